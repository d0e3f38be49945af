//! Session runner: the single event loop around a `WorkoutSession`.
//!
//! User input and timers are producers on one channel; the runner is the
//! only consumer and applies messages one at a time, so a transition always
//! completes before the next message is looked at.
//!
//! In wall-clock mode the runner owns two metronomes:
//! - the elapsed metronome, alive for the whole session
//! - the rest metronome, alive only while the session is resting
//!
//! Both are stopped when the session ends for any reason. Rest ticks carry
//! the number of the rest period that produced them, so a tick that lands
//! after its rest ended never reaches a later rest. In virtual mode no
//! threads are spawned and the caller sends tick events itself.

use crate::recorder::{self, Delivery};
use crate::session::{Outcome, SessionEvent, WorkoutSession};
use crate::timer::{Clock, Metronome};
use crate::wal::CompletionSink;
use crate::CompletionRecord;
use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

/// A message for the runner
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SessionMessage {
    Event(SessionEvent),
    /// Tick from the rest metronome of one rest period
    ///
    /// Dropped unless that rest is still running.
    RestTick { rest: u64 },
    /// Leave the session without recording it
    Abandon,
}

/// Where ticks come from
pub enum Ticking {
    /// Spawn metronomes that send ticks on this channel
    WallClock(Sender<SessionMessage>),
    /// The caller sends tick events
    Virtual,
}

/// How a run ended
#[derive(Debug)]
pub enum SessionEnd {
    Completed {
        record: CompletionRecord,
        delivery: Delivery,
    },
    Abandoned {
        elapsed: u64,
    },
    /// Every sender hung up before the session finished
    Disconnected {
        elapsed: u64,
    },
}

pub struct SessionRunner<'a, C: Clock> {
    session: WorkoutSession,
    sink: &'a mut dyn CompletionSink,
    clock: C,
    tick_period: Duration,
}

impl<'a, C: Clock> SessionRunner<'a, C> {
    pub fn new(session: WorkoutSession, sink: &'a mut dyn CompletionSink, clock: C) -> Self {
        Self {
            session,
            sink,
            clock,
            tick_period: Duration::from_secs(1),
        }
    }

    /// Override the one-second metronome period
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Process messages until the session finishes, is abandoned, or loses
    /// every sender
    ///
    /// `observer` sees the session after each applied message together
    /// with what the message did.
    pub fn run<F>(mut self, rx: Receiver<SessionMessage>, ticking: Ticking, mut observer: F) -> SessionEnd
    where
        F: FnMut(&WorkoutSession, &Outcome),
    {
        let tick_tx = match ticking {
            Ticking::WallClock(tx) => Some(tx),
            Ticking::Virtual => None,
        };

        let _elapsed_metronome = tick_tx.as_ref().map(|tx| {
            Metronome::spawn(tx.clone(), self.tick_period, || {
                SessionMessage::Event(SessionEvent::ElapsedTick)
            })
        });
        let mut rest_metronome: Option<Metronome> = None;
        let mut rest_period: u64 = 0;

        while let Ok(message) = rx.recv() {
            let event = match message {
                SessionMessage::RestTick { rest } => {
                    if rest_metronome.is_none() || rest != rest_period {
                        tracing::trace!("Dropping tick from finished rest {}", rest);
                        continue;
                    }
                    SessionEvent::RestTick
                }
                SessionMessage::Abandon => {
                    tracing::info!(
                        "Abandoned '{}' after {}s",
                        self.session.workout_name(),
                        self.session.elapsed_seconds()
                    );
                    return SessionEnd::Abandoned {
                        elapsed: self.session.elapsed_seconds(),
                    };
                }
                SessionMessage::Event(event) => event,
            };

            let was_resting = self.session.phase().is_resting();
            let outcome = self.session.handle(event, self.clock.now());
            let is_resting = self.session.phase().is_resting();

            if let Some(tx) = tick_tx.as_ref() {
                if !was_resting && is_resting {
                    rest_period += 1;
                    let rest = rest_period;
                    rest_metronome = Some(Metronome::spawn(tx.clone(), self.tick_period, move || {
                        SessionMessage::RestTick { rest }
                    }));
                } else if was_resting && !is_resting {
                    if let Some(mut metronome) = rest_metronome.take() {
                        metronome.stop();
                    }
                }
            }

            observer(&self.session, &outcome);

            if let Outcome::Finished(record) = outcome {
                let delivery = recorder::deliver(self.sink, &record);
                return SessionEnd::Completed {
                    record: *record,
                    delivery,
                };
            }
        }

        tracing::warn!("All session inputs closed before the workout finished");
        SessionEnd::Disconnected {
            elapsed: self.session.elapsed_seconds(),
        }
    }
}
