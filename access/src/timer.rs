// access/src/timer.rs

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// What the tick callback tells the timer to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop,
}

/// Cancellable one-second countdown driving access expiry.
///
/// The timer owns nothing but the task handle; every tick runs the supplied
/// callback, which decides whether the countdown goes on. Cancellation is
/// idempotent and safe after natural expiry, and the owning controller
/// guards each tick with a session epoch so a dangling task can never
/// mutate a destroyed session.
#[derive(Debug, Default)]
pub struct SessionTimer {
    handle: Option<JoinHandle<()>>,
}

impl SessionTimer {
    pub fn new() -> Self {
        SessionTimer::default()
    }

    /// Starts ticking once per second. Any previous countdown is cancelled
    /// first.
    pub fn start<F>(&mut self, mut on_tick: F)
    where
        F: FnMut() -> TickOutcome + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately; consume
            // it so the countdown starts a full second from now.
            interval.tick().await;
            loop {
                interval.tick().await;
                if on_tick() == TickOutcome::Stop {
                    break;
                }
            }
        }));
    }

    /// Stops the countdown. Safe to call repeatedly or after the timer has
    /// already run out.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
