// access/src/session.rs

use serde::Serialize;

use models::PatientRecord;

use crate::timer::TickOutcome;

/// Seconds of record access granted by a successful verification.
pub const ACCESS_TTL_SECS: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    Search,
    ContactFound,
    Verifying,
    Accessing,
}

/// Process-local secure access session. Owned by one controller; never
/// persisted. The epoch counter is bumped on every reset so a timer task
/// from an earlier life of the session can recognize it is stale.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub state: AccessState,
    pub target: Option<PatientRecord>,
    pub code: Option<String>,
    pub ttl: u32,
    pub epoch: u64,
}

impl SessionState {
    pub fn new() -> Self {
        SessionState {
            state: AccessState::Search,
            target: None,
            code: None,
            ttl: 0,
            epoch: 0,
        }
    }

    /// Back to `search` with every session field cleared, in one step.
    pub fn reset(&mut self) {
        self.state = AccessState::Search;
        self.target = None;
        self.code = None;
        self.ttl = 0;
        self.epoch += 1;
    }
}

/// One countdown step. Stale epochs and non-accessing states are ignored;
/// hitting zero tears the whole session down within the same mutation, so
/// no caller can observe ttl=0 while still in `accessing`.
pub(crate) fn apply_tick(session: &mut SessionState, epoch: u64) -> TickOutcome {
    if session.epoch != epoch || session.state != AccessState::Accessing {
        return TickOutcome::Stop;
    }
    session.ttl = session.ttl.saturating_sub(1);
    if session.ttl == 0 {
        session.reset();
        TickOutcome::Stop
    } else {
        TickOutcome::Continue
    }
}

/// What the shell is allowed to see of the session. The issued code is
/// deliberately not part of this view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: AccessState,
    pub patient: Option<PatientRecord>,
    pub remaining_seconds: u32,
}
