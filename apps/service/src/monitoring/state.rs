use chrono::{DateTime, Utc};

use super::types::CheckResult;
use crate::database::models::SiteStatus;

/// Per-site scheduling state, owned by the scheduler.
///
/// Lives only in memory; a restart starts over with a zeroed failure
/// streak.
#[derive(Debug, Clone)]
pub struct RuntimeState {
    /// Next time this site is due for a check
    pub next_run: DateTime<Utc>,
    /// Consecutive failed checks observed since the last success
    pub consecutive_failures: u32,
}

impl RuntimeState {
    pub fn new(next_run: DateTime<Utc>) -> Self {
        Self { next_run, consecutive_failures: 0 }
    }
}

/// A confirmed availability transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Confirmed UP -> DOWN
    Down,
    /// Confirmed DOWN -> UP
    Recovered,
}

/// What a single check result means for a site, given its stored status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    /// Confirmed transition to alert on, at most one per flip
    pub transition: Option<Transition>,
    /// Whether the stored `is_up` flips with this write
    pub state_changed: bool,
    /// Whether the status row is written at all
    pub write_status: bool,
    /// First-ever observation of this site
    pub initial: bool,
}

/// Decide what a check result means for a site.
///
/// `consecutive_failures` is the streak before this result; the returned
/// value is the streak after it. A failing site whose stored status is UP
/// is not considered down until the streak reaches `confirm_down_after`;
/// until then the status row is left untouched, so readers keep seeing the
/// site as up.
pub fn evaluate(
    previous: Option<&SiteStatus>,
    result: &CheckResult,
    consecutive_failures: u32,
    confirm_down_after: u32,
) -> (u32, Assessment) {
    if result.is_up {
        let recovered = previous.is_some_and(|p| !p.is_up);
        return (
            0,
            Assessment {
                transition: recovered.then_some(Transition::Recovered),
                state_changed: recovered,
                write_status: true,
                initial: previous.is_none(),
            },
        );
    }

    let failures = consecutive_failures.saturating_add(1);

    let assessment = match previous {
        // Never seen before: recorded as down, but an unconfirmed baseline
        // is not an outage.
        None => Assessment {
            transition: None,
            state_changed: false,
            write_status: true,
            initial: true,
        },
        Some(p) if p.is_up && failures >= confirm_down_after => Assessment {
            transition: Some(Transition::Down),
            state_changed: true,
            write_status: true,
            initial: false,
        },
        // Below the confirmation threshold, or already known down.
        Some(_) => Assessment {
            transition: None,
            state_changed: false,
            write_status: false,
            initial: false,
        },
    };

    (failures, assessment)
}
