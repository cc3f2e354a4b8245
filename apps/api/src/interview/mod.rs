// Interview progression: the per-candidate state machine, its registry, and
// the REST surface. Sequencing rules live in `session`; everything here is
// keyed by candidate id — there is no process-global interview state.

pub mod handlers;
pub mod phase;
pub mod registry;
pub mod session;
pub mod summary;
pub mod tier;
pub mod validation;

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::state::AppState;

/// Spawns the background task that auto-submits empty answers for overdue
/// questions once per second, independent of client polling.
pub fn spawn_expiry_sweeper(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            handlers::sweep_expired(&state).await;
        }
    })
}
