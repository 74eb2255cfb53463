//! `kintai-scheduler`: Cancellable background loops.
//!
//! # Overview
//!
//! A [`task::ScheduledTask`] runs a job on a [`Schedule`] until its
//! `CancellationToken` fires. A failing run is logged and the loop waits for
//! the next tick; it never terminates the task. Delays are computed with
//! `tokio::time`, so tests drive the loop with a paused runtime clock.
//!
//! # Schedule variants
//!
//! | Variant    | Behaviour                                   |
//! |------------|---------------------------------------------|
//! | `Interval` | Repeat every N seconds                      |
//! | `Daily`    | Fire at HH:MM local time every day          |

pub mod schedule;
pub mod task;

pub use schedule::Schedule;
pub use task::{spawn_task, ScheduledTask};
