//! `kintai-supervisor`: Keeping the service alive unattended.
//!
//! - [`launch`] tells a supervisor-launched process from a hand-started one.
//! - [`bind`] runs startup sequencing: yield to a healthy instance (manual
//!   launches only), reclaim the port, bind with reuse and bounded retries.
//! - [`restart`] drives the external supervisor's forced restart.
//! - [`watchdog`] is the probe-then-restart cycle behind `kintai-watchdog`.
//!
//! Every external command runs through [`exec`] with a timeout.

pub mod bind;
pub mod error;
pub mod exec;
pub mod launch;
pub mod probe;
pub mod reclaim;
pub mod restart;
pub mod watchdog;

pub use bind::{acquire, Startup};
pub use error::{Result, SupervisorError};
pub use launch::LaunchMode;
pub use probe::{HttpProbe, LivenessProbe};
pub use reclaim::{LsofReclaimer, PortReclaimer};
pub use restart::{schedule_restart, RestartCommand, RestartOutcome};
pub use watchdog::{run_cycle, CycleOutcome};
