//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod clock;
pub mod mute;
pub mod notifier;
pub mod region_monitor;
pub mod rule_store;
pub mod sync;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use mute::MuteActuatorPort;
pub use notifier::{Notice, UserNotifier};
pub use region_monitor::RegionMonitorPort;
pub use rule_store::RuleStore;
pub use sync::RemoteSync;
pub use timer::{Precision, TimerHandle, TimerPort};
