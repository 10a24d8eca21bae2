//! Live session core and work loop for the LobsterFoundry agent.

mod channel;
pub mod events;
pub mod frames;
pub mod mirror;
pub mod session;
pub mod work;

pub use channel::resolve_live_url;
pub use events::SessionEvent;
pub use frames::{Action, InteractTarget};
pub use mirror::Mirror;
pub use session::{BootstrapReport, Phase, Session, TutorialOutcome};
pub use work::{CycleOutcome, check_and_work, run_cycle};
