//! Session resolution and the auth flows built on top of it.

mod flow;
pub(crate) mod flow_state;
mod resolver;
mod state;
mod types;

pub use flow::{AuthFlow, SignUpOutcome};
pub use flow_state::{AuthFlowPhase, AuthFlowRecord, FLOW_STATE_KEY};
pub use resolver::SessionResolver;
pub use state::{SessionHandle, SessionState};
pub use types::{Identity, Role};
