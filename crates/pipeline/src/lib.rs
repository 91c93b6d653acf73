//! Session-scoped pipeline driver
//!
//! Composes the whole workflow: mission -> script -> speech -> duration
//! gate -> images/videos -> sync plan -> overlays -> composition. The
//! compositor itself is an external collaborator behind a trait.

pub mod compositor;
pub mod driver;
pub mod metadata;
pub mod session;

pub use compositor::{CompositionRequest, Compositor, Overlay};
pub use driver::{PipelineDriver, SessionResult, SessionStatus};
pub use metadata::SessionMetadata;
pub use session::{CancelHandle, SessionContext};
