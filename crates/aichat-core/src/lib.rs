pub mod ai;
pub mod config;
pub mod error;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::{EndpointClient, Generator};
pub use config::Config;
pub use error::RequestFailed;
pub use session::{ChatSession, PendingRequest, SessionEvent, FALLBACK_MESSAGE};
pub use state::{ChatMessage, ChatRole};
