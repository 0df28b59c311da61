//! Server-side game sessions keyed by an opaque identifier.

mod models;
/// In-memory session storage with idle expiry.
pub mod store;

pub use models::{SessionId, SessionSnapshot};
pub use store::SessionStore;
