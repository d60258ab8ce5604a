//! Per-connection authenticated context and the session table that owns it.

mod context;
mod store;

pub use context::{AuthContext, SelectedEnvironment, SelectionError, resolve_environment};
pub use store::{Session, SessionStore};
