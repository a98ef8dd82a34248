//! Session-scoped storage
//!
//! Lightweight string-keyed storage for metadata that should live for the
//! process lifetime and no longer. Durable stores (the structured local
//! database, the desktop secure store) are separate backends owned by the
//! surrounding application.

mod session;

pub use session::{MemorySessionStore, SessionStore};
