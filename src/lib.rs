//! Alcove - anonymous one-to-one chat over WebSocket
//!
//! Alcove pairs each connecting guest with the oldest waiting stranger and
//! relays chat frames between the two until either side hangs up. Pairing
//! state lives in Redis, so multiple Alcove processes sharing one Redis
//! form a single pairing pool.
//!
//! ## Services
//!
//! - **Chat**: WebSocket pairing and relay at /ws
//! - **Store**: Redis-backed queue and pair records (in-memory for tests)
//! - **Ops**: Health, readiness, version and status endpoints

pub mod chat;
pub mod config;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{AlcoveError, Result};
