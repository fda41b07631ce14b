//! HTTP server and request routing

pub mod http;

pub use http::{run, AppState};
