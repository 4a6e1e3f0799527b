// Relay module - HTTP endpoint that forwards advice conversations upstream
//
// Request path: CORS -> trace span -> per-client rate limit -> handler.
// The chat handler validates the body, prepends the system prompt, makes one
// upstream call, and returns the sanitized reply. All failures leave through
// `RelayError`, which owns status codes and client-facing wording.

mod cors;
mod error;
mod handlers;
mod helpers;
pub mod models;
pub mod prompt;
pub mod rate_limit;
pub mod sanitize;
pub mod server;
pub mod state;
pub mod upstream;

pub use server::start_server;
