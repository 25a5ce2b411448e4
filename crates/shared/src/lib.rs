//! Types shared between the server and its clients
//!
//! - `protocol` - WebSocket command and message envelopes
//! - `models` - Users, auth tokens, games and HTTP request/response bodies

pub mod models;
pub mod protocol;
