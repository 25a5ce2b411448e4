//! Chess game server
//!
//! # Module Structure
//!
//! - `config` - Command line / environment configuration
//! - `error` - Service error taxonomy and its HTTP mapping
//! - `data_access` - Storage collaborator (in-memory or SQLite)
//! - `service` - Accounts, games and move application over the storage
//! - `rooms` - Connection registry and per-game locks
//! - `game` - WebSocket command handler driving the rooms
//! - `auth` / `api` - HTTP routes and the WebSocket upgrade

pub mod api;
pub mod auth;
pub mod config;
pub mod data_access;
pub mod error;
pub mod game;
pub mod rooms;
pub mod service;
