//! HTTP surface of the Curio quest engine.
//!
//! Exposes quest reads, progress persistence, collection replacement,
//! leaderboard appends and account deletion over the store selected at
//! startup. The binary in `main.rs` wires configuration, tracing and
//! graceful shutdown around [`router::build_app_router`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod seed;
pub mod state;
