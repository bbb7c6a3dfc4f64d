//! # tokensync - Design Token Relay and Sync Tool
//!
//! Application library behind the `tokensync` binary.
//!
//! This crate provides:
//! - Relay HTTP API server (axum-based)
//! - CLI interface for store operations and publishing
//! - Relay HTTP client (reqwest-based)
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                   apps/tokensync (THE BINARY)                  │
//! │                                                                │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────┐  │
//! │  │   CLI       │    │  Relay API   │    │  Relay Client   │  │
//! │  │  (clap)     │    │  (axum)      │    │  (reqwest)      │  │
//! │  └──────┬──────┘    └──────┬───────┘    └────────┬────────┘  │
//! │         │                  │                     │            │
//! │         └──────────────────┼─────────────────────┘            │
//! │                            ▼                                  │
//! │                  ┌──────────────────┐                         │
//! │                  │  tokensync-core  │                         │
//! │                  │   (THE LOGIC)    │                         │
//! │                  └──────────────────┘                         │
//! └────────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod cli;
pub mod client;
pub mod remote;
pub mod settings;
