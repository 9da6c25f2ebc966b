//! # Pantry Raider
//!
//! A pantry inventory server with owner/editor/viewer sharing, usable both as
//! a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! pantry-raider = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pantry_raider::config::ServerConfig;
//! use pantry_raider::server::{AppState, create_router};
//! use pantry_raider::store::SqliteStore;
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), &config));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! Access decisions live in [`access::Resolver`]; the HTTP layer only
//! authenticates the caller and forwards their user id.
//!
//! ## Feature Flags
//!
//! - `cli` (default): Pulls in the dependencies of the `pantry-raider` binary.
//!   Disable with `default-features = false`.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
