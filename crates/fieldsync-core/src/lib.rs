//! fieldsync-core - Core library for fieldsync
//!
//! This crate contains the soil observation models, the offline-first sync
//! engine, and the service wrapper used by fieldsync clients.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use services::SyncService;
pub use state::SyncState;
