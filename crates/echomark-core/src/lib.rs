//! Echomark Core - shared model for content-based audio identification
//!
//! This crate holds everything the fingerprinting pipeline and the matching
//! engine agree on:
//! - Peak, landmark and match result types
//! - The canonical landmark hash representation
//! - The catalog store capability and its bundled implementations
//! - The crate-wide error type
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Echomark Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │     Peak     │  │   Landmark   │  │    Match     │           │
//! │  │              │  │    Record    │  │    Result    │           │
//! │  └──────────────┘  └──────┬───────┘  └──────────────┘           │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Catalog   │                              │
//! │                    │    Store    │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │            ┌──────────────┴──────────────┐                      │
//! │     ┌──────┴───────┐             ┌───────┴──────┐               │
//! │     │    Memory    │             │     File     │               │
//! │     │   Catalog    │             │   Catalog    │               │
//! │     └──────────────┘             └──────────────┘               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod store;
pub mod types;

pub use error::{Error, Result};
pub use store::{CatalogStore, FileCatalog, MemoryCatalog};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() {
    tracing::info!(version = VERSION, "Echomark Core initialized");
}
