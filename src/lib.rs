//! LoRaWAN network server core in Rust
//!
//! This crate implements the network server tier of a LoRaWAN backend. It sits
//! between the broker, which deduplicates gateway traffic, and the handler,
//! which talks to applications. It owns the MAC-layer state of every device.
//!
//! # Features
//! - DevAddr prefix registry with usage constraints (multi-tenant allocation)
//! - 16-bit to 32-bit frame counter reconstruction
//! - Two-phase OTAA activation
//! - Join accept and downlink frame construction with MIC signing
//! - Pluggable device store, with an in-memory implementation
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use lorawan_ns::{
//!     config::NetworkServerConfig,
//!     server::NetworkServer,
//!     store::MemoryDeviceStore,
//! };
//!
//! let config = NetworkServerConfig::from_toml_str(r#"
//!     net_id = 0x000013
//!
//!     [[prefixes]]
//!     prefix = "26000000/7"
//!     usages = ["otaa"]
//! "#).unwrap();
//!
//! let store = Arc::new(MemoryDeviceStore::new());
//! let server = NetworkServer::from_config(store, &config).unwrap();
//! assert_eq!(server.prefixes_for(&["otaa"]).len(), 1);
//! ```

#![warn(missing_docs)]

/// Network server configuration
pub mod config;

/// Message Integrity Code computation
pub mod crypto;

/// Device session records
pub mod device;

/// Error types
pub mod error;

/// Frame counter reconstruction
pub mod fcnt;

/// LoRaWAN frame codec
pub mod lorawan;

/// Broker and handler messages
pub mod messages;

/// DevAddr prefixes and allocation
pub mod prefix;

/// Request handling
pub mod server;

/// Device directory
pub mod store;

/// Identifiers and keys
pub mod types;

pub use error::{Error, Result};
pub use server::NetworkServer;
