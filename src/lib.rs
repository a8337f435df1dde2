//! # tesmart
//!
//! Client driver for TESmart-style HDMI matrix switches:
//! - Fixed 6-byte binary command protocol over one TCP connection
//! - Transparent reconnect with bounded backoff
//! - Single-flight request/response correlation (the protocol has no IDs)
//! - Unsolicited status pushes routed to an observer
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SwitchClient                            │
//! │             (validate, encode, await reply)                  │
//! └──────────┬──────────────────────────────────▲───────────────┘
//!            │ write                            │ reply
//! ┌──────────▼──────────┐            ┌──────────┴──────────┐
//! │     Supervisor      │  frames    │     Correlator      │
//! │ (read loop, redial) ├───────────►│  (pending marker)   ├──► Observer
//! └──────────┬──────────┘            └─────────────────────┘
//!            │
//!            ▼
//!       TCP :5000
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use tesmart::{Config, SwitchClient};
//!
//! let config = Config::builder().addr("192.168.1.10:5000").build();
//! let client = SwitchClient::connect(config)?;
//! let active = client.switch_input(3)?;
//! assert_eq!(active, 3);
//! # Ok::<(), tesmart::SwitchError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{SwitchError, Result};
pub use config::{Config, Model};
pub use client::SwitchClient;
pub use network::ConnectionState;
pub use protocol::{Command, Frame};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the driver
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
