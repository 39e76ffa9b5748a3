//! Core abstractions for lsp-mux.
//!
//! This crate holds everything the router needs that does not depend on the
//! registry of feature servers:
//!
//! - **Merge**: the fold that combines partial initialize results
//! - **Protocol**: typed vendor requests and notifications (`aws/*`)
//! - **Client sink**: the outbound channel to the editor
//! - **Error types**: structured wire errors and router errors
//!
//! # Examples
//!
//! Merging two partial initialize results on top of the runtime defaults:
//!
//! ```
//! use lsp_mux_core::merge::fold;
//! use lsp_mux_core::protocol::PartialInitializeResult;
//! use serde_json::json;
//!
//! let base = serde_json::to_value(PartialInitializeResult::runtime_defaults("mux", "1.0.0"))
//!     .unwrap();
//! let merged = fold(
//!     base,
//!     [
//!         json!({"capabilities": {"executeCommandProvider": {"commands": ["log"]}}}),
//!         json!({"capabilities": {"executeCommandProvider": {"commands": ["run"]}}}),
//!     ],
//! );
//!
//! let merged: PartialInitializeResult = serde_json::from_value(merged).unwrap();
//! assert_eq!(merged.server_name(), Some("mux"));
//! assert_eq!(merged.commands(), ["run".to_string(), "log".to_string()]);
//! ```

pub mod client;
pub mod error;
pub mod merge;
pub mod protocol;

pub use client::ClientSink;
pub use error::{AwsErrorCode, MuxError, ResponseError, Result};
pub use merge::{fold, merge_into, prepend_unique};
pub use protocol::{
    AwsServerCapabilities, ConfigurationProvider, CredentialsType,
    GetConfigurationFromServerParams, NotificationFollowupParams, NotificationId,
    NotificationParams, PartialInitializeResult, SERVER_CAPABILITIES_CONFIGURATION_SECTION,
    UpdateConfigurationParams,
};
