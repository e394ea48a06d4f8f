//! # bolt-dispatch
//!
//! In-memory bookkeeping for the bolt controller's message dispatcher.
//!
//! The crate provides three independent components and a thin composition of
//! them:
//!
//! - [`SchemaRegistry`] — named message schemas (opaque JSON structures)
//! - [`Packet`] / [`PacketEncoder`] — payload + SHA-256 identifier, rendered
//!   as a flat JSON envelope
//! - [`DispatchQueue`] — identifier → last observed [`DispatchStatus`]
//! - [`Dispatcher`] — owns one of each and drives the outgoing flow
//!
//! Transmission is left to the caller.
//!
//! ## Envelope
//!
//! ```text
//! {"id":"<64 hex chars>","payload":<payload>}
//! ```
//!
//! ## Example
//!
//! ```rust
//! use bolt_dispatch::{DispatchConfig, DispatchStatus, Dispatcher};
//! use serde_json::json;
//!
//! let mut dispatcher = Dispatcher::new(&DispatchConfig::default());
//! dispatcher
//!     .registry_mut()
//!     .add("ping", json!({"type": "string"}))
//!     .unwrap();
//!
//! let (id, envelope) = dispatcher.prepare("ping", &json!({"cmd": "run"})).unwrap();
//! assert!(envelope.starts_with(r#"{"id":""#));
//!
//! dispatcher.record_response(&id.to_hex(), "Completed").unwrap();
//! assert_eq!(
//!     dispatcher.queue().status(&id.to_hex()),
//!     Some(&DispatchStatus::Completed)
//! );
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod packet;
pub mod queue;
pub mod schema;
pub mod shared;

pub use config::{DispatchConfig, PacketConfig, QueueConfig};
pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use packet::{encode, Envelope, IdentifierMode, Packet, PacketEncoder, PacketId};
pub use queue::{DispatchQueue, DispatchStatus, QueueEntry, RetentionPolicy};
pub use schema::SchemaRegistry;
pub use shared::{SharedDispatchQueue, MIN_SWEEP_INTERVAL};

/// Hex-encoded packet identifier as used for queue keys.
pub type MessageId = String;

/// Length in bytes of a packet digest (SHA-256).
pub const DIGEST_LEN: usize = 32;

/// Status assigned by the queue to freshly enqueued entries.
pub const AWAITED: &str = "Awaited";
