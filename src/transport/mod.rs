//! HTTP transport and failure classification.
//!
//! - [`client`]: reqwest-backed client that unwraps the entity envelope
//! - [`error`]: the transport failure taxonomy
//! - [`notify`]: the user-facing notification channel and status-message table

pub mod client;
pub mod error;
pub mod notify;

pub use client::{Envelope, Transport};
pub use error::TransportError;
pub use notify::{Level, Notification, Notifier};
