//! Glasslead event bus and lead notification relay.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`FunnelEvent`]: the event envelope, e.g. `lead.submitted`.
//! - [`WebhookDelivery`] / [`LeadNotifier`]: forward submitted leads to an
//!   external notification endpoint (SMS, voice) when one is configured.

pub mod bus;
pub mod notifier;
pub mod webhook;

pub use bus::{EventBus, FunnelEvent};
pub use notifier::LeadNotifier;
pub use webhook::WebhookDelivery;
