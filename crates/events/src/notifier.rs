//! Forwards `lead.submitted` events to the notification webhook.
//!
//! SMS and voice senders live outside this system; [`LeadNotifier`] hands
//! them each new lead and nothing else. It runs as a background task and
//! exits when the [`EventBus`](crate::bus::EventBus) is dropped.

use tokio::sync::broadcast;

use crate::bus::{FunnelEvent, LEAD_SUBMITTED};
use crate::webhook::WebhookDelivery;

pub struct LeadNotifier {
    delivery: WebhookDelivery,
    url: String,
}

impl LeadNotifier {
    pub fn new(delivery: WebhookDelivery, url: String) -> Self {
        Self { delivery, url }
    }

    /// Run the relay loop until the channel closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<FunnelEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) if event.event_type == LEAD_SUBMITTED => {
                    if let Err(e) = self.delivery.deliver(&self.url, &event).await {
                        tracing::error!(
                            error = %e,
                            lead_id = ?event.source_entity_id,
                            "Failed to deliver lead notification"
                        );
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Lead notifier lagged, some leads were not relayed");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, lead notifier shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bus::EventBus;

    #[tokio::test]
    async fn ignores_other_events_and_stops_when_bus_drops() {
        let bus = EventBus::default();
        let notifier = LeadNotifier::new(
            WebhookDelivery::with_client(reqwest::Client::new()),
            "http://127.0.0.1:9/unused".to_string(),
        );
        let handle = tokio::spawn(notifier.run(bus.subscribe()));

        bus.publish(FunnelEvent::new("draft.saved"));
        drop(bus);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("notifier should stop once the bus is gone")
            .unwrap();
    }
}
