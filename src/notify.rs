use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// A booking event delivered to subscribers of a band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub band_id: Ulid,
    pub event: Event,
}

impl Notification {
    /// JSON rendering for transports that carry text payloads.
    pub fn payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Broadcast hub for booking changes, one channel per band.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Notification>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a band's booking changes. Creates the channel if needed.
    pub fn subscribe(&self, band_id: Ulid) -> broadcast::Receiver<Notification> {
        let sender = self
            .channels
            .entry(band_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// No-op if nobody is listening.
    pub fn send(&self, band_id: Ulid, event: &Event) {
        if let Some(sender) = self.channels.get(&band_id) {
            let _ = sender.send(Notification {
                band_id,
                event: event.clone(),
            });
        }
    }
}
