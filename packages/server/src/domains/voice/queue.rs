//! Explicit event queue between SDK callbacks and the session machine.

use tokio::sync::mpsc;
use tracing::warn;

use super::events::{TranscriptMessage, VoiceEvent};

/// Default queue depth per call.
pub const VOICE_QUEUE_CAPACITY: usize = 128;

/// Cloneable sending side. Each SDK callback maps to one method.
#[derive(Clone)]
pub struct VoiceEventSender {
    tx: mpsc::Sender<VoiceEvent>,
}

pub fn voice_event_channel(capacity: usize) -> (VoiceEventSender, mpsc::Receiver<VoiceEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (VoiceEventSender { tx }, rx)
}

impl VoiceEventSender {
    /// Queue an event, waiting for room. Returns false once the consumer
    /// has gone away.
    pub async fn push(&self, event: VoiceEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Queue from a synchronous callback; drops the event if the queue is full.
    pub fn try_push(&self, event: VoiceEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "Voice event queue full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn on_call_start(&self) -> bool {
        self.try_push(VoiceEvent::CallStarted)
    }

    pub fn on_call_end(&self) -> bool {
        self.try_push(VoiceEvent::CallEnded)
    }

    pub fn on_volume_level(&self, level: f32) -> bool {
        self.try_push(VoiceEvent::VolumeLevel { level })
    }

    pub fn on_message(&self, message: TranscriptMessage) -> bool {
        self.try_push(VoiceEvent::Transcript(message))
    }

    pub fn on_error(&self, message: impl Into<String>) -> bool {
        self.try_push(VoiceEvent::Error {
            message: message.into(),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_callbacks_arrive_in_order() {
        let (sender, mut rx) = voice_event_channel(8);

        sender.on_call_start();
        sender.on_volume_level(0.5);
        sender.on_error("mic lost");

        assert_eq!(rx.recv().await, Some(VoiceEvent::CallStarted));
        assert_eq!(rx.recv().await, Some(VoiceEvent::VolumeLevel { level: 0.5 }));
        assert_eq!(
            rx.recv().await,
            Some(VoiceEvent::Error {
                message: "mic lost".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let (sender, _rx) = voice_event_channel(1);
        assert!(sender.on_call_start());
        assert!(!sender.on_call_end());
    }

    #[tokio::test]
    async fn test_closed_queue_reports_false() {
        let (sender, rx) = voice_event_channel(1);
        drop(rx);
        assert!(!sender.push(VoiceEvent::CallEnded).await);
        assert!(sender.is_closed());
    }
}
