//! Voice assistant calls: starts calls through the SDK and runs one
//! consumer task per call that feeds queued events to its machine.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{info, warn};

use super::events::VoiceEvent;
use super::machine::{VoiceCallStatus, VoiceCommand, VoiceSessionMachine, VoiceSessionState};
use super::queue::{voice_event_channel, VoiceEventSender, VOICE_QUEUE_CAPACITY};
use super::webhook::ServerMessage;
use crate::common::Machine;
use crate::kernel::stream_hub::voice_topic;
use crate::kernel::{BaseVoiceSdk, StreamHub, VoiceCall};

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice assistant is not configured")]
    NotConfigured,

    #[error("unknown voice call: {0}")]
    UnknownCall(String),

    #[error(transparent)]
    Sdk(#[from] anyhow::Error),
}

struct VoiceSession {
    call: VoiceCall,
    events: VoiceEventSender,
    state: watch::Receiver<VoiceSessionState>,
}

#[derive(Clone)]
pub struct VoiceSessions {
    sessions: Arc<RwLock<HashMap<String, VoiceSession>>>,
    sdk: Option<Arc<dyn BaseVoiceSdk>>,
    default_assistant_id: Option<String>,
    stream_hub: StreamHub,
}

impl VoiceSessions {
    pub fn new(
        sdk: Option<Arc<dyn BaseVoiceSdk>>,
        default_assistant_id: Option<String>,
        stream_hub: StreamHub,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            sdk,
            default_assistant_id,
            stream_hub,
        }
    }

    fn sdk(&self) -> Result<Arc<dyn BaseVoiceSdk>, VoiceError> {
        self.sdk.clone().ok_or(VoiceError::NotConfigured)
    }

    /// Start a call with `assistant_id`, or the configured default.
    pub async fn start(&self, assistant_id: Option<&str>) -> Result<VoiceSessionState, VoiceError> {
        let sdk = self.sdk()?;
        let assistant_id = assistant_id
            .map(str::to_string)
            .or_else(|| self.default_assistant_id.clone())
            .ok_or(VoiceError::NotConfigured)?;

        let call = sdk.start_session(&assistant_id).await?;
        info!(call_id = %call.id, assistant_id = %call.assistant_id, "Voice call started");

        let machine = VoiceSessionMachine::new(call.id.clone());
        let initial = machine.state().clone();
        let (state_tx, state_rx) = watch::channel(initial.clone());
        let (events, rx) = voice_event_channel(VOICE_QUEUE_CAPACITY);

        tokio::spawn(consume(
            machine,
            rx,
            sdk,
            self.stream_hub.clone(),
            state_tx,
        ));

        self.sessions.write().await.insert(
            call.id.clone(),
            VoiceSession {
                call,
                events,
                state: state_rx,
            },
        );
        Ok(initial)
    }

    /// Stop a call and forget it. Returns the last known state.
    pub async fn stop(&self, call_id: &str) -> Result<VoiceSessionState, VoiceError> {
        if !self.sessions.read().await.contains_key(call_id) {
            return Err(VoiceError::UnknownCall(call_id.to_string()));
        }

        self.sdk()?.stop_session(call_id).await?;

        let session = self
            .sessions
            .write()
            .await
            .remove(call_id)
            .ok_or_else(|| VoiceError::UnknownCall(call_id.to_string()))?;
        session.events.push(VoiceEvent::CallEnded).await;
        info!(call_id = %session.call.id, "Voice call stopped");

        let mut state = session.state.borrow().clone();
        state.status = VoiceCallStatus::Ended;
        state.volume_level = 0.0;
        Ok(state)
    }

    pub async fn state(&self, call_id: &str) -> Option<VoiceSessionState> {
        self.sessions
            .read()
            .await
            .get(call_id)
            .map(|s| s.state.borrow().clone())
    }

    /// Queue an event for a call.
    pub async fn dispatch(&self, call_id: &str, event: VoiceEvent) -> Result<(), VoiceError> {
        let events = self
            .sessions
            .read()
            .await
            .get(call_id)
            .map(|s| s.events.clone())
            .ok_or_else(|| VoiceError::UnknownCall(call_id.to_string()))?;

        if !events.push(event).await {
            warn!(call_id, "Voice call consumer has ended, event dropped");
        }
        Ok(())
    }

    /// Route a webhook message to its call. Returns whether it produced an event.
    pub async fn handle_server_message(&self, message: ServerMessage) -> Result<bool, VoiceError> {
        let Some(call_id) = message.call_id().map(str::to_string) else {
            return Ok(false);
        };
        match message.into_event() {
            Some(event) => {
                self.dispatch(&call_id, event).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Per-call consumer: apply events in order, publish state, and execute
/// stop requests.
async fn consume(
    mut machine: VoiceSessionMachine,
    mut rx: mpsc::Receiver<VoiceEvent>,
    sdk: Arc<dyn BaseVoiceSdk>,
    stream_hub: StreamHub,
    state_tx: watch::Sender<VoiceSessionState>,
) {
    let call_id = machine.state().call_id.clone();
    let topic = voice_topic(&call_id);

    while let Some(event) = rx.recv().await {
        let command = machine.decide(&event);
        stream_hub.publish_event(&topic, "voice_event", &event).await;

        if let Some(VoiceCommand::StopCall { call_id }) = command {
            warn!(call_id = %call_id, error = ?machine.state().last_error, "Stopping voice call after error");
            if let Err(e) = sdk.stop_session(&call_id).await {
                warn!(call_id = %call_id, error = %e, "Failed to stop voice call");
            }
            machine.decide(&VoiceEvent::CallEnded);
        }

        state_tx.send_replace(machine.state().clone());
        stream_hub
            .publish_event(&topic, "voice_state", machine.state())
            .await;

        if machine.is_ended() {
            break;
        }
    }
}
