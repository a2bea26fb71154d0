use serde::{Deserialize, Serialize};

use super::events::{TranscriptMessage, VoiceEvent};
use crate::common::Machine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceCallStatus {
    Connecting,
    Active,
    Ended,
}

/// What the UI shows about a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSessionState {
    pub call_id: String,
    pub status: VoiceCallStatus,
    /// 0.0..=1.0
    pub volume_level: f32,
    pub transcript: Vec<TranscriptMessage>,
    /// Latest partial message, replaced until its final version arrives.
    pub pending: Option<TranscriptMessage>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceCommand {
    StopCall { call_id: String },
}

/// Voice session machine - owns the state of one call
pub struct VoiceSessionMachine {
    state: VoiceSessionState,
    stop_requested: bool,
}

impl VoiceSessionMachine {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            state: VoiceSessionState {
                call_id: call_id.into(),
                status: VoiceCallStatus::Connecting,
                volume_level: 0.0,
                transcript: Vec::new(),
                pending: None,
                last_error: None,
            },
            stop_requested: false,
        }
    }

    pub fn state(&self) -> &VoiceSessionState {
        &self.state
    }

    pub fn is_ended(&self) -> bool {
        self.state.status == VoiceCallStatus::Ended
    }
}

impl Machine for VoiceSessionMachine {
    type Event = VoiceEvent;
    type Command = VoiceCommand;

    fn decide(&mut self, event: &VoiceEvent) -> Option<VoiceCommand> {
        if self.is_ended() {
            return None;
        }

        match event {
            VoiceEvent::CallStarted => {
                self.state.status = VoiceCallStatus::Active;
                None
            }
            VoiceEvent::CallEnded => {
                self.state.status = VoiceCallStatus::Ended;
                self.state.volume_level = 0.0;
                self.state.pending = None;
                None
            }
            VoiceEvent::VolumeLevel { level } => {
                self.state.volume_level = level.clamp(0.0, 1.0);
                None
            }
            VoiceEvent::Transcript(message) => {
                if message.is_final {
                    self.state.pending = None;
                    self.state.transcript.push(message.clone());
                } else {
                    self.state.pending = Some(message.clone());
                }
                None
            }
            VoiceEvent::Error { message } => {
                self.state.last_error = Some(message.clone());
                if self.stop_requested {
                    return None;
                }
                self.stop_requested = true;
                Some(VoiceCommand::StopCall {
                    call_id: self.state.call_id.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::voice::events::TranscriptRole;

    fn message(text: &str, is_final: bool) -> VoiceEvent {
        VoiceEvent::Transcript(TranscriptMessage {
            role: TranscriptRole::Assistant,
            text: text.to_string(),
            is_final,
        })
    }

    #[test]
    fn test_partials_are_replaced_by_final() {
        let mut machine = VoiceSessionMachine::new("call-1");
        machine.decide(&VoiceEvent::CallStarted);
        machine.decide(&message("How are", false));
        machine.decide(&message("How are you", false));
        assert_eq!(machine.state().pending.as_ref().unwrap().text, "How are you");

        machine.decide(&message("How are you feeling?", true));

        assert_eq!(machine.state().pending, None);
        assert_eq!(machine.state().transcript.len(), 1);
    }

    #[test]
    fn test_error_requests_stop_once() {
        let mut machine = VoiceSessionMachine::new("call-1");
        machine.decide(&VoiceEvent::CallStarted);

        let command = machine.decide(&VoiceEvent::Error {
            message: "network".to_string(),
        });
        assert_eq!(
            command,
            Some(VoiceCommand::StopCall {
                call_id: "call-1".to_string()
            })
        );
        assert_eq!(
            machine.decide(&VoiceEvent::Error {
                message: "again".to_string()
            }),
            None
        );
        assert_eq!(machine.state().last_error.as_deref(), Some("again"));
    }

    #[test]
    fn test_ended_call_ignores_events() {
        let mut machine = VoiceSessionMachine::new("call-1");
        machine.decide(&VoiceEvent::CallStarted);
        machine.decide(&VoiceEvent::VolumeLevel { level: 3.0 });
        assert_eq!(machine.state().volume_level, 1.0);

        machine.decide(&VoiceEvent::CallEnded);
        assert_eq!(
            machine.decide(&VoiceEvent::Error {
                message: "late".to_string()
            }),
            None
        );
        assert_eq!(machine.state().status, VoiceCallStatus::Ended);
        assert_eq!(machine.state().volume_level, 0.0);
    }
}
