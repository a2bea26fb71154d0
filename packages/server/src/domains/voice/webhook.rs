//! Vapi server messages, as posted to the webhook endpoint.
//!
//! Only the message types that map onto a `VoiceEvent` are modelled; the
//! rest deserialize to `Unknown` and are acknowledged without effect.

use serde::Deserialize;
use serde_json::Value;

use super::events::{TranscriptMessage, TranscriptRole, VoiceEvent};

#[derive(Debug, Deserialize)]
pub struct ServerMessageEnvelope {
    pub message: ServerMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallRef {
    pub id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptType {
    Partial,
    #[default]
    Final,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    StatusUpdate {
        status: String,
        #[serde(default)]
        call: Option<CallRef>,
    },
    Transcript {
        role: TranscriptRole,
        #[serde(rename = "transcriptType", default)]
        transcript_type: TranscriptType,
        transcript: String,
        #[serde(default)]
        call: Option<CallRef>,
    },
    EndOfCallReport {
        #[serde(rename = "endedReason", default)]
        ended_reason: Option<String>,
        #[serde(default)]
        call: Option<CallRef>,
    },
    Hang {
        #[serde(default)]
        call: Option<CallRef>,
    },
    VolumeLevel {
        volume: f32,
        #[serde(default)]
        call: Option<CallRef>,
    },
    Error {
        #[serde(default)]
        error: Value,
        #[serde(default)]
        call: Option<CallRef>,
    },
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    pub fn call_id(&self) -> Option<&str> {
        let call = match self {
            ServerMessage::StatusUpdate { call, .. }
            | ServerMessage::Transcript { call, .. }
            | ServerMessage::EndOfCallReport { call, .. }
            | ServerMessage::Hang { call }
            | ServerMessage::VolumeLevel { call, .. }
            | ServerMessage::Error { call, .. } => call.as_ref(),
            ServerMessage::Unknown => None,
        };
        call.map(|c| c.id.as_str())
    }

    pub fn into_event(self) -> Option<VoiceEvent> {
        match self {
            ServerMessage::StatusUpdate { status, .. } => match status.as_str() {
                "in-progress" => Some(VoiceEvent::CallStarted),
                "ended" => Some(VoiceEvent::CallEnded),
                _ => None,
            },
            ServerMessage::Transcript {
                role,
                transcript_type,
                transcript,
                ..
            } => Some(VoiceEvent::Transcript(TranscriptMessage {
                role,
                text: transcript,
                is_final: transcript_type == TranscriptType::Final,
            })),
            ServerMessage::EndOfCallReport { .. } => Some(VoiceEvent::CallEnded),
            ServerMessage::Hang { .. } => Some(VoiceEvent::Error {
                message: "Assistant stopped responding".to_string(),
            }),
            ServerMessage::VolumeLevel { volume, .. } => {
                Some(VoiceEvent::VolumeLevel { level: volume })
            }
            ServerMessage::Error { error, .. } => Some(VoiceEvent::Error {
                message: match error {
                    Value::String(message) => message,
                    Value::Null => "Unknown voice error".to_string(),
                    other => other.to_string(),
                },
            }),
            ServerMessage::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> ServerMessage {
        serde_json::from_value::<ServerMessageEnvelope>(value)
            .unwrap()
            .message
    }

    #[test]
    fn test_status_update_in_progress_starts_call() {
        let message = parse(json!({
            "message": {"type": "status-update", "status": "in-progress", "call": {"id": "call-1"}}
        }));

        assert_eq!(message.call_id(), Some("call-1"));
        assert_eq!(message.into_event(), Some(VoiceEvent::CallStarted));
    }

    #[test]
    fn test_partial_transcript() {
        let message = parse(json!({
            "message": {
                "type": "transcript",
                "role": "user",
                "transcriptType": "partial",
                "transcript": "I have a head",
                "call": {"id": "call-1"}
            }
        }));

        assert_eq!(
            message.into_event(),
            Some(VoiceEvent::Transcript(TranscriptMessage {
                role: TranscriptRole::User,
                text: "I have a head".to_string(),
                is_final: false,
            }))
        );
    }

    #[test]
    fn test_end_of_call_report_ends_call() {
        let message = parse(json!({
            "message": {"type": "end-of-call-report", "endedReason": "customer-ended-call", "call": {"id": "c"}}
        }));
        assert_eq!(message.into_event(), Some(VoiceEvent::CallEnded));
    }

    #[test]
    fn test_error_payload_shapes() {
        let message = parse(json!({"message": {"type": "error", "error": "mic denied"}}));
        assert_eq!(
            message.into_event(),
            Some(VoiceEvent::Error {
                message: "mic denied".to_string()
            })
        );

        let message = parse(json!({"message": {"type": "error", "error": {"code": 42}}}));
        assert_eq!(
            message.into_event(),
            Some(VoiceEvent::Error {
                message: r#"{"code":42}"#.to_string()
            })
        );
    }

    #[test]
    fn test_unmodelled_type_is_unknown() {
        let message = parse(json!({"message": {"type": "speech-update", "status": "started"}}));
        assert!(matches!(message, ServerMessage::Unknown));
        assert_eq!(message.call_id(), None);
    }
}
