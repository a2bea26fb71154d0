use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: TranscriptRole,
    pub text: String,
    /// Partial transcripts are replaced by the next message for the turn.
    pub is_final: bool,
}

/// Everything the voice SDK reports about a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceEvent {
    CallStarted,
    CallEnded,
    VolumeLevel { level: f32 },
    Transcript(TranscriptMessage),
    Error { message: String },
}
