//! Voice assistant integration: SDK callbacks and webhook messages become
//! `VoiceEvent`s on a per-call queue consumed by a session machine.

pub mod assistant;
pub mod events;
pub mod machine;
pub mod queue;
pub mod webhook;

pub use assistant::{VoiceError, VoiceSessions};
pub use events::{TranscriptMessage, TranscriptRole, VoiceEvent};
pub use machine::{VoiceCallStatus, VoiceCommand, VoiceSessionMachine, VoiceSessionState};
pub use queue::{voice_event_channel, VoiceEventSender};
pub use webhook::{ServerMessage, ServerMessageEnvelope};
