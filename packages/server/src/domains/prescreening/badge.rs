//! Badge presentation for a prescreening status.

use serde::{Deserialize, Serialize};

use super::models::PrescreeningStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    Success,
    Danger,
    Critical,
    Pending,
    Neutral,
}

/// User action a badge may offer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrescreeningAction {
    Start,
    Retry,
}

impl PrescreeningAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescreeningAction::Start => "start",
            PrescreeningAction::Retry => "retry",
        }
    }
}

impl std::fmt::Display for PrescreeningAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PrescreeningBadge {
    pub status: PrescreeningStatus,
    pub label: &'static str,
    pub tone: BadgeTone,
    pub action: Option<PrescreeningAction>,
}

impl PrescreeningBadge {
    pub fn from_status(status: PrescreeningStatus) -> Self {
        let (label, tone, action) = match status {
            PrescreeningStatus::Successful => ("Prescreening complete", BadgeTone::Success, None),
            PrescreeningStatus::Failed => (
                "Prescreening failed",
                BadgeTone::Danger,
                Some(PrescreeningAction::Retry),
            ),
            PrescreeningStatus::EmergencyDeclared => {
                ("Emergency declared", BadgeTone::Critical, None)
            }
            PrescreeningStatus::Loading => ("Prescreening in progress", BadgeTone::Pending, None),
            PrescreeningStatus::NotStarted => (
                "Prescreening not started",
                BadgeTone::Neutral,
                Some(PrescreeningAction::Start),
            ),
        };

        Self {
            status,
            label,
            tone,
            action,
        }
    }

    pub fn offers(&self, action: PrescreeningAction) -> bool {
        self.action == Some(action)
    }
}
