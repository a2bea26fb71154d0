use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Auth user as returned by GoTrue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
    #[serde(default)]
    pub identities: Option<Vec<Value>>,
}

impl User {
    /// GoTrue answers a sign-up for an existing, confirmed address with an
    /// obfuscated user carrying an empty identity list instead of an error.
    pub fn is_existing_account(&self) -> bool {
        matches!(&self.identities, Some(identities) if identities.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: User,
}

/// Result of a sign-up call. The session is only present when email
/// confirmation is disabled on the project.
#[derive(Debug, Clone)]
pub struct SignUpResult {
    pub user: User,
    pub session: Option<Session>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(rename = "Key")]
    pub key: Option<String>,
}

/// Error payloads differ between GoTrue, PostgREST and Storage; every
/// field is optional and the first non-empty message wins.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        [
            &self.msg,
            &self.message,
            &self.error_description,
            &self.error,
        ]
        .into_iter()
        .flatten()
        .find(|m| !m.is_empty())
        .cloned()
    }

    pub fn code(&self) -> Option<String> {
        if let Some(code) = &self.error_code {
            return Some(code.clone());
        }
        match &self.code {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}
