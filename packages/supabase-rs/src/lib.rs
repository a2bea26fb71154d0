// Minimal Supabase client: GoTrue auth, PostgREST rows and Storage objects.

pub mod models;

use bytes::Bytes;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub use crate::models::{Session, SignUpResult, User};
use crate::models::{ErrorBody, PasswordGrant, SignUpRequest, UploadResponse};

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("request to Supabase failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Supabase returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("failed to decode Supabase response: {0}")]
    Decode(String),
}

impl SupabaseError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SupabaseError::Api { status, .. } => Some(*status),
            SupabaseError::Http(e) => e.status().map(|s| s.as_u16()),
            SupabaseError::Decode(_) => None,
        }
    }

    /// True when GoTrue rejected a sign-up because the address is taken.
    pub fn is_user_already_registered(&self) -> bool {
        match self {
            SupabaseError::Api { code, message, .. } => {
                matches!(code.as_deref(), Some("user_already_exists" | "email_exists"))
                    || message.to_lowercase().contains("already registered")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SupabaseError>;

#[derive(Debug, Clone)]
pub struct SupabaseOptions {
    pub url: String,
    pub anon_key: String,
    /// Used for row and storage access when present; falls back to the anon key.
    pub service_role_key: Option<String>,
}

/// PostgREST filter. Only the operators this service needs are exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    column: String,
    op: &'static str,
    value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            op: "eq",
            value: value.to_string(),
        }
    }

    fn to_query(&self) -> (String, String) {
        (self.column.clone(), format!("{}.{}", self.op, self.value))
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseService {
    options: SupabaseOptions,
    client: Client,
}

impl SupabaseService {
    pub fn new(options: SupabaseOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.options.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn server_key(&self) -> &str {
        self.options
            .service_role_key
            .as_deref()
            .unwrap_or(&self.options.anon_key)
    }

    fn with_key(&self, builder: RequestBuilder, key: &str) -> RequestBuilder {
        builder
            .header("apikey", &self.options.anon_key)
            .bearer_auth(key)
    }

    // ---------------------------------------------------------------------
    // Auth
    // ---------------------------------------------------------------------

    pub async fn sign_up(&self, email: &str, password: &str, data: Value) -> Result<SignUpResult> {
        let body = SignUpRequest {
            email,
            password,
            data,
        };
        let request = self.client.post(self.endpoint("auth/v1/signup")).json(&body);
        let value: Value = send(self.with_key(request, &self.options.anon_key)).await?;

        if value.get("access_token").is_some() {
            let session: Session = decode(value)?;
            return Ok(SignUpResult {
                user: session.user.clone(),
                session: Some(session),
            });
        }

        let user: User = match value.get("user") {
            Some(user) => decode(user.clone())?,
            None => decode(value)?,
        };
        Ok(SignUpResult {
            user,
            session: None,
        })
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let request = self
            .client
            .post(self.endpoint("auth/v1/token"))
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password });
        send(self.with_key(request, &self.options.anon_key)).await
    }

    /// Resolve the user behind an access token.
    pub async fn get_user(&self, access_token: &str) -> Result<User> {
        let request = self.client.get(self.endpoint("auth/v1/user"));
        send(self.with_key(request, access_token)).await
    }

    // ---------------------------------------------------------------------
    // Rows
    // ---------------------------------------------------------------------

    /// Insert-or-merge on the given conflict target.
    pub async fn upsert<T, R>(&self, table: &str, rows: &T, on_conflict: &str) -> Result<Vec<R>>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self
            .client
            .post(self.endpoint(&format!("rest/v1/{}", table)))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(rows);
        send(self.with_key(request, self.server_key())).await
    }

    pub async fn update<T, R>(&self, table: &str, filters: &[Filter], patch: &T) -> Result<Vec<R>>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let query: Vec<(String, String)> = filters.iter().map(Filter::to_query).collect();
        let request = self
            .client
            .patch(self.endpoint(&format!("rest/v1/{}", table)))
            .query(&query)
            .header("Prefer", "return=representation")
            .json(patch);
        send(self.with_key(request, self.server_key())).await
    }

    pub async fn select<R>(&self, table: &str, filters: &[Filter]) -> Result<Vec<R>>
    where
        R: DeserializeOwned,
    {
        let mut query: Vec<(String, String)> = vec![("select".to_string(), "*".to_string())];
        query.extend(filters.iter().map(Filter::to_query));
        let request = self
            .client
            .get(self.endpoint(&format!("rest/v1/{}", table)))
            .query(&query);
        send(self.with_key(request, self.server_key())).await
    }

    // ---------------------------------------------------------------------
    // Storage
    // ---------------------------------------------------------------------

    /// Upload an object and return its storage key.
    pub async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        data: Bytes,
        upsert: bool,
    ) -> Result<String> {
        let request = self
            .client
            .post(self.endpoint(&format!("storage/v1/object/{}/{}", bucket, path)))
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(data);
        let response: UploadResponse = send(self.with_key(request, self.server_key())).await?;
        Ok(response
            .key
            .unwrap_or_else(|| format!("{}/{}", bucket, path)))
    }

    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        self.endpoint(&format!("storage/v1/object/public/{}/{}", bucket, path))
    }
}

async fn send<R: DeserializeOwned>(request: RequestBuilder) -> Result<R> {
    let response = request.send().await?;
    parse_response(response).await
}

async fn parse_response<R: DeserializeOwned>(response: Response) -> Result<R> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let error = api_error(status.as_u16(), &text);
        warn!(status = status.as_u16(), error = %error, "Supabase request failed");
        return Err(error);
    }

    debug!(status = status.as_u16(), "Supabase request succeeded");
    serde_json::from_str(&text).map_err(|e| SupabaseError::Decode(e.to_string()))
}

fn api_error(status: u16, body: &str) -> SupabaseError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message().unwrap_or_else(|| {
        if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            body.to_string()
        }
    });
    SupabaseError::Api {
        status,
        code: parsed.code(),
        message,
    }
}

fn decode<R: DeserializeOwned>(value: Value) -> Result<R> {
    serde_json::from_value(value).map_err(|e| SupabaseError::Decode(e.to_string()))
}
