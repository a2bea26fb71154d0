//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Extension, Request},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::{self, Next},
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use supabase::{SupabaseOptions, SupabaseService};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::domains::documents::{PreviewRegistry, MAX_DOCUMENT_BYTES};
use crate::domains::preferences::PreferenceStore;
use crate::domains::prescreening::{PrescreeningActions, StoreBackedPrescreeningActions};
use crate::domains::providers::{RegistrationSessions, RetryPolicy};
use crate::domains::voice::VoiceSessions;
use crate::kernel::{
    BaseRecordStore, BaseVoiceSdk, PostgresRecordStore, ServerDeps, StreamHub, SupabaseAdapter,
    VapiClient,
};
use crate::server::middleware::session_auth_middleware;
use crate::server::routes::*;

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: Arc<ServerDeps>,
    pub sessions: RegistrationSessions,
    pub previews: PreviewRegistry,
    pub voice: VoiceSessions,
    pub preferences: PreferenceStore,
    pub prescreening_actions: Arc<dyn PrescreeningActions>,
}

impl AxumAppState {
    pub fn new(
        deps: Arc<ServerDeps>,
        policy: RetryPolicy,
        preferences: PreferenceStore,
        default_assistant_id: Option<String>,
    ) -> Self {
        let previews = PreviewRegistry::new();
        Self {
            sessions: RegistrationSessions::new(deps.clone(), previews.clone(), policy),
            voice: VoiceSessions::new(
                deps.voice.clone(),
                default_assistant_id,
                deps.stream_hub.clone(),
            ),
            prescreening_actions: Arc::new(StoreBackedPrescreeningActions::new(
                deps.records.clone(),
            )),
            previews,
            preferences,
            deps,
        }
    }
}

/// Build ServerDeps and app state from configuration.
pub async fn build_state(config: &Config) -> Result<AxumAppState> {
    let supabase = Arc::new(SupabaseService::new(SupabaseOptions {
        url: config.supabase_url.clone(),
        anon_key: config.supabase_anon_key.clone(),
        service_role_key: config.supabase_service_role_key.clone(),
    }));
    let adapter = Arc::new(SupabaseAdapter::new(supabase, &config.storage_bucket));

    // Direct Postgres when configured, otherwise rows go through the REST API
    let records: Arc<dyn BaseRecordStore> = match &config.database_url {
        Some(url) => {
            info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("Failed to connect to database")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            info!("Database connected, migrations complete");
            Arc::new(PostgresRecordStore::new(pool))
        }
        None => adapter.clone(),
    };

    let voice: Option<Arc<dyn BaseVoiceSdk>> = match &config.vapi_api_key {
        Some(key) => Some(Arc::new(VapiClient::new(
            key.clone(),
            config.vapi_base_url.clone(),
        )?)),
        None => {
            warn!("VAPI_API_KEY not set, voice assistant disabled");
            None
        }
    };

    let deps = Arc::new(ServerDeps::new(
        adapter.clone(),
        records,
        adapter,
        voice,
        StreamHub::new(),
    ));

    let preferences = PreferenceStore::init(&config.preferences_path)
        .await
        .context("Failed to load preferences")?;

    Ok(AxumAppState::new(
        deps,
        config.retry_policy(),
        preferences,
        config.vapi_assistant_id.clone(),
    ))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // No configured origins allows any origin (development)
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Build the Axum application router
pub fn build_app(state: AxumAppState, allowed_origins: &[String]) -> Router {
    let auth = state.deps.auth.clone();

    let api = Router::new()
        .route(
            "/providers/types/:provider_type/specializations",
            get(specializations_handler),
        )
        // Signup wizard + registration
        .route("/registrations", post(create_session_handler))
        .route(
            "/registrations/:id",
            get(get_session_handler)
                .patch(update_session_handler)
                .delete(delete_session_handler),
        )
        .route("/registrations/:id/next", post(next_step_handler))
        .route("/registrations/:id/back", post(previous_step_handler))
        .route(
            "/registrations/:id/documents/:kind",
            put(upload_document_handler),
        )
        .route("/registrations/:id/signature", put(signature_handler))
        .route("/registrations/:id/submit", post(submit_handler))
        .route("/registrations/:id/reset", post(reset_handler))
        .route("/previews/:id", get(preview_handler))
        // Prescreening badge
        .route(
            "/prescreening/:patient_id/:appointment_id",
            get(badge_handler),
        )
        .route(
            "/prescreening/:patient_id/:appointment_id/start",
            post(start_handler),
        )
        .route(
            "/prescreening/:patient_id/:appointment_id/retry",
            post(retry_handler),
        )
        // Voice assistant
        .route("/voice/sessions", post(start_call_handler))
        .route(
            "/voice/sessions/:call_id",
            get(call_state_handler).delete(stop_call_handler),
        )
        .route("/voice/webhook", post(webhook_handler))
        // Preferences
        .route(
            "/preferences",
            get(get_preferences_handler).put(update_preferences_handler),
        )
        // SSE
        .route("/streams/:topic", get(stream_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            session_auth_middleware(auth.clone(), req, next)
        }))
        // Room for the multipart envelope around a maximum-size document
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES * 2))
        .layer(Extension(state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}
