//! SSE streaming endpoint.
//!
//! GET /api/streams/:topic
//!
//! Subscribes to StreamHub by topic string and forwards JSON values as SSE
//! events. Topics are `registration:{session_id}` and `voice:{call_id}`;
//! the session or call must exist, and its id is the access credential.

use std::convert::Infallible;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use crate::common::SessionId;
use crate::server::app::AxumAppState;

pub async fn stream_handler(
    Extension(state): Extension<AxumAppState>,
    Path(topic): Path<String>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    authorize_topic(&state, &topic).await?;

    let rx = state.deps.stream_hub.subscribe(&topic).await;

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

    let events = BroadcastStream::new(rx).filter_map(|result| async {
        match result {
            Ok(value) => {
                let event_name = value
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("message");
                Event::default()
                    .event(event_name)
                    .json_data(&value)
                    .ok()
                    .map(Ok)
            }
            Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
                Event::default()
                    .event("lagged")
                    .json_data(&serde_json::json!({"missed": n}))
                    .ok()
                    .map(Ok)
            }
        }
    });

    Ok(Sse::new(connected.chain(events)).keep_alive(KeepAlive::default()))
}

/// Topic-level authorization by prefix.
async fn authorize_topic(state: &AxumAppState, topic: &str) -> Result<(), StatusCode> {
    if let Some(id) = topic.strip_prefix("registration:") {
        let id = SessionId::parse(id).map_err(|_| StatusCode::BAD_REQUEST)?;
        state
            .sessions
            .get(id)
            .await
            .map(|_| ())
            .ok_or(StatusCode::NOT_FOUND)
    } else if let Some(call_id) = topic.strip_prefix("voice:") {
        state
            .voice
            .state(call_id)
            .await
            .map(|_| ())
            .ok_or(StatusCode::NOT_FOUND)
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}
