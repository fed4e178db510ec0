//! Realtime event feed
//!
//! SSE endpoint backed by the scoped broadcast channel. The connection is
//! registered under the ambient organization at subscribe time; events for
//! any other organization never reach it.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::Stream;
use serde::Deserialize;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::{utils::AppError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(subscribe))
}

#[derive(Debug, Deserialize)]
struct SubscribeParams {
    /// Stable id for this live connection; mutations sent with a matching
    /// `X-Connection-Id` header are not echoed back to it.
    connection_id: Option<Uuid>,
}

async fn subscribe(
    State(state): State<AppState>,
    Query(params): Query<SubscribeParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let connection_id = params.connection_id.unwrap_or_else(Uuid::new_v4);
    let subscription = state.broadcast.register(connection_id)?;

    let stream = subscription.into_stream().map(|scoped| {
        let event = Event::default().event(scoped.event);
        Ok(match serde_json::to_string(&scoped.payload) {
            Ok(data) => event.data(data),
            Err(_) => event.data("{}"),
        })
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
