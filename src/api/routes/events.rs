use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::warn;

use crate::api::errors::ApiQuery;
use crate::api::models::EventStreamQuery;
use crate::api::AppState;

/// Live stream of workflow events, optionally narrowed to one review.
pub async fn event_stream(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EventStreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.workflow.events().subscribe();
    let review_filter = query.review_id;

    let events = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) => {
            if review_filter.as_deref().map_or(true, |id| id == event.review_id()) {
                Some(Ok(Event::default()
                    .event(event.kind())
                    .json_data(&event)
                    .unwrap_or_else(|_| Event::default().data("error"))))
            } else {
                None
            }
        }
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(skipped, "Event stream subscriber lagged; events dropped");
            None
        }
    });

    let initial = stream::once(async { Ok(Event::default().event("connected").data("ok")) });

    Sse::new(initial.chain(events)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
