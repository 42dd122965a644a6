use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::Stream;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::api::handlers::AppState;
use crate::model::Id;
use crate::store::Store;

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackerEventKind {
    NewTracker,
    UpdateTracker,
    DeleteTracker,
}

impl TrackerEventKind {
    /// SSE event name, one per kind
    pub fn topic(&self) -> &'static str {
        match self {
            TrackerEventKind::NewTracker => "newTracker",
            TrackerEventKind::UpdateTracker => "updateTracker",
            TrackerEventKind::DeleteTracker => "deleteTracker",
        }
    }
}

/// A committed tracker write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerEvent {
    pub kind: TrackerEventKind,
    pub id: Id,
}

/// Fan-out of tracker writes to every connected client
#[derive(Debug, Clone)]
pub struct TrackerEvents {
    sender: broadcast::Sender<TrackerEvent>,
}

impl Default for TrackerEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publish after the store write succeeded. Nobody listening is not an error.
    pub fn publish(&self, kind: TrackerEventKind, id: Id) {
        if self.sender.send(TrackerEvent { kind, id }).is_err() {
            debug!("No subscribers for {} {}", kind.topic(), id);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.sender.subscribe()
    }
}

/// GET /api/events
/// Server-sent stream of tracker changes; opens with a `connected` event
pub async fn tracker_events<S: Store>(
    State(state): State<AppState<S>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before the response is returned so no write is missed
    let mut receiver = state.events.subscribe();

    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(Event::default().event("connected").data("connected"));

        loop {
            match receiver.recv().await {
                Ok(event) => match Event::default().event(event.kind.topic()).json_data(event) {
                    Ok(sse_event) => yield Ok(sse_event),
                    Err(e) => warn!("Failed to encode tracker event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged; {} tracker events dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let events = TrackerEvents::new();
        let mut first = events.subscribe();
        let mut second = events.subscribe();

        events.publish(TrackerEventKind::UpdateTracker, 4);

        let expected = TrackerEvent {
            kind: TrackerEventKind::UpdateTracker,
            id: 4,
        };
        assert_eq!(first.recv().await.unwrap(), expected);
        assert_eq!(second.recv().await.unwrap(), expected);
    }

    #[test]
    fn test_publish_without_subscribers() {
        TrackerEvents::new().publish(TrackerEventKind::NewTracker, 1);
    }

    #[test]
    fn test_event_json_uses_topic_names() {
        let json = serde_json::to_value(TrackerEvent {
            kind: TrackerEventKind::DeleteTracker,
            id: 9,
        })
        .unwrap();

        assert_eq!(json, serde_json::json!({"kind": "deleteTracker", "id": 9}));
        assert_eq!(TrackerEventKind::NewTracker.topic(), "newTracker");
    }
}
