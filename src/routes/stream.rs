//! Server-Sent Events over realtime snapshot subscriptions.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Serialize;

use crate::services::realtime::Subscription;

fn snapshot_event<T: Serialize>(snapshot: &T) -> Event {
    Event::default()
        .event("snapshot")
        .json_data(snapshot)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize snapshot");
            Event::default().event("error").data("snapshot unavailable")
        })
}

/// Emit `initial`, then every snapshot the subscription yields.
///
/// Dropping the response (client disconnect) drops the subscription.
pub fn snapshot_stream<T>(
    initial: T,
    mut subscription: Subscription<T>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>>
where
    T: Serialize + Send + Sync + 'static,
{
    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(snapshot_event(&initial));
        while let Some(snapshot) = subscription.next().await {
            yield Ok(snapshot_event(snapshot.as_ref()));
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}
