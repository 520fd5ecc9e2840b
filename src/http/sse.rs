use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use crate::engine::core::EngineHandle;

use super::routes::HttpServerError;

pub type ShakeStream = Sse<Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>;

/// Build a Server-Sent Events stream of live shake detections.
pub fn shake_stream(handle: &'static EngineHandle) -> Result<ShakeStream, HttpServerError> {
    let receiver = handle
        .shake_receiver()
        .ok_or(HttpServerError::ServiceUnavailable(
            "shake channel not initialized",
        ))?;

    let stream = BroadcastStream::new(receiver).filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(payload) => Some(Ok(Event::default().event("shake").data(payload))),
                Err(_) => None,
            },
            Err(_) => None,
        }
    });
    let stream: Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>> = Box::pin(stream);

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(5))
            .text("debug-keepalive"),
    ))
}
