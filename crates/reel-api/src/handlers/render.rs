//! Render job handler: one POST, one SSE stream, one job.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::Stream;
use tracing::info;

use reel_models::{RenderEvent, RenderRequest};
use reel_render::{ProgressSender, RenderContext};

use crate::state::AppState;

/// POST /api/render
///
/// Starts a render job and streams its progress events until the terminal
/// `complete` or `error` message. Validation failures arrive the same way:
/// a stream whose only message is the error event. The job owns its own
/// lifetime; if the client disconnects, it still runs to completion and
/// cleans up after itself.
pub async fn render_video(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        project_id = %request.project_id,
        images = request.image_urls.len(),
        "Received render request"
    );

    let (progress, rx) = ProgressSender::channel();
    let ctx = RenderContext::new(
        state.config.clone(),
        state.http.clone(),
        state.store.clone(),
        progress,
    );

    tokio::spawn(reel_render::execute(ctx, request));

    // The stream ends when the pipeline drops its sender, which happens
    // right after the terminal event.
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok::<_, Infallible>(sse_event(&event)), rx))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Serialize a render event as an SSE message.
fn sse_event(event: &RenderEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|_| Event::default().data(r#"{"type":"error","error":"serialization failed"}"#))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::Stage;

    #[test]
    fn test_sse_event_carries_protocol_json() {
        let ev = sse_event(&RenderEvent::progress(Stage::Uploading, 85, "Uploading..."));
        let rendered = format!("{:?}", ev);
        assert!(rendered.contains("progress"));
        assert!(rendered.contains("uploading"));
    }
}
