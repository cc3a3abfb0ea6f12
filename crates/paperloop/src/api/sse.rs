use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use paperloop_jobs::JobEvent;

use super::AppState;

pub async fn job_events(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.service.store().subscribe();
    let stream = BroadcastStream::new(rx).map(|result| {
        let event = match result {
            Ok(evt) => Event::default()
                .event(event_name(&evt))
                .data(serde_json::to_string(&evt).unwrap_or_default()),
            Err(_) => Event::default().comment("missed event"),
        };
        Ok(event)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn event_name(event: &JobEvent) -> &'static str {
    match event {
        JobEvent::JobSubmitted { .. } => "job_submitted",
        JobEvent::SectionUpdated { .. } => "section_updated",
        JobEvent::JobFinished { .. } => "job_finished",
    }
}
