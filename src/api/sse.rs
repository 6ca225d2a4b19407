//! `GET /api/reservations/{id}/log/sse` — a Server-Sent Events stream of
//! new [`nsi_aura_core::LogEntry`] rows, polled every 500 ms and emitted as
//! one `data:` frame per batch. Modeled on `turn-server::api::events`'
//! broadcast-backed stream, adapted from one process-wide channel to a
//! plain poll loop since log rows are already durable in the database —
//! there is no in-memory event to miss between polls.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, unfold};
use sqlx::AnyPool;

use crate::context::AppState;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

struct PollState {
    pool: AnyPool,
    reservation_id: i64,
    after: i64,
}

pub async fn handle(
    State(app): State<AppState>,
    Path(reservation_id): Path<i64>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let initial = PollState {
        pool: app.pool.clone(),
        reservation_id,
        after: 0,
    };

    let stream = unfold(initial, |mut state| async move {
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            match crate::db::log::list_since(&state.pool, state.reservation_id, state.after).await
            {
                Ok(entries) if entries.is_empty() => continue,
                Ok(entries) => {
                    state.after = entries.last().map(|e| e.id).unwrap_or(state.after);
                    let json = serde_json::to_string(&entries).unwrap_or_default();
                    return Some((Ok(Event::default().data(json)), state));
                }
                Err(err) => {
                    log::warn!(
                        "sse log poll failed for reservation {}: {err:#}",
                        state.reservation_id
                    );
                    continue;
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
