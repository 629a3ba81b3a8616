use std::convert::Infallible;
use async_stream::stream;
use tokio::sync::broadcast::{Sender, error::RecvError};
use cpr_dashboard_lib::UiEvent;
use warp::{Filter, Rejection, Reply, sse::{Event, reply, keep_alive}};
use log::{info, warn};

use crate::events_ws;

/// GET /events → one SSE event per render update, named by its kind
fn sse_route(
    tx: Sender<UiEvent>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::get()
        .and(warp::path("events"))
        .and(warp::path::end())
        .map(move || {
            // subscribe inside the closure so every viewer gets its own receiver
            let mut rx = tx.subscribe();
            info!("SSE viewer attached");
            let event_stream = stream! {
                loop {
                    match rx.recv().await {
                        Ok(ev) => match serde_json::to_string(&ev) {
                            Ok(json) => {
                                yield Ok::<_, Infallible>(Event::default().event(ev.kind()).data(json));
                            }
                            Err(e) => warn!("unserializable {} event: {}", ev.kind(), e),
                        },
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("SSE viewer lagged, dropped {} events", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            };
            reply(keep_alive().stream(event_stream))
        })
}

/// Health probe, SSE and WebSocket fan-out on one port.
pub async fn serve_events(tx: Sender<UiEvent>, port: u16) {
    let health = warp::path!("health").map(|| "OK");

    // Build CORS once, apply to every route
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["OPTIONS", "GET"])
        .allow_headers(vec!["accept", "last-event-id", "origin", "sec-websocket-protocol", "upgrade"]);

    let routes = health
        .or(sse_route(tx.clone()))
        .or(events_ws::ws_route(tx))
        .with(cors);

    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
}
