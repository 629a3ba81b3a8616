use std::convert::Infallible;
use futures_util::{StreamExt, SinkExt, future::select};
use tokio::sync::broadcast::{Sender, error::RecvError};
use warp::{Filter, Rejection, Reply, ws::{Message as WsMsg, WebSocket}};
use cpr_dashboard_lib::UiEvent;
use log::{info, warn};

/// Cloneable filter for broadcasting
fn with_tx(
    tx: Sender<UiEvent>,
) -> impl Filter<Extract = (Sender<UiEvent>,), Error = Infallible> + Clone {
    warp::any().map(move || tx.clone())
}

/// GET /ws → render events as JSON text frames
pub fn ws_route(
    tx: Sender<UiEvent>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("ws")
        .and(warp::ws())
        .and(with_tx(tx))
        .map(|ws: warp::ws::Ws, tx: Sender<UiEvent>| {
            ws.on_upgrade(move |socket| handle_ws(socket, tx))
        })
}

async fn handle_ws(ws: WebSocket, tx: Sender<UiEvent>) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut rx = tx.subscribe();
    info!("WebSocket viewer attached");

    // Viewers are read-only; just notice when they hang up
    let inbound = async {
        while let Some(Ok(msg)) = ws_rx.next().await {
            if msg.is_close() {
                break;
            }
        }
    };

    let outbound = async {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    let txt = match serde_json::to_string(&ev) {
                        Ok(txt) => txt,
                        Err(e) => {
                            warn!("unserializable {} event: {}", ev.kind(), e);
                            continue;
                        }
                    };
                    if ws_tx.send(WsMsg::text(txt)).await.is_err() {
                        break; // viewer disconnected
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WS viewer lagged, dropped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    // Run inbound and outbound until one finishes
    select(Box::pin(inbound), Box::pin(outbound)).await;
    info!("WebSocket viewer disconnected");
}
