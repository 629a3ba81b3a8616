use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures::StreamExt;
use log::{debug, info};
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::Message as WsMsg;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::config::{ClientConfig, Endpoint};
use crate::connection::Reconnector;
use crate::dashboard::Dashboard;
use crate::surface::DisplaySurface;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum SessionEnd {
    Closed,
    Shutdown,
}

/// Drives one dashboard from a telemetry stream, reconnecting per the retry policy.
///
/// Everything runs on the task that awaits [`DashboardClient::run`]: frames are
/// painted one at a time, in arrival order.
pub struct DashboardClient<S> {
    endpoint:    Endpoint,
    dashboard:   Dashboard<S>,
    reconnector: Reconnector,
    pulse:       Duration,
    pulses:      JoinSet<()>,
}

impl<S: DisplaySurface> DashboardClient<S> {
    pub fn new(config: ClientConfig, surface: S) -> Self {
        let pulse = config.display.pulse;
        Self {
            endpoint: config.endpoint,
            dashboard: Dashboard::new(surface, config.display),
            reconnector: Reconnector::new(config.retry),
            pulse,
            pulses: JoinSet::new(),
        }
    }

    /// Connect and paint until `shutdown` resolves or the retry policy gives up.
    ///
    /// Teardown closes the socket and aborts pending pulse clears; the
    /// dashboard is handed back for inspection.
    pub async fn run<F>(mut self, shutdown: F) -> Dashboard<S>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let url = self.endpoint.url();
        if self.endpoint.secure {
            install_crypto_provider();
        }

        loop {
            info!("Connecting to {}", url);
            let connect = connect_async(url.as_str());
            tokio::pin!(connect);
            // a slow handshake must not hold a pulse on
            let attempt = loop {
                tokio::select! {
                    _ = shutdown.as_mut() => break None,
                    res = &mut connect => break Some(res),
                    Some(_) = self.pulses.join_next() => self.dashboard.end_pulse(),
                }
            };
            let Some(attempt) = attempt else { break };

            match attempt {
                Ok((ws, _resp)) => {
                    self.reconnector.opened();
                    self.dashboard.on_open();
                    if let SessionEnd::Shutdown = self.session(ws, shutdown.as_mut()).await {
                        break;
                    }
                }
                Err(e) => self.dashboard.on_transport_error(&e),
            }

            let retry = self.reconnector.closed();
            self.dashboard.on_close(retry);
            let Some(delay) = retry else { break };
            if !self.wait(delay, shutdown.as_mut()).await {
                break;
            }
        }

        self.pulses.abort_all();
        info!(
            "Client stopped: {} packets, {} quarantined, {} connects",
            self.dashboard.packets(),
            self.dashboard.quarantined(),
            self.reconnector.opens()
        );
        self.dashboard
    }

    async fn session<F>(&mut self, mut ws: WsStream, mut shutdown: Pin<&mut F>) -> SessionEnd
    where
        F: Future<Output = ()>,
    {
        loop {
            tokio::select! {
                _ = shutdown.as_mut() => {
                    if let Err(e) = ws.close(None).await {
                        debug!("close on shutdown failed: {}", e);
                    }
                    return SessionEnd::Shutdown;
                }
                Some(_) = self.pulses.join_next() => self.dashboard.end_pulse(),
                frame = ws.next() => match frame {
                    Some(Ok(WsMsg::Text(txt))) => self.on_text(&txt),
                    Some(Ok(WsMsg::Binary(bin))) => {
                        debug!("ignoring {}-byte binary frame", bin.len());
                    }
                    Some(Ok(WsMsg::Close(frame))) => {
                        debug!("server closed stream: {:?}", frame);
                        return SessionEnd::Closed;
                    }
                    // ping/pong are answered by the transport
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.dashboard.on_transport_error(&e);
                        return SessionEnd::Closed;
                    }
                    None => return SessionEnd::Closed,
                },
            }
        }
    }

    fn on_text(&mut self, txt: &str) {
        // rejects are already counted and logged by the dashboard
        if let Ok(outcome) = self.dashboard.handle_frame(txt) {
            if outcome.pulse {
                self.pulses.spawn(tokio::time::sleep(self.pulse));
            }
        }
    }

    /// Sleep out a reconnect delay while still clearing pulses. `false` on shutdown.
    async fn wait<F>(&mut self, delay: Duration, mut shutdown: Pin<&mut F>) -> bool
    where
        F: Future<Output = ()>,
    {
        let timer = tokio::time::sleep(delay);
        tokio::pin!(timer);
        loop {
            tokio::select! {
                _ = &mut timer => return true,
                _ = shutdown.as_mut() => return false,
                Some(_) = self.pulses.join_next() => self.dashboard.end_pulse(),
            }
        }
    }
}

/// rustls will not choose between compiled-in providers on its own.
fn install_crypto_provider() {
    // Err only means a provider is already in place
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }
}
