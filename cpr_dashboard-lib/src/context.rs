use log::trace;
use tokio::sync::broadcast;

use crate::surface::{DisplaySurface, UiEvent};

/// A small wrapper around a Tokio broadcast channel,
/// used to fan render events out to every attached viewer.
#[derive(Clone)]
pub struct Context {
    pub tx: broadcast::Sender<UiEvent>,
}

impl Context {
    /// Create a new Context with a channel of the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }
}

impl DisplaySurface for Context {
    fn render(&mut self, event: UiEvent) {
        // no viewers attached is the normal idle case
        if self.tx.send(event).is_err() {
            trace!("render event dropped: no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fans_out_to_every_subscriber() {
        let mut ctx = Context::new(8);
        let mut a = ctx.subscribe();
        let mut b = ctx.subscribe();

        ctx.render(UiEvent::Pulse { active: true });

        assert_eq!(a.recv().await.unwrap(), UiEvent::Pulse { active: true });
        assert_eq!(b.recv().await.unwrap(), UiEvent::Pulse { active: true });
    }

    #[test]
    fn rendering_without_subscribers_is_harmless() {
        let mut ctx = Context::new(0);
        ctx.render(UiEvent::Pulse { active: false });
    }
}
