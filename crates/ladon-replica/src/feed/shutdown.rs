use tokio::sync::watch;

/// Cancellation signal for the consumer, backed by a `watch` channel.
///
/// Stop is requested by sending `true`. If the sender is dropped without ever
/// requesting a stop, the consumer keeps running detached.
#[derive(Debug)]
pub struct Shutdown {
    rx: Option<watch::Receiver<bool>>,
}

impl Shutdown {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }

    pub fn is_requested(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once a stop is requested. Cancel-safe.
    pub async fn requested(&mut self) {
        loop {
            let Some(rx) = self.rx.as_mut() else {
                return std::future::pending().await;
            };
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                self.rx = None;
            }
        }
    }
}
