//! Coordinated graceful shutdown.
//!
//! Explicit Running → Draining → ForceExit state machine. The first
//! termination signal tells every registered instance to quit and the bus
//! publisher to drain, exactly once. A second signal, or a timeout while the
//! drain is in flight, forces immediate termination with a non-zero exit so
//! a hung bridge can always be killed within a bounded window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use crate::irc::Registry;
use crate::nats::NatsPublisher;

/// How long a drain may run after the first signal before the process is
/// forcibly terminated.
const FORCE_EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Process-wide shutdown state machine.
pub struct ShutdownCoordinator {
    registry: Arc<Registry>,
    publisher: Arc<NatsPublisher>,
    draining: AtomicBool,
}

impl ShutdownCoordinator {
    /// Create a coordinator over the process's registry and publisher.
    pub fn new(registry: Arc<Registry>, publisher: Arc<NatsPublisher>) -> Self {
        Self {
            registry,
            publisher,
            draining: AtomicBool::new(false),
        }
    }

    /// Whether draining has started.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Wait for a termination signal, drain once, escalate on repeat or
    /// timeout.
    ///
    /// Returns cleanly once the drain completes, letting the caller exit
    /// with status 0. Forced termination never returns.
    ///
    /// # Errors
    ///
    /// Returns an error if signal listeners cannot be installed.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let received = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        info!(
            producer = "core",
            "received {received}, cleaning up (repeat to force)"
        );

        let Some(drain) = self.initiate(received) else {
            return Ok(());
        };

        tokio::select! {
            _ = sigint.recv() => self.force_exit(&format!("received a second signal after {received}")),
            _ = sigterm.recv() => self.force_exit(&format!("received a second signal after {received}")),
            _ = tokio::time::sleep(FORCE_EXIT_TIMEOUT) => self.force_exit("drain timeout expired"),
            result = drain => {
                if let Err(e) = result {
                    warn!(producer = "core", "drain task failed: {e}");
                }
                info!(producer = "core", "drains complete, exiting cleanly");
            }
        }
        Ok(())
    }

    /// Transition Running → Draining.
    ///
    /// Issues exactly one `quit` per registered instance (fire-and-forget)
    /// and starts the publisher drain, returning its task so the caller can
    /// await natural completion. Returns `None` if draining had already
    /// started — repeated initiation is a no-op at this level; escalation is
    /// the signal loop's job.
    pub fn initiate(&self, reason: &str) -> Option<tokio::task::JoinHandle<()>> {
        if self.draining.swap(true, Ordering::SeqCst) {
            return None;
        }
        for instance in self.registry.snapshot() {
            instance.quit(Some(&format!(
                "{reason} received - {}",
                instance.quit_message()
            )));
        }
        let publisher = Arc::clone(&self.publisher);
        Some(tokio::spawn(async move {
            publisher.drain().await;
        }))
    }

    /// Draining → ForceExit. Never returns.
    fn force_exit(&self, reason: &str) -> ! {
        error!(producer = "core", "{reason}, forcing exit");
        std::process::exit(1);
    }
}
