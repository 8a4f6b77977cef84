//! One-shot shutdown coordination.
//!
//! The coordinator moves `Running -> ShuttingDown -> Terminated` and never
//! back. The first trigger (a termination signal or the enumeration finishing)
//! records the reason and cancels the token; every later trigger is ignored.
//! Nothing here exits the process: the main path observes the token, writes
//! the checkpoint and returns.

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
    Quit,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Quit => "SIGQUIT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Completed,
    Signal(ShutdownSignal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    ShuttingDown,
    Terminated,
}

#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    reason: OnceLock<ShutdownReason>,
    terminated: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Moves to `ShuttingDown`. Returns false if a shutdown was already
    /// under way, in which case `reason` is dropped.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        if self.reason.set(reason).is_err() {
            return false;
        }
        self.token.cancel();
        true
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Marks the drain finished. Only meaningful after a trigger.
    pub fn terminate(&self) {
        if self.reason.get().is_some() {
            self.terminated.store(true, Ordering::Release);
        }
    }

    pub fn phase(&self) -> Phase {
        match (self.reason.get(), self.terminated.load(Ordering::Acquire)) {
            (None, _) => Phase::Running,
            (Some(_), false) => Phase::ShuttingDown,
            (Some(_), true) => Phase::Terminated,
        }
    }
}

fn on_signal(coordinator: &ShutdownCoordinator, signal: ShutdownSignal) {
    if coordinator.trigger(ShutdownReason::Signal(signal)) {
        warn!(%signal, "Signal received, shutting down the application..");
    } else {
        warn!(%signal, "Signal received while already shutting down, ignoring");
    }
}

/// Installs SIGINT/SIGTERM/SIGQUIT handlers and forwards them to
/// `coordinator` from a background task. Handler installation errors are
/// returned before anything is spawned.
#[cfg(unix)]
pub fn spawn_signal_listener(
    coordinator: Arc<ShutdownCoordinator>,
) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;
    info!("Application started, waiting for signals to shutdown gracefully..");

    Ok(tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = interrupt.recv() => ShutdownSignal::Interrupt,
                Some(()) = terminate.recv() => ShutdownSignal::Terminate,
                Some(()) = quit.recv() => ShutdownSignal::Quit,
                else => break,
            };
            on_signal(&coordinator, received);
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_signal_listener(
    coordinator: Arc<ShutdownCoordinator>,
) -> std::io::Result<JoinHandle<()>> {
    info!("Application started, waiting for Ctrl+C to shutdown gracefully..");
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            on_signal(&coordinator, ShutdownSignal::Interrupt);
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_running() {
        let coordinator = ShutdownCoordinator::new();
        assert_eq!(coordinator.phase(), Phase::Running);
        assert_eq!(coordinator.reason(), None);
        assert!(!coordinator.token().is_cancelled());
    }

    #[test]
    fn first_trigger_wins() {
        let coordinator = ShutdownCoordinator::new();
        let reason = ShutdownReason::Signal(ShutdownSignal::Terminate);

        assert!(coordinator.trigger(reason));
        assert!(!coordinator.trigger(ShutdownReason::Completed));
        assert!(!coordinator.trigger(ShutdownReason::Signal(ShutdownSignal::Quit)));

        assert_eq!(coordinator.reason(), Some(reason));
        assert_eq!(coordinator.phase(), Phase::ShuttingDown);
        assert!(coordinator.token().is_cancelled());
    }

    #[test]
    fn terminate_requires_a_trigger() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.terminate();
        assert_eq!(coordinator.phase(), Phase::Running);

        coordinator.trigger(ShutdownReason::Completed);
        coordinator.terminate();
        assert_eq!(coordinator.phase(), Phase::Terminated);
    }

    #[tokio::test]
    async fn token_clones_observe_trigger() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let token = coordinator.token();

        let waiter = tokio::spawn(async move { token.cancelled().await });
        on_signal(&coordinator, ShutdownSignal::Interrupt);
        waiter.await.unwrap();

        assert_eq!(
            coordinator.reason(),
            Some(ShutdownReason::Signal(ShutdownSignal::Interrupt))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn listener_maps_sigterm_to_terminate() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let listener = spawn_signal_listener(coordinator.clone()).unwrap();
        let token = coordinator.token();

        let status = tokio::process::Command::new("kill")
            .arg("-TERM")
            .arg(std::process::id().to_string())
            .status()
            .await
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .expect("SIGTERM should cancel the token");
        assert_eq!(
            coordinator.reason(),
            Some(ShutdownReason::Signal(ShutdownSignal::Terminate))
        );
        assert_eq!(coordinator.phase(), Phase::ShuttingDown);
        listener.abort();
    }

    #[test]
    fn signals_display_posix_names() {
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownSignal::Terminate.to_string(), "SIGTERM");
        assert_eq!(ShutdownSignal::Quit.to_string(), "SIGQUIT");
    }
}
