//! Interrupt-safe shutdown coordination
//!
//! A [`ShutdownCoordinator`] is armed for the duration of one harvest run.
//! While armed, the first termination signal (SIGINT or SIGTERM) flips a
//! shared flag: workers that have not started fetching bail out, in-flight
//! fetches are allowed to finish their single store write, and the run's
//! exit path performs its one snapshot as usual. Further signals are
//! swallowed and logged, so a second Ctrl-C does not re-enter shutdown
//! logic or kill the snapshot write.
//!
//! Dropping the coordinator disarms it by aborting the listener task, so
//! signal handling never leaks past the run that installed it. It must be
//! armed from within the tokio runtime that drives the harvest; worker
//! tasks never install handlers themselves.

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Listens for termination signals and publishes the shutdown flag
#[derive(Debug)]
pub struct ShutdownCoordinator {
    listener: JoinHandle<()>,
    receiver: watch::Receiver<bool>,
}

impl ShutdownCoordinator {
    /// Installs the signal listeners and arms the coordinator
    pub fn arm() -> Self {
        let (sender, receiver) = watch::channel(false);
        let listener = tokio::spawn(listen(sender));
        Self { listener, receiver }
    }

    /// A cheap handle workers can poll
    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            receiver: self.receiver.clone(),
        }
    }
}

impl Drop for ShutdownCoordinator {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(unix)]
async fn listen(sender: watch::Sender<bool>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!("failed to install SIGINT handler: {err}");
            return;
        }
    };
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!("failed to install SIGTERM handler: {err}");
            return;
        }
    };

    let mut shutting_down = false;
    loop {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }

        if shutting_down {
            tracing::debug!("already shutting down, ignoring signal");
            continue;
        }
        shutting_down = true;

        tracing::warn!("ordered to stop; finishing in-flight fetches and saving the snapshot");
        if sender.send(true).is_err() {
            return;
        }
    }
}

#[cfg(not(unix))]
async fn listen(sender: watch::Sender<bool>) {
    let mut shutting_down = false;
    loop {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("failed to listen for Ctrl-C");
            return;
        }

        if shutting_down {
            tracing::debug!("already shutting down, ignoring signal");
            continue;
        }
        shutting_down = true;

        tracing::warn!("ordered to stop; finishing in-flight fetches and saving the snapshot");
        if sender.send(true).is_err() {
            return;
        }
    }
}

/// Read side of the shutdown flag
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    pub(crate) receiver: watch::Receiver<bool>,
}

impl ShutdownHandle {
    /// A handle that never reports shutdown, for runs without a coordinator
    /// (store iteration, tests)
    pub fn inactive() -> Self {
        let (_, receiver) = watch::channel(false);
        Self { receiver }
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.receiver.borrow()
    }
}
