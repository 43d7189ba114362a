use log::warn;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A spawned accept loop together with the means to stop it.
///
/// Dropping the handle also stops the loop.
pub struct ServiceHandle {
    local_addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ServiceHandle {
    pub fn new(local_addr: SocketAddr, shutdown_tx: mpsc::Sender<()>, task: JoinHandle<()>) -> Self {
        Self {
            local_addr,
            shutdown_tx,
            task,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for the accept loop to exit.
    ///
    /// Connections already handed to their own tasks run to completion.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!("Service on {} ended abnormally: {}", self.local_addr, e);
        }
    }
}
