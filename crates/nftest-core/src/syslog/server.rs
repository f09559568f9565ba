//! UDP relay that receives a pipeline's syslog stream.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument};

use super::record::{emit, transform, LogEnvelope};
use crate::error::RelayError;

/// Largest datagram accepted; longer ones are truncated by the socket.
pub const MAX_DATAGRAM: usize = 64 * 1024;

/// Relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address to bind. Must be reachable from the pipeline process.
    pub bind_host: IpAddr,
    /// Upper bound on how long the serve loop waits before rechecking for
    /// shutdown.
    pub poll_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Lifecycle of a relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Bound, not yet serving.
    Listening,
    Serving,
    Stopped,
}

/// A bound syslog listener on an ephemeral port.
pub struct SyslogServer {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl SyslogServer {
    /// Bind to an ephemeral port on `config.bind_host`.
    pub async fn bind(config: &RelayConfig) -> Result<Self, RelayError> {
        let bind_err = |source| RelayError::Bind {
            host: config.bind_host,
            source,
        };
        let socket = UdpSocket::bind((config.bind_host, 0))
            .await
            .map_err(bind_err)?;
        let local_addr = socket.local_addr().map_err(bind_err)?;
        Ok(Self { socket, local_addr })
    }

    /// The bound `host:port`, to be handed to the pipeline.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> RelayState {
        RelayState::Listening
    }

    /// Start serving on a background task inside the caller's span.
    pub fn start(self, poll_interval: Duration) -> SyslogRelay {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let addr = self.local_addr;
        let task = tokio::spawn(
            self.serve_forever(poll_interval, shutdown_rx)
                .in_current_span(),
        );
        SyslogRelay {
            addr,
            shutdown_tx,
            task: Some(task),
        }
    }

    async fn serve_forever(self, poll_interval: Duration, mut shutdown: watch::Receiver<bool>) {
        debug!("Syslog server at {} starting up", self.local_addr);
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Handle dropped without signalling.
                        break;
                    }
                    continue;
                }
                received = tokio::time::timeout(poll_interval, self.socket.recv_from(&mut buf)) => received,
            };

            match received {
                Err(_elapsed) => continue,
                Ok(Ok((len, peer))) => handle_datagram(&buf[..len], peer),
                Ok(Err(e)) => {
                    warn!(error = %e, "Syslog server receive failed");
                }
            }
        }

        debug!("Syslog server at {} shutting down", self.local_addr);
    }
}

/// Each datagram is transformed and logged on its own; nothing carries over
/// between datagrams.
fn handle_datagram(payload: &[u8], peer: SocketAddr) {
    let envelope = LogEnvelope::new(payload, peer);
    let record = transform(&envelope.payload);
    emit(&record, &envelope);
}

/// A running relay.
///
/// Call [`SyslogRelay::shutdown`] to stop it and wait for the serve task.
/// Dropping the handle also stops the task, without waiting.
pub struct SyslogRelay {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SyslogRelay {
    /// The bound `host:port`, to be handed to the pipeline.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> RelayState {
        match &self.task {
            Some(task) if !task.is_finished() => RelayState::Serving,
            _ => RelayState::Stopped,
        }
    }

    /// Stop serving and wait for the task to exit. Safe to call repeatedly.
    pub async fn shutdown(&mut self) {
        // Fails only when the task already exited.
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Syslog server task ended abnormally");
            }
        }
    }
}

impl Drop for SyslogRelay {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
