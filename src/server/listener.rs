//! The accept/handle loop.
//!
//! One listener instance owns the bound socket and handles connections
//! strictly one at a time: a connection is fully read, verified, installed
//! and closed before the next accept. That keeps at most one pending
//! artifact in staging and rules out concurrent renames of the target.
//! Reads carry no timeout, so a stalled peer blocks the loop; acceptable
//! for a single-operator device, and the first thing to harden otherwise.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::device::DeviceReset;
use crate::http::connection::{Connection, Outcome};
use crate::install::Installer;

const BIND_RETRY_INTERVAL: Duration = Duration::from_secs(2);

pub struct Listener {
    socket: TcpListener,
    installer: Installer,
    reset: Arc<dyn DeviceReset>,
}

/// Binds the service port, retrying until it succeeds.
///
/// Right after a soft reset the old socket can linger and the bind fails
/// with address-in-use; the port frees eventually, so there is no retry
/// cutoff and the caller never sees a bind error.
pub async fn bind(cfg: &Config, reset: Arc<dyn DeviceReset>) -> Listener {
    let socket = loop {
        match TcpListener::bind(&cfg.listen_addr).await {
            Ok(socket) => break socket,
            Err(e) => {
                error!("bind {} failed: {}", cfg.listen_addr, e);
                sleep(BIND_RETRY_INTERVAL).await;
            }
        }
    };

    Listener {
        socket,
        installer: Installer::new(&cfg.staging_dir),
        reset,
    }
}

impl Listener {
    /// The address actually bound; useful when configured with port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        info!("Listening on {}", self.socket.local_addr()?);

        loop {
            let (stream, peer) = self.socket.accept().await?;
            info!("Accepted connection from {}", peer);

            let mut conn = Connection::new(stream, self.installer.clone());

            match conn.run().await {
                Ok(Outcome::Installed) => {
                    // Close the socket before resetting; the closed
                    // connection is the client's only success signal.
                    drop(conn);
                    info!("Resetting");
                    self.reset.reset();
                }
                Ok(Outcome::NoUpdate) => {}
                Err(e) => {
                    warn!("connection from {} aborted: {:#}", peer, e);
                }
            }
        }
    }
}
