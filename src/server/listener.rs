use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket};
use tracing::info;

use crate::client::endpoint::{AddressFamily, resolve, split_host_port};
use crate::config::ServerConfig;
use crate::http::connection::Connection;
use crate::server::supervisor::{Supervisor, WorkerStats};

pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Binds the first resolved address of `listen_addr` that accepts a bind.
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let (host, port) = split_host_port(&config.listen_addr)
            .with_context(|| format!("Invalid listen address {}", config.listen_addr))?;
        let endpoints = resolve(host, port).await?;

        for endpoint in &endpoints {
            let socket = match endpoint.family {
                AddressFamily::V4 => TcpSocket::new_v4(),
                AddressFamily::V6 => TcpSocket::new_v6(),
            };
            let socket = match socket {
                Ok(socket) => socket,
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "Could not open socket");
                    continue;
                }
            };

            socket
                .set_reuseaddr(true)
                .context("Failed to set SO_REUSEADDR")?;

            if let Err(e) = socket.bind(endpoint.socket_addr()) {
                tracing::warn!(endpoint = %endpoint, error = %e, "Bind failed");
                continue;
            }

            let listener = socket
                .listen(config.backlog)
                .with_context(|| format!("Failed to listen on {}", endpoint))?;

            return Ok(Self {
                listener,
                config: Arc::new(config),
            });
        }

        anyhow::bail!("Failed to bind {}", config.listen_addr)
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the process is killed.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(std::future::pending::<()>()).await?;
        Ok(())
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Every accepted connection is handed to its own worker and the accept
    /// loop never waits on one. Finished workers are collected as they exit.
    /// In-flight workers are left running when `shutdown` fires.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<WorkerStats>
    where
        F: Future<Output = ()>,
    {
        self.run_until_with(shutdown, Connection::run).await
    }

    /// Like `run_until`, but each worker runs `handler` on its connection.
    ///
    /// A handler that panics takes down only its own worker.
    pub async fn run_until_with<F, H, W>(self, shutdown: F, handler: H) -> anyhow::Result<WorkerStats>
    where
        F: Future<Output = ()>,
        H: Fn(Connection) -> W,
        W: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        info!("Listening on {}", self.local_addr()?);

        let mut supervisor = Supervisor::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((socket, peer)) => {
                            info!("Accepted connection from {}", peer);

                            let conn = Connection::new(socket, peer, Arc::clone(&self.config));
                            let worker = handler(conn);
                            supervisor.dispatch(async move {
                                if let Err(e) = worker.await {
                                    tracing::error!("Connection error from {}: {:#}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Accept failed");
                        }
                    }
                    supervisor.reap();
                }

                _ = supervisor.wait_exit(), if supervisor.in_flight() > 0 => {}

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        supervisor.reap();
        let stats = supervisor.stats();
        info!(
            dispatched = stats.dispatched,
            reaped = stats.reaped,
            in_flight = supervisor.in_flight(),
            "Stopped accepting"
        );

        Ok(stats)
    }
}
