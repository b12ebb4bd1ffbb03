use std::net::SocketAddr;
use std::sync::Arc;

use cw_store::{FileDurableStore, SnapshotStore};
use cw_sync::WorldRegistry;
use cw_types::ResourceCatalog;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::serve_connection;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Cloud Warehouse server for one world.
pub struct WarehouseServer {
    config: ServerConfig,
    registry: Arc<WorldRegistry>,
    catalog: Arc<dyn ResourceCatalog>,
}

impl WarehouseServer {
    /// Open the file store under `data_dir` and load the configured catalog.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let backend = FileDurableStore::open(config.data_dir.clone())?;
        let store = SnapshotStore::new(Arc::new(backend));
        let catalog: Arc<dyn ResourceCatalog> = Arc::new(config.load_catalog()?);
        Ok(Self::with_store(config, store, catalog))
    }

    pub fn with_store(
        config: ServerConfig,
        store: SnapshotStore,
        catalog: Arc<dyn ResourceCatalog>,
    ) -> Self {
        let registry = WorldRegistry::new(store, Arc::clone(&catalog), config.authority.clone());
        Self {
            config,
            registry: Arc::new(registry),
            catalog,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<WorldRegistry> {
        &self.registry
    }

    /// Build the HTTP router, loading the world if needed.
    pub async fn router(&self) -> ServerResult<axum::Router> {
        let handle = self.registry.get_or_load(&self.config.world).await?;
        Ok(build_router(AppState { handle }))
    }

    /// Bind both listeners and start the background tasks.
    pub async fn start(self) -> ServerResult<RunningServer> {
        let handle = self.registry.get_or_load(&self.config.world).await?;
        let protocol = TcpListener::bind(self.config.protocol_addr).await?;
        let http = TcpListener::bind(self.config.http_addr).await?;
        let protocol_addr = protocol.local_addr()?;
        let http_addr = http.local_addr()?;
        let (shutdown, _) = watch::channel(false);

        let mut tasks = Vec::with_capacity(3);

        let config = self.config.clone();
        let catalog = Arc::clone(&self.catalog);
        let accept_handle = handle.clone();
        let mut stop = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            loop {
                let (stream, peer) = tokio::select! {
                    accepted = protocol.accept() => match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    },
                    _ = stop.changed() => break,
                };
                let handle = accept_handle.clone();
                let catalog = Arc::clone(&catalog);
                let inventory = config.starting_inventory();
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, peer, handle, catalog, inventory).await {
                        debug!(%peer, error = %e, "connection ended with error");
                    }
                });
            }
        }));

        let app = build_router(AppState { handle });
        let mut stop = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            let result = axum::serve(http, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.changed().await;
                })
                .await;
            if let Err(e) = result {
                warn!(error = %e, "HTTP server failed");
            }
        }));

        let registry = Arc::clone(&self.registry);
        let interval = self.config.save_interval();
        let mut stop = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = registry.save_all().await {
                            warn!(error = %e, "save cycle failed");
                        }
                    }
                    _ = stop.changed() => break,
                }
            }
        }));

        info!(
            world = %self.config.world,
            %protocol_addr,
            %http_addr,
            "warehouse server listening"
        );
        Ok(RunningServer {
            protocol_addr,
            http_addr,
            shutdown,
            tasks,
            registry: self.registry,
        })
    }

    /// Run until Ctrl+C or SIGTERM, then save and stop.
    pub async fn serve(self) -> ServerResult<()> {
        let running = self.start().await?;
        shutdown_signal().await;
        running.shutdown().await
    }
}

/// A started server. Dropping it leaves the tasks running; call
/// [`shutdown`](Self::shutdown) to stop and save.
pub struct RunningServer {
    protocol_addr: SocketAddr,
    http_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    registry: Arc<WorldRegistry>,
}

impl RunningServer {
    pub fn protocol_addr(&self) -> SocketAddr {
        self.protocol_addr
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Stop accepting, wait for the listeners, and save every changed world.
    pub async fn shutdown(self) -> ServerResult<()> {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            task.await
                .map_err(|e| ServerError::Internal(e.to_string()))?;
        }
        let saved = self.registry.save_all().await?;
        info!(worlds = saved, "warehouse server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::num::NonZeroU32;
    use std::time::Duration;

    use cw_protocol::{error_codes, Request};
    use cw_store::InMemoryDurableStore;
    use cw_sync::{SessionEvent, ViewerSession};
    use cw_types::{ResourceType, StaticCatalog};
    use tokio::time::timeout;

    use super::*;
    use crate::client::RemoteTransport;
    use crate::config::StarterStack;

    fn wheat() -> ResourceType {
        ResourceType::new("minecraft:wheat").unwrap()
    }

    fn test_config() -> ServerConfig {
        let any_port = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
        ServerConfig {
            protocol_addr: any_port,
            http_addr: any_port,
            starter_kit: vec![StarterStack {
                resource: wheat(),
                quantity: 64,
            }],
            ..ServerConfig::default()
        }
    }

    fn catalog() -> Arc<dyn ResourceCatalog> {
        Arc::new(StaticCatalog::builtin())
    }

    async fn next(session: &mut ViewerSession<RemoteTransport>) -> SessionEvent {
        timeout(Duration::from_secs(5), session.next_event())
            .await
            .expect("timed out waiting for the server")
            .unwrap()
            .expect("connection closed")
    }

    async fn viewer(addr: SocketAddr, name: &str) -> ViewerSession<RemoteTransport> {
        let transport = RemoteTransport::connect(addr, name).await.unwrap();
        assert_eq!(transport.world(), "overworld");
        ViewerSession::new(transport, catalog())
    }

    #[test]
    fn server_construction() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: dir.path().join("data"),
            ..ServerConfig::default()
        };
        let server = WarehouseServer::new(config).unwrap();
        assert_eq!(server.config().world, "overworld");
    }

    #[tokio::test]
    async fn deposits_reach_every_connected_viewer() {
        let store = SnapshotStore::new(Arc::new(InMemoryDurableStore::new()));
        let server = WarehouseServer::with_store(test_config(), store.clone(), catalog());
        let running = server.start().await.unwrap();
        let addr = running.protocol_addr();

        let mut alex = viewer(addr, "alex").await;
        let mut steve = viewer(addr, "steve").await;

        steve.request_snapshot().await.unwrap();
        assert_eq!(next(&mut steve).await, SessionEvent::Snapshot { accepted: true });
        assert_eq!(next(&mut steve).await, SessionEvent::Inventory);
        assert_eq!(steve.cache().quantity(&wheat()), 0);

        alex.send(Request::DepositAll).await.unwrap();
        assert_eq!(next(&mut alex).await, SessionEvent::Snapshot { accepted: true });
        assert_eq!(next(&mut alex).await, SessionEvent::Inventory);
        match next(&mut alex).await {
            SessionEvent::Feedback(text) => assert!(text.starts_with("Stored 64 items"), "{text}"),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(alex.inventory().iter().all(Option::is_none));

        assert_eq!(next(&mut steve).await, SessionEvent::Snapshot { accepted: true });
        assert_eq!(steve.cache().quantity(&wheat()), 64);

        steve
            .send(Request::WithdrawByType {
                resource: wheat(),
                count: NonZeroU32::new(10).unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(next(&mut alex).await, SessionEvent::Snapshot { accepted: true });
        assert_eq!(alex.cache().quantity(&wheat()), 54);

        drop(alex);
        drop(steve);
        running.shutdown().await.unwrap();
        assert_eq!(store.load("overworld").unwrap().unwrap().quantity(&wheat()), 54);
    }

    #[tokio::test]
    async fn unknown_resource_is_rejected_without_closing() {
        let store = SnapshotStore::new(Arc::new(InMemoryDurableStore::new()));
        let running = WarehouseServer::with_store(test_config(), store, catalog())
            .start()
            .await
            .unwrap();
        let mut alex = viewer(running.protocol_addr(), "alex").await;

        alex.send(Request::DepositByType {
            resource: ResourceType::new("mod:unobtainium").unwrap(),
            count: NonZeroU32::new(1).unwrap(),
        })
        .await
        .unwrap();
        assert!(matches!(
            next(&mut alex).await,
            SessionEvent::Error { code, .. } if code == error_codes::UNKNOWN_RESOURCE
        ));

        alex.request_snapshot().await.unwrap();
        assert_eq!(next(&mut alex).await, SessionEvent::Snapshot { accepted: true });

        drop(alex);
        running.shutdown().await.unwrap();
    }
}
