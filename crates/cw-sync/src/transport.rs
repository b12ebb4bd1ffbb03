use async_trait::async_trait;
use cw_ledger::SourceInventory;
use cw_protocol::{Request, WarehouseMessage};

use crate::authority::AuthorityHandle;
use crate::error::SyncResult;
use crate::feed::ViewerFeed;
use crate::types::ViewerId;

/// A viewer's connection to an authority.
#[async_trait]
pub trait WarehouseTransport: Send {
    /// Deliver one request to the authority.
    async fn send(&mut self, request: Request) -> SyncResult<()>;

    /// Wait for the next message. `None` once the authority is gone.
    async fn recv(&mut self) -> SyncResult<Option<WarehouseMessage>>;

    /// Next already-delivered message, without waiting.
    fn try_recv(&mut self) -> SyncResult<Option<WarehouseMessage>>;
}

/// In-process transport talking straight to an [`AuthorityHandle`].
pub struct LocalTransport {
    handle: AuthorityHandle,
    viewer: ViewerId,
    receiver: ViewerFeed,
}

impl LocalTransport {
    /// Join `handle` as a new viewer operating on `inventory`.
    pub async fn connect<I>(handle: AuthorityHandle, inventory: I) -> SyncResult<Self>
    where
        I: SourceInventory + Send + 'static,
    {
        let (viewer, receiver) = handle.join(inventory).await?;
        Ok(Self {
            handle,
            viewer,
            receiver,
        })
    }

    pub fn viewer(&self) -> ViewerId {
        self.viewer
    }

    /// Leave the authority.
    pub async fn disconnect(self) -> SyncResult<()> {
        self.handle.leave(self.viewer).await?;
        Ok(())
    }
}

#[async_trait]
impl WarehouseTransport for LocalTransport {
    async fn send(&mut self, request: Request) -> SyncResult<()> {
        self.handle.submit(self.viewer, request).await?;
        Ok(())
    }

    async fn recv(&mut self) -> SyncResult<Option<WarehouseMessage>> {
        Ok(self.receiver.recv().await)
    }

    fn try_recv(&mut self) -> SyncResult<Option<WarehouseMessage>> {
        Ok(self.receiver.try_recv())
    }
}
