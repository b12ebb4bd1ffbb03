use std::sync::Arc;

use cw_protocol::feedback::describe_outcome;
use cw_protocol::{Request, WarehouseMessage};
use cw_types::{ItemStack, ResourceCatalog};
use tracing::{debug, warn};

use crate::cache::RemoteCache;
use crate::error::SyncResult;
use crate::transport::WarehouseTransport;

/// What applying one incoming message did to the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Snapshot { accepted: bool },
    Inventory,
    Feedback(String),
    Error { code: u32, message: String },
    Ignored(&'static str),
}

/// Viewer-side state: the remote cache, the inventory mirror, and pending
/// feedback lines, fed by a [`WarehouseTransport`].
pub struct ViewerSession<T> {
    transport: T,
    catalog: Arc<dyn ResourceCatalog>,
    cache: RemoteCache,
    inventory: Vec<Option<ItemStack>>,
    feedback: Vec<String>,
}

impl<T: WarehouseTransport> ViewerSession<T> {
    pub fn new(transport: T, catalog: Arc<dyn ResourceCatalog>) -> Self {
        Self {
            transport,
            catalog,
            cache: RemoteCache::new(),
            inventory: Vec::new(),
            feedback: Vec::new(),
        }
    }

    pub fn cache(&self) -> &RemoteCache {
        &self.cache
    }

    /// Last inventory mirror pushed by the authority.
    pub fn inventory(&self) -> &[Option<ItemStack>] {
        &self.inventory
    }

    pub fn catalog(&self) -> &Arc<dyn ResourceCatalog> {
        &self.catalog
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Feedback lines received since the last call.
    pub fn take_feedback(&mut self) -> Vec<String> {
        std::mem::take(&mut self.feedback)
    }

    /// Ask for a fresh snapshot; sent when a view opens.
    pub async fn request_snapshot(&mut self) -> SyncResult<()> {
        self.transport.send(Request::RequestSnapshot).await
    }

    pub async fn send(&mut self, request: Request) -> SyncResult<()> {
        self.transport.send(request).await
    }

    /// Apply every message that has already arrived. Call before rendering.
    pub fn pump(&mut self) -> SyncResult<usize> {
        let mut applied = 0;
        while let Some(msg) = self.transport.try_recv()? {
            self.apply(msg);
            applied += 1;
        }
        Ok(applied)
    }

    /// Wait for and apply the next message. `None` once the authority is gone.
    pub async fn next_event(&mut self) -> SyncResult<Option<SessionEvent>> {
        match self.transport.recv().await? {
            Some(msg) => Ok(Some(self.apply(msg))),
            None => Ok(None),
        }
    }

    pub fn apply(&mut self, msg: WarehouseMessage) -> SessionEvent {
        match msg {
            WarehouseMessage::PushSnapshot { snapshot } => {
                let accepted = self.cache.apply(snapshot);
                SessionEvent::Snapshot { accepted }
            }
            WarehouseMessage::PushInventory { slots } => {
                self.inventory = slots;
                SessionEvent::Inventory
            }
            WarehouseMessage::OperationOutcome { op, result, moved } => {
                let text = describe_outcome(op, result, &moved, &*self.catalog);
                self.feedback.push(text.clone());
                SessionEvent::Feedback(text)
            }
            WarehouseMessage::Error { code, message } => {
                warn!(code, %message, "authority reported an error");
                self.feedback.push(message.clone());
                SessionEvent::Error { code, message }
            }
            other => {
                debug!(message = other.type_name(), "ignoring message");
                SessionEvent::Ignored(other.type_name())
            }
        }
    }
}
