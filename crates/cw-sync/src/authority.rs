use std::collections::BTreeMap;
use std::sync::Arc;

use cw_ledger::{Ledger, SourceInventory};
use cw_protocol::{Request, WarehouseMessage};
use cw_store::SnapshotStore;
use cw_types::{OperationKind, OperationResult, ResourceCatalog, Snapshot};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::feed::{self, Delivery, FeedSender, ViewerFeed};
use crate::types::{AuthorityConfig, Outcome, ViewerId};

/// Inventory owned by the authority on a viewer's behalf.
pub type BoxedInventory = Box<dyn SourceInventory + Send>;

enum Command {
    Join {
        inventory: BoxedInventory,
        reply: oneshot::Sender<(ViewerId, ViewerFeed)>,
    },
    Leave {
        viewer: ViewerId,
        reply: oneshot::Sender<bool>,
    },
    Request {
        viewer: ViewerId,
        request: Request,
        reply: oneshot::Sender<SyncResult<Option<Outcome>>>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    ViewerCount {
        reply: oneshot::Sender<usize>,
    },
    Save {
        reply: oneshot::Sender<SyncResult<bool>>,
    },
}

struct Viewer {
    id: ViewerId,
    inventory: BoxedInventory,
    feed: FeedSender,
}

impl Viewer {
    /// Hand `msg` to the viewer's feed without waiting. Returns `false` once
    /// the viewer is gone.
    fn deliver(&self, msg: WarehouseMessage) -> bool {
        let name = msg.type_name();
        match self.feed.deliver(msg) {
            Delivery::Queued => true,
            Delivery::Dropped => {
                warn!(viewer = %self.id, message = name, "viewer event queue full, dropping message");
                true
            }
            Delivery::Closed => false,
        }
    }
}

/// The single serialized owner of one world's ledger.
///
/// Runs as a task draining a mailbox one command at a time. Every accepted
/// mutation is followed by a snapshot push to all viewers before the next
/// command is read, so viewers observe snapshots in the order the
/// mutations were accepted.
pub struct Authority {
    world: String,
    ledger: Ledger,
    catalog: Arc<dyn ResourceCatalog>,
    store: Option<SnapshotStore>,
    config: AuthorityConfig,
    viewers: Vec<Viewer>,
}

impl Authority {
    pub fn new(
        world: impl Into<String>,
        ledger: Ledger,
        catalog: Arc<dyn ResourceCatalog>,
        store: Option<SnapshotStore>,
        config: AuthorityConfig,
    ) -> Self {
        Self {
            world: world.into(),
            ledger,
            catalog,
            store,
            config,
            viewers: Vec::new(),
        }
    }

    /// Start the authority on the current runtime.
    ///
    /// The task ends, after a final save, once every handle is dropped.
    pub fn spawn(self) -> AuthorityHandle {
        let (sender, mailbox) = mpsc::channel(self.config.mailbox_capacity.max(1));
        let handle = AuthorityHandle {
            world: Arc::from(self.world.as_str()),
            sender,
        };
        tokio::spawn(self.run(mailbox));
        handle
    }

    async fn run(mut self, mut mailbox: mpsc::Receiver<Command>) {
        info!(world = %self.world, types = self.ledger.type_count(), "authority started");
        while let Some(command) = mailbox.recv().await {
            self.handle(command);
        }
        if let Err(e) = self.save() {
            warn!(world = %self.world, error = %e, "final save failed");
        }
        info!(world = %self.world, "authority stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Join { inventory, reply } => {
                let (sender, receiver) = feed::channel(self.config.viewer_channel_capacity);
                let id = ViewerId::new();
                self.viewers.push(Viewer {
                    id,
                    inventory,
                    feed: sender,
                });
                debug!(world = %self.world, viewer = %id, viewers = self.viewers.len(), "viewer joined");
                let _ = reply.send((id, receiver));
            }
            Command::Leave { viewer, reply } => {
                let before = self.viewers.len();
                self.viewers.retain(|v| v.id != viewer);
                let removed = self.viewers.len() < before;
                if removed {
                    debug!(world = %self.world, viewer = %viewer, "viewer left");
                }
                let _ = reply.send(removed);
            }
            Command::Request {
                viewer,
                request,
                reply,
            } => {
                let _ = reply.send(self.process(viewer, request));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.ledger.snapshot());
            }
            Command::ViewerCount { reply } => {
                let _ = reply.send(self.viewers.len());
            }
            Command::Save { reply } => {
                let _ = reply.send(self.save());
            }
        }
    }

    fn process(&mut self, viewer: ViewerId, request: Request) -> SyncResult<Option<Outcome>> {
        let index = self
            .viewers
            .iter()
            .position(|v| v.id == viewer)
            .ok_or(SyncError::UnknownViewer(viewer))?;
        let catalog = Arc::clone(&self.catalog);
        let inventory = &mut *self.viewers[index].inventory;

        let (op, result, moved) = match request {
            Request::RequestSnapshot => {
                let requester = &self.viewers[index];
                let live = requester.deliver(WarehouseMessage::PushSnapshot {
                    snapshot: self.ledger.snapshot(),
                }) && requester.deliver(WarehouseMessage::PushInventory {
                    slots: requester.inventory.to_slots(),
                });
                if !live {
                    self.viewers.remove(index);
                }
                return Ok(None);
            }
            Request::DepositByType { resource, count } => {
                let result = self
                    .ledger
                    .deposit_by_type(&*catalog, inventory, &resource, count);
                let moved = moved_if(result, [(resource, u64::from(count.get()))]);
                (OperationKind::DepositByType, result, moved)
            }
            Request::DepositAll => {
                let deposited = self.ledger.deposit_all(&*catalog, inventory);
                (OperationKind::DepositAll, OperationResult::Success, deposited)
            }
            Request::WithdrawByType { resource, count } => {
                let result = self
                    .ledger
                    .withdraw_by_type(&*catalog, inventory, &resource, count);
                let moved = moved_if(result, [(resource, u64::from(count.get()))]);
                (OperationKind::WithdrawByType, result, moved)
            }
            Request::DepositFromSlot { slot, count } => {
                let preview = inventory
                    .slot_at(slot)
                    .map(|stack| (stack.resource.clone(), u64::from(stack.quantity.min(count.get()))));
                let result = self
                    .ledger
                    .deposit_from_slot(&*catalog, &mut *inventory, slot, count);
                (OperationKind::DepositFromSlot, result, moved_if(result, preview))
            }
        };

        let changed = result.is_success() && !moved.is_empty();
        debug!(
            world = %self.world,
            viewer = %viewer,
            op = %op,
            result = %result,
            changed,
            "operation processed"
        );

        let outcome = Outcome { op, result, moved };
        let mut gone = Vec::new();
        if changed {
            gone = self.broadcast(WarehouseMessage::PushSnapshot {
                snapshot: self.ledger.snapshot(),
            });
            let requester = &self.viewers[index];
            if !requester.deliver(WarehouseMessage::PushInventory {
                slots: requester.inventory.to_slots(),
            }) {
                gone.push(requester.id);
            }
        }
        let requester = &self.viewers[index];
        if !requester.deliver(outcome.to_message()) {
            gone.push(requester.id);
        }
        self.prune(&gone);
        Ok(Some(outcome))
    }

    /// Push `msg` to every viewer. Returns the viewers whose channel closed.
    fn broadcast(&self, msg: WarehouseMessage) -> Vec<ViewerId> {
        let mut gone = Vec::new();
        let mut delivered = 0usize;
        for viewer in &self.viewers {
            if viewer.deliver(msg.clone()) {
                delivered += 1;
            } else {
                gone.push(viewer.id);
            }
        }
        debug!(world = %self.world, message = msg.type_name(), delivered, "broadcast");
        gone
    }

    fn prune(&mut self, gone: &[ViewerId]) {
        if gone.is_empty() {
            return;
        }
        self.viewers.retain(|v| !gone.contains(&v.id));
        debug!(world = %self.world, removed = gone.len(), "cleaned up closed viewers");
    }

    fn save(&mut self) -> SyncResult<bool> {
        match &self.store {
            Some(store) => Ok(self.ledger.save(store, &self.world)?),
            None => Ok(false),
        }
    }
}

fn moved_if<I>(result: OperationResult, moved: I) -> BTreeMap<cw_types::ResourceType, u64>
where
    I: IntoIterator<Item = (cw_types::ResourceType, u64)>,
{
    if result.is_success() {
        moved.into_iter().collect()
    } else {
        BTreeMap::new()
    }
}

/// Cloneable address of a running [`Authority`].
#[derive(Clone, Debug)]
pub struct AuthorityHandle {
    world: Arc<str>,
    sender: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Join { .. } => "Join",
            Self::Leave { .. } => "Leave",
            Self::Request { .. } => "Request",
            Self::Snapshot { .. } => "Snapshot",
            Self::ViewerCount { .. } => "ViewerCount",
            Self::Save { .. } => "Save",
        };
        f.write_str(name)
    }
}

impl AuthorityHandle {
    pub fn world(&self) -> &str {
        &self.world
    }

    /// Register a viewer whose operations act on `inventory`.
    ///
    /// The feed carries every message addressed to the viewer.
    pub async fn join<I>(&self, inventory: I) -> SyncResult<(ViewerId, ViewerFeed)>
    where
        I: SourceInventory + Send + 'static,
    {
        let inventory: BoxedInventory = Box::new(inventory);
        self.call(|reply| Command::Join { inventory, reply }).await
    }

    /// Unregister a viewer. Returns `false` if it was not joined.
    pub async fn leave(&self, viewer: ViewerId) -> SyncResult<bool> {
        self.call(|reply| Command::Leave { viewer, reply }).await
    }

    /// Run one request and wait until it has been processed.
    ///
    /// Every message the request produced is already on the viewers' feeds
    /// when this returns. `None` for snapshot requests.
    pub async fn submit(&self, viewer: ViewerId, request: Request) -> SyncResult<Option<Outcome>> {
        self.call(|reply| Command::Request {
            viewer,
            request,
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> SyncResult<Snapshot> {
        self.call(|reply| Command::Snapshot { reply }).await
    }

    pub async fn viewer_count(&self) -> SyncResult<usize> {
        self.call(|reply| Command::ViewerCount { reply }).await
    }

    /// Persist the ledger if it changed. Returns whether anything was written.
    pub async fn save(&self) -> SyncResult<bool> {
        self.call(|reply| Command::Save { reply }).await?
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> SyncResult<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(make(reply))
            .await
            .map_err(|_| self.closed())?;
        response.await.map_err(|_| self.closed())
    }

    fn closed(&self) -> SyncError {
        SyncError::AuthorityClosed(self.world.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use cw_ledger::SlotInventory;
    use cw_store::InMemoryDurableStore;
    use cw_types::{ItemStack, ResourceType, StaticCatalog, Timestamp};

    use super::*;
    use crate::cache::RemoteCache;

    fn wheat() -> ResourceType {
        ResourceType::new("minecraft:wheat").unwrap()
    }

    fn n(count: u32) -> NonZeroU32 {
        NonZeroU32::new(count).unwrap()
    }

    fn spawn_with(ledger: Ledger, store: Option<SnapshotStore>, config: AuthorityConfig) -> AuthorityHandle {
        Authority::new("overworld", ledger, Arc::new(StaticCatalog::builtin()), store, config).spawn()
    }

    fn spawn_empty() -> AuthorityHandle {
        spawn_with(Ledger::new(Timestamp::from_millis(1)), None, AuthorityConfig::default())
    }

    fn drain(rx: &mut ViewerFeed) -> Vec<WarehouseMessage> {
        let mut out = Vec::new();
        while let Some(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn names(msgs: &[WarehouseMessage]) -> Vec<&'static str> {
        msgs.iter().map(|m| m.type_name()).collect()
    }

    #[tokio::test]
    async fn snapshot_request_answers_only_requester() {
        let authority = spawn_empty();
        let (alice, mut alice_rx) = authority.join(SlotInventory::player()).await.unwrap();
        let (_bob, mut bob_rx) = authority.join(SlotInventory::player()).await.unwrap();

        let outcome = authority.submit(alice, Request::RequestSnapshot).await.unwrap();

        assert!(outcome.is_none());
        assert_eq!(names(&drain(&mut alice_rx)), vec!["PushSnapshot", "PushInventory"]);
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn successful_deposit_broadcasts_to_everyone() {
        let authority = spawn_empty();
        let inv = SlotInventory::player().with(0, ItemStack::simple(wheat(), 64));
        let (alice, mut alice_rx) = authority.join(inv).await.unwrap();
        let (_bob, mut bob_rx) = authority.join(SlotInventory::player()).await.unwrap();

        let outcome = authority
            .submit(alice, Request::DepositByType { resource: wheat(), count: n(64) })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.result, OperationResult::Success);
        assert_eq!(outcome.moved.get(&wheat()), Some(&64));
        assert_eq!(
            names(&drain(&mut alice_rx)),
            vec!["PushSnapshot", "PushInventory", "OperationOutcome"]
        );
        let bob_msgs = drain(&mut bob_rx);
        match bob_msgs.as_slice() {
            [WarehouseMessage::PushSnapshot { snapshot }] => {
                assert_eq!(snapshot.quantity(&wheat()), 64);
            }
            other => panic!("unexpected messages: {:?}", names(other)),
        }
    }

    #[tokio::test]
    async fn failed_operation_reports_without_broadcast() {
        let authority = spawn_empty();
        let (alice, mut alice_rx) = authority.join(SlotInventory::player()).await.unwrap();
        let (_bob, mut bob_rx) = authority.join(SlotInventory::player()).await.unwrap();

        let outcome = authority
            .submit(alice, Request::WithdrawByType { resource: wheat(), count: n(20) })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.result, OperationResult::InsufficientStock);
        assert!(outcome.moved.is_empty());
        assert_eq!(names(&drain(&mut alice_rx)), vec!["OperationOutcome"]);
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn empty_deposit_all_does_not_broadcast() {
        let authority = spawn_empty();
        let (alice, mut alice_rx) = authority.join(SlotInventory::player()).await.unwrap();

        let outcome = authority.submit(alice, Request::DepositAll).await.unwrap().unwrap();

        assert!(outcome.moved.is_empty());
        assert_eq!(names(&drain(&mut alice_rx)), vec!["OperationOutcome"]);
    }

    #[tokio::test]
    async fn unknown_viewer_is_rejected() {
        let authority = spawn_empty();
        let err = authority
            .submit(ViewerId::new(), Request::DepositAll)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::UnknownViewer(_)));
    }

    #[tokio::test]
    async fn closed_viewers_are_pruned_on_broadcast() {
        let authority = spawn_empty();
        let inv = SlotInventory::player().with(0, ItemStack::simple(wheat(), 5));
        let (alice, _alice_rx) = authority.join(inv).await.unwrap();
        let (_bob, bob_rx) = authority.join(SlotInventory::player()).await.unwrap();
        drop(bob_rx);

        authority.submit(alice, Request::DepositAll).await.unwrap();

        assert_eq!(authority.viewer_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn lagging_viewer_catches_up_to_latest_snapshot() {
        let config = AuthorityConfig {
            viewer_channel_capacity: 2,
            ..AuthorityConfig::default()
        };
        let authority = spawn_with(Ledger::new(Timestamp::from_millis(1)), None, config);
        let inv = SlotInventory::player().with(0, ItemStack::simple(wheat(), 10));
        let (alice, _alice_rx) = authority.join(inv).await.unwrap();
        let (_bob, mut bob_rx) = authority.join(SlotInventory::player()).await.unwrap();

        for _ in 0..5 {
            let outcome = authority
                .submit(alice, Request::DepositFromSlot { slot: 0, count: n(1) })
                .await
                .unwrap()
                .unwrap();
            assert!(outcome.result.is_success());
        }

        let mut cache = RemoteCache::new();
        for msg in drain(&mut bob_rx) {
            if let WarehouseMessage::PushSnapshot { snapshot } = msg {
                cache.apply(snapshot);
            }
        }
        let ledger = authority.snapshot().await.unwrap();
        assert_eq!(ledger.quantity(&wheat()), 5);
        assert_eq!(cache.quantity(&wheat()), 5);
        assert_eq!(cache.last_updated(), Some(ledger.last_updated()));
        assert_eq!(authority.viewer_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn requester_sees_latest_state_after_outcomes_overflow() {
        let config = AuthorityConfig {
            viewer_channel_capacity: 1,
            ..AuthorityConfig::default()
        };
        let authority = spawn_with(Ledger::new(Timestamp::from_millis(1)), None, config);
        let inv = SlotInventory::player().with(0, ItemStack::simple(wheat(), 3));
        let (alice, mut alice_rx) = authority.join(inv).await.unwrap();

        for _ in 0..3 {
            authority
                .submit(alice, Request::DepositFromSlot { slot: 0, count: n(1) })
                .await
                .unwrap();
        }

        let msgs = drain(&mut alice_rx);
        assert_eq!(
            names(&msgs),
            vec!["PushSnapshot", "PushInventory", "OperationOutcome"]
        );
        match &msgs[1] {
            WarehouseMessage::PushInventory { slots } => assert!(slots.iter().all(Option::is_none)),
            other => panic!("unexpected {}", other.type_name()),
        }
    }

    #[tokio::test]
    async fn feed_ends_after_leave() {
        let authority = spawn_empty();
        let (alice, mut alice_rx) = authority.join(SlotInventory::player()).await.unwrap();
        authority.submit(alice, Request::RequestSnapshot).await.unwrap();
        authority.leave(alice).await.unwrap();

        assert_eq!(alice_rx.recv().await.map(|m| m.type_name()), Some("PushSnapshot"));
        assert_eq!(alice_rx.recv().await.map(|m| m.type_name()), Some("PushInventory"));
        assert_eq!(alice_rx.recv().await, None);
    }

    #[tokio::test]
    async fn leave_unregisters() {
        let authority = spawn_empty();
        let (alice, _rx) = authority.join(SlotInventory::player()).await.unwrap();
        assert!(authority.leave(alice).await.unwrap());
        assert!(!authority.leave(alice).await.unwrap());
        assert_eq!(authority.viewer_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn save_persists_dirty_ledger() {
        let store = SnapshotStore::new(Arc::new(InMemoryDurableStore::new()));
        let authority = spawn_with(
            Ledger::new(Timestamp::from_millis(1)),
            Some(store.clone()),
            AuthorityConfig::default(),
        );
        assert!(!authority.save().await.unwrap());

        let inv = SlotInventory::player().with(3, ItemStack::simple(wheat(), 7));
        let (alice, _rx) = authority.join(inv).await.unwrap();
        authority
            .submit(alice, Request::DepositFromSlot { slot: 3, count: n(64) })
            .await
            .unwrap();

        assert!(authority.save().await.unwrap());
        assert_eq!(store.load("overworld").unwrap().unwrap().quantity(&wheat()), 7);
    }
}
