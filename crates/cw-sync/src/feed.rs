use cw_protocol::WarehouseMessage;
use cw_types::{ItemStack, Snapshot};
use tokio::sync::{mpsc, watch};

type Slots = Vec<Option<ItemStack>>;

/// Open a feed whose event queue holds up to `capacity` messages.
pub(crate) fn channel(capacity: usize) -> (FeedSender, ViewerFeed) {
    let (snapshot_tx, snapshot_rx) = watch::channel(None);
    let (inventory_tx, inventory_rx) = watch::channel(None);
    let (events_tx, events_rx) = mpsc::channel(capacity.max(1));
    (
        FeedSender {
            snapshot: snapshot_tx,
            inventory: inventory_tx,
            events: events_tx,
        },
        ViewerFeed {
            snapshot: snapshot_rx,
            inventory: inventory_rx,
            events: events_rx,
        },
    )
}

/// Result of handing one message to a viewer's feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Delivery {
    Queued,
    /// The event queue was full and the message was discarded.
    Dropped,
    Closed,
}

/// Authority side of a [`ViewerFeed`].
pub(crate) struct FeedSender {
    snapshot: watch::Sender<Option<Snapshot>>,
    inventory: watch::Sender<Option<Slots>>,
    events: mpsc::Sender<WarehouseMessage>,
}

impl FeedSender {
    /// State pushes overwrite any push the viewer has not read yet, so they
    /// are never refused. Everything else goes through the bounded queue.
    pub(crate) fn deliver(&self, msg: WarehouseMessage) -> Delivery {
        if self.events.is_closed() {
            return Delivery::Closed;
        }
        match msg {
            WarehouseMessage::PushSnapshot { snapshot } => {
                self.snapshot.send_replace(Some(snapshot));
                Delivery::Queued
            }
            WarehouseMessage::PushInventory { slots } => {
                self.inventory.send_replace(Some(slots));
                Delivery::Queued
            }
            other => match self.events.try_send(other) {
                Ok(()) => Delivery::Queued,
                Err(mpsc::error::TrySendError::Full(_)) => Delivery::Dropped,
                Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
            },
        }
    }
}

/// Everything an authority addresses to one viewer.
///
/// Snapshot and inventory pushes are coalesced: a reader that falls behind
/// skips intermediate states and gets the newest one. Pending state pushes
/// are returned before queued events, snapshot first. The feed ends once
/// the viewer has left and every pending message was read.
#[derive(Debug)]
pub struct ViewerFeed {
    snapshot: watch::Receiver<Option<Snapshot>>,
    inventory: watch::Receiver<Option<Slots>>,
    events: mpsc::Receiver<WarehouseMessage>,
}

impl ViewerFeed {
    /// Wait for the next message. `None` once the feed has ended.
    pub async fn recv(&mut self) -> Option<WarehouseMessage> {
        loop {
            tokio::select! {
                biased;
                Ok(()) = self.snapshot.changed() => {
                    if let Some(snapshot) = self.snapshot.borrow_and_update().clone() {
                        return Some(WarehouseMessage::PushSnapshot { snapshot });
                    }
                }
                Ok(()) = self.inventory.changed() => {
                    if let Some(slots) = self.inventory.borrow_and_update().clone() {
                        return Some(WarehouseMessage::PushInventory { slots });
                    }
                }
                msg = self.events.recv() => return msg,
            }
        }
    }

    /// Next pending message, without waiting.
    pub fn try_recv(&mut self) -> Option<WarehouseMessage> {
        if let Some(snapshot) = take_unseen(&mut self.snapshot) {
            return Some(WarehouseMessage::PushSnapshot { snapshot });
        }
        if let Some(slots) = take_unseen(&mut self.inventory) {
            return Some(WarehouseMessage::PushInventory { slots });
        }
        self.events.try_recv().ok()
    }
}

fn take_unseen<T: Clone>(rx: &mut watch::Receiver<Option<T>>) -> Option<T> {
    let current = rx.borrow_and_update();
    if current.has_changed() {
        current.clone()
    } else {
        None
    }
}
