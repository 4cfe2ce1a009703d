//! Change notification for successful writes
//!
//! Each resource keeps an append-only list of subscribers. After a write has
//! landed and the store's locks are released, every subscriber runs once, in
//! the order it was added. Subscribers may call back into the same store.
//!
//! A subscriber that writes the very resource and instance it was invoked
//! for re-triggers itself without bound; guarding against that is the
//! subscriber's job.

use crate::core::datastore::Datastore;
use crate::core::types::{InstanceId, ResourceId};
use std::fmt;
use std::sync::Arc;

/// Callback invoked after a successful set
///
/// Any context the subscriber needs is captured by the closure itself.
pub type SetCallback<'a> = dyn Fn(&Datastore<'a>, ResourceId, InstanceId) + Send + Sync + 'a;

/// Ordered subscribers of one resource
///
/// The list is shared copy-on-write: a write takes a cheap snapshot, so a
/// subscriber added while notifications are in flight is only seen by later
/// writes.
pub(crate) struct SubscriberList<'a> {
    entries: Arc<Vec<Arc<SetCallback<'a>>>>,
}

impl<'a> SubscriberList<'a> {
    pub(crate) fn new() -> Self {
        SubscriberList {
            entries: Arc::new(Vec::new()),
        }
    }

    /// Append to the end of the chain
    pub(crate) fn push(&mut self, callback: Arc<SetCallback<'a>>) {
        Arc::make_mut(&mut self.entries).push(callback);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn snapshot(&self) -> Subscribers<'a> {
        Subscribers {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl fmt::Debug for SubscriberList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberList")
            .field("len", &self.len())
            .finish()
    }
}

/// Subscribers captured at write time, invoked once the locks are gone
pub(crate) struct Subscribers<'a> {
    entries: Arc<Vec<Arc<SetCallback<'a>>>>,
}

impl<'a> Subscribers<'a> {
    pub(crate) fn notify(&self, store: &Datastore<'a>, id: ResourceId, instance: InstanceId) {
        for callback in self.entries.iter() {
            callback(store, id, instance);
        }
    }
}
