//! The key-value boundary between the engine and whatever medium the host persists to.

use std::{cell::RefCell, collections::BTreeMap, future::Future, pin::Pin, rc::Rc};

use crate::error::StoreError;
use crate::storage::envelope::StateEnvelope;

/// Boxed future returned by [`EnvelopeStore`] so the trait stays object safe.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a>>;

/// Whole-envelope storage keyed by namespace.
///
/// Hosts implement this over local storage, files or a remote service.
pub trait EnvelopeStore {
    /// Fetches the envelope saved under `namespace`, if any.
    fn load<'a>(&'a self, namespace: &'a str) -> StoreFuture<'a, Option<StateEnvelope>>;

    /// Saves `envelope` under its namespace, replacing the previous one.
    fn save<'a>(&'a self, envelope: &'a StateEnvelope) -> StoreFuture<'a, ()>;

    /// Removes whatever is saved under `namespace`. Missing entries are not an error.
    fn delete<'a>(&'a self, namespace: &'a str) -> StoreFuture<'a, ()>;
}

/// In-process store. Clones share one map, so a test can hand a clone to the code under test
/// and inspect the original.
#[derive(Debug, Clone, Default)]
pub struct MemoryEnvelopeStore {
    entries: Rc<RefCell<BTreeMap<String, StateEnvelope>>>,
}

impl MemoryEnvelopeStore {
    /// Namespaces currently holding an envelope, in sorted order.
    pub fn namespaces(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

impl EnvelopeStore for MemoryEnvelopeStore {
    fn load<'a>(&'a self, namespace: &'a str) -> StoreFuture<'a, Option<StateEnvelope>> {
        Box::pin(async move { Ok(self.entries.borrow().get(namespace).cloned()) })
    }

    fn save<'a>(&'a self, envelope: &'a StateEnvelope) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.entries
                .borrow_mut()
                .insert(envelope.namespace.clone(), envelope.clone());
            Ok(())
        })
    }

    fn delete<'a>(&'a self, namespace: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.entries.borrow_mut().remove(namespace);
            Ok(())
        })
    }
}
