//! Shared provider access
//!
//! A [`ProviderSlot`] holds at most one [`MovieProvider`]. The first
//! `get_instance` call builds it; later calls return the same provider and
//! ignore their store argument. Test harnesses swap the provider with
//! `set_instance_for_testing`.
//!
//! Applications normally own a slot and pass it by reference. For code that
//! cannot thread a slot through, [`get_instance`] and
//! [`set_instance_for_testing`] use a single process-wide slot.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::provider::MovieProvider;
use crate::store::RemoteStore;

/// Holder for one shared provider
#[derive(Default)]
pub struct ProviderSlot {
    provider: Mutex<Option<Arc<MovieProvider>>>,
}

impl ProviderSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the held provider, building one from `store` if empty
    pub fn get_instance(&self, store: Arc<dyn RemoteStore>) -> Arc<MovieProvider> {
        let mut slot = self.provider.lock();
        let provider = slot.get_or_insert_with(|| Arc::new(MovieProvider::new(store)));
        Arc::clone(provider)
    }

    /// Replace the held provider with a fresh one built from `store`
    ///
    /// For test harnesses. Callers that already hold the old provider keep it.
    pub fn set_instance_for_testing(&self, store: Arc<dyn RemoteStore>) -> Arc<MovieProvider> {
        self.set_instance_for_testing_with(MovieProvider::new(store))
    }

    /// Replace the held provider with `provider`
    pub fn set_instance_for_testing_with(&self, provider: MovieProvider) -> Arc<MovieProvider> {
        let provider = Arc::new(provider);
        *self.provider.lock() = Some(Arc::clone(&provider));
        provider
    }

    /// The held provider, if any
    pub fn current(&self) -> Option<Arc<MovieProvider>> {
        self.provider.lock().clone()
    }
}

fn global_slot() -> &'static ProviderSlot {
    static GLOBAL: OnceLock<ProviderSlot> = OnceLock::new();
    GLOBAL.get_or_init(ProviderSlot::new)
}

/// Process-wide [`ProviderSlot::get_instance`]
pub fn get_instance(store: Arc<dyn RemoteStore>) -> Arc<MovieProvider> {
    global_slot().get_instance(store)
}

/// Process-wide [`ProviderSlot::set_instance_for_testing`]
pub fn set_instance_for_testing(store: Arc<dyn RemoteStore>) -> Arc<MovieProvider> {
    global_slot().set_instance_for_testing(store)
}
