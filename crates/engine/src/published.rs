//! Shared copy of the standard descriptor chosen at boot.
//!
//! Readers take a copy under the lock and never hold a reference.

use std::sync::Arc;

use homewrecker_core::FruDescriptor;
use parking_lot::Mutex;

#[derive(Debug, Clone, Default)]
pub struct PublishedDescriptor {
    inner: Arc<Mutex<Option<FruDescriptor>>>,
}

impl PublishedDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, descriptor: FruDescriptor) {
        *self.inner.lock() = Some(descriptor);
    }

    pub fn get(&self) -> Option<FruDescriptor> {
        self.inner.lock().clone()
    }

    pub fn is_published(&self) -> bool {
        self.inner.lock().is_some()
    }

    pub fn clear(&self) {
        *self.inner.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homewrecker_core::SerialNumber;

    #[test]
    fn clones_share_the_published_copy() {
        let published = PublishedDescriptor::new();
        let reader = published.clone();
        assert!(!reader.is_published());

        let descriptor = FruDescriptor::new(7, [SerialNumber::new("A"); 4]);
        published.publish(descriptor.clone());
        assert_eq!(reader.get(), Some(descriptor));

        published.clear();
        assert_eq!(reader.get(), None);
    }
}
