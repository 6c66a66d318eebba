//! Type-erased decoded record

use std::any::Any;
use std::sync::Arc;

/// Decoded value of a topic, shared read-only by every holder of the snapshot
#[derive(Clone)]
pub struct Record(Arc<dyn Any + Send + Sync>);

impl Record {
    /// Wrap a decoded value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the value as `T`
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether the value is a `T`
    pub fn is<T: 'static>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Record(..)")
    }
}
