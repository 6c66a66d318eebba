//! Consumer handlers
//!
//! A handler is called with a live handle on the new snapshot of its topic.
//! The handle is valid for the duration of the call; a handler that needs the
//! value afterwards clones the handle, which keeps the snapshot alive.

use std::marker::PhantomData;

use crate::error::HandlerError;
use crate::snapshot::SnapshotHandle;

/// Callback invoked by the dispatcher when a subscribed topic changes
pub trait ConfigHandler: Send {
    /// Handle a new snapshot
    fn on_update(&mut self, snapshot: &SnapshotHandle) -> Result<(), HandlerError>;
}

impl<F> ConfigHandler for F
where
    F: FnMut(&SnapshotHandle) -> Result<(), HandlerError> + Send,
{
    fn on_update(&mut self, snapshot: &SnapshotHandle) -> Result<(), HandlerError> {
        self(snapshot)
    }
}

/// Handler over a decoded record type, see [`typed`]
pub struct Typed<T, F> {
    f: F,
    _record: PhantomData<fn(&T)>,
}

/// Adapt a closure over the decoded record `T` into a handler
///
/// A snapshot whose record is missing or of another type is reported as a
/// handler error.
pub fn typed<T, F>(f: F) -> Typed<T, F>
where
    T: 'static,
    F: FnMut(&T) -> Result<(), HandlerError> + Send,
{
    Typed {
        f,
        _record: PhantomData,
    }
}

impl<T, F> ConfigHandler for Typed<T, F>
where
    T: 'static,
    F: FnMut(&T) -> Result<(), HandlerError> + Send,
{
    fn on_update(&mut self, snapshot: &SnapshotHandle) -> Result<(), HandlerError> {
        let record = snapshot.decoded::<T>().ok_or_else(|| {
            format!(
                "{} v{}: record is not a {}",
                snapshot.topic_name(),
                snapshot.version(),
                std::any::type_name::<T>()
            )
        })?;
        (self.f)(record)
    }
}
