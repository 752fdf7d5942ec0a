use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::Reusable;

pub(super) trait PoolCommander<T> : Send + Sync {
    fn restoration(&self, item : T);
    fn dispose(&self, item : T);
}

/// Borrowed resource that goes back to its pool exactly once, when dropped.
///
/// Moving the guard moves the borrow. [`transfer`](Self::transfer) does the
/// same through a `&mut` and leaves this guard empty; dropping an empty guard
/// does nothing.
pub struct ScopedBorrow<T> where T : Reusable {
    value : Option<T>,
    command : Arc<dyn PoolCommander<T>>,
}

impl<T> ScopedBorrow<T> where T : Reusable {
    pub(super) fn new(value : T, command : Arc<dyn PoolCommander<T>>) -> Self {
        ScopedBorrow {
            value : Some(value),
            command
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut()
    }

    pub fn is_released(&self) -> bool {
        self.value.is_none()
    }

    pub fn transfer(&mut self) -> ScopedBorrow<T> {
        ScopedBorrow {
            value : self.value.take(),
            command : self.command.clone()
        }
    }

    /// Returns the resource to the pool now instead of at drop.
    pub fn restoration(&mut self) {
        if let Some(item) = self.value.take() {
            self.command.restoration(item);
        }
    }

    /// Destroys the resource instead of returning it, e.g. after a broken connection.
    pub fn dispose(&mut self) {
        if let Some(item) = self.value.take() {
            self.command.dispose(item);
        }
    }
}

impl<T> Deref for ScopedBorrow<T> where T : Reusable {
    type Target = T;

    /// # Panics
    /// If the guard was already released, disposed or transferred.
    fn deref(&self) -> &T {
        match self.value.as_ref() {
            Some(v) => v,
            None => panic!("scoped borrow used after release")
        }
    }
}

impl<T> DerefMut for ScopedBorrow<T> where T : Reusable {
    fn deref_mut(&mut self) -> &mut T {
        match self.value.as_mut() {
            Some(v) => v,
            None => panic!("scoped borrow used after release")
        }
    }
}

impl<T> fmt::Debug for ScopedBorrow<T> where T : Reusable {
    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedBorrow")
            .field("key", &self.value.as_ref().map(|v| v.key()))
            .finish()
    }
}

impl<T> Drop for ScopedBorrow<T> where T : Reusable {
    fn drop(&mut self) {
        self.restoration();
    }
}
