//! Callback lists for engine events.
//!
//! Engine components only collect listeners; emission happens after the
//! engine releases its render lock, so a callback may call back into the
//! engine without deadlocking.

use std::fmt;
use std::sync::Arc;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// An ordered list of callbacks receiving `&T`.
pub struct Listeners<T: ?Sized> {
    callbacks: Vec<Callback<T>>,
}

impl<T: ?Sized> Listeners<T> {
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    pub fn add(&mut self, callback: impl Fn(&T) + Send + Sync + 'static) {
        self.callbacks.push(Arc::new(callback));
    }

    pub fn emit(&self, value: &T) {
        for cb in &self.callbacks {
            cb(value);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<T: ?Sized> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<T: ?Sized> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listeners({})", self.callbacks.len())
    }
}
