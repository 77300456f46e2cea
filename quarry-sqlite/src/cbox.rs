use std::ops::{Deref, DerefMut};

/// Owner of a C handle, released by `drop` when it goes out of scope.
///
/// A no-op `drop` makes a borrowed copy of a handle owned elsewhere.
pub(crate) struct CBox<T: Copy> {
    value: T,
    drop: fn(T),
}

impl<T: Copy> CBox<T> {
    pub(crate) fn new(value: T, drop: fn(T)) -> Self {
        Self { value, drop }
    }
}

impl<T: Copy> Deref for CBox<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T: Copy> DerefMut for CBox<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

impl<T: Copy> Drop for CBox<T> {
    fn drop(&mut self) {
        (self.drop)(self.value);
    }
}

// Sqlite handles are opened in serialized mode, they can be moved across threads
unsafe impl<T: Copy> Send for CBox<T> {}
