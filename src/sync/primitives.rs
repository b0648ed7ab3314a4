//! The interior-mutability cell behind every piece of shared controller state.
//!
//! A controller keeps its lifecycle, each instance slot, the bound-resources
//! table and the interrupt tables in separate cells. Thread-context calls and
//! the interrupt handlers both go through [`CriticalSectionCell::with`].

use core::cell::RefCell;
use critical_section::Mutex;

/// `RefCell` guarded by a `critical_section::Mutex`.
///
/// A borrow lasts exactly as long as the closure. Closures must not call
/// back into the same cell, so TCC and global error callbacks are looked up
/// inside a borrow and invoked after it ends.
pub struct CriticalSectionCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Wrap `value`; usable in `const` array initialisers for instance slots.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` on the guarded value inside a critical section.
    ///
    /// Panics if the cell is already borrowed by an enclosing `with`.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            let mut value = self.inner.borrow_ref_mut(cs);
            f(&mut value)
        })
    }

    /// Like [`with`](Self::with), but yields `None` instead of panicking
    /// when the value is already borrowed (used by `Debug`).
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow_mut()
                .ok()
                .map(|mut value| f(&mut value))
        })
    }

    /// Take the value back out of the cell.
    pub fn into_inner(self) -> T {
        self.inner.into_inner().into_inner()
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for CriticalSectionCell<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.try_with(|value| f.debug_tuple("CriticalSectionCell").field(value).finish()) {
            Some(result) => result,
            None => f.write_str("CriticalSectionCell(<borrowed>)"),
        }
    }
}

// SAFETY: CriticalSectionCell uses critical sections to protect all access,
// and values only move between contexts when T is Send.
unsafe impl<T: Send> Sync for CriticalSectionCell<T> {}
