//! Synchronization Support
//!
//! [`CriticalSectionCell`] is the only primitive the resource manager needs.
//! It stands in for the instance semaphore and for the interrupt-mask
//! protect domains at once: every bitmap flip, bound-table update and
//! interrupt-table update runs inside a `critical_section::with` block, which
//! is safe to enter from both thread and interrupt context.
//!
//! # Example
//!
//! ```ignore
//! use edma3_rm::sync::CriticalSectionCell;
//!
//! static COUNTER: CriticalSectionCell<u32> = CriticalSectionCell::new(0);
//!
//! #[interrupt]
//! fn EDMA_COMPLETION() {
//!     COUNTER.with(|count| *count += 1);
//! }
//! ```

mod primitives;

pub use primitives::CriticalSectionCell;
