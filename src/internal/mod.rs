//! Internal Implementation Details
//!
//! This module contains implementation details that are not part of the public API.
//! Types in this module may change without notice between minor versions.
//!
//! # Contents
//!
//! - [`register`]: Register access trait and channel/transfer controller views
//! - [`constants`]: Hardware maxima, sentinels and retry budgets
//! - [`bitset`]: Fixed-width resource bitmaps
//!
//! # Stability
//!
//! **WARNING:** This module is `pub(crate)` only. Do not depend on any types
//! or functions in this module from external code. They are subject to change
//! without notice.

pub(crate) mod bitset;
pub(crate) mod constants;
pub(crate) mod register;
