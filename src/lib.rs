//! EDMA3 Resource Manager
//!
//! A `no_std`, `no_alloc` resource manager for the TI EDMA3 multi-region DMA
//! controller.
//!
//! The EDMA3 channel controller exposes DMA channels, QDMA channels, PaRAM
//! sets and transfer completion codes (TCCs) that several software entities
//! (cores, OS partitions, drivers) share. Each entity works through a shadow
//! region. This crate tracks who owns what, hands out resources, composes
//! logical channels and dispatches completion and error interrupts to the
//! owners.
//!
//! # Architecture
//!
//! The crate is organized into three layers:
//!
//! 1. **Controller Layer** ([`driver::controller`]): Registry, lifecycle and
//!    global register initialisation
//! 2. **Instance Layer** ([`driver::instance`], [`driver::channel`]): Per-region
//!    allocator, logical channel composition, PaRAM access
//! 3. **Interrupt Layer** ([`driver::interrupt`]): Completion, CC error and TC
//!    error handlers
//!
//! All hardware access goes through [`unsafe_registers::RegisterAccess`] so the
//! whole manager runs against a mock register file in tests.
//!
//! # Features
//!
//! - `am335x` (default): AM335x preset in [`boards`]
//! - `defmt`: Enable defmt formatting and logging
//!
//! # Example
//!
//! ```ignore
//! use edma3_rm::boards::am335x::Am335x;
//! use edma3_rm::unsafe_registers::Mmio;
//! use edma3_rm::{ControllerRegistry, OpenParams, Resource};
//!
//! let mut registry: ControllerRegistry<Mmio> = ControllerRegistry::new();
//! let regs = unsafe { Mmio::new() };
//! let controller = registry.create(0, Am335x::global_config(), regs, false)?;
//!
//! let host = controller.open(
//!     OpenParams::new(0, Am335x::region0_config()).with_master(true),
//! )?;
//!
//! let any = Resource::ANY;
//! let lch = host.alloc_logical_channel(Resource::Dma(any), any, any)?;
//! let tcc = lch.tcc.unwrap_or(Resource::ANY);
//! host.register_tcc_callback(lch.channel, tcc, on_done, 0)?;
//!
//! // From the completion interrupt
//! controller.handle_completion();
//! ```
//!
//! # Memory Requirements
//!
//! Every table is statically sized by the hardware maxima in [`constants`];
//! nothing is heap allocated.

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here; the same groups are mirrored in Cargo.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements
)]

// =============================================================================
// Modules
// =============================================================================

#[cfg(feature = "am335x")]
#[cfg_attr(docsrs, doc(cfg(feature = "am335x")))]
pub mod boards;
pub mod driver;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::callback::{GlobalError, GlobalErrorCallback, TccCallback, TccStatus};
pub use driver::config::{GlobalConfig, InstanceConfig, OpenParams};
pub use driver::controller::{Controller, ControllerRegistry, ControllerState};
pub use driver::error::{
    Error, RequestError, RequestResult, ResourceError, ResourceResult, Result, StateError,
    StateResult,
};
pub use driver::instance::{Instance, InstanceHandle};
pub use driver::param::ParamSet;
pub use driver::resource::{
    Ioctl, LogicalChannel, RegisterBlock, Resource, ResourceKind, TriggerWord,
};

/// Low-level register accessors for advanced use.
///
/// These are intentionally separated from the primary facade. Most users should
/// prefer the resource manager APIs instead of touching registers directly.
///
/// # Safety
///
/// Direct register access bypasses the ownership bookkeeping. Use only if you
/// fully understand the EDMA3 hardware and accept responsibility for correct
/// sequencing and synchronization with other regions.
pub mod unsafe_registers {
    pub use crate::internal::register::cc::{CcRegs, ShadowRegs};
    pub use crate::internal::register::tc::TcRegs;
    pub use crate::internal::register::{Mmio, RegisterAccess};
}

/// Shared resource manager constants.
///
/// These are grouped into a dedicated module to keep the top-level facade
/// focused on manager types.
pub mod constants {
    pub use crate::internal::constants::{
        // Sentinels
        ANY,
        // Interrupt handling
        CC_ERROR_RETRY_COUNT,
        CLEAR_UNOWNED_ERRORS,
        COMPLETION_RETRY_COUNT,
        // Hardware maxima
        MAX_CONTROLLERS,
        MAX_DMA_CHANNELS,
        MAX_EVENT_QUEUES,
        MAX_INSTANCES,
        MAX_LOGICAL_CHANNELS,
        MAX_PARAM_SETS,
        MAX_QDMA_CHANNELS,
        MAX_REGIONS,
        MAX_TCCS,
        MAX_TCS,
        NO_PARAM_MAP,
        NO_TCC_MAP,
        // PaRAM layout
        PARAM_SET_SIZE,
        PARAM_SET_WORDS,
        TCC_POLL_INTERVAL_US,
    };
    pub use crate::driver::config::{MAX_QUEUE_PRIORITY, MAX_QUEUE_WATERMARK};
}
