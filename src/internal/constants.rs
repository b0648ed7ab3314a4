//! Centralized Constants
//!
//! This module provides a single source of truth for the hardware maxima,
//! sentinels and drain-loop budgets used throughout the resource manager.
//!
//! # Organization
//!
//! Constants are grouped by category:
//! - **Hardware maxima**: upper bounds across every EDMA3 integration
//! - **Bitmap widths**: number of 32-bit words per resource bitmap
//! - **Sentinels**: "any" and "no default mapping" markers
//! - **Interrupt handling**: retry budgets for the drain loops
//!
//! # Note
//!
//! Register offsets and bit fields remain in `internal::register` as they
//! are specific to the channel and transfer controller blocks.

// =============================================================================
// Hardware Maxima
// =============================================================================

/// Maximum number of EDMA3 controllers a registry can manage
pub const MAX_CONTROLLERS: usize = 5;

/// Maximum number of DMA channels on any controller
pub const MAX_DMA_CHANNELS: usize = 64;

/// Maximum number of QDMA channels on any controller
pub const MAX_QDMA_CHANNELS: usize = 8;

/// Maximum number of PaRAM sets on any controller
pub const MAX_PARAM_SETS: usize = 512;

/// Maximum number of transfer completion codes
pub const MAX_TCCS: usize = 64;

/// Maximum number of event queues
pub const MAX_EVENT_QUEUES: usize = 8;

/// Maximum number of transfer controllers
pub const MAX_TCS: usize = 8;

/// Maximum number of shadow regions
pub const MAX_REGIONS: usize = 8;

/// Maximum number of resource manager instances open on one controller
pub const MAX_INSTANCES: usize = 8;

/// Number of logical channel slots (DMA + link + QDMA)
pub const MAX_LOGICAL_CHANNELS: usize = MAX_DMA_CHANNELS + MAX_PARAM_SETS + MAX_QDMA_CHANNELS;

// =============================================================================
// Bitmap Widths
// =============================================================================

/// 32-bit words in a DMA channel bitmap
pub const DMA_WORDS: usize = MAX_DMA_CHANNELS / 32;

/// 32-bit words in a QDMA channel bitmap
pub const QDMA_WORDS: usize = 1;

/// 32-bit words in a PaRAM set bitmap
pub const PARAM_WORDS: usize = MAX_PARAM_SETS / 32;

/// 32-bit words in a TCC bitmap
pub const TCC_WORDS: usize = MAX_TCCS / 32;

// =============================================================================
// PaRAM Layout
// =============================================================================

/// Size of one PaRAM set in bytes
pub const PARAM_SET_SIZE: usize = 32;

/// Number of 32-bit words in one PaRAM set
pub const PARAM_SET_WORDS: usize = PARAM_SET_SIZE / 4;

// =============================================================================
// Sentinels
// =============================================================================

/// Resource id meaning "any free resource of this kind"
pub const ANY: u32 = u32::MAX;

/// Channel-to-PaRAM map entry meaning "no default PaRAM set"
pub const NO_PARAM_MAP: u32 = u32::MAX - 1;

/// Channel-to-TCC map entry meaning "no default TCC"
pub const NO_TCC_MAP: u32 = u32::MAX - 2;

// =============================================================================
// Interrupt Handling
// =============================================================================

/// Passes over the pending-completion registers before giving up
pub const COMPLETION_RETRY_COUNT: u32 = 10;

/// Passes over the CC error registers before giving up
pub const CC_ERROR_RETRY_COUNT: u32 = 10;

/// Default for clearing error bits of channels nobody has mapped a TCC to
pub const CLEAR_UNOWNED_ERRORS: bool = true;

/// Microseconds between polls in the timed TCC wait
pub const TCC_POLL_INTERVAL_US: u32 = 10;

// =============================================================================
// Unit Tests
// =============================================================================
