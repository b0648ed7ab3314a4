//! Configuration types for the EDMA3 resource manager
//!
//! [`GlobalConfig`] describes one physical controller (counts, register
//! bases, default channel maps). [`InstanceConfig`] describes what one
//! region owns and reserves. [`OpenParams`] bundles everything an opener
//! supplies.

use crate::driver::callback::GlobalErrorCallback;
use crate::driver::error::{RequestError, RequestResult};
use crate::internal::constants::{
    CLEAR_UNOWNED_ERRORS, DMA_WORDS, MAX_DMA_CHANNELS, MAX_EVENT_QUEUES, MAX_PARAM_SETS,
    MAX_QDMA_CHANNELS, MAX_REGIONS, MAX_TCCS, MAX_TCS, NO_PARAM_MAP, NO_TCC_MAP, PARAM_WORDS,
    QDMA_WORDS, TCC_WORDS,
};

/// Largest event queue priority value
pub const MAX_QUEUE_PRIORITY: u32 = 7;

/// Largest event queue watermark value
pub const MAX_QUEUE_WATERMARK: u32 = 0x1F;

// =============================================================================
// Global Configuration
// =============================================================================

/// Static description of one EDMA3 controller.
///
/// Usually taken from a platform table such as
/// [`Am335x`](crate::boards::am335x::Am335x).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GlobalConfig {
    /// Number of DMA channels
    pub num_dma_channels: u32,
    /// Number of QDMA channels
    pub num_qdma_channels: u32,
    /// Number of transfer completion codes
    pub num_tccs: u32,
    /// Number of PaRAM sets
    pub num_param_sets: u32,
    /// Number of event queues
    pub num_event_queues: u32,
    /// Number of transfer controllers
    pub num_tcs: u32,
    /// Number of shadow regions
    pub num_regions: u32,
    /// Whether DCHMAP (channel to PaRAM mapping) registers exist
    pub channel_mapping_exists: bool,
    /// Whether memory protection registers exist
    pub memory_protection_exists: bool,
    /// Channel controller base address
    pub cc_base: usize,
    /// Transfer controller base addresses (zero when absent)
    pub tc_bases: [usize; MAX_TCS],
    /// Priority of each event queue (0 highest)
    pub queue_priority: [u32; MAX_EVENT_QUEUES],
    /// Watermark threshold of each event queue
    pub queue_watermark: [u32; MAX_EVENT_QUEUES],
    /// Default PaRAM set per DMA channel, or `NO_PARAM_MAP`
    pub dma_channel_param_map: [u32; MAX_DMA_CHANNELS],
    /// Default TCC per DMA channel, or `NO_TCC_MAP`
    pub dma_channel_tcc_map: [u32; MAX_DMA_CHANNELS],
    /// DMA channels tied to a hardware event
    pub dma_hw_event_map: [u32; DMA_WORDS],
    /// Clear error bits of channels nobody mapped a TCC to
    pub clear_unowned_errors: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalConfig {
    /// Create an empty configuration (no resources, no maps)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            num_dma_channels: 0,
            num_qdma_channels: 0,
            num_tccs: 0,
            num_param_sets: 0,
            num_event_queues: 0,
            num_tcs: 0,
            num_regions: 1,
            channel_mapping_exists: false,
            memory_protection_exists: false,
            cc_base: 0,
            tc_bases: [0; MAX_TCS],
            queue_priority: [0; MAX_EVENT_QUEUES],
            queue_watermark: [0; MAX_EVENT_QUEUES],
            dma_channel_param_map: [NO_PARAM_MAP; MAX_DMA_CHANNELS],
            dma_channel_tcc_map: [NO_TCC_MAP; MAX_DMA_CHANNELS],
            dma_hw_event_map: [0; DMA_WORDS],
            clear_unowned_errors: CLEAR_UNOWNED_ERRORS,
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set the resource counts
    #[must_use]
    pub const fn with_counts(mut self, dma: u32, qdma: u32, tccs: u32, param_sets: u32) -> Self {
        self.num_dma_channels = dma;
        self.num_qdma_channels = qdma;
        self.num_tccs = tccs;
        self.num_param_sets = param_sets;
        self
    }

    /// Set the number of event queues
    #[must_use]
    pub const fn with_event_queues(mut self, count: u32) -> Self {
        self.num_event_queues = count;
        self
    }

    /// Set the number of shadow regions
    #[must_use]
    pub const fn with_regions(mut self, count: u32) -> Self {
        self.num_regions = count;
        self
    }

    /// Declare whether DCHMAP registers exist
    #[must_use]
    pub const fn with_channel_mapping(mut self, exists: bool) -> Self {
        self.channel_mapping_exists = exists;
        self
    }

    /// Declare whether memory protection registers exist
    #[must_use]
    pub const fn with_memory_protection(mut self, exists: bool) -> Self {
        self.memory_protection_exists = exists;
        self
    }

    /// Set the channel controller base address
    #[must_use]
    pub const fn with_cc_base(mut self, base: usize) -> Self {
        self.cc_base = base;
        self
    }

    /// Add a transfer controller at `base`
    ///
    /// Transfer controllers are numbered in the order they are added.
    #[must_use]
    pub const fn with_tc(mut self, base: usize) -> Self {
        if (self.num_tcs as usize) < MAX_TCS {
            self.tc_bases[self.num_tcs as usize] = base;
            self.num_tcs += 1;
        }
        self
    }

    /// Set the priority and watermark of event queue `queue`
    #[must_use]
    pub const fn with_queue(mut self, queue: usize, priority: u32, watermark: u32) -> Self {
        if queue < MAX_EVENT_QUEUES {
            self.queue_priority[queue] = priority;
            self.queue_watermark[queue] = watermark;
        }
        self
    }

    /// Set the default PaRAM set of DMA channel `channel`
    #[must_use]
    pub const fn with_param_map(mut self, channel: usize, param: u32) -> Self {
        if channel < MAX_DMA_CHANNELS {
            self.dma_channel_param_map[channel] = param;
        }
        self
    }

    /// Set the default TCC of DMA channel `channel`
    #[must_use]
    pub const fn with_tcc_map(mut self, channel: usize, tcc: u32) -> Self {
        if channel < MAX_DMA_CHANNELS {
            self.dma_channel_tcc_map[channel] = tcc;
        }
        self
    }

    /// Map every DMA channel `n` below the channel count to TCC `n`
    #[must_use]
    pub const fn with_identity_tcc_map(mut self) -> Self {
        let mut channel = 0;
        while channel < self.num_dma_channels as usize && channel < MAX_DMA_CHANNELS {
            self.dma_channel_tcc_map[channel] = channel as u32;
            channel += 1;
        }
        self
    }

    /// Set the hardware event map
    #[must_use]
    pub const fn with_hw_event_map(mut self, map: [u32; DMA_WORDS]) -> Self {
        self.dma_hw_event_map = map;
        self
    }

    /// Enable or disable clearing of unowned channel errors
    #[must_use]
    pub const fn with_clear_unowned_errors(mut self, enabled: bool) -> Self {
        self.clear_unowned_errors = enabled;
        self
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check counts against hardware maxima and maps against counts.
    pub fn validate(&self) -> RequestResult<()> {
        let counts_ok = self.num_dma_channels as usize <= MAX_DMA_CHANNELS
            && self.num_qdma_channels as usize <= MAX_QDMA_CHANNELS
            && self.num_tccs as usize <= MAX_TCCS
            && self.num_param_sets as usize <= MAX_PARAM_SETS
            && self.num_event_queues as usize <= MAX_EVENT_QUEUES
            && self.num_tcs as usize <= MAX_TCS
            && self.num_regions >= 1
            && self.num_regions as usize <= MAX_REGIONS
            && self.num_dma_channels <= self.num_param_sets;
        if !counts_ok || self.cc_base == 0 {
            return Err(RequestError::InvalidParameter);
        }

        let queues = self.num_event_queues as usize;
        let queues_ok = self.queue_priority[..queues]
            .iter()
            .all(|p| *p <= MAX_QUEUE_PRIORITY)
            && self.queue_watermark[..queues]
                .iter()
                .all(|w| *w <= MAX_QUEUE_WATERMARK);

        let channels = self.num_dma_channels as usize;
        let maps_ok = self.dma_channel_param_map[..channels]
            .iter()
            .all(|p| *p == NO_PARAM_MAP || *p < self.num_param_sets)
            && self.dma_channel_tcc_map[..channels]
                .iter()
                .all(|t| *t == NO_TCC_MAP || *t < self.num_tccs);

        if queues_ok && maps_ok {
            Ok(())
        } else {
            Err(RequestError::InvalidParameter)
        }
    }
}

// =============================================================================
// Instance Configuration
// =============================================================================

/// Owned and reserved resources of one region.
///
/// Each array is a bitmap: bit `n` of word `n / 32` stands for id `n`.
/// Reserved resources are owned but never handed out for "any" requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InstanceConfig {
    /// Owned PaRAM sets
    pub own_param_sets: [u32; PARAM_WORDS],
    /// Owned DMA channels
    pub own_dma_channels: [u32; DMA_WORDS],
    /// Owned QDMA channels
    pub own_qdma_channels: [u32; QDMA_WORDS],
    /// Owned TCCs
    pub own_tccs: [u32; TCC_WORDS],
    /// Reserved PaRAM sets
    pub resvd_param_sets: [u32; PARAM_WORDS],
    /// Reserved DMA channels
    pub resvd_dma_channels: [u32; DMA_WORDS],
    /// Reserved QDMA channels
    pub resvd_qdma_channels: [u32; QDMA_WORDS],
    /// Reserved TCCs
    pub resvd_tccs: [u32; TCC_WORDS],
}

impl InstanceConfig {
    /// Create a configuration owning nothing
    #[must_use]
    pub const fn new() -> Self {
        Self {
            own_param_sets: [0; PARAM_WORDS],
            own_dma_channels: [0; DMA_WORDS],
            own_qdma_channels: [0; QDMA_WORDS],
            own_tccs: [0; TCC_WORDS],
            resvd_param_sets: [0; PARAM_WORDS],
            resvd_dma_channels: [0; DMA_WORDS],
            resvd_qdma_channels: [0; QDMA_WORDS],
            resvd_tccs: [0; TCC_WORDS],
        }
    }

    /// Create a configuration owning every resource `global` describes
    #[must_use]
    pub const fn owning_all(global: &GlobalConfig) -> Self {
        Self {
            own_param_sets: first_n(global.num_param_sets),
            own_dma_channels: first_n(global.num_dma_channels),
            own_qdma_channels: first_n(global.num_qdma_channels),
            own_tccs: first_n(global.num_tccs),
            ..Self::new()
        }
    }

    /// Set the owned PaRAM sets
    #[must_use]
    pub const fn with_owned_param_sets(mut self, words: [u32; PARAM_WORDS]) -> Self {
        self.own_param_sets = words;
        self
    }

    /// Set the owned DMA channels
    #[must_use]
    pub const fn with_owned_dma_channels(mut self, words: [u32; DMA_WORDS]) -> Self {
        self.own_dma_channels = words;
        self
    }

    /// Set the owned QDMA channels
    #[must_use]
    pub const fn with_owned_qdma_channels(mut self, words: [u32; QDMA_WORDS]) -> Self {
        self.own_qdma_channels = words;
        self
    }

    /// Set the owned TCCs
    #[must_use]
    pub const fn with_owned_tccs(mut self, words: [u32; TCC_WORDS]) -> Self {
        self.own_tccs = words;
        self
    }

    /// Set the reserved PaRAM sets
    #[must_use]
    pub const fn with_reserved_param_sets(mut self, words: [u32; PARAM_WORDS]) -> Self {
        self.resvd_param_sets = words;
        self
    }

    /// Set the reserved DMA channels
    #[must_use]
    pub const fn with_reserved_dma_channels(mut self, words: [u32; DMA_WORDS]) -> Self {
        self.resvd_dma_channels = words;
        self
    }

    /// Set the reserved QDMA channels
    #[must_use]
    pub const fn with_reserved_qdma_channels(mut self, words: [u32; QDMA_WORDS]) -> Self {
        self.resvd_qdma_channels = words;
        self
    }

    /// Set the reserved TCCs
    #[must_use]
    pub const fn with_reserved_tccs(mut self, words: [u32; TCC_WORDS]) -> Self {
        self.resvd_tccs = words;
        self
    }
}

/// Bitmap words with bits `0..count` set
const fn first_n<const W: usize>(count: u32) -> [u32; W] {
    let mut words = [0; W];
    let mut index = 0;
    while index < W {
        let base = index as u32 * 32;
        words[index] = if count >= base + 32 {
            u32::MAX
        } else if count > base {
            (1u32 << (count - base)) - 1
        } else {
            0
        };
        index += 1;
    }
    words
}

// =============================================================================
// Open Parameters
// =============================================================================

/// Everything an opener supplies to [`Controller::open`](crate::Controller::open).
#[derive(Debug, Clone, Copy)]
pub struct OpenParams {
    /// Shadow region the instance works in
    pub region: u32,
    /// Request mastership (global register programming and interrupt service)
    pub is_master: bool,
    /// Owned and reserved resources
    pub config: InstanceConfig,
    /// Clear the shadow region's enable/pending state on open
    pub init_region: bool,
    /// Callback for controller-wide errors
    pub global_error_callback: Option<GlobalErrorCallback>,
    /// Opaque value handed to the global error callback
    pub global_error_data: usize,
}

impl OpenParams {
    /// Open parameters for a non-master instance in `region`
    #[must_use]
    pub const fn new(region: u32, config: InstanceConfig) -> Self {
        Self {
            region,
            is_master: false,
            config,
            init_region: true,
            global_error_callback: None,
            global_error_data: 0,
        }
    }

    /// Request or decline mastership
    #[must_use]
    pub const fn with_master(mut self, is_master: bool) -> Self {
        self.is_master = is_master;
        self
    }

    /// Enable or skip shadow region initialisation
    #[must_use]
    pub const fn with_region_init(mut self, init: bool) -> Self {
        self.init_region = init;
        self
    }

    /// Register a global error callback
    #[must_use]
    pub const fn with_global_error_callback(
        mut self,
        callback: GlobalErrorCallback,
        data: usize,
    ) -> Self {
        self.global_error_callback = Some(callback);
        self.global_error_data = data;
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
