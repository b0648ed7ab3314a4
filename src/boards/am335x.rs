//! AM335x EDMA3 configuration (one channel controller, three transfer controllers).
//!
//! This module provides the SoC description and the region 0 resource split
//! used on AM335x parts, so bring-up code does not have to spell out every
//! bitmap by hand.

use crate::driver::config::{GlobalConfig, InstanceConfig};
use crate::internal::constants::{NO_TCC_MAP, PARAM_WORDS};

/// AM335x EDMA3 configuration constants and helpers.
pub struct Am335x;

impl Am335x {
    // =========================================================================
    // Resource Counts
    // =========================================================================

    /// DMA channels on the channel controller.
    pub const NUM_DMA_CHANNELS: u32 = 64;

    /// QDMA channels on the channel controller.
    pub const NUM_QDMA_CHANNELS: u32 = 8;

    /// Transfer completion codes.
    pub const NUM_TCCS: u32 = 64;

    /// PaRAM sets.
    pub const NUM_PARAM_SETS: u32 = 256;

    /// Event queues (one per transfer controller).
    pub const NUM_EVENT_QUEUES: u32 = 3;

    /// Shadow regions.
    pub const NUM_REGIONS: u32 = 8;

    // =========================================================================
    // Memory Map
    // =========================================================================

    /// Channel controller (TPCC) base address.
    pub const CC_BASE: usize = 0x4900_0000;

    /// Transfer controller (TPTC0..2) base addresses.
    pub const TC_BASES: [usize; 3] = [0x4980_0000, 0x4990_0000, 0x49A0_0000];

    // =========================================================================
    // Event Queues
    // =========================================================================

    /// Default watermark for every event queue.
    pub const QUEUE_WATERMARK: u32 = 16;

    // =========================================================================
    // Channel Maps
    // =========================================================================

    /// DMA channels tied to a peripheral event.
    pub const HW_EVENT_MAP: [u32; 2] = [0xFFCF_CFFF, 0xFF3F_FFC0];

    /// DMA channels left out of the identity TCC map.
    pub const UNMAPPED_TCC_CHANNELS: [usize; 16] =
        [4, 5, 6, 7, 12, 13, 20, 21, 32, 33, 34, 35, 36, 37, 54, 55];

    // =========================================================================
    // Region 0 Resource Split
    // =========================================================================

    /// DMA channels and TCCs owned by region 0.
    pub const REGION0_DMA_CHANNELS: [u32; 2] = [0x0030_3000, 0x00C0_003F];

    /// QDMA channels owned by region 0.
    pub const REGION0_QDMA_CHANNELS: [u32; 1] = [0xFF];

    /// DMA channels and TCCs region 0 keeps for peripheral drivers.
    pub const REGION0_RESERVED_DMA_CHANNELS: [u32; 2] = Self::HW_EVENT_MAP;

    /// Global configuration of the AM335x channel controller.
    ///
    /// DCHMAP registers exist, so no channel has a default PaRAM set.
    #[must_use]
    pub const fn global_config() -> GlobalConfig {
        let mut config = GlobalConfig::new()
            .with_counts(
                Self::NUM_DMA_CHANNELS,
                Self::NUM_QDMA_CHANNELS,
                Self::NUM_TCCS,
                Self::NUM_PARAM_SETS,
            )
            .with_event_queues(Self::NUM_EVENT_QUEUES)
            .with_regions(Self::NUM_REGIONS)
            .with_channel_mapping(true)
            .with_memory_protection(true)
            .with_cc_base(Self::CC_BASE)
            .with_tc(Self::TC_BASES[0])
            .with_tc(Self::TC_BASES[1])
            .with_tc(Self::TC_BASES[2])
            .with_queue(0, 0, Self::QUEUE_WATERMARK)
            .with_queue(1, 1, Self::QUEUE_WATERMARK)
            .with_queue(2, 2, Self::QUEUE_WATERMARK)
            .with_hw_event_map(Self::HW_EVENT_MAP)
            .with_identity_tcc_map();

        let mut i = 0;
        while i < Self::UNMAPPED_TCC_CHANNELS.len() {
            config = config.with_tcc_map(Self::UNMAPPED_TCC_CHANNELS[i], NO_TCC_MAP);
            i += 1;
        }
        config
    }

    /// Resources of the host (region 0).
    ///
    /// PaRAM sets 64..255 are owned; sets 0..63 stay reserved for the DMA
    /// channels they default to.
    #[must_use]
    pub const fn region0_config() -> InstanceConfig {
        let mut owned_params = [0u32; PARAM_WORDS];
        let mut reserved_params = [0u32; PARAM_WORDS];
        let mut word = 0;
        while word < 8 {
            if word < 2 {
                reserved_params[word] = u32::MAX;
            } else {
                owned_params[word] = u32::MAX;
            }
            word += 1;
        }

        InstanceConfig::new()
            .with_owned_param_sets(owned_params)
            .with_owned_dma_channels(Self::REGION0_DMA_CHANNELS)
            .with_owned_qdma_channels(Self::REGION0_QDMA_CHANNELS)
            .with_owned_tccs(Self::REGION0_DMA_CHANNELS)
            .with_reserved_param_sets(reserved_params)
            .with_reserved_dma_channels(Self::REGION0_RESERVED_DMA_CHANNELS)
            .with_reserved_tccs(Self::REGION0_RESERVED_DMA_CHANNELS)
    }

    /// Board description string.
    pub const fn description() -> &'static str {
        "AM335x EDMA3 (TPCC + 3 TPTC)"
    }
}
