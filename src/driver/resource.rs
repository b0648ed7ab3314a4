//! Resource descriptors and small request types.

use crate::internal::constants::ANY;

/// The four kinds of EDMA3 resource an instance can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResourceKind {
    /// Event-triggered DMA channel
    Dma,
    /// Auto-triggered QDMA channel
    Qdma,
    /// Transfer completion code
    Tcc,
    /// PaRAM descriptor set
    Param,
}

/// A (kind, id) resource descriptor.
///
/// The id is either a concrete index or [`Resource::ANY`], meaning "the
/// lowest free one".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resource {
    /// DMA channel
    Dma(u32),
    /// QDMA channel
    Qdma(u32),
    /// Transfer completion code
    Tcc(u32),
    /// PaRAM set (also names a link channel)
    Param(u32),
}

impl Resource {
    /// Sentinel id requesting any free resource of the kind
    pub const ANY: u32 = ANY;

    /// Descriptor for any free resource of `kind`
    #[must_use]
    pub const fn any(kind: ResourceKind) -> Self {
        Self::new(kind, ANY)
    }

    /// Descriptor from a kind and an id
    #[must_use]
    pub const fn new(kind: ResourceKind, id: u32) -> Self {
        match kind {
            ResourceKind::Dma => Resource::Dma(id),
            ResourceKind::Qdma => Resource::Qdma(id),
            ResourceKind::Tcc => Resource::Tcc(id),
            ResourceKind::Param => Resource::Param(id),
        }
    }

    /// Kind of the resource
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Resource::Dma(_) => ResourceKind::Dma,
            Resource::Qdma(_) => ResourceKind::Qdma,
            Resource::Tcc(_) => ResourceKind::Tcc,
            Resource::Param(_) => ResourceKind::Param,
        }
    }

    /// Id of the resource (may be [`Resource::ANY`])
    #[must_use]
    pub const fn id(&self) -> u32 {
        match *self {
            Resource::Dma(id) | Resource::Qdma(id) | Resource::Tcc(id) | Resource::Param(id) => id,
        }
    }

    /// Whether the id is the "any" sentinel
    #[must_use]
    pub const fn is_any(&self) -> bool {
        self.id() == ANY
    }

    /// Same kind, different id
    #[must_use]
    pub const fn with_id(self, id: u32) -> Self {
        Self::new(self.kind(), id)
    }
}

/// Result of a logical channel allocation.
///
/// `param` and `tcc` are the resolved ids actually bound to the channel.
/// Link channels carry no TCC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogicalChannel {
    /// The allocated channel (`Dma`, `Qdma`, or `Param` for a link channel)
    pub channel: Resource,
    /// Bound PaRAM set
    pub param: u32,
    /// Bound TCC
    pub tcc: Option<u32>,
}

/// PaRAM word written to trigger a QDMA channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TriggerWord {
    /// Options word
    Opt = 0,
    /// Source address
    Src = 1,
    /// A and B counts
    ABCnt = 2,
    /// Destination address
    Dst = 3,
    /// Source and destination B index
    SrcDstBidx = 4,
    /// Link and B count reload
    LinkBcntrld = 5,
    /// Source and destination C index
    SrcDstCidx = 6,
    /// C count (default)
    #[default]
    Ccnt = 7,
}

impl TriggerWord {
    /// Trigger word from its index in the PaRAM set
    #[must_use]
    pub const fn from_index(index: u32) -> Option<Self> {
        Some(match index {
            0 => TriggerWord::Opt,
            1 => TriggerWord::Src,
            2 => TriggerWord::ABCnt,
            3 => TriggerWord::Dst,
            4 => TriggerWord::SrcDstBidx,
            5 => TriggerWord::LinkBcntrld,
            6 => TriggerWord::SrcDstCidx,
            7 => TriggerWord::Ccnt,
            _ => return None,
        })
    }

    /// Index of the word in the PaRAM set
    #[must_use]
    pub const fn index(self) -> u32 {
        self as u32
    }
}

/// Register block selector for [`Instance::base_address`](crate::Instance::base_address).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterBlock {
    /// The channel controller
    ChannelController,
    /// Transfer controller `n`
    TransferController(u32),
}

/// Instance behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ioctl {
    /// Zero PaRAM sets on allocation
    SetParamClear(bool),
    /// Query the PaRAM clear option
    GetParamClear,
    /// Program global registers (DRAE, QRAE, PaRAM) on allocation
    SetGlobalRegModify(bool),
    /// Query the global register option
    GetGlobalRegModify,
}
