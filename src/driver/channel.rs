//! Logical channels.
//!
//! A logical channel bundles a channel, the PaRAM set it transfers from and
//! the TCC its completion is tagged with. Three flavours exist:
//!
//! | Flavour | Resources                  | Bound-table index              |
//! |---------|----------------------------|--------------------------------|
//! | DMA     | DMA channel, PaRAM, TCC    | `ch`                           |
//! | Link    | PaRAM only                 | `num_dma .. num_dma+num_param` |
//! | QDMA    | QDMA channel, PaRAM, TCC   | `num_dma + num_param + ch`     |
//!
//! Composite allocation is all-or-nothing: whatever was allocated before a
//! failing step is freed again before the error is returned.

use core::ops::Range;

use super::error::{RequestError, ResourceError, Result};
use super::instance::Instance;
use super::resource::{LogicalChannel, Resource, TriggerWord};
use crate::internal::constants::{ANY, MAX_LOGICAL_CHANNELS, NO_PARAM_MAP, NO_TCC_MAP};
use crate::internal::register::RegisterAccess;
use crate::internal::register::cc::{
    LINK_MASK, LINK_NULL, OPT_ITCCHEN, OPT_TCCHEN, PARAM_LINK_BCNTRLD, PARAM_OPT,
    chmap_with_param, opt_with_tcc, qchmap_with_trigger,
};

// =============================================================================
// Bound Resources Table
// =============================================================================

/// What a logical channel index is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Binding {
    #[default]
    None,
    /// DMA or QDMA channel with its PaRAM set and TCC
    Channel { param: u16, tcc: u8 },
    /// Link channel (PaRAM only)
    Link { param: u16 },
}

/// Bindings of every logical channel index of a controller.
#[derive(Debug)]
pub(crate) struct BoundTable {
    entries: [Binding; MAX_LOGICAL_CHANNELS],
}

impl BoundTable {
    pub(crate) const fn new() -> Self {
        Self {
            entries: [Binding::None; MAX_LOGICAL_CHANNELS],
        }
    }

    pub(crate) fn reset(&mut self) {
        self.entries.fill(Binding::None);
    }

    pub(crate) fn get(&self, index: usize) -> Binding {
        self.entries.get(index).copied().unwrap_or_default()
    }

    pub(crate) fn set(&mut self, index: usize, binding: Binding) {
        if let Some(entry) = self.entries.get_mut(index) {
            *entry = binding;
        }
    }

    fn first_free(&self, mut range: Range<usize>) -> Option<usize> {
        range.find(|&index| self.get(index) == Binding::None)
    }

    fn find_link(&self, mut range: Range<usize>, param: u32) -> Option<usize> {
        range.find(|&index| {
            matches!(self.get(index), Binding::Link { param: p } if u32::from(p) == param)
        })
    }
}

// =============================================================================
// Logical Channel Operations
// =============================================================================

impl<R: RegisterAccess> Instance<'_, R> {
    fn link_range(&self) -> Range<usize> {
        let config = self.global_config();
        let start = config.num_dma_channels as usize;
        start..start + config.num_param_sets as usize
    }

    fn qdma_index(&self, channel: u32) -> usize {
        let config = self.global_config();
        (config.num_dma_channels + config.num_param_sets + channel) as usize
    }

    /// Allocate a channel together with its PaRAM set and TCC.
    ///
    /// `channel` selects the flavour: `Dma`, `Qdma`, or `Param` for a link
    /// channel (which ignores `param` and `tcc`). Each id may be
    /// [`Resource::ANY`]; for DMA channels "any" PaRAM and TCC fall back to
    /// the platform's channel maps first.
    ///
    /// The PaRAM set is prepared for use: TCC written into OPT and LINK set
    /// to the NULL set. Channel maps and PaRAM are left untouched while the
    /// instance's register programming is off.
    pub fn alloc_logical_channel(
        &self,
        channel: Resource,
        param: u32,
        tcc: u32,
    ) -> Result<LogicalChannel> {
        let allocated = match channel {
            Resource::Dma(_) => self.alloc_dma_channel(channel, param, tcc),
            Resource::Qdma(_) => self.alloc_qdma_channel(channel, param, tcc),
            Resource::Param(id) => self.alloc_link_channel(id),
            Resource::Tcc(_) => Err(RequestError::InvalidParameter.into()),
        }?;

        #[cfg(feature = "defmt")]
        defmt::debug!("logical channel {}", allocated);

        Ok(allocated)
    }

    fn alloc_dma_channel(&self, channel: Resource, param: u32, tcc: u32) -> Result<LogicalChannel> {
        let modify = self.global_reg_modify()?;
        let ch = self.alloc_resource(channel)?.id();
        let (param, tcc) = match self.bind_dma_resources(ch, param, tcc) {
            Ok(bound) => bound,
            Err(err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("DMA channel {} rolled back: {}", ch, err);
                self.release_on_rollback(Resource::Dma(ch));
                return Err(err);
            }
        };

        if modify {
            if self.global_config().channel_mapping_exists {
                self.controller
                    .cc()
                    .set_dchmap(ch, chmap_with_param(0, param));
            }
            self.prepare_param(param, Some(tcc));
        }
        self.controller.bound.with(|table| {
            table.set(
                ch as usize,
                Binding::Channel {
                    param: param as u16,
                    tcc: tcc as u8,
                },
            )
        });

        Ok(LogicalChannel {
            channel: Resource::Dma(ch),
            param,
            tcc: Some(tcc),
        })
    }

    /// Allocate the PaRAM set and TCC of DMA channel `ch`.
    fn bind_dma_resources(&self, ch: u32, param: u32, tcc: u32) -> Result<(u32, u32)> {
        let config = self.global_config();

        let param = if param == ANY {
            match config.dma_channel_param_map[ch as usize] {
                NO_PARAM_MAP => ANY,
                mapped => mapped,
            }
        } else if !config.channel_mapping_exists && param != ch {
            // Without DCHMAP channel n can only use PaRAM set n
            return Err(RequestError::InvalidParameter.into());
        } else {
            param
        };
        let param = self.alloc_resource(Resource::Param(param))?.id();

        let tcc = if tcc == ANY {
            match config.dma_channel_tcc_map[ch as usize] {
                NO_TCC_MAP => ANY,
                mapped => mapped,
            }
        } else {
            tcc
        };
        match self.alloc_resource(Resource::Tcc(tcc)) {
            Ok(tcc) => Ok((param, tcc.id())),
            Err(err) => {
                self.release_on_rollback(Resource::Param(param));
                Err(err)
            }
        }
    }

    fn alloc_qdma_channel(
        &self,
        channel: Resource,
        param: u32,
        tcc: u32,
    ) -> Result<LogicalChannel> {
        let modify = self.global_reg_modify()?;
        let ch = self.alloc_resource(channel)?.id();
        let (param, tcc) = match self.bind_qdma_resources(param, tcc) {
            Ok(bound) => bound,
            Err(err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("QDMA channel {} rolled back: {}", ch, err);
                self.release_on_rollback(Resource::Qdma(ch));
                return Err(err);
            }
        };

        if modify {
            let cc = self.controller.cc();
            cc.set_qchmap(
                ch,
                qchmap_with_trigger(chmap_with_param(0, param), TriggerWord::default().index()),
            );
            self.prepare_param(param, Some(tcc));
            cc.shadow(self.region()?).set_qeesr(1 << ch);
        }

        let index = self.qdma_index(ch);
        self.controller.bound.with(|table| {
            table.set(
                index,
                Binding::Channel {
                    param: param as u16,
                    tcc: tcc as u8,
                },
            )
        });

        Ok(LogicalChannel {
            channel: Resource::Qdma(ch),
            param,
            tcc: Some(tcc),
        })
    }

    fn bind_qdma_resources(&self, param: u32, tcc: u32) -> Result<(u32, u32)> {
        let param = self.alloc_resource(Resource::Param(param))?.id();
        match self.alloc_resource(Resource::Tcc(tcc)) {
            Ok(tcc) => Ok((param, tcc.id())),
            Err(err) => {
                self.release_on_rollback(Resource::Param(param));
                Err(err)
            }
        }
    }

    fn alloc_link_channel(&self, param: u32) -> Result<LogicalChannel> {
        let modify = self.global_reg_modify()?;
        let param = self.alloc_resource(Resource::Param(param))?.id();

        let range = self.link_range();
        let slot = self.controller.bound.with(|table| {
            let slot = table.first_free(range)?;
            table.set(
                slot,
                Binding::Link {
                    param: param as u16,
                },
            );
            Some(slot)
        });
        if slot.is_none() {
            self.release_on_rollback(Resource::Param(param));
            return Err(ResourceError::AllUnavailable.into());
        }

        if modify {
            self.prepare_param(param, None);
        }

        Ok(LogicalChannel {
            channel: Resource::Param(param),
            param,
            tcc: None,
        })
    }

    /// Program the TCC (or clear chaining for a link set) and a NULL link.
    fn prepare_param(&self, param: u32, tcc: Option<u32>) {
        let cc = self.controller.cc();
        cc.modify_param(param, PARAM_OPT, |opt| match tcc {
            Some(tcc) => opt_with_tcc(opt, tcc),
            None => opt & !(OPT_TCCHEN | OPT_ITCCHEN),
        });
        cc.modify_param(param, PARAM_LINK_BCNTRLD, |value| {
            (value & !LINK_MASK) | LINK_NULL
        });
    }

    /// Free a resource taken earlier in a failed composite allocation.
    fn release_on_rollback(&self, resource: Resource) {
        if let Err(_err) = self.free_resource(resource) {
            #[cfg(feature = "defmt")]
            defmt::warn!("rollback of {} failed: {}", resource, _err);
        }
    }

    /// Free a logical channel and everything bound to it.
    ///
    /// Pending secondary and missed events of the channel are cleared and
    /// its channel map entry reset before the resources are released. With
    /// register programming turned off only the bookkeeping is undone.
    pub fn free_logical_channel(&self, channel: Resource) -> Result<()> {
        match channel {
            Resource::Dma(ch) => self.free_dma_channel(ch),
            Resource::Qdma(ch) => self.free_qdma_channel(ch),
            Resource::Param(param) => self.free_link_channel(param),
            Resource::Tcc(_) => Err(RequestError::InvalidParameter.into()),
        }
    }

    /// Binding of an allocated channel, or `InvalidParameter`.
    fn owned_binding(&self, channel: Resource, index: usize) -> Result<(u32, u32)> {
        if !self.controller.is_channel_in_range(channel) || !self.is_allocated(channel)? {
            return Err(RequestError::InvalidParameter.into());
        }
        match self.controller.bound.with(|table| table.get(index)) {
            Binding::Channel { param, tcc } => Ok((u32::from(param), u32::from(tcc))),
            Binding::None | Binding::Link { .. } => Err(RequestError::InvalidParameter.into()),
        }
    }

    fn free_dma_channel(&self, ch: u32) -> Result<()> {
        let (param, tcc) = self.owned_binding(Resource::Dma(ch), ch as usize)?;
        if self.global_reg_modify()? {
            let cc = self.controller.cc();
            let shadow = cc.shadow(self.region()?);
            if shadow.secondary_event(ch) {
                shadow.clear_secondary_event(ch);
            }
            if cc.event_missed(ch) {
                cc.clear_event_missed(ch);
            }
            if self.global_config().channel_mapping_exists {
                cc.set_dchmap(ch, 0);
            }
        }

        self.free_resource(Resource::Param(param))?;
        self.free_resource(Resource::Tcc(tcc))?;
        self.controller
            .bound
            .with(|table| table.set(ch as usize, Binding::None));
        self.free_resource(Resource::Dma(ch))
    }

    fn free_qdma_channel(&self, ch: u32) -> Result<()> {
        let index = self.qdma_index(ch);
        let (param, tcc) = self.owned_binding(Resource::Qdma(ch), index)?;
        if self.global_reg_modify()? {
            let cc = self.controller.cc();
            cc.shadow(self.region()?).set_qeecr(1 << ch);
            if cc.qemr() & (1 << ch) != 0 {
                cc.set_qemcr(1 << ch);
            }
            cc.set_qchmap(ch, 0);
        }

        self.free_resource(Resource::Param(param))?;
        self.free_resource(Resource::Tcc(tcc))?;
        self.controller
            .bound
            .with(|table| table.set(index, Binding::None));
        self.free_resource(Resource::Qdma(ch))
    }

    fn free_link_channel(&self, param: u32) -> Result<()> {
        if param == ANY || param >= self.global_config().num_param_sets {
            return Err(RequestError::InvalidParameter.into());
        }
        let range = self.link_range();
        let slot = self
            .controller
            .bound
            .with(|table| table.find_link(range, param))
            .ok_or(RequestError::InvalidParameter)?;

        self.free_resource(Resource::Param(param))?;
        self.controller
            .bound
            .with(|table| table.set(slot, Binding::None));
        Ok(())
    }

    /// Resources bound to a logical channel, if it is allocated.
    pub fn bound_resources(&self, channel: Resource) -> Result<Option<LogicalChannel>> {
        let config = self.global_config();
        let index = match channel {
            Resource::Dma(ch) if ch < config.num_dma_channels => ch as usize,
            Resource::Qdma(ch) if ch < config.num_qdma_channels => self.qdma_index(ch),
            Resource::Param(param) if param < config.num_param_sets => {
                let range = self.link_range();
                let found = self
                    .controller
                    .bound
                    .with(|table| table.find_link(range, param));
                return Ok(found.map(|_| LogicalChannel {
                    channel,
                    param,
                    tcc: None,
                }));
            }
            _ => return Err(RequestError::InvalidParameter.into()),
        };

        Ok(match self.controller.bound.with(|table| table.get(index)) {
            Binding::Channel { param, tcc } => Some(LogicalChannel {
                channel,
                param: u32::from(param),
                tcc: Some(u32::from(tcc)),
            }),
            Binding::None | Binding::Link { .. } => None,
        })
    }

    /// PaRAM set behind a DMA/QDMA channel or link channel of this instance.
    pub(crate) fn resolve_param(&self, channel: Resource) -> Result<u32> {
        match channel {
            Resource::Dma(_) | Resource::Qdma(_) => {
                if !self.is_allocated(channel)? {
                    return Err(RequestError::InvalidParameter.into());
                }
                self.bound_resources(channel)?
                    .map(|bound| bound.param)
                    .ok_or_else(|| RequestError::InvalidParameter.into())
            }
            Resource::Param(param) => {
                if self.is_allocated(channel)? {
                    Ok(param)
                } else {
                    Err(RequestError::InvalidParameter.into())
                }
            }
            Resource::Tcc(_) => Err(RequestError::InvalidParameter.into()),
        }
    }

    // =========================================================================
    // Direct Mapping
    // =========================================================================

    /// Point DMA channel `channel` at PaRAM set `param` (DCHMAP).
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for ids beyond the configured counts
    /// - `FeatureUnsupported` without DCHMAP registers
    /// - `NotAllocated` unless both resources are allocated by this instance
    pub fn map_edma_channel(&self, channel: u32, param: u32) -> Result<()> {
        let config = self.global_config();
        if channel >= config.num_dma_channels || param >= config.num_param_sets {
            return Err(RequestError::InvalidParameter.into());
        }
        if !config.channel_mapping_exists {
            return Err(RequestError::FeatureUnsupported.into());
        }
        if !self.is_allocated(Resource::Dma(channel))?
            || !self.is_allocated(Resource::Param(param))?
        {
            return Err(ResourceError::NotAllocated.into());
        }

        let cc = self.controller.cc();
        cc.set_dchmap(channel, chmap_with_param(cc.dchmap(channel), param));
        Ok(())
    }

    /// Point QDMA channel `channel` at PaRAM set `param`, triggered by a
    /// write to `trigger` (QCHMAP).
    pub fn map_qdma_channel(&self, channel: u32, param: u32, trigger: TriggerWord) -> Result<()> {
        let config = self.global_config();
        if channel >= config.num_qdma_channels || param >= config.num_param_sets {
            return Err(RequestError::InvalidParameter.into());
        }
        if !self.is_allocated(Resource::Qdma(channel))?
            || !self.is_allocated(Resource::Param(param))?
        {
            return Err(ResourceError::NotAllocated.into());
        }

        self.controller.cc().set_qchmap(
            channel,
            qchmap_with_trigger(chmap_with_param(0, param), trigger.index()),
        );
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
