//! Resource manager instances and the resource allocator.
//!
//! An [`Instance`] is one opener of a controller, working in one shadow
//! region. It owns a subset of every resource kind (taken from its
//! [`InstanceConfig`]) and tracks which of those are still available.
//!
//! For each kind the instance keeps three bitmaps:
//!
//! - **owned**: what the instance may ever hand out
//! - **reserved**: owned ids skipped by "any" requests (still grantable by id)
//! - **available**: owned ids not currently allocated
//!
//! Allocation clears a bit in `available`, freeing sets it again. Allocation
//! can also program the global registers (region access enables, PaRAM
//! clearing) when the instance's `reg_modify` option is on.

use embedded_hal::delay::DelayNs;

use super::callback::GlobalErrorCallback;
use super::config::{GlobalConfig, InstanceConfig, OpenParams};
use super::controller::Controller;
use super::error::{RequestError, ResourceError, ResourceResult, Result};
use super::resource::{Ioctl, RegisterBlock, Resource, ResourceKind};
use crate::internal::bitset::Bitset;
use crate::internal::constants::{
    ANY, DMA_WORDS, PARAM_SET_WORDS, PARAM_WORDS, QDMA_WORDS, TCC_POLL_INTERVAL_US, TCC_WORDS,
};
use crate::internal::register::RegisterAccess;
use crate::internal::register::cc::CC_BLOCK_SIZE;

// =============================================================================
// Resource Pools
// =============================================================================

/// Owned / reserved / available bitmaps of one resource kind.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pool<const W: usize> {
    owned: Bitset<W>,
    reserved: Bitset<W>,
    available: Bitset<W>,
}

impl<const W: usize> Pool<W> {
    fn new(owned: [u32; W], reserved: [u32; W], limit: u32) -> Self {
        let mut owned = Bitset::from_words(owned);
        owned.truncate(limit as usize);
        let mut reserved = Bitset::from_words(reserved);
        reserved.truncate(limit as usize);
        Self {
            owned,
            reserved,
            available: owned,
        }
    }

    fn allocate(&mut self, id: u32, limit: u32) -> ResourceResult<u32> {
        if id == ANY {
            let candidates = self.owned.and(&self.available).and_not(&self.reserved);
            let id = candidates
                .first_set(limit as usize)
                .ok_or(ResourceError::AllUnavailable)?;
            self.available.remove(id);
            return Ok(id as u32);
        }

        let id = id as usize;
        if !self.owned.contains(id) {
            return Err(ResourceError::NotOwned);
        }
        if !self.available.contains(id) {
            return Err(ResourceError::AlreadyBooked);
        }
        self.available.remove(id);
        Ok(id as u32)
    }

    fn allocate_run(&mut self, first: u32, count: u32, limit: u32) -> ResourceResult<u32> {
        let count = count as usize;
        let start = if first == ANY {
            self.owned
                .and(&self.available)
                .and_not(&self.reserved)
                .find_run(count, limit as usize)
                .ok_or(ResourceError::SpecifiedNotAvailable)?
        } else {
            let first = first as usize;
            let free = (first..first + count)
                .all(|id| self.owned.contains(id) && self.available.contains(id));
            if !free {
                return Err(ResourceError::SpecifiedNotAvailable);
            }
            first
        };
        self.available.remove_range(start, count);
        Ok(start as u32)
    }

    fn free(&mut self, id: u32) -> ResourceResult<()> {
        let id = id as usize;
        if !self.owned.contains(id) {
            return Err(ResourceError::NotOwned);
        }
        if self.available.contains(id) {
            return Err(ResourceError::AlreadyFree);
        }
        self.available.insert(id);
        Ok(())
    }

    fn is_available(&self, id: u32) -> bool {
        self.owned.contains(id as usize) && self.available.contains(id as usize)
    }

    fn is_allocated(&self, id: u32) -> bool {
        self.owned.contains(id as usize) && !self.available.contains(id as usize)
    }
}

/// One pool per resource kind.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pools {
    pub(crate) dma: Pool<DMA_WORDS>,
    pub(crate) qdma: Pool<QDMA_WORDS>,
    pub(crate) tcc: Pool<TCC_WORDS>,
    pub(crate) param: Pool<PARAM_WORDS>,
}

/// Run `$body` with `$pool` bound to the pool of `$kind`.
macro_rules! with_pool {
    ($pools:expr, $kind:expr, $pool:ident => $body:expr) => {
        match $kind {
            ResourceKind::Dma => {
                let $pool = &mut $pools.dma;
                $body
            }
            ResourceKind::Qdma => {
                let $pool = &mut $pools.qdma;
                $body
            }
            ResourceKind::Tcc => {
                let $pool = &mut $pools.tcc;
                $body
            }
            ResourceKind::Param => {
                let $pool = &mut $pools.param;
                $body
            }
        }
    };
}

// =============================================================================
// Instance State
// =============================================================================

/// Switches copied out of the instance state for register programming.
#[derive(Debug, Clone, Copy)]
struct Options {
    region: u32,
    reg_modify: bool,
    param_clear: bool,
}

/// Everything the controller keeps per open instance.
#[derive(Debug)]
pub(crate) struct InstanceState {
    pub(crate) generation: u32,
    pub(crate) region: u32,
    pub(crate) is_master: bool,
    pub(crate) config: InstanceConfig,
    pub(crate) pools: Pools,
    pub(crate) param_clear: bool,
    pub(crate) reg_modify: bool,
    pub(crate) global_error: Option<(GlobalErrorCallback, usize)>,
}

impl InstanceState {
    pub(crate) fn new(generation: u32, params: &OpenParams, global: &GlobalConfig) -> Self {
        let owned = &params.config;

        // PaRAM sets tied to DMA channels are never handed out as "any"
        let mut reserved_params = Bitset::from_words(owned.resvd_param_sets);
        reserved_params.insert_range(0, global.num_dma_channels as usize);

        Self {
            generation,
            region: params.region,
            is_master: params.is_master,
            config: params.config,
            pools: Pools {
                dma: Pool::new(
                    owned.own_dma_channels,
                    owned.resvd_dma_channels,
                    global.num_dma_channels,
                ),
                qdma: Pool::new(
                    owned.own_qdma_channels,
                    owned.resvd_qdma_channels,
                    global.num_qdma_channels,
                ),
                tcc: Pool::new(owned.own_tccs, owned.resvd_tccs, global.num_tccs),
                param: Pool::new(
                    owned.own_param_sets,
                    *reserved_params.words(),
                    global.num_param_sets,
                ),
            },
            param_clear: true,
            reg_modify: true,
            global_error: params
                .global_error_callback
                .map(|callback| (callback, params.global_error_data)),
        }
    }

    fn options(&self) -> Options {
        Options {
            region: self.region,
            reg_modify: self.reg_modify,
            param_clear: self.param_clear,
        }
    }
}

// =============================================================================
// Instance
// =============================================================================

/// Copyable reference to an open instance.
///
/// Handles carry a generation stamp: once the instance is closed, the handle
/// is rejected by [`Controller::attach`] even if the slot was reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InstanceHandle {
    pub(crate) slot: u8,
    pub(crate) generation: u32,
}

/// An open resource manager instance.
///
/// Created by [`Controller::open`], consumed by [`Instance::close`].
pub struct Instance<'a, R: RegisterAccess> {
    pub(crate) controller: &'a Controller<R>,
    pub(crate) slot: usize,
    pub(crate) generation: u32,
}

impl<R: RegisterAccess> core::fmt::Debug for Instance<'_, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Instance")
            .field("controller", &self.controller.id())
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .finish()
    }
}

impl<'a, R: RegisterAccess> Instance<'a, R> {
    /// Handle for re-attaching later
    pub fn handle(&self) -> InstanceHandle {
        InstanceHandle {
            slot: self.slot as u8,
            generation: self.generation,
        }
    }

    /// The controller this instance was opened on
    pub fn controller(&self) -> &'a Controller<R> {
        self.controller
    }

    /// Close the instance.
    ///
    /// Resources still allocated are dropped with the instance; the register
    /// state they programmed is left as is.
    pub fn close(self) -> Result<()> {
        self.controller.close_instance(self.slot, self.generation)
    }

    /// Run `f` on this instance's state, rejecting stale instances.
    pub(crate) fn with_state<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut InstanceState) -> Result<T>,
    {
        let cell = self
            .controller
            .instances
            .get(self.slot)
            .ok_or(RequestError::InvalidParameter)?;
        cell.with(|entry| match entry {
            Some(state) if state.generation == self.generation => f(state),
            _ => Err(RequestError::InvalidParameter.into()),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Shadow region the instance works in
    pub fn region(&self) -> Result<u32> {
        self.with_state(|state| Ok(state.region))
    }

    /// Whether the instance is the controller's master
    pub fn is_master(&self) -> Result<bool> {
        self.with_state(|state| Ok(state.is_master))
    }

    /// The controller's global configuration
    pub fn global_config(&self) -> &'a GlobalConfig {
        self.controller.global_config()
    }

    /// The configuration the instance was opened with
    pub fn instance_config(&self) -> Result<InstanceConfig> {
        self.with_state(|state| Ok(state.config))
    }

    fn options(&self) -> Result<Options> {
        self.with_state(|state| Ok(state.options()))
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocate one resource.
    ///
    /// With [`Resource::ANY`] the lowest owned, available, unreserved id is
    /// taken. A concrete id may be reserved but must be owned and free.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for a concrete id beyond the configured count
    /// - `AllUnavailable` if an "any" request finds nothing
    /// - `NotOwned` / `AlreadyBooked` for a concrete id
    pub fn alloc_resource(&self, resource: Resource) -> Result<Resource> {
        let kind = resource.kind();
        let limit = self.controller.count(kind);
        let requested = resource.id();
        if requested != ANY && requested >= limit {
            return Err(RequestError::InvalidParameter.into());
        }

        let (id, options) = self.with_state(|state| {
            let id = with_pool!(state.pools, kind, pool => pool.allocate(requested, limit))?;
            Ok((id, state.options()))
        })?;

        let allocated = resource.with_id(id);
        self.program_allocation(allocated, resource.is_any(), options);

        #[cfg(feature = "defmt")]
        defmt::trace!("allocated {}", allocated);

        Ok(allocated)
    }

    /// Free one resource.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for [`Resource::ANY`] or an id beyond the count
    /// - `NotOwned` if the instance does not own the id
    /// - `AlreadyFree` if the id is not allocated
    pub fn free_resource(&self, resource: Resource) -> Result<()> {
        let kind = resource.kind();
        let id = resource.id();
        if id == ANY || id >= self.controller.count(kind) {
            return Err(RequestError::InvalidParameter.into());
        }

        let options = self.with_state(|state| {
            with_pool!(state.pools, kind, pool => pool.free(id))?;
            Ok(state.options())
        })?;

        self.program_release(resource, options);
        Ok(())
    }

    /// Allocate `count` consecutive resources starting at `first`.
    ///
    /// With [`Resource::ANY`] the lowest run of unreserved, available ids is
    /// taken. Returns the descriptor of the first id.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for a zero count or a range beyond the count
    /// - `SpecifiedNotAvailable` if no such run is free
    pub fn alloc_contiguous(&self, first: Resource, count: u32) -> Result<Resource> {
        let kind = first.kind();
        let limit = self.controller.count(kind);
        let start = first.id();
        let in_range = if start == ANY {
            count <= limit
        } else {
            start < limit && count <= limit - start
        };
        if count == 0 || !in_range {
            return Err(RequestError::InvalidParameter.into());
        }

        let (start, options) = self.with_state(|state| {
            let start =
                with_pool!(state.pools, kind, pool => pool.allocate_run(start, count, limit))?;
            Ok((start, state.options()))
        })?;

        for id in start..start + count {
            self.program_allocation(first.with_id(id), first.is_any(), options);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("allocated {} x {}", count, first.with_id(start));

        Ok(first.with_id(start))
    }

    /// Free `count` consecutive resources starting at `first`.
    ///
    /// Stops at the first id that fails to free.
    pub fn free_contiguous(&self, first: Resource, count: u32) -> Result<()> {
        let limit = self.controller.count(first.kind());
        let start = first.id();
        if start == ANY || count == 0 || start >= limit || count > limit - start {
            return Err(RequestError::InvalidParameter.into());
        }
        for id in start..start + count {
            self.free_resource(first.with_id(id))?;
        }
        Ok(())
    }

    /// Whether a concrete resource is owned by the instance and free
    pub fn is_available(&self, resource: Resource) -> Result<bool> {
        let id = resource.id();
        if id == ANY || id >= self.controller.count(resource.kind()) {
            return Err(RequestError::InvalidParameter.into());
        }
        self.with_state(|state| {
            Ok(with_pool!(state.pools, resource.kind(), pool => pool.is_available(id)))
        })
    }

    /// Whether a concrete resource is currently allocated by this instance
    pub(crate) fn is_allocated(&self, resource: Resource) -> Result<bool> {
        let id = resource.id();
        if id == ANY || id >= self.controller.count(resource.kind()) {
            return Ok(false);
        }
        self.with_state(|state| {
            Ok(with_pool!(state.pools, resource.kind(), pool => pool.is_allocated(id)))
        })
    }

    fn program_allocation(&self, resource: Resource, requested_any: bool, options: Options) {
        let cc = self.controller.cc();
        let region = options.region;
        match resource {
            Resource::Dma(channel) => {
                if options.reg_modify {
                    cc.enable_dma_region_bit(region, channel);
                    if !requested_any {
                        cc.shadow(region).disable_event(channel);
                    }
                }
            }
            Resource::Qdma(channel) => {
                if options.reg_modify {
                    cc.enable_qdma_region_bit(region, channel);
                }
            }
            Resource::Tcc(tcc) => {
                if options.reg_modify {
                    cc.enable_dma_region_bit(region, tcc);
                }
                if self.controller.master_region() == Some(region) {
                    self.controller
                        .irq
                        .with(|tables| tables.allocated_tccs.insert(tcc as usize));
                }
            }
            Resource::Param(param) => {
                if options.reg_modify && options.param_clear {
                    for word in 0..PARAM_SET_WORDS {
                        cc.set_param_word(param, word, 0);
                    }
                }
            }
        }
    }

    fn program_release(&self, resource: Resource, options: Options) {
        let cc = self.controller.cc();
        let region = options.region;
        match resource {
            Resource::Dma(channel) => {
                if options.reg_modify {
                    cc.disable_dma_region_bit(region, channel);
                }
            }
            Resource::Qdma(channel) => {
                if options.reg_modify {
                    cc.disable_qdma_region_bit(region, channel);
                }
            }
            Resource::Tcc(tcc) => {
                if options.reg_modify {
                    cc.disable_dma_region_bit(region, tcc);
                }
                if self.controller.master_region() == Some(region) {
                    self.controller
                        .irq
                        .with(|tables| tables.allocated_tccs.remove(tcc as usize));
                }
            }
            Resource::Param(_) => {}
        }
    }

    // =========================================================================
    // Options
    // =========================================================================

    /// Set or query an instance option.
    ///
    /// Setters return the new value, getters the current one.
    pub fn ioctl(&self, cmd: Ioctl) -> Result<bool> {
        self.with_state(|state| {
            Ok(match cmd {
                Ioctl::SetParamClear(enabled) => {
                    state.param_clear = enabled;
                    enabled
                }
                Ioctl::GetParamClear => state.param_clear,
                Ioctl::SetGlobalRegModify(enabled) => {
                    state.reg_modify = enabled;
                    enabled
                }
                Ioctl::GetGlobalRegModify => state.reg_modify,
            })
        })
    }

    /// Zero PaRAM sets on allocation (default on)
    pub fn set_param_clear(&self, enabled: bool) -> Result<()> {
        self.ioctl(Ioctl::SetParamClear(enabled)).map(|_| ())
    }

    /// Whether PaRAM sets are zeroed on allocation
    pub fn param_clear(&self) -> Result<bool> {
        self.ioctl(Ioctl::GetParamClear)
    }

    /// Program DRAE/QRAE and PaRAM on allocation (default on)
    pub fn set_global_reg_modify(&self, enabled: bool) -> Result<()> {
        self.ioctl(Ioctl::SetGlobalRegModify(enabled)).map(|_| ())
    }

    /// Whether allocation programs global registers
    pub fn global_reg_modify(&self) -> Result<bool> {
        self.ioctl(Ioctl::GetGlobalRegModify)
    }

    // =========================================================================
    // Raw Register Access
    // =========================================================================

    fn check_cc_offset(offset: usize) -> Result<()> {
        if offset % 4 != 0 || offset >= CC_BLOCK_SIZE {
            return Err(RequestError::InvalidParameter.into());
        }
        Ok(())
    }

    /// Write a channel controller register by byte offset
    pub fn set_cc_register(&self, offset: usize, value: u32) -> Result<()> {
        Self::check_cc_offset(offset)?;
        self.with_state(|_| Ok(()))?;
        self.controller.cc().write_offset(offset, value);
        Ok(())
    }

    /// Read a channel controller register by byte offset
    pub fn cc_register(&self, offset: usize) -> Result<u32> {
        Self::check_cc_offset(offset)?;
        self.with_state(|_| Ok(()))?;
        Ok(self.controller.cc().read_offset(offset))
    }

    /// Base address of the channel controller or a transfer controller
    pub fn base_address(&self, block: RegisterBlock) -> Result<usize> {
        let config = self.controller.global_config();
        match block {
            RegisterBlock::ChannelController => Ok(config.cc_base),
            RegisterBlock::TransferController(tc) => {
                if tc >= config.num_tcs {
                    return Err(RequestError::InvalidParameter.into());
                }
                match config.tc_bases[tc as usize] {
                    0 => Err(RequestError::InvalidParameter.into()),
                    base => Ok(base),
                }
            }
        }
    }

    // =========================================================================
    // Polled Completion
    // =========================================================================

    fn check_tcc(&self, tcc: u32) -> Result<u32> {
        if tcc >= self.controller.global_config().num_tccs {
            return Err(RequestError::InvalidParameter.into());
        }
        self.region()
    }

    /// Spin until `tcc` is pending in this instance's region, then clear it.
    ///
    /// Never returns if the transfer never completes; see
    /// [`wait_and_clear_tcc_timeout`](Self::wait_and_clear_tcc_timeout).
    pub fn wait_and_clear_tcc(&self, tcc: u32) -> Result<()> {
        let region = self.check_tcc(tcc)?;
        let shadow = self.controller.cc().shadow(region);
        while !shadow.interrupt_pending(tcc) {
            core::hint::spin_loop();
        }
        shadow.clear_interrupt(tcc);
        Ok(())
    }

    /// Poll `tcc` every few microseconds until it is pending, then clear it.
    ///
    /// # Errors
    ///
    /// `Timeout` if the completion does not arrive within `timeout_us`.
    pub fn wait_and_clear_tcc_timeout<D: DelayNs>(
        &self,
        tcc: u32,
        mut delay: D,
        timeout_us: u32,
    ) -> Result<()> {
        let region = self.check_tcc(tcc)?;
        let shadow = self.controller.cc().shadow(region);
        let mut waited = 0u32;
        while !shadow.interrupt_pending(tcc) {
            if waited >= timeout_us {
                #[cfg(feature = "defmt")]
                defmt::warn!("TCC {} not complete after {} us", tcc, waited);
                return Err(RequestError::Timeout.into());
            }
            delay.delay_us(TCC_POLL_INTERVAL_US);
            waited = waited.saturating_add(TCC_POLL_INTERVAL_US);
        }
        shadow.clear_interrupt(tcc);
        Ok(())
    }

    /// Clear `tcc` if it is pending; returns whether it was
    pub fn check_and_clear_tcc(&self, tcc: u32) -> Result<bool> {
        let region = self.check_tcc(tcc)?;
        let shadow = self.controller.cc().shadow(region);
        let pending = shadow.interrupt_pending(tcc);
        if pending {
            shadow.clear_interrupt(tcc);
        }
        Ok(pending)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::register::cc::{
        DRAE, DRAEH, PARAM_BASE, QRAE, SH_EECR, SH_ICR, SH_IPR, SHADOW_BASE,
    };
    use crate::testing::{CC, MockDelay, TC1, all_params, small_registry};
    use crate::{Error, assert_reg_eq, assert_reg_not_written};

    fn pool8() -> Pool<1> {
        // owns 0..8, reserves 0 and 1
        Pool::new([0xFF], [0b11], 8)
    }

    // =========================================================================
    // Pool
    // =========================================================================

    #[test]
    fn pool_any_skips_reserved() {
        let mut pool = pool8();
        assert_eq!(pool.allocate(ANY, 8), Ok(2));
        assert_eq!(pool.allocate(ANY, 8), Ok(3));
    }

    #[test]
    fn pool_concrete_may_take_reserved() {
        let mut pool = pool8();
        assert_eq!(pool.allocate(0, 8), Ok(0));
        assert_eq!(pool.allocate(0, 8), Err(ResourceError::AlreadyBooked));
    }

    #[test]
    fn pool_rejects_unowned() {
        let mut pool = Pool::<1>::new([0x0F], [0], 8);
        assert_eq!(pool.allocate(5, 8), Err(ResourceError::NotOwned));
        assert_eq!(pool.free(5), Err(ResourceError::NotOwned));
    }

    #[test]
    fn pool_owned_is_masked_to_limit() {
        let mut pool = Pool::<1>::new([0xFF], [0], 4);
        for expected in 0..4 {
            assert_eq!(pool.allocate(ANY, 4), Ok(expected));
        }
        assert_eq!(pool.allocate(ANY, 4), Err(ResourceError::AllUnavailable));
    }

    #[test]
    fn pool_free_twice() {
        let mut pool = pool8();
        pool.allocate(4, 8).unwrap();
        assert_eq!(pool.free(4), Ok(()));
        assert_eq!(pool.free(4), Err(ResourceError::AlreadyFree));
    }

    #[test]
    fn pool_run_any_avoids_reserved_and_busy() {
        let mut pool = pool8();
        pool.allocate(4, 8).unwrap();
        // 2..4 is too short, 5..8 fits
        assert_eq!(pool.allocate_run(ANY, 3, 8), Ok(5));
        assert!(!pool.is_available(6));
        assert_eq!(
            pool.allocate_run(ANY, 3, 8),
            Err(ResourceError::SpecifiedNotAvailable)
        );
    }

    #[test]
    fn pool_run_concrete_is_all_or_nothing() {
        let mut pool = pool8();
        pool.allocate(3, 8).unwrap();
        assert_eq!(
            pool.allocate_run(1, 4, 8),
            Err(ResourceError::SpecifiedNotAvailable)
        );
        assert!(pool.is_available(1));
        assert!(pool.is_available(2));
        assert_eq!(pool.allocate_run(4, 4, 8), Ok(4));
    }

    // =========================================================================
    // Single Allocation
    // =========================================================================

    #[test]
    fn any_allocation_returns_lowest_free() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();

        assert_eq!(inst.alloc_resource(Resource::Qdma(ANY)), Ok(Resource::Qdma(0)));
        assert_eq!(inst.alloc_resource(Resource::Qdma(ANY)), Ok(Resource::Qdma(1)));
        assert_eq!(
            inst.alloc_resource(Resource::Qdma(ANY)),
            Err(Error::Resource(ResourceError::AllUnavailable))
        );
    }

    #[test]
    fn concrete_out_of_range_is_invalid() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();

        let invalid = Err(Error::Request(RequestError::InvalidParameter));
        assert_eq!(inst.alloc_resource(Resource::Dma(8)), invalid);
        assert_eq!(inst.alloc_resource(Resource::Param(16)), invalid);
        assert_eq!(inst.free_resource(Resource::Tcc(ANY)), invalid.map(|_| ()));
    }

    #[test]
    fn param_sets_of_dma_channels_are_not_any_candidates() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();

        // 8 DMA channels reserve PaRAM 0..8
        assert_eq!(
            inst.alloc_resource(Resource::Param(ANY)),
            Ok(Resource::Param(8))
        );
        assert_eq!(inst.alloc_resource(Resource::Param(2)), Ok(Resource::Param(2)));
    }

    #[test]
    fn dma_allocation_programs_region_access() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 1, false)).unwrap();
        let regs = controller.registers();
        regs.clear_writes();

        inst.alloc_resource(Resource::Dma(3)).unwrap();
        assert_reg_eq!(regs, CC + DRAE + 8, 1 << 3);
        // concrete request disables the event
        let sh = CC + SHADOW_BASE + 0x200;
        assert_eq!(regs.writes_to(sh + SH_EECR), [1 << 3]);

        inst.alloc_resource(Resource::Dma(ANY)).unwrap();
        assert_reg_eq!(regs, CC + DRAE + 8, 0b1001);
        assert_eq!(regs.writes_to(sh + SH_EECR), [1 << 3]);

        inst.free_resource(Resource::Dma(3)).unwrap();
        assert_reg_eq!(regs, CC + DRAE + 8, 0b0001);
        assert_reg_not_written!(regs, CC + DRAEH + 8);
    }

    #[test]
    fn qdma_allocation_programs_qrae() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 2, false)).unwrap();

        inst.alloc_resource(Resource::Qdma(1)).unwrap();
        assert_reg_eq!(controller.registers(), CC + QRAE + 8, 0b10);
        inst.free_resource(Resource::Qdma(1)).unwrap();
        assert_reg_eq!(controller.registers(), CC + QRAE + 8, 0);
    }

    #[test]
    fn param_allocation_clears_the_set() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();
        let regs = controller.registers();
        let set9 = CC + PARAM_BASE + 9 * 32;
        for word in 0..8 {
            regs.set(set9 + 4 * word, 0xDEAD_0000 | word as u32);
        }

        inst.alloc_resource(Resource::Param(9)).unwrap();
        for word in 0..8 {
            assert_reg_eq!(regs, set9 + 4 * word, 0);
        }
    }

    #[test]
    fn param_clear_off_leaves_the_set() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();
        let regs = controller.registers();
        regs.set(CC + PARAM_BASE + 10 * 32, 0x1234);

        inst.set_param_clear(false).unwrap();
        inst.alloc_resource(Resource::Param(10)).unwrap();
        assert_reg_eq!(regs, CC + PARAM_BASE + 10 * 32, 0x1234);
    }

    #[test]
    fn reg_modify_off_touches_no_registers() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();
        inst.set_global_reg_modify(false).unwrap();
        controller.registers().clear_writes();

        inst.alloc_resource(Resource::Dma(1)).unwrap();
        inst.alloc_resource(Resource::Tcc(1)).unwrap();
        inst.alloc_resource(Resource::Param(12)).unwrap();
        inst.free_resource(Resource::Dma(1)).unwrap();
        assert!(controller.registers().writes().is_empty());

        // completion bookkeeping is independent of register programming
        let tracked = controller
            .irq
            .with(|tables| tables.allocated_tccs.contains(1));
        assert!(tracked);
    }

    #[test]
    fn tcc_tracking_follows_master_region() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let master = controller.open(all_params(controller, 0, true)).unwrap();
        let other = controller.open(all_params(controller, 1, false)).unwrap();

        master.alloc_resource(Resource::Tcc(2)).unwrap();
        other.alloc_resource(Resource::Tcc(3)).unwrap();
        let (two, three) = controller.irq.with(|tables| {
            (
                tables.allocated_tccs.contains(2),
                tables.allocated_tccs.contains(3),
            )
        });
        assert!(two);
        assert!(!three);

        master.free_resource(Resource::Tcc(2)).unwrap();
        let two = controller
            .irq
            .with(|tables| tables.allocated_tccs.contains(2));
        assert!(!two);
    }

    #[test]
    fn non_master_free_keeps_tracked_tcc() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let _master = controller.open(all_params(controller, 0, true)).unwrap();
        let other = controller.open(all_params(controller, 1, false)).unwrap();
        controller
            .irq
            .with(|tables| tables.allocated_tccs.insert(5));

        other.alloc_resource(Resource::Tcc(5)).unwrap();
        other.free_resource(Resource::Tcc(5)).unwrap();
        let five = controller
            .irq
            .with(|tables| tables.allocated_tccs.contains(5));
        assert!(five);
    }

    #[test]
    fn double_free_reports_already_free() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();

        inst.alloc_resource(Resource::Tcc(5)).unwrap();
        assert_eq!(inst.free_resource(Resource::Tcc(5)), Ok(()));
        assert_eq!(
            inst.free_resource(Resource::Tcc(5)),
            Err(Error::Resource(ResourceError::AlreadyFree))
        );
    }

    #[test]
    fn disjoint_instances_allocate_independently() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let global = controller.global_config();
        let low = InstanceConfig::owning_all(global).with_owned_dma_channels([0x0F, 0]);
        let high = InstanceConfig::owning_all(global).with_owned_dma_channels([0xF0, 0]);
        let a = controller.open(OpenParams::new(0, low)).unwrap();
        let b = controller.open(OpenParams::new(1, high)).unwrap();

        assert_eq!(a.alloc_resource(Resource::Dma(ANY)), Ok(Resource::Dma(0)));
        assert_eq!(b.alloc_resource(Resource::Dma(ANY)), Ok(Resource::Dma(4)));
        assert_eq!(
            a.alloc_resource(Resource::Dma(4)),
            Err(Error::Resource(ResourceError::NotOwned))
        );
        assert_eq!(b.is_available(Resource::Dma(5)), Ok(true));
        assert_eq!(a.is_available(Resource::Dma(5)), Ok(false));
    }

    // =========================================================================
    // Contiguous Allocation
    // =========================================================================

    #[test]
    fn contiguous_any_skips_busy_run() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();

        inst.alloc_resource(Resource::Tcc(2)).unwrap();
        assert_eq!(
            inst.alloc_contiguous(Resource::Tcc(ANY), 4),
            Ok(Resource::Tcc(3))
        );
        for tcc in 3..7 {
            assert_eq!(inst.is_available(Resource::Tcc(tcc)), Ok(false));
        }
        assert_eq!(
            inst.alloc_contiguous(Resource::Tcc(ANY), 3),
            Err(Error::Resource(ResourceError::SpecifiedNotAvailable))
        );
    }

    #[test]
    fn contiguous_concrete_failure_changes_nothing() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();

        inst.alloc_resource(Resource::Param(12)).unwrap();
        assert_eq!(
            inst.alloc_contiguous(Resource::Param(10), 4),
            Err(Error::Resource(ResourceError::SpecifiedNotAvailable))
        );
        assert_eq!(inst.is_available(Resource::Param(10)), Ok(true));
        assert_eq!(inst.is_available(Resource::Param(11)), Ok(true));
    }

    #[test]
    fn contiguous_range_checks() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();

        let invalid = Err(Error::Request(RequestError::InvalidParameter));
        assert_eq!(inst.alloc_contiguous(Resource::Dma(ANY), 0), invalid);
        assert_eq!(inst.alloc_contiguous(Resource::Dma(ANY), 9), invalid);
        assert_eq!(inst.alloc_contiguous(Resource::Dma(6), 3), invalid);
        assert_eq!(inst.free_contiguous(Resource::Dma(ANY), 1), invalid.map(|_| ()));
    }

    #[test]
    fn contiguous_free_releases_the_run() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();

        let first = inst.alloc_contiguous(Resource::Dma(2), 3).unwrap();
        assert_eq!(first, Resource::Dma(2));
        assert_reg_eq!(controller.registers(), CC + DRAE, 0b11100);

        inst.free_contiguous(first, 3).unwrap();
        assert_eq!(inst.is_available(Resource::Dma(3)), Ok(true));
        assert_eq!(
            inst.free_contiguous(first, 3),
            Err(Error::Resource(ResourceError::AlreadyFree))
        );
    }

    // =========================================================================
    // Options, Registers, Polling
    // =========================================================================

    #[test]
    fn ioctl_set_and_get() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();

        assert_eq!(inst.ioctl(Ioctl::GetParamClear), Ok(true));
        assert_eq!(inst.ioctl(Ioctl::SetParamClear(false)), Ok(false));
        assert_eq!(inst.param_clear(), Ok(false));
        assert_eq!(inst.global_reg_modify(), Ok(true));
        inst.set_global_reg_modify(false).unwrap();
        assert_eq!(inst.ioctl(Ioctl::GetGlobalRegModify), Ok(false));
    }

    #[test]
    fn cc_register_offsets_are_checked() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();

        inst.set_cc_register(0x1000, 0xABCD).unwrap();
        assert_eq!(inst.cc_register(0x1000), Ok(0xABCD));
        assert_eq!(controller.registers().get(CC + 0x1000), 0xABCD);

        let invalid = Err(Error::Request(RequestError::InvalidParameter));
        assert_eq!(inst.cc_register(0x1002), invalid);
        assert_eq!(inst.cc_register(CC_BLOCK_SIZE), invalid);
    }

    #[test]
    fn base_address_lookup() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();

        assert_eq!(inst.base_address(RegisterBlock::ChannelController), Ok(CC));
        assert_eq!(
            inst.base_address(RegisterBlock::TransferController(1)),
            Ok(TC1)
        );
        assert_eq!(
            inst.base_address(RegisterBlock::TransferController(2)),
            Err(Error::Request(RequestError::InvalidParameter))
        );
    }

    #[test]
    fn check_and_clear_tcc_reports_pending() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();
        let regs = controller.registers();

        assert_eq!(inst.check_and_clear_tcc(4), Ok(false));
        regs.set(CC + SHADOW_BASE + SH_IPR, 1 << 4);
        assert_eq!(inst.check_and_clear_tcc(4), Ok(true));
        assert_eq!(regs.writes_to(CC + SHADOW_BASE + SH_ICR), [1 << 4]);
        assert_eq!(regs.get(CC + SHADOW_BASE + SH_IPR), 0);
        assert_eq!(
            inst.check_and_clear_tcc(8),
            Err(Error::Request(RequestError::InvalidParameter))
        );
    }

    #[test]
    fn wait_and_clear_returns_when_pending() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();
        controller.registers().set(CC + SHADOW_BASE + SH_IPR, 1 << 7);

        inst.wait_and_clear_tcc(7).unwrap();
        assert_eq!(controller.registers().get(CC + SHADOW_BASE + SH_IPR), 0);
    }

    #[test]
    fn wait_with_timeout_expires() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();
        let mut delay = MockDelay::new();

        let result = inst.wait_and_clear_tcc_timeout(3, &mut delay, 100);
        assert_eq!(result, Err(Error::Request(RequestError::Timeout)));
        assert_eq!(delay.total_us(), 100);
        assert_reg_not_written!(controller.registers(), CC + SHADOW_BASE + SH_ICR);
    }

    #[test]
    fn closed_instance_is_rejected() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();
        let stale = Instance {
            controller,
            slot: inst.slot,
            generation: inst.generation,
        };
        inst.close().unwrap();

        assert_eq!(
            stale.alloc_resource(Resource::Dma(ANY)),
            Err(Error::Request(RequestError::InvalidParameter))
        );
        assert_eq!(
            stale.region(),
            Err(Error::Request(RequestError::InvalidParameter))
        );
    }
}
