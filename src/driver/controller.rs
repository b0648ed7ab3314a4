//! Controller registry and lifecycle.
//!
//! A [`Controller`] represents one physical EDMA3 channel controller and its
//! transfer controllers. Controllers live in a [`ControllerRegistry`] indexed
//! by controller id; instances are opened on a controller and borrow it.
//!
//! # Lifecycle
//!
//! ```text
//! Deleted --create--> Created --open--> Opened --last close--> Closed
//!    ^                   |                 ^                      |
//!    +------delete-------+                 +--------open----------+
//!    +--------------------------delete----------------------------+
//! ```
//!
//! All controller methods take `&self`. Mutable state is split across
//! [`CriticalSectionCell`]s (lifecycle, one per instance slot, the bound
//! resources table and the interrupt tables) so a controller can be shared
//! between thread context and the interrupt handlers.

use super::callback::IrqTables;
use super::channel::BoundTable;
use super::config::{GlobalConfig, InstanceConfig, OpenParams};
use super::error::{RequestError, Result, StateError};
use super::instance::{Instance, InstanceHandle, InstanceState};
use super::resource::{Resource, ResourceKind};
use crate::internal::constants::{MAX_CONTROLLERS, MAX_INSTANCES};
use crate::internal::register::RegisterAccess;
use crate::internal::register::cc::{CCERRCLR_ALL, CcRegs};
use crate::sync::CriticalSectionCell;

// =============================================================================
// Lifecycle State
// =============================================================================

/// Lifecycle state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerState {
    /// Not created (empty registry slot)
    #[default]
    Deleted,
    /// Created, never opened
    Created,
    /// At least one instance open
    Opened,
    /// Every instance closed again
    Closed,
}

/// The master instance and its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Master {
    pub(crate) slot: usize,
    pub(crate) region: u32,
}

#[derive(Debug)]
pub(crate) struct Lifecycle {
    pub(crate) state: ControllerState,
    pub(crate) open_count: u32,
    pub(crate) occupied: [bool; MAX_INSTANCES],
    pub(crate) master: Option<Master>,
    generation: u32,
}

impl Lifecycle {
    const fn new() -> Self {
        Self {
            state: ControllerState::Created,
            open_count: 0,
            occupied: [false; MAX_INSTANCES],
            master: None,
            generation: 0,
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// One EDMA3 channel controller and its transfer controllers.
pub struct Controller<R: RegisterAccess> {
    id: u32,
    regs: R,
    config: GlobalConfig,
    is_slave: bool,
    pub(crate) lifecycle: CriticalSectionCell<Lifecycle>,
    pub(crate) instances: [CriticalSectionCell<Option<InstanceState>>; MAX_INSTANCES],
    pub(crate) bound: CriticalSectionCell<BoundTable>,
    pub(crate) irq: CriticalSectionCell<IrqTables>,
}

impl<R: RegisterAccess> core::fmt::Debug for Controller<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("open_count", &self.open_count())
            .field("is_slave", &self.is_slave)
            .finish_non_exhaustive()
    }
}

impl<R: RegisterAccess> Controller<R> {
    fn new(id: u32, mut config: GlobalConfig, regs: R, is_slave: bool) -> Result<Self> {
        config.validate()?;

        if !config.channel_mapping_exists {
            // Without DCHMAP, DMA channel n always uses PaRAM set n
            for channel in 0..config.num_dma_channels {
                config.dma_channel_param_map[channel as usize] = channel;
            }
        }

        let controller = Self {
            id,
            regs,
            config,
            is_slave,
            lifecycle: CriticalSectionCell::new(Lifecycle::new()),
            instances: [const { CriticalSectionCell::new(None) }; MAX_INSTANCES],
            bound: CriticalSectionCell::new(BoundTable::new()),
            irq: CriticalSectionCell::new(IrqTables::new()),
        };

        if !is_slave {
            controller.init_global_region();
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "EDMA3 controller {} created (dma={}, qdma={}, tcc={}, param={}, slave={})",
            id,
            controller.config.num_dma_channels,
            controller.config.num_qdma_channels,
            controller.config.num_tccs,
            controller.config.num_param_sets,
            is_slave
        );

        Ok(controller)
    }

    /// Clear stale error state and program the event queues.
    fn init_global_region(&self) {
        let cc = self.cc();
        cc.set_emcr(u32::MAX);
        if self.config.num_dma_channels > 32 {
            cc.set_emcrh(u32::MAX);
        }
        cc.set_qemcr(u32::MAX);

        for queue in 0..self.config.num_event_queues {
            cc.set_queue_priority(queue, self.config.queue_priority[queue as usize]);
            cc.set_queue_watermark(queue, self.config.queue_watermark[queue as usize]);
        }

        cc.set_ccerrclr(CCERRCLR_ALL);
    }

    /// Clear the enable and pending state of `region` for the resources
    /// `owned` names, and revoke the region's access enables.
    fn init_shadow_region(&self, region: u32, owned: &InstanceConfig) {
        let cc = self.cc();
        let shadow = cc.shadow(region);
        let low = owned.own_dma_channels[0] | owned.own_tccs[0];
        let high = owned.own_dma_channels[1] | owned.own_tccs[1];

        shadow.set_ecr(low);
        shadow.set_ecrh(high);
        shadow.set_eecr(low);
        shadow.set_eecrh(high);
        shadow.set_secr(low);
        shadow.set_secrh(high);
        shadow.set_iecr(low);
        shadow.set_iecrh(high);
        shadow.set_icr(low);
        shadow.set_icrh(high);

        shadow.set_qeecr(owned.own_qdma_channels[0]);
        shadow.set_qsecr(owned.own_qdma_channels[0]);

        cc.set_drae(region, false, 0);
        cc.set_drae(region, true, 0);
        cc.set_qrae(region, 0);
    }

    // =========================================================================
    // Open / Close
    // =========================================================================

    /// Open a resource manager instance on this controller.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` if the region does not exist
    /// - `MaxInstancesOpened` if every instance slot is in use
    /// - `MasterAlreadyExists` if mastership is requested twice
    pub fn open(&self, params: OpenParams) -> Result<Instance<'_, R>> {
        if params.region >= self.config.num_regions {
            return Err(RequestError::InvalidParameter.into());
        }

        let (slot, generation) = self.lifecycle.with(|lc| {
            if lc.state == ControllerState::Deleted {
                return Err(StateError::InvalidState);
            }
            if lc.open_count as usize >= MAX_INSTANCES {
                return Err(StateError::MaxInstancesOpened);
            }
            if params.is_master && lc.master.is_some() {
                return Err(StateError::MasterAlreadyExists);
            }
            let slot = lc
                .occupied
                .iter()
                .position(|used| !used)
                .ok_or(StateError::MaxInstancesOpened)?;

            lc.generation = lc.generation.wrapping_add(1);
            lc.occupied[slot] = true;
            lc.open_count += 1;
            lc.state = ControllerState::Opened;
            if params.is_master {
                lc.master = Some(Master {
                    slot,
                    region: params.region,
                });
            }
            Ok((slot, lc.generation))
        })?;

        let state = InstanceState::new(generation, &params, &self.config);
        self.instances[slot].with(|entry| *entry = Some(state));

        if params.init_region {
            self.init_shadow_region(params.region, &params.config);
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "EDMA3 controller {}: instance {} opened in region {} (master={})",
            self.id,
            slot,
            params.region,
            params.is_master
        );

        Ok(Instance {
            controller: self,
            slot,
            generation,
        })
    }

    /// Re-attach to an open instance from its handle.
    ///
    /// Fails with `InvalidParameter` if the instance has been closed since.
    pub fn attach(&self, handle: InstanceHandle) -> Result<Instance<'_, R>> {
        let instance = Instance {
            controller: self,
            slot: handle.slot as usize,
            generation: handle.generation,
        };
        instance.region()?;
        Ok(instance)
    }

    pub(crate) fn close_instance(&self, slot: usize, generation: u32) -> Result<()> {
        let opened = self
            .lifecycle
            .with(|lc| lc.state == ControllerState::Opened);
        if !opened {
            return Err(StateError::InvalidState.into());
        }

        let was_master = self.instances[slot].with(|entry| match entry {
            Some(state) if state.generation == generation => {
                let master = state.is_master;
                *entry = None;
                Ok(master)
            }
            _ => Err(RequestError::InvalidParameter),
        })?;

        let last = self.lifecycle.with(|lc| {
            lc.occupied[slot] = false;
            lc.open_count = lc.open_count.saturating_sub(1);
            if lc.master.is_some_and(|m| m.slot == slot) {
                lc.master = None;
            }
            if lc.open_count == 0 {
                lc.state = ControllerState::Closed;
            }
            lc.open_count == 0
        });

        if was_master {
            self.irq.with(|tables| tables.allocated_tccs.clear());
        }
        if last {
            self.bound.with(BoundTable::reset);
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "EDMA3 controller {}: instance {} closed (last={})",
            self.id,
            slot,
            last
        );

        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Controller id in its registry
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> ControllerState {
        self.lifecycle.with(|lc| lc.state)
    }

    /// Number of open instances
    pub fn open_count(&self) -> u32 {
        self.lifecycle.with(|lc| lc.open_count)
    }

    /// Region of the master instance, if one is open
    pub fn master_region(&self) -> Option<u32> {
        self.lifecycle.with(|lc| lc.master.map(|m| m.region))
    }

    /// Whether the controller was created without global region init
    pub fn is_slave(&self) -> bool {
        self.is_slave
    }

    /// The configuration the controller was created with
    ///
    /// Without DCHMAP registers the PaRAM map is the identity.
    pub fn global_config(&self) -> &GlobalConfig {
        &self.config
    }

    /// The register backend
    pub fn registers(&self) -> &R {
        &self.regs
    }

    #[inline]
    pub(crate) fn cc(&self) -> CcRegs<'_, R> {
        CcRegs::new(&self.regs, self.config.cc_base)
    }

    /// Configured number of resources of `kind`
    pub(crate) fn count(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Dma => self.config.num_dma_channels,
            ResourceKind::Qdma => self.config.num_qdma_channels,
            ResourceKind::Tcc => self.config.num_tccs,
            ResourceKind::Param => self.config.num_param_sets,
        }
    }

    /// Whether `channel` names a concrete, configured DMA or QDMA channel
    pub(crate) fn is_channel_in_range(&self, channel: Resource) -> bool {
        match channel {
            Resource::Dma(ch) => ch < self.config.num_dma_channels,
            Resource::Qdma(ch) => ch < self.config.num_qdma_channels,
            Resource::Tcc(_) | Resource::Param(_) => false,
        }
    }

    fn can_delete(&self) -> Result<()> {
        self.lifecycle.with(|lc| match lc.state {
            ControllerState::Created | ControllerState::Closed if lc.open_count == 0 => Ok(()),
            _ => Err(StateError::InvalidState.into()),
        })
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Fixed-capacity table of controllers indexed by controller id.
pub struct ControllerRegistry<R: RegisterAccess, const N: usize = MAX_CONTROLLERS> {
    slots: [Option<Controller<R>>; N],
}

impl<R: RegisterAccess, const N: usize> Default for ControllerRegistry<R, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RegisterAccess, const N: usize> core::fmt::Debug for ControllerRegistry<R, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.slots.iter().flatten()).finish()
    }
}

impl<R: RegisterAccess, const N: usize> ControllerRegistry<R, N> {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; N],
        }
    }

    /// Create controller `id` from `config`.
    ///
    /// Unless `is_slave`, the global registers are initialised: missed
    /// events and CC errors cleared, queue priorities and watermarks set.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for an out-of-range id or invalid configuration
    /// - `InvalidState` if the controller already exists
    pub fn create(
        &mut self,
        id: u32,
        config: GlobalConfig,
        regs: R,
        is_slave: bool,
    ) -> Result<&Controller<R>> {
        let slot = self
            .slots
            .get_mut(id as usize)
            .ok_or(RequestError::InvalidParameter)?;
        if slot.is_some() {
            return Err(StateError::InvalidState.into());
        }
        let controller = Controller::new(id, config, regs, is_slave)?;
        Ok(slot.insert(controller))
    }

    /// Delete controller `id` and return its register backend.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for an out-of-range id
    /// - `InvalidState` if the controller does not exist or has open instances
    pub fn delete(&mut self, id: u32) -> Result<R> {
        let slot = self
            .slots
            .get_mut(id as usize)
            .ok_or(RequestError::InvalidParameter)?;
        slot.as_ref()
            .ok_or(StateError::InvalidState)?
            .can_delete()?;

        let controller = slot.take().ok_or(StateError::InvalidState)?;

        #[cfg(feature = "defmt")]
        defmt::info!("EDMA3 controller {} deleted", id);

        Ok(controller.regs)
    }

    /// Controller `id`
    pub fn controller(&self, id: u32) -> Result<&Controller<R>> {
        self.slots
            .get(id as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| RequestError::InvalidParameter.into())
    }

    /// Lifecycle state of controller `id` (`Deleted` for an empty slot)
    pub fn state(&self, id: u32) -> ControllerState {
        self.slots
            .get(id as usize)
            .and_then(Option::as_ref)
            .map_or(ControllerState::Deleted, Controller::state)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
