//! Testing utilities and mock implementations
//!
//! This module provides a mock register file and recording callbacks for
//! exercising the resource manager on the host without EDMA3 hardware.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::RefCell;
use std::collections::HashMap;
use std::vec::Vec;

use crate::driver::callback::{GlobalError, TccStatus};
use crate::driver::config::{GlobalConfig, InstanceConfig, OpenParams};
use crate::driver::controller::{Controller, ControllerRegistry};
use crate::internal::constants::MAX_REGIONS;
use crate::internal::register::RegisterAccess;
use crate::internal::register::cc::{
    CCERR, CCERRCLR, EMCR, EMCRH, EMR, EMRH, QEMCR, QEMR, SH_ECR, SH_ECRH, SH_EECR, SH_EECRH,
    SH_EER, SH_EERH, SH_ER, SH_ERH, SH_ICR, SH_ICRH, SH_IECR, SH_IECRH, SH_IER, SH_IERH, SH_IESR,
    SH_IESRH, SH_IPR, SH_IPRH, SH_QEECR, SH_QEER, SH_QEESR, SH_QSECR, SH_QSER, SH_SECR, SH_SECRH,
    SH_SER, SH_SERH, SHADOW_BASE, SHADOW_STRIDE,
};
use crate::internal::register::tc::{ERRCLR, ERRSTAT};

// =============================================================================
// Mock Register File
// =============================================================================

/// How a write to an alias register affects its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    /// Writing 1 clears the bit in the target register
    ClearOnOne,
    /// Writing 1 sets the bit in the target register
    SetOnOne,
}

/// Mock register file for testing without hardware
///
/// Unwritten registers read as zero. Writes are recorded in order. Alias
/// registers (write-1-to-clear / write-1-to-set) update their target the way
/// the EDMA3 hardware does, so `ICR` clears `IPR`, `IESR` sets `IER` and so on.
///
/// # Example
///
/// ```ignore
/// let regs = MockRegisters::edma3(CC_BASE, &[TC0_BASE]);
/// regs.set(CC_BASE + 0x2000 + 0x68, 1 << 5); // IPR bit 5 pending
/// regs.write(CC_BASE + 0x2000 + 0x70, 1 << 5); // ICR
/// assert_eq!(regs.get(CC_BASE + 0x2000 + 0x68), 0);
/// ```
#[derive(Debug, Default)]
pub struct MockRegisters {
    /// Register values: address -> value
    registers: RefCell<HashMap<usize, u32>>,
    /// Record of writes: (address, value)
    write_log: RefCell<Vec<(usize, u32)>>,
    /// Alias wiring: alias address -> (target address, kind)
    aliases: HashMap<usize, (usize, AliasKind)>,
}

impl MockRegisters {
    /// Create an empty register file with no aliases
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a register file wired like an EDMA3 channel controller at
    /// `cc_base` with transfer controllers at `tc_bases`.
    pub fn edma3(cc_base: usize, tc_bases: &[usize]) -> Self {
        let mut regs = Self::new();
        regs.alias_clear(cc_base + EMCR, cc_base + EMR);
        regs.alias_clear(cc_base + EMCRH, cc_base + EMRH);
        regs.alias_clear(cc_base + QEMCR, cc_base + QEMR);
        regs.alias_clear(cc_base + CCERRCLR, cc_base + CCERR);

        for region in 0..MAX_REGIONS {
            let sh = cc_base + SHADOW_BASE + SHADOW_STRIDE * region;
            regs.alias_clear(sh + SH_ICR, sh + SH_IPR);
            regs.alias_clear(sh + SH_ICRH, sh + SH_IPRH);
            regs.alias_clear(sh + SH_SECR, sh + SH_SER);
            regs.alias_clear(sh + SH_SECRH, sh + SH_SERH);
            regs.alias_clear(sh + SH_QSECR, sh + SH_QSER);
            regs.alias_set(sh + SH_IESR, sh + SH_IER);
            regs.alias_set(sh + SH_IESRH, sh + SH_IERH);
            regs.alias_clear(sh + SH_IECR, sh + SH_IER);
            regs.alias_clear(sh + SH_IECRH, sh + SH_IERH);
            regs.alias_clear(sh + SH_EECR, sh + SH_EER);
            regs.alias_clear(sh + SH_EECRH, sh + SH_EERH);
            regs.alias_set(sh + SH_QEESR, sh + SH_QEER);
            regs.alias_clear(sh + SH_QEECR, sh + SH_QEER);
            regs.alias_clear(sh + SH_ECR, sh + SH_ER);
            regs.alias_clear(sh + SH_ECRH, sh + SH_ERH);
        }

        for &tc in tc_bases {
            regs.alias_clear(tc + ERRCLR, tc + ERRSTAT);
        }
        regs
    }

    /// Wire `alias` as a write-1-to-clear register for `target`
    pub fn alias_clear(&mut self, alias: usize, target: usize) {
        self.aliases.insert(alias, (target, AliasKind::ClearOnOne));
    }

    /// Wire `alias` as a write-1-to-set register for `target`
    pub fn alias_set(&mut self, alias: usize, target: usize) {
        self.aliases.insert(alias, (target, AliasKind::SetOnOne));
    }

    /// Set a register value without logging a write
    pub fn set(&self, addr: usize, value: u32) {
        self.registers.borrow_mut().insert(addr, value);
    }

    /// Get the current value of a register (for test verification)
    pub fn get(&self, addr: usize) -> u32 {
        self.registers.borrow().get(&addr).copied().unwrap_or(0)
    }

    /// Get all writes that have been made
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.write_log.borrow().clone()
    }

    /// Values written to `addr`, in order
    pub fn writes_to(&self, addr: usize) -> Vec<u32> {
        self.write_log
            .borrow()
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Whether anything was written to `addr`
    pub fn was_written(&self, addr: usize) -> bool {
        self.write_log.borrow().iter().any(|(a, _)| *a == addr)
    }

    /// Clear the write log
    pub fn clear_writes(&self) {
        self.write_log.borrow_mut().clear();
    }
}

impl RegisterAccess for MockRegisters {
    fn read(&self, addr: usize) -> u32 {
        self.get(addr)
    }

    fn write(&self, addr: usize, value: u32) {
        self.write_log.borrow_mut().push((addr, value));
        self.set(addr, value);

        if let Some(&(target, kind)) = self.aliases.get(&addr) {
            let current = self.get(target);
            let updated = match kind {
                AliasKind::ClearOnOne => current & !value,
                AliasKind::SetOnOne => current | value,
            };
            self.set(target, updated);
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Channel controller base used by the fixtures
pub const CC: usize = 0x4900_0000;
/// Transfer controller 0 base used by the fixtures
pub const TC0: usize = 0x4980_0000;
/// Transfer controller 1 base used by the fixtures
pub const TC1: usize = 0x4990_0000;

/// A small controller: 8 DMA, 2 QDMA, 8 TCCs, 16 PaRAM sets, 2 queues,
/// 4 regions, two transfer controllers and no DCHMAP registers.
pub fn small_config() -> GlobalConfig {
    GlobalConfig::new()
        .with_counts(8, 2, 8, 16)
        .with_event_queues(2)
        .with_regions(4)
        .with_cc_base(CC)
        .with_tc(TC0)
        .with_tc(TC1)
        .with_identity_tcc_map()
}

/// Registry with controller 0 created from [`small_config`]
pub fn small_registry() -> ControllerRegistry<MockRegisters> {
    let mut registry = ControllerRegistry::new();
    registry
        .create(0, small_config(), MockRegisters::edma3(CC, &[TC0, TC1]), false)
        .expect("small config is valid");
    registry
}

/// Open parameters owning every resource of `controller`
pub fn all_params(
    controller: &Controller<MockRegisters>,
    region: u32,
    is_master: bool,
) -> OpenParams {
    let config = InstanceConfig::owning_all(controller.global_config());
    OpenParams::new(region, config).with_master(is_master)
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay for testing without actual timing
///
/// Records delays for verification without actually waiting.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Total nanoseconds delayed
    total_ns: RefCell<u64>,
}

impl MockDelay {
    /// Create a new mock delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total microseconds that were "delayed"
    pub fn total_us(&self) -> u64 {
        *self.total_ns.borrow() / 1_000
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.borrow_mut() += ns as u64;
    }
}

// =============================================================================
// Recording Callbacks
// =============================================================================

std::thread_local! {
    static TCC_EVENTS: RefCell<Vec<(u32, TccStatus, usize)>> = const { RefCell::new(Vec::new()) };
    static GLOBAL_EVENTS: RefCell<Vec<(GlobalError, u32, usize)>> = const { RefCell::new(Vec::new()) };
}

/// TCC callback that records every invocation on the current thread
pub fn record_tcc(tcc: u32, status: TccStatus, data: usize) {
    TCC_EVENTS.with(|events| events.borrow_mut().push((tcc, status, data)));
}

/// Drain the TCC events recorded on the current thread
pub fn take_tcc_events() -> Vec<(u32, TccStatus, usize)> {
    TCC_EVENTS.with(|events| core::mem::take(&mut *events.borrow_mut()))
}

/// Global error callback that records every invocation on the current thread
pub fn record_global(error: GlobalError, num: u32, data: usize) {
    GLOBAL_EVENTS.with(|events| events.borrow_mut().push((error, num, data)));
}

/// Drain the global error events recorded on the current thread
pub fn take_global_events() -> Vec<(GlobalError, u32, usize)> {
    GLOBAL_EVENTS.with(|events| core::mem::take(&mut *events.borrow_mut()))
}

// =============================================================================
// Test Assertions
// =============================================================================

/// Assert that a register was written with a specific value
#[macro_export]
macro_rules! assert_reg_written {
    ($regs:expr, $addr:expr, $value:expr) => {
        let writes = $regs.writes();
        assert!(
            writes.iter().any(|w| w.0 == $addr && w.1 == $value),
            "Expected write to 0x{:08X} with value 0x{:08X}, but got: {:X?}",
            $addr,
            $value,
            writes
        );
    };
}

/// Assert the current value of a register
#[macro_export]
macro_rules! assert_reg_eq {
    ($regs:expr, $addr:expr, $value:expr) => {
        assert_eq!(
            $regs.get($addr),
            $value,
            "register 0x{:08X} holds 0x{:08X}, expected 0x{:08X}",
            $addr,
            $regs.get($addr),
            $value
        );
    };
}

/// Assert that a register was never written
#[macro_export]
macro_rules! assert_reg_not_written {
    ($regs:expr, $addr:expr) => {
        assert!(
            !$regs.was_written($addr),
            "Expected no write to 0x{:08X}, but got: {:X?}",
            $addr,
            $regs.writes_to($addr)
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_registers_read_zero() {
        let regs = MockRegisters::new();
        assert_eq!(regs.read(0x1234), 0);
    }

    #[test]
    fn writes_are_logged_in_order() {
        let regs = MockRegisters::new();
        regs.write(0x10, 1);
        regs.write(0x14, 2);
        regs.write(0x10, 3);
        assert_eq!(regs.writes(), [(0x10, 1), (0x14, 2), (0x10, 3)]);
        assert_eq!(regs.writes_to(0x10), [1, 3]);
        regs.clear_writes();
        assert!(regs.writes().is_empty());
    }

    #[test]
    fn clear_alias_clears_target_bits() {
        let regs = MockRegisters::edma3(CC, &[]);
        let ipr = CC + SHADOW_BASE + SH_IPR;
        regs.set(ipr, 0b1110);
        regs.write(CC + SHADOW_BASE + SH_ICR, 0b0100);
        assert_eq!(regs.get(ipr), 0b1010);
    }

    #[test]
    fn set_alias_sets_target_bits() {
        let regs = MockRegisters::edma3(CC, &[]);
        let sh = CC + SHADOW_BASE + SHADOW_STRIDE * 3;
        regs.write(sh + SH_IESRH, 1 << 4);
        assert_eq!(regs.get(sh + SH_IERH), 1 << 4);
        regs.write(sh + SH_IECRH, 1 << 4);
        assert_eq!(regs.get(sh + SH_IERH), 0);
    }

    #[test]
    fn tc_error_clear_alias() {
        let regs = MockRegisters::edma3(CC, &[TC0]);
        regs.set(TC0 + ERRSTAT, 0b1101);
        regs.write(TC0 + ERRCLR, 0b0001);
        assert_eq!(regs.get(TC0 + ERRSTAT), 0b1100);
    }

    #[test]
    fn small_registry_has_one_controller() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        assert_eq!(controller.global_config().num_tcs, 2);
        assert!(registry.controller(1).is_err());

        let params = all_params(controller, 3, true);
        assert_eq!(params.config.own_param_sets[0], 0xFFFF);
        assert!(params.is_master);
    }

    #[test]
    fn recorders_drain() {
        record_tcc(3, TccStatus::TransferComplete, 7);
        assert_eq!(take_tcc_events(), [(3, TccStatus::TransferComplete, 7)]);
        assert!(take_tcc_events().is_empty());
    }
}
