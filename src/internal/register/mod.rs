//! Memory-mapped register access for the EDMA3 controller.
//!
//! All hardware access funnels through the [`RegisterAccess`] trait so the
//! allocator, composer and interrupt handlers never dereference raw pointers.
//! The [`Mmio`] backend performs volatile accesses on real hardware; tests
//! substitute a mock register file.
//!
//! Typed views ([`cc::CcRegs`], [`cc::ShadowRegs`], [`tc::TcRegs`]) turn
//! register offsets into named accessors.

pub mod cc;
pub mod tc;

// =============================================================================
// Register Access Trait
// =============================================================================

/// Narrow 32-bit register access interface.
///
/// Addresses are absolute. Implementations decide how an address reaches the
/// hardware (volatile MMIO, a simulator, a mock).
pub trait RegisterAccess {
    /// Read the 32-bit register at `addr`.
    fn read(&self, addr: usize) -> u32;

    /// Write `value` to the 32-bit register at `addr`.
    fn write(&self, addr: usize, value: u32);

    /// Read-modify-write the register at `addr`.
    #[inline]
    fn modify<F>(&self, addr: usize, f: F)
    where
        F: FnOnce(u32) -> u32,
        Self: Sized,
    {
        let value = self.read(addr);
        self.write(addr, f(value));
    }

    /// Set `bits` in the register at `addr` (read-modify-write).
    #[inline]
    fn set_bits(&self, addr: usize, bits: u32)
    where
        Self: Sized,
    {
        self.modify(addr, |v| v | bits);
    }

    /// Clear `bits` in the register at `addr` (read-modify-write).
    #[inline]
    fn clear_bits(&self, addr: usize, bits: u32)
    where
        Self: Sized,
    {
        self.modify(addr, |v| v & !bits);
    }
}

impl<T: RegisterAccess> RegisterAccess for &T {
    #[inline(always)]
    fn read(&self, addr: usize) -> u32 {
        (**self).read(addr)
    }

    #[inline(always)]
    fn write(&self, addr: usize, value: u32) {
        (**self).write(addr, value);
    }
}

// =============================================================================
// Volatile MMIO Backend
// =============================================================================

/// Volatile memory-mapped register backend.
///
/// Register addresses come from the controller's
/// [`GlobalConfig`](crate::GlobalConfig) base addresses.
#[derive(Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Create the MMIO backend.
    ///
    /// # Safety
    ///
    /// Every base address placed in the [`GlobalConfig`](crate::GlobalConfig)
    /// used with this backend must point at the mapped, 4-byte aligned EDMA3
    /// channel controller and transfer controller register blocks.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterAccess for Mmio {
    #[inline(always)]
    fn read(&self, addr: usize) -> u32 {
        // SAFETY: the constructor contract guarantees the address is valid MMIO
        unsafe { read_reg(addr) }
    }

    #[inline(always)]
    fn write(&self, addr: usize, value: u32) {
        // SAFETY: the constructor contract guarantees the address is valid MMIO
        unsafe { write_reg(addr, value) }
    }
}

/// Read a 32-bit register at the given address
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn read_reg(addr: usize) -> u32 {
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

/// Write a 32-bit value to a register at the given address
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn write_reg(addr: usize, value: u32) {
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
}

// =============================================================================
// Register Accessor Macros
// =============================================================================

/// Generate read/write accessor methods for a register in a view.
///
/// The view must provide `read(&self, offset)` and `write(&self, offset, value)`.
///
/// # Example
/// ```ignore
/// impl<R: RegisterAccess> CcRegs<'_, R> {
///     reg_rw!(quepri, set_quepri, QUEPRI, "queue priority register");
/// }
/// ```
macro_rules! reg_rw {
    ($read_fn:ident, $write_fn:ident, $offset:expr, $doc:expr) => {
        #[doc = concat!("Read ", $doc)]
        #[inline(always)]
        pub fn $read_fn(&self) -> u32 {
            self.read($offset)
        }

        #[doc = concat!("Write ", $doc)]
        #[inline(always)]
        pub fn $write_fn(&self, value: u32) {
            self.write($offset, value)
        }
    };
}

/// Generate a read-only accessor method for a register in a view.
macro_rules! reg_ro {
    ($read_fn:ident, $offset:expr, $doc:expr) => {
        #[doc = concat!("Read ", $doc)]
        #[inline(always)]
        pub fn $read_fn(&self) -> u32 {
            self.read($offset)
        }
    };
}

/// Generate a write-only accessor (write-1-to-set / write-1-to-clear aliases).
macro_rules! reg_wo {
    ($write_fn:ident, $offset:expr, $doc:expr) => {
        #[doc = concat!("Write ", $doc)]
        #[inline(always)]
        pub fn $write_fn(&self, value: u32) {
            self.write($offset, value)
        }
    };
}

// Export macros for use in submodules
pub(crate) use reg_ro;
pub(crate) use reg_rw;
pub(crate) use reg_wo;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRegisters;

    #[test]
    fn modify_reads_then_writes() {
        let regs = MockRegisters::new();
        regs.set(0x100, 0b1010);
        regs.modify(0x100, |v| v << 1);
        assert_eq!(regs.get(0x100), 0b10100);
    }

    #[test]
    fn set_and_clear_bits() {
        let regs = MockRegisters::new();
        regs.set(0x40, 0xF0);
        regs.set_bits(0x40, 0x0F);
        assert_eq!(regs.get(0x40), 0xFF);
        regs.clear_bits(0x40, 0x3C);
        assert_eq!(regs.get(0x40), 0xC3);
    }

    #[test]
    fn reference_forwards_to_backend() {
        let regs = MockRegisters::new();
        let by_ref = &regs;
        by_ref.write(0x8, 7);
        assert_eq!(by_ref.read(0x8), 7);
        assert_eq!(regs.get(0x8), 7);
    }
}
