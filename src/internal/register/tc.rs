//! Transfer Controller (TPTC) Register Definitions
//!
//! Only the error reporting block is touched by the resource manager: the
//! TC error handler reads `ERRSTAT`/`ERRDET` and acknowledges through `ERRCLR`.

use super::{RegisterAccess, reg_ro, reg_rw, reg_wo};

// =============================================================================
// Register Offsets
// =============================================================================

/// Error status register
pub const ERRSTAT: usize = 0x120;
/// Error enable register
pub const ERREN: usize = 0x124;
/// Error clear register
pub const ERRCLR: usize = 0x128;
/// Error details register
pub const ERRDET: usize = 0x12C;

// =============================================================================
// ERRSTAT / ERRCLR Bits
// =============================================================================

/// Bus error
pub const ERR_BUSERR: u32 = 1 << 0;
/// Transfer request error
pub const ERR_TRERR: u32 = 1 << 2;
/// Memory-mapped register access error
pub const ERR_MMRAERR: u32 = 1 << 3;

/// ERRDET status code field
pub const ERRDET_STAT_MASK: u32 = 0xF;
/// First ERRDET status code reporting a read error
pub const ERRDET_READ_FIRST: u32 = 0x1;
/// Last ERRDET status code reporting a read error
pub const ERRDET_READ_LAST: u32 = 0x7;
/// First ERRDET status code reporting a write error
pub const ERRDET_WRITE_FIRST: u32 = 0x8;
/// Last ERRDET status code reporting a write error
pub const ERRDET_WRITE_LAST: u32 = 0xF;

/// Bus error sub-class decoded from ERRDET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusErrorKind {
    /// Error on the read side of the transfer
    Read,
    /// Error on the write side of the transfer
    Write,
    /// Status code zero (no detail latched)
    Unknown,
}

/// Classify the ERRDET status code.
pub const fn classify_bus_error(errdet: u32) -> BusErrorKind {
    match errdet & ERRDET_STAT_MASK {
        ERRDET_READ_FIRST..=ERRDET_READ_LAST => BusErrorKind::Read,
        ERRDET_WRITE_FIRST..=ERRDET_WRITE_LAST => BusErrorKind::Write,
        _ => BusErrorKind::Unknown,
    }
}

// =============================================================================
// Transfer Controller View
// =============================================================================

/// Typed view over one transfer controller's error registers.
#[derive(Debug)]
pub struct TcRegs<'a, R: RegisterAccess> {
    regs: &'a R,
    base: usize,
}

impl<'a, R: RegisterAccess> TcRegs<'a, R> {
    /// Create a view for a transfer controller at `base`.
    #[inline(always)]
    pub const fn new(regs: &'a R, base: usize) -> Self {
        Self { regs, base }
    }

    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        self.regs.read(self.base + offset)
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        self.regs.write(self.base + offset, value);
    }

    reg_ro!(errstat, ERRSTAT, "error status register");
    reg_rw!(erren, set_erren, ERREN, "error enable register");
    reg_wo!(set_errclr, ERRCLR, "error clear register");
    reg_ro!(errdet, ERRDET, "error details register");
}
