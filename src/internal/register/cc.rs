//! Channel Controller (TPCC) Register Definitions
//!
//! The channel controller holds the global registers (channel maps, region
//! access enables, error status), one shadow register window per region and
//! the PaRAM descriptor memory.
//!
//! # Memory Map
//!
//! | Offset   | Block                                   |
//! |----------|-----------------------------------------|
//! | `0x0000` | Global registers                        |
//! | `0x2000` | Shadow region 0 (`0x200` per region)    |
//! | `0x4000` | PaRAM sets (32 bytes each)              |

use super::{RegisterAccess, reg_ro, reg_rw, reg_wo};
use crate::internal::constants::{MAX_PARAM_SETS, PARAM_SET_SIZE};

// =============================================================================
// Global Register Offsets
// =============================================================================

/// Peripheral ID register offset
pub const PID: usize = 0x000;
/// CC configuration register offset
pub const CCCFG: usize = 0x004;
/// DMA channel n to PaRAM mapping registers (`DCHMAP[n]`)
pub const DCHMAP: usize = 0x100;
/// QDMA channel n to PaRAM mapping registers (`QCHMAP[n]`)
pub const QCHMAP: usize = 0x200;
/// Queue priority register offset
pub const QUEPRI: usize = 0x284;
/// Event missed register (channels 0-31)
pub const EMR: usize = 0x300;
/// Event missed register (channels 32-63)
pub const EMRH: usize = 0x304;
/// Event missed clear register (channels 0-31)
pub const EMCR: usize = 0x308;
/// Event missed clear register (channels 32-63)
pub const EMCRH: usize = 0x30C;
/// QDMA event missed register
pub const QEMR: usize = 0x310;
/// QDMA event missed clear register
pub const QEMCR: usize = 0x314;
/// CC error register
pub const CCERR: usize = 0x318;
/// CC error clear register
pub const CCERRCLR: usize = 0x31C;
/// Error evaluate register
pub const EEVAL: usize = 0x320;
/// DMA region access enable for region n, channels 0-31 (`DRAE[n]`, stride 8)
pub const DRAE: usize = 0x340;
/// DMA region access enable for region n, channels 32-63 (`DRAEH[n]`, stride 8)
pub const DRAEH: usize = 0x344;
/// QDMA region access enable for region n (`QRAE[n]`, stride 4)
pub const QRAE: usize = 0x380;
/// Queue watermark threshold A register (queues 0-3)
pub const QWMTHRA: usize = 0x620;
/// CC status register
pub const CCSTAT: usize = 0x640;

/// First shadow region window
pub const SHADOW_BASE: usize = 0x2000;
/// Size of one shadow region window
pub const SHADOW_STRIDE: usize = 0x200;
/// First PaRAM set
pub const PARAM_BASE: usize = 0x4000;
/// Size of the whole channel controller register block
pub const CC_BLOCK_SIZE: usize = PARAM_BASE + MAX_PARAM_SETS * PARAM_SET_SIZE;

// =============================================================================
// Shadow Region Register Offsets (relative to the window)
// =============================================================================

/// Event register (channels 0-31)
pub const SH_ER: usize = 0x00;
/// Event register (channels 32-63)
pub const SH_ERH: usize = 0x04;
/// Event clear register (channels 0-31)
pub const SH_ECR: usize = 0x08;
/// Event clear register (channels 32-63)
pub const SH_ECRH: usize = 0x0C;
/// Event enable register (channels 0-31)
pub const SH_EER: usize = 0x20;
/// Event enable register (channels 32-63)
pub const SH_EERH: usize = 0x24;
/// Event enable clear register (channels 0-31)
pub const SH_EECR: usize = 0x28;
/// Event enable clear register (channels 32-63)
pub const SH_EECRH: usize = 0x2C;
/// Secondary event register (channels 0-31)
pub const SH_SER: usize = 0x38;
/// Secondary event register (channels 32-63)
pub const SH_SERH: usize = 0x3C;
/// Secondary event clear register (channels 0-31)
pub const SH_SECR: usize = 0x40;
/// Secondary event clear register (channels 32-63)
pub const SH_SECRH: usize = 0x44;
/// Interrupt enable register (TCCs 0-31)
pub const SH_IER: usize = 0x50;
/// Interrupt enable register (TCCs 32-63)
pub const SH_IERH: usize = 0x54;
/// Interrupt enable clear register (TCCs 0-31)
pub const SH_IECR: usize = 0x58;
/// Interrupt enable clear register (TCCs 32-63)
pub const SH_IECRH: usize = 0x5C;
/// Interrupt enable set register (TCCs 0-31)
pub const SH_IESR: usize = 0x60;
/// Interrupt enable set register (TCCs 32-63)
pub const SH_IESRH: usize = 0x64;
/// Interrupt pending register (TCCs 0-31)
pub const SH_IPR: usize = 0x68;
/// Interrupt pending register (TCCs 32-63)
pub const SH_IPRH: usize = 0x6C;
/// Interrupt clear register (TCCs 0-31)
pub const SH_ICR: usize = 0x70;
/// Interrupt clear register (TCCs 32-63)
pub const SH_ICRH: usize = 0x74;
/// Interrupt evaluate register
pub const SH_IEVAL: usize = 0x78;
/// QDMA event enable register
pub const SH_QEER: usize = 0x84;
/// QDMA event enable clear register
pub const SH_QEECR: usize = 0x88;
/// QDMA event enable set register
pub const SH_QEESR: usize = 0x8C;
/// QDMA secondary event register
pub const SH_QSER: usize = 0x90;
/// QDMA secondary event clear register
pub const SH_QSECR: usize = 0x94;

// =============================================================================
// Bit Fields
// =============================================================================

/// DCHMAP/QCHMAP PaRAM entry field mask
pub const CHMAP_PAENTRY_MASK: u32 = 0x3FE0;
/// DCHMAP/QCHMAP PaRAM entry field shift
pub const CHMAP_PAENTRY_SHIFT: u32 = 5;
/// QCHMAP trigger word field mask
pub const QCHMAP_TRWORD_MASK: u32 = 0x1C;
/// QCHMAP trigger word field shift
pub const QCHMAP_TRWORD_SHIFT: u32 = 2;

/// QUEPRI priority field mask for queue 0
pub const QUEPRI_PRIQ0_MASK: u32 = 0x7;
/// QUEPRI field stride per queue
pub const QUEPRI_SHIFT_PER_QUEUE: u32 = 4;

/// QWMTHRA watermark field mask for queue 0
pub const QWMTHR_Q0_MASK: u32 = 0x1F;
/// QWMTHRA field stride per queue
pub const QWMTHR_SHIFT_PER_QUEUE: u32 = 8;

/// CCERR queue threshold exceeded bits (one per event queue)
pub const CCERR_QTHRXCD_MASK: u32 = 0xFF;
/// CCERR transfer completion code error bit
pub const CCERR_TCCERR: u32 = 1 << 16;
/// Value written to CCERRCLR to clear every error
pub const CCERRCLR_ALL: u32 = 0xFFFF;

/// Evaluate bit for EEVAL / IEVAL
pub const EVAL: u32 = 1 << 0;

// =============================================================================
// PaRAM Set Layout
// =============================================================================

/// Options word offset in a PaRAM set
pub const PARAM_OPT: usize = 0x00;
/// LINK / BCNTRLD word offset in a PaRAM set
pub const PARAM_LINK_BCNTRLD: usize = 0x14;

/// OPT transfer completion code field mask
pub const OPT_TCC_MASK: u32 = 0x0003_F000;
/// OPT transfer completion code field shift
pub const OPT_TCC_SHIFT: u32 = 12;
/// OPT transfer complete chaining enable
pub const OPT_TCCHEN: u32 = 1 << 22;
/// OPT intermediate transfer complete chaining enable
pub const OPT_ITCCHEN: u32 = 1 << 23;

/// LINK field mask inside LINK_BCNTRLD
pub const LINK_MASK: u32 = 0xFFFF;
/// LINK value meaning "no link" (the NULL PaRAM set)
pub const LINK_NULL: u32 = 0xFFFF;

// =============================================================================
// Field Helpers
// =============================================================================

/// Insert a PaRAM id into a DCHMAP/QCHMAP value
#[inline(always)]
pub const fn chmap_with_param(value: u32, param: u32) -> u32 {
    (value & !CHMAP_PAENTRY_MASK)
        | ((param & (CHMAP_PAENTRY_MASK >> CHMAP_PAENTRY_SHIFT)) << CHMAP_PAENTRY_SHIFT)
}

/// Insert a trigger word index into a QCHMAP value
#[inline(always)]
pub const fn qchmap_with_trigger(value: u32, word: u32) -> u32 {
    (value & !QCHMAP_TRWORD_MASK)
        | ((word & (QCHMAP_TRWORD_MASK >> QCHMAP_TRWORD_SHIFT)) << QCHMAP_TRWORD_SHIFT)
}

/// Insert a TCC into a PaRAM OPT word
#[inline(always)]
pub const fn opt_with_tcc(opt: u32, tcc: u32) -> u32 {
    (opt & !OPT_TCC_MASK) | ((tcc & (OPT_TCC_MASK >> OPT_TCC_SHIFT)) << OPT_TCC_SHIFT)
}

/// Extract the TCC from a PaRAM OPT word
#[inline(always)]
pub const fn opt_tcc(opt: u32) -> u32 {
    (opt & OPT_TCC_MASK) >> OPT_TCC_SHIFT
}

/// Split a bit index into (register selector, mask) for low/high register pairs
///
/// Returns `false` for the low register (bits 0-31), `true` for the high one.
#[inline(always)]
pub const fn split_bit(bit: u32) -> (bool, u32) {
    if bit < 32 {
        (false, 1 << bit)
    } else {
        (true, 1 << (bit - 32))
    }
}

// =============================================================================
// Channel Controller View
// =============================================================================

/// Typed view over the channel controller global registers.
#[derive(Debug)]
pub struct CcRegs<'a, R: RegisterAccess> {
    regs: &'a R,
    base: usize,
}

impl<'a, R: RegisterAccess> CcRegs<'a, R> {
    /// Create a view for a channel controller at `base`.
    #[inline(always)]
    pub const fn new(regs: &'a R, base: usize) -> Self {
        Self { regs, base }
    }

    /// Base address of the block.
    #[inline(always)]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        self.regs.read(self.base + offset)
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        self.regs.write(self.base + offset, value);
    }

    /// Read the register at a raw byte offset.
    #[inline(always)]
    pub fn read_offset(&self, offset: usize) -> u32 {
        self.read(offset)
    }

    /// Write the register at a raw byte offset.
    #[inline(always)]
    pub fn write_offset(&self, offset: usize, value: u32) {
        self.write(offset, value);
    }

    reg_ro!(pid, PID, "peripheral ID register");
    reg_ro!(cccfg, CCCFG, "CC configuration register");
    reg_rw!(quepri, set_quepri, QUEPRI, "queue priority register");
    reg_ro!(emr, EMR, "event missed register (channels 0-31)");
    reg_ro!(emrh, EMRH, "event missed register (channels 32-63)");
    reg_wo!(set_emcr, EMCR, "event missed clear register (channels 0-31)");
    reg_wo!(set_emcrh, EMCRH, "event missed clear register (channels 32-63)");
    reg_ro!(qemr, QEMR, "QDMA event missed register");
    reg_wo!(set_qemcr, QEMCR, "QDMA event missed clear register");
    reg_ro!(ccerr, CCERR, "CC error register");
    reg_wo!(set_ccerrclr, CCERRCLR, "CC error clear register");
    reg_wo!(set_eeval, EEVAL, "error evaluate register");
    reg_rw!(qwmthra, set_qwmthra, QWMTHRA, "queue watermark threshold A register");
    reg_ro!(ccstat, CCSTAT, "CC status register");

    /// Program the priority of event queue `queue` in QUEPRI
    pub fn set_queue_priority(&self, queue: u32, priority: u32) {
        let shift = QUEPRI_SHIFT_PER_QUEUE * queue;
        self.regs.modify(self.base + QUEPRI, |v| {
            (v & !(QUEPRI_PRIQ0_MASK << shift)) | ((priority & QUEPRI_PRIQ0_MASK) << shift)
        });
    }

    /// Program the watermark of event queue `queue` (QWMTHRA for 0-3, QWMTHRB for 4-7)
    pub fn set_queue_watermark(&self, queue: u32, watermark: u32) {
        let offset = QWMTHRA + 4 * (queue as usize / 4);
        let shift = QWMTHR_SHIFT_PER_QUEUE * (queue % 4);
        self.regs.modify(self.base + offset, |v| {
            (v & !(QWMTHR_Q0_MASK << shift)) | ((watermark & QWMTHR_Q0_MASK) << shift)
        });
    }

    /// Read `DCHMAP[channel]`
    #[inline(always)]
    pub fn dchmap(&self, channel: u32) -> u32 {
        self.read(DCHMAP + 4 * channel as usize)
    }

    /// Write `DCHMAP[channel]`
    #[inline(always)]
    pub fn set_dchmap(&self, channel: u32, value: u32) {
        self.write(DCHMAP + 4 * channel as usize, value);
    }

    /// Read `QCHMAP[channel]`
    #[inline(always)]
    pub fn qchmap(&self, channel: u32) -> u32 {
        self.read(QCHMAP + 4 * channel as usize)
    }

    /// Write `QCHMAP[channel]`
    #[inline(always)]
    pub fn set_qchmap(&self, channel: u32, value: u32) {
        self.write(QCHMAP + 4 * channel as usize, value);
    }

    /// Offset of the DRAE (or DRAEH when `high`) register for `region`
    #[inline(always)]
    const fn drae_offset(region: u32, high: bool) -> usize {
        (if high { DRAEH } else { DRAE }) + 8 * region as usize
    }

    /// Read the region access enable register covering DMA bit `high`
    #[inline(always)]
    pub fn drae(&self, region: u32, high: bool) -> u32 {
        self.read(Self::drae_offset(region, high))
    }

    /// Write the region access enable register covering DMA bit `high`
    #[inline(always)]
    pub fn set_drae(&self, region: u32, high: bool, value: u32) {
        self.write(Self::drae_offset(region, high), value);
    }

    /// Grant `region` access to DMA channel / TCC `bit`
    pub fn enable_dma_region_bit(&self, region: u32, bit: u32) {
        let (high, mask) = split_bit(bit);
        self.regs
            .modify(self.base + Self::drae_offset(region, high), |v| v | mask);
    }

    /// Revoke `region` access to DMA channel / TCC `bit`
    pub fn disable_dma_region_bit(&self, region: u32, bit: u32) {
        let (high, mask) = split_bit(bit);
        self.regs
            .modify(self.base + Self::drae_offset(region, high), |v| v & !mask);
    }

    /// Read `QRAE[region]`
    #[inline(always)]
    pub fn qrae(&self, region: u32) -> u32 {
        self.read(QRAE + 4 * region as usize)
    }

    /// Write `QRAE[region]`
    #[inline(always)]
    pub fn set_qrae(&self, region: u32, value: u32) {
        self.write(QRAE + 4 * region as usize, value);
    }

    /// Grant `region` access to QDMA channel `channel`
    pub fn enable_qdma_region_bit(&self, region: u32, channel: u32) {
        self.regs
            .modify(self.base + QRAE + 4 * region as usize, |v| v | (1 << channel));
    }

    /// Revoke `region` access to QDMA channel `channel`
    pub fn disable_qdma_region_bit(&self, region: u32, channel: u32) {
        self.regs
            .modify(self.base + QRAE + 4 * region as usize, |v| v & !(1 << channel));
    }

    /// Whether DMA channel `channel` has a missed event latched
    pub fn event_missed(&self, channel: u32) -> bool {
        let (high, mask) = split_bit(channel);
        let value = if high { self.emrh() } else { self.emr() };
        value & mask != 0
    }

    /// Clear the missed event latch of DMA channel `channel`
    pub fn clear_event_missed(&self, channel: u32) {
        let (high, mask) = split_bit(channel);
        if high {
            self.set_emcrh(mask);
        } else {
            self.set_emcr(mask);
        }
    }

    /// Shadow register window for `region`
    #[inline(always)]
    pub const fn shadow(&self, region: u32) -> ShadowRegs<'a, R> {
        ShadowRegs {
            regs: self.regs,
            base: self.base + SHADOW_BASE + SHADOW_STRIDE * region as usize,
        }
    }

    /// Absolute address of PaRAM set `id`
    #[inline(always)]
    pub const fn param_address(&self, id: u32) -> usize {
        self.base + PARAM_BASE + PARAM_SET_SIZE * id as usize
    }

    /// Read word `word` of PaRAM set `id`
    #[inline(always)]
    pub fn param_word(&self, id: u32, word: usize) -> u32 {
        self.regs.read(self.param_address(id) + 4 * word)
    }

    /// Write word `word` of PaRAM set `id`
    #[inline(always)]
    pub fn set_param_word(&self, id: u32, word: usize, value: u32) {
        self.regs.write(self.param_address(id) + 4 * word, value);
    }

    /// Read-modify-write a word of PaRAM set `id` at byte offset `offset`
    pub fn modify_param<F>(&self, id: u32, offset: usize, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        self.regs.modify(self.param_address(id) + offset, f);
    }
}

// =============================================================================
// Shadow Region View
// =============================================================================

/// Typed view over one region's shadow register window.
#[derive(Debug)]
pub struct ShadowRegs<'a, R: RegisterAccess> {
    regs: &'a R,
    base: usize,
}

impl<R: RegisterAccess> ShadowRegs<'_, R> {
    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        self.regs.read(self.base + offset)
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        self.regs.write(self.base + offset, value);
    }

    reg_wo!(set_ecr, SH_ECR, "event clear register (channels 0-31)");
    reg_wo!(set_ecrh, SH_ECRH, "event clear register (channels 32-63)");
    reg_wo!(set_eecr, SH_EECR, "event enable clear register (channels 0-31)");
    reg_wo!(set_eecrh, SH_EECRH, "event enable clear register (channels 32-63)");
    reg_ro!(ser, SH_SER, "secondary event register (channels 0-31)");
    reg_ro!(serh, SH_SERH, "secondary event register (channels 32-63)");
    reg_wo!(set_secr, SH_SECR, "secondary event clear register (channels 0-31)");
    reg_wo!(set_secrh, SH_SECRH, "secondary event clear register (channels 32-63)");
    reg_ro!(ier, SH_IER, "interrupt enable register (TCCs 0-31)");
    reg_ro!(ierh, SH_IERH, "interrupt enable register (TCCs 32-63)");
    reg_wo!(set_iecr, SH_IECR, "interrupt enable clear register (TCCs 0-31)");
    reg_wo!(set_iecrh, SH_IECRH, "interrupt enable clear register (TCCs 32-63)");
    reg_wo!(set_iesr, SH_IESR, "interrupt enable set register (TCCs 0-31)");
    reg_wo!(set_iesrh, SH_IESRH, "interrupt enable set register (TCCs 32-63)");
    reg_ro!(ipr, SH_IPR, "interrupt pending register (TCCs 0-31)");
    reg_ro!(iprh, SH_IPRH, "interrupt pending register (TCCs 32-63)");
    reg_wo!(set_icr, SH_ICR, "interrupt clear register (TCCs 0-31)");
    reg_wo!(set_icrh, SH_ICRH, "interrupt clear register (TCCs 32-63)");
    reg_wo!(set_ieval, SH_IEVAL, "interrupt evaluate register");
    reg_ro!(qeer, SH_QEER, "QDMA event enable register");
    reg_wo!(set_qeecr, SH_QEECR, "QDMA event enable clear register");
    reg_wo!(set_qeesr, SH_QEESR, "QDMA event enable set register");
    reg_ro!(qser, SH_QSER, "QDMA secondary event register");
    reg_wo!(set_qsecr, SH_QSECR, "QDMA secondary event clear register");

    /// Disable event triggering for DMA channel `channel`
    pub fn disable_event(&self, channel: u32) {
        let (high, mask) = split_bit(channel);
        if high {
            self.set_eecrh(mask);
        } else {
            self.set_eecr(mask);
        }
    }

    /// Whether DMA channel `channel` has a secondary event latched
    pub fn secondary_event(&self, channel: u32) -> bool {
        let (high, mask) = split_bit(channel);
        let value = if high { self.serh() } else { self.ser() };
        value & mask != 0
    }

    /// Clear the secondary event latch of DMA channel `channel`
    pub fn clear_secondary_event(&self, channel: u32) {
        let (high, mask) = split_bit(channel);
        if high {
            self.set_secrh(mask);
        } else {
            self.set_secr(mask);
        }
    }

    /// Enable the completion interrupt of `tcc`
    pub fn enable_interrupt(&self, tcc: u32) {
        let (high, mask) = split_bit(tcc);
        if high {
            self.set_iesrh(mask);
        } else {
            self.set_iesr(mask);
        }
    }

    /// Disable the completion interrupt of `tcc`
    pub fn disable_interrupt(&self, tcc: u32) {
        let (high, mask) = split_bit(tcc);
        if high {
            self.set_iecrh(mask);
        } else {
            self.set_iecr(mask);
        }
    }

    /// Whether the completion of `tcc` is pending
    pub fn interrupt_pending(&self, tcc: u32) -> bool {
        let (high, mask) = split_bit(tcc);
        let value = if high { self.iprh() } else { self.ipr() };
        value & mask != 0
    }

    /// Clear the pending completion of `tcc`
    pub fn clear_interrupt(&self, tcc: u32) {
        let (high, mask) = split_bit(tcc);
        if high {
            self.set_icrh(mask);
        } else {
            self.set_icr(mask);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
