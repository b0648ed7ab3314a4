//! PaRAM set contents and access.
//!
//! A PaRAM set is the 32-byte transfer descriptor the channel controller
//! reads when a channel is triggered:
//!
//! ```text
//! +0x00  OPT            +0x10  SRC_DST_BIDX
//! +0x04  SRC            +0x14  LINK_BCNTRLD
//! +0x08  A_B_CNT        +0x18  SRC_DST_CIDX
//! +0x0C  DST            +0x1C  CCNT
//! ```

use super::error::Result;
use super::instance::Instance;
use super::resource::Resource;
use crate::internal::constants::{PARAM_SET_SIZE, PARAM_SET_WORDS};
use crate::internal::register::RegisterAccess;
use crate::internal::register::cc::{LINK_MASK, opt_tcc, opt_with_tcc};

/// Contents of one PaRAM set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParamSet {
    /// Transfer options (TCC, chaining, interrupt enables)
    pub opt: u32,
    /// Source address
    pub src: u32,
    /// BCNT in the upper half, ACNT in the lower half
    pub a_b_cnt: u32,
    /// Destination address
    pub dst: u32,
    /// DSTBIDX in the upper half, SRCBIDX in the lower half
    pub src_dst_bidx: u32,
    /// BCNTRLD in the upper half, LINK in the lower half
    pub link_bcntrld: u32,
    /// DSTCIDX in the upper half, SRCCIDX in the lower half
    pub src_dst_cidx: u32,
    /// C count
    pub ccnt: u32,
}

impl ParamSet {
    /// Set from the eight words in hardware order
    #[must_use]
    pub const fn from_words(words: [u32; PARAM_SET_WORDS]) -> Self {
        Self {
            opt: words[0],
            src: words[1],
            a_b_cnt: words[2],
            dst: words[3],
            src_dst_bidx: words[4],
            link_bcntrld: words[5],
            src_dst_cidx: words[6],
            ccnt: words[7],
        }
    }

    /// The eight words in hardware order
    #[must_use]
    pub const fn to_words(&self) -> [u32; PARAM_SET_WORDS] {
        [
            self.opt,
            self.src,
            self.a_b_cnt,
            self.dst,
            self.src_dst_bidx,
            self.link_bcntrld,
            self.src_dst_cidx,
            self.ccnt,
        ]
    }

    /// Set from its 32-byte little-endian image
    #[must_use]
    pub fn from_bytes(bytes: &[u8; PARAM_SET_SIZE]) -> Self {
        let mut words = [0u32; PARAM_SET_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self::from_words(words)
    }

    /// 32-byte little-endian image of the set
    #[must_use]
    pub fn to_bytes(&self) -> [u8; PARAM_SET_SIZE] {
        let mut bytes = [0u8; PARAM_SET_SIZE];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(self.to_words()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    /// Byte address of the linked set (`0xFFFF` for none)
    #[must_use]
    pub const fn link(&self) -> u32 {
        self.link_bcntrld & LINK_MASK
    }

    /// Same set with a different link, BCNTRLD kept
    #[must_use]
    pub const fn with_link(mut self, link: u32) -> Self {
        self.link_bcntrld = (self.link_bcntrld & !LINK_MASK) | (link & LINK_MASK);
        self
    }

    /// Completion code programmed in OPT
    #[must_use]
    pub const fn tcc(&self) -> u32 {
        opt_tcc(self.opt)
    }

    /// Same set with a different completion code
    #[must_use]
    pub const fn with_tcc(mut self, tcc: u32) -> Self {
        self.opt = opt_with_tcc(self.opt, tcc);
        self
    }
}

impl<R: RegisterAccess> Instance<'_, R> {
    /// Write all eight words of the PaRAM set behind `channel`.
    ///
    /// `channel` is an allocated DMA/QDMA logical channel or a link channel
    /// (`Resource::Param`) of this instance.
    pub fn set_param(&self, channel: Resource, set: &ParamSet) -> Result<()> {
        let param = self.resolve_param(channel)?;
        let cc = self.controller.cc();
        for (index, word) in set.to_words().into_iter().enumerate() {
            cc.set_param_word(param, index, word);
        }
        Ok(())
    }

    /// Read the PaRAM set behind `channel`
    pub fn get_param(&self, channel: Resource) -> Result<ParamSet> {
        let param = self.resolve_param(channel)?;
        let cc = self.controller.cc();
        let mut words = [0u32; PARAM_SET_WORDS];
        for (index, word) in words.iter_mut().enumerate() {
            *word = cc.param_word(param, index);
        }
        Ok(ParamSet::from_words(words))
    }

    /// Bus address of the PaRAM set behind `channel`
    pub fn param_physical_address(&self, channel: Resource) -> Result<usize> {
        let param = self.resolve_param(channel)?;
        Ok(self.controller.cc().param_address(param))
    }
}
