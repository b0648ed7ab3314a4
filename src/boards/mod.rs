//! SoC presets.
//!
//! This module provides ready-made controller and region configurations for
//! known EDMA3 integrations.
//!
//! # Overview
//!
//! A preset encapsulates resource counts, base addresses, channel maps and the
//! default resource split of the host region. It is the canonical starting
//! point for bring-up on that SoC.
//!
//! # Supported SoCs
//!
//! - AM335x (64 DMA, 8 QDMA, 256 PaRAM sets, three transfer controllers)

#[cfg(feature = "am335x")]
#[cfg_attr(docsrs, doc(cfg(feature = "am335x")))]
pub mod am335x;
