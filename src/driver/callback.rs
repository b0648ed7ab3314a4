//! Completion and error callbacks.
//!
//! Callbacks are plain function pointers paired with an opaque `usize`. They
//! run synchronously in the context of the interrupt handler that detected
//! the event, so they must not block.

use super::error::{RequestError, Result};
use super::instance::Instance;
use super::resource::Resource;
use crate::internal::bitset::Bitset;
use crate::internal::constants::{MAX_DMA_CHANNELS, MAX_QDMA_CHANNELS, MAX_TCCS, TCC_WORDS};
use crate::internal::register::RegisterAccess;

/// Reason passed to a [`TccCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TccStatus {
    /// The transfer tagged with the TCC completed
    TransferComplete,
    /// A DMA event arrived while the previous one was still pending
    DmaEventMiss,
    /// A QDMA trigger arrived while the previous one was still pending
    QdmaEventMiss,
}

/// Controller-wide fault passed to a [`GlobalErrorCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GlobalError {
    /// Event queue `num` exceeded its watermark
    QueueThresholdExceeded,
    /// Too many outstanding transfer completion codes
    TccError,
    /// Transfer controller `num` reported a bus error on read
    TcReadError,
    /// Transfer controller `num` reported a bus error on write
    TcWriteError,
    /// Transfer controller `num` saw an invalid register access
    TcInvalidAddress,
    /// Transfer controller `num` saw a malformed transfer request
    TcTransferRequestError,
}

/// Per-TCC completion / event-miss callback: `(tcc, status, data)`.
pub type TccCallback = fn(tcc: u32, status: TccStatus, data: usize);

/// Per-instance global error callback: `(error, num, data)`.
///
/// `num` is the event queue or transfer controller index the error refers to.
pub type GlobalErrorCallback = fn(error: GlobalError, num: u32, data: usize);

/// A registered callback and its opaque data.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TccHandler {
    pub(crate) callback: TccCallback,
    pub(crate) data: usize,
}

impl TccHandler {
    #[inline]
    pub(crate) fn invoke(self, tcc: u32, status: TccStatus) {
        (self.callback)(tcc, status, self.data);
    }
}

/// Tables shared between callers and the interrupt handlers.
#[derive(Debug)]
pub(crate) struct IrqTables {
    /// Callback per TCC
    pub(crate) handlers: [Option<TccHandler>; MAX_TCCS],
    /// TCC routed to each DMA channel's error reports
    pub(crate) dma_channel_tcc: [Option<u8>; MAX_DMA_CHANNELS],
    /// TCC routed to each QDMA channel's error reports
    pub(crate) qdma_channel_tcc: [Option<u8>; MAX_QDMA_CHANNELS],
    /// TCCs allocated in the master's region (the completion mask)
    pub(crate) allocated_tccs: Bitset<TCC_WORDS>,
}

impl IrqTables {
    pub(crate) const fn new() -> Self {
        Self {
            handlers: [None; MAX_TCCS],
            dma_channel_tcc: [None; MAX_DMA_CHANNELS],
            qdma_channel_tcc: [None; MAX_QDMA_CHANNELS],
            allocated_tccs: Bitset::new(),
        }
    }

    /// Slot recording the TCC of a channel descriptor
    fn channel_slot(&mut self, channel: Resource) -> Option<&mut Option<u8>> {
        match channel {
            Resource::Dma(ch) => self.dma_channel_tcc.get_mut(ch as usize),
            Resource::Qdma(ch) => self.qdma_channel_tcc.get_mut(ch as usize),
            Resource::Tcc(_) | Resource::Param(_) => None,
        }
    }

    /// Handler routed to DMA channel `channel`, with its TCC
    pub(crate) fn dma_route(&self, channel: u32) -> Option<(u32, Option<TccHandler>)> {
        let tcc = (*self.dma_channel_tcc.get(channel as usize)?)? as u32;
        Some((tcc, self.handlers[tcc as usize]))
    }

    /// Handler routed to QDMA channel `channel`, with its TCC
    pub(crate) fn qdma_route(&self, channel: u32) -> Option<(u32, Option<TccHandler>)> {
        let tcc = (*self.qdma_channel_tcc.get(channel as usize)?)? as u32;
        Some((tcc, self.handlers[tcc as usize]))
    }
}

// =============================================================================
// Registration
// =============================================================================

impl<R: RegisterAccess> Instance<'_, R> {
    /// Register `callback` for completions of `tcc` and route the error
    /// reports of `channel` to it.
    ///
    /// Enables the TCC's completion interrupt in this instance's region.
    pub fn register_tcc_callback(
        &self,
        channel: Resource,
        tcc: u32,
        callback: TccCallback,
        data: usize,
    ) -> Result<()> {
        let config = self.controller.global_config();
        if tcc >= config.num_tccs || !self.controller.is_channel_in_range(channel) {
            return Err(RequestError::InvalidParameter.into());
        }
        let region = self.region()?;

        self.controller.irq.with(|tables| {
            if tables.handlers[tcc as usize].is_some() {
                return Err(RequestError::CallbackAlreadyRegistered);
            }
            let slot = tables
                .channel_slot(channel)
                .ok_or(RequestError::InvalidParameter)?;
            *slot = Some(tcc as u8);
            tables.handlers[tcc as usize] = Some(TccHandler { callback, data });
            Ok(())
        })?;

        self.controller.cc().shadow(region).enable_interrupt(tcc);
        Ok(())
    }

    /// Drop the callback routed to `channel` and disable its TCC's
    /// completion interrupt.
    pub fn unregister_tcc_callback(&self, channel: Resource) -> Result<()> {
        if !self.controller.is_channel_in_range(channel) {
            return Err(RequestError::InvalidParameter.into());
        }
        let region = self.region()?;

        let tcc = self.controller.irq.with(|tables| {
            let tcc = tables
                .channel_slot(channel)
                .and_then(|slot| slot.take())
                .ok_or(RequestError::InvalidParameter)?;
            Ok::<u32, RequestError>(tcc as u32)
        })?;

        self.controller.cc().shadow(region).disable_interrupt(tcc);
        self.controller
            .irq
            .with(|tables| tables.handlers[tcc as usize] = None);
        Ok(())
    }
}
