//! Interrupt service for the master instance's region.
//!
//! The platform wires three kinds of interrupt line to these handlers:
//!
//! - the master region's completion interrupt → [`Controller::handle_completion`]
//! - the CC error interrupt → [`Controller::handle_cc_error`]
//! - each TC error interrupt → [`Controller::handle_tc_error`]
//!
//! Handlers only act while a master instance is open. Callbacks are looked
//! up under the critical section and invoked after it is released.

use super::callback::{GlobalError, GlobalErrorCallback, TccStatus};
use super::controller::Controller;
use super::error::{RequestError, Result};
use crate::internal::bitset::Bitset;
use crate::internal::constants::{
    CC_ERROR_RETRY_COUNT, COMPLETION_RETRY_COUNT, DMA_WORDS, MAX_INSTANCES, QDMA_WORDS, TCC_WORDS,
};
use crate::internal::register::RegisterAccess;
use crate::internal::register::cc::{CCERR_TCCERR, CcRegs, EVAL, ShadowRegs};
use crate::internal::register::tc::{
    BusErrorKind, ERR_BUSERR, ERR_MMRAERR, ERR_TRERR, TcRegs, classify_bus_error,
};

impl<R: RegisterAccess> Controller<R> {
    // =========================================================================
    // Transfer Completion
    // =========================================================================

    /// Pending completions of TCCs allocated in the master region
    fn pending_completions(&self, shadow: &ShadowRegs<'_, R>) -> Bitset<TCC_WORDS> {
        let allocated = self.irq.with(|tables| tables.allocated_tccs);
        let high = if self.global_config().num_tccs > 32 {
            shadow.iprh()
        } else {
            0
        };
        Bitset::from_words([shadow.ipr(), high]).and(&allocated)
    }

    /// Service the master region's completion interrupt.
    ///
    /// Every pending TCC with a registered callback is cleared and its
    /// callback invoked with [`TccStatus::TransferComplete`]. TCCs without a
    /// callback stay pending for polling. If completions remain after the
    /// retry budget, IEVAL is written so the interrupt fires again.
    pub fn handle_completion(&self) {
        let Some(region) = self.master_region() else {
            return;
        };
        let cc = self.cc();
        let shadow = cc.shadow(region);

        let mut pending = self.pending_completions(&shadow);
        let mut rounds = 0;
        while !pending.is_empty() && rounds < COMPLETION_RETRY_COUNT {
            for tcc in pending.iter() {
                let handler = self.irq.with(|tables| tables.handlers[tcc]);
                if let Some(handler) = handler {
                    shadow.clear_interrupt(tcc as u32);
                    handler.invoke(tcc as u32, TccStatus::TransferComplete);
                }
            }
            rounds += 1;
            pending = self.pending_completions(&shadow);
        }

        if !pending.is_empty() {
            #[cfg(feature = "defmt")]
            defmt::trace!("completions left pending after {} rounds", rounds);
            shadow.set_ieval(EVAL);
        }
    }

    // =========================================================================
    // Channel Controller Errors
    // =========================================================================

    fn cc_error_pending(&self, cc: &CcRegs<'_, R>) -> bool {
        let high = self.global_config().num_tccs > 32 && cc.emrh() != 0;
        cc.emr() != 0 || high || cc.qemr() != 0 || cc.ccerr() != 0
    }

    /// Service the channel controller error interrupt.
    ///
    /// Missed DMA/QDMA events are cleared and reported to the callback of
    /// the TCC routed to the channel. Queue threshold and TCC errors are
    /// broadcast to the global error callbacks of the master region.
    pub fn handle_cc_error(&self) {
        let Some(region) = self.master_region() else {
            return;
        };
        let config = self.global_config();
        let cc = self.cc();
        let shadow = cc.shadow(region);

        let mut rounds = 0;
        while self.cc_error_pending(&cc) {
            if rounds >= CC_ERROR_RETRY_COUNT {
                #[cfg(feature = "defmt")]
                defmt::warn!("CC error still pending after {} rounds", rounds);
                break;
            }

            let high = if config.num_tccs > 32 {
                cc.emrh()
            } else {
                0
            };
            let missed = Bitset::<DMA_WORDS>::from_words([cc.emr(), high]);
            for channel in missed.iter() {
                self.dma_event_missed(&cc, &shadow, channel as u32);
            }

            let missed = Bitset::<QDMA_WORDS>::from_words([cc.qemr()]);
            for channel in missed.iter() {
                self.qdma_event_missed(&cc, &shadow, channel as u32);
            }

            let ccerr = cc.ccerr();
            for queue in 0..config.num_event_queues {
                if ccerr & (1 << queue) != 0 {
                    self.broadcast(GlobalError::QueueThresholdExceeded, queue);
                    cc.set_ccerrclr(1 << queue);
                }
            }
            if ccerr & CCERR_TCCERR != 0 {
                self.broadcast(GlobalError::TccError, 0);
                cc.set_ccerrclr(CCERR_TCCERR);
            }

            rounds += 1;
        }

        cc.set_eeval(EVAL);
    }

    fn dma_event_missed(&self, cc: &CcRegs<'_, R>, shadow: &ShadowRegs<'_, R>, channel: u32) {
        match self.irq.with(|tables| tables.dma_route(channel)) {
            Some((tcc, handler)) => {
                cc.clear_event_missed(channel);
                shadow.clear_secondary_event(channel);
                if let Some(handler) = handler {
                    handler.invoke(tcc, TccStatus::DmaEventMiss);
                }
            }
            None if self.global_config().clear_unowned_errors => {
                #[cfg(feature = "defmt")]
                defmt::debug!("clearing missed event of unrouted DMA channel {}", channel);
                cc.clear_event_missed(channel);
                shadow.clear_secondary_event(channel);
            }
            None => {}
        }
    }

    fn qdma_event_missed(&self, cc: &CcRegs<'_, R>, shadow: &ShadowRegs<'_, R>, channel: u32) {
        match self.irq.with(|tables| tables.qdma_route(channel)) {
            Some((tcc, handler)) => {
                cc.set_qemcr(1 << channel);
                shadow.set_qsecr(1 << channel);
                if let Some(handler) = handler {
                    handler.invoke(tcc, TccStatus::QdmaEventMiss);
                }
            }
            None if self.global_config().clear_unowned_errors => {
                #[cfg(feature = "defmt")]
                defmt::debug!("clearing missed event of unrouted QDMA channel {}", channel);
                cc.set_qemcr(1 << channel);
                shadow.set_qsecr(1 << channel);
            }
            None => {}
        }
    }

    // =========================================================================
    // Transfer Controller Errors
    // =========================================================================

    /// Service the error interrupt of transfer controller `tc`.
    ///
    /// One cause is handled per call, in the order bus error, transfer
    /// request error, register access error; the hardware raises the
    /// interrupt again for the rest.
    pub fn handle_tc_error(&self, tc: u32) -> Result<()> {
        let config = self.global_config();
        let base = match config.tc_bases.get(tc as usize) {
            Some(&base) if tc < config.num_tcs && base != 0 => base,
            _ => return Err(RequestError::InvalidParameter.into()),
        };
        let regs = TcRegs::new(self.registers(), base);

        let status = regs.errstat();
        if status & ERR_BUSERR != 0 {
            match classify_bus_error(regs.errdet()) {
                BusErrorKind::Read => self.broadcast(GlobalError::TcReadError, tc),
                BusErrorKind::Write => self.broadcast(GlobalError::TcWriteError, tc),
                BusErrorKind::Unknown => {}
            }
            regs.set_errclr(ERR_BUSERR);
        } else if status & ERR_TRERR != 0 {
            self.broadcast(GlobalError::TcTransferRequestError, tc);
            regs.set_errclr(ERR_TRERR);
        } else if status & ERR_MMRAERR != 0 {
            self.broadcast(GlobalError::TcInvalidAddress, tc);
            regs.set_errclr(ERR_MMRAERR);
        }
        Ok(())
    }

    /// Invoke the global error callback of every instance in the master region
    pub(crate) fn broadcast(&self, error: GlobalError, num: u32) {
        let Some(region) = self.master_region() else {
            return;
        };

        #[cfg(feature = "defmt")]
        defmt::warn!("EDMA3 controller {}: {} ({})", self.id(), error, num);

        let mut targets: [Option<(GlobalErrorCallback, usize)>; MAX_INSTANCES] =
            [None; MAX_INSTANCES];
        for (cell, target) in self.instances.iter().zip(targets.iter_mut()) {
            *target = cell.with(|entry| {
                entry
                    .as_ref()
                    .filter(|state| state.region == region)
                    .and_then(|state| state.global_error)
            });
        }

        for (callback, data) in targets.into_iter().flatten() {
            callback(error, num, data);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::driver::callback::{GlobalError, TccStatus};
    use crate::driver::resource::Resource;
    use crate::internal::constants::ANY;
    use crate::internal::register::cc::{
        CCERR, EEVAL, EMCRH, EMR, EMRH, QEMR, SH_IEVAL, SH_IPR, SH_QSECR, SH_SECR, SHADOW_BASE, SHADOW_STRIDE,
    };
    use crate::internal::register::tc::{ERRDET, ERRSTAT};
    use crate::testing::{
        CC, MockRegisters, TC0, TC1, all_params, record_global, record_tcc, small_config,
        small_registry, take_global_events, take_tcc_events,
    };
    use crate::{ControllerRegistry, Error, RequestError, assert_reg_eq, assert_reg_not_written};

    const IPR: usize = CC + SHADOW_BASE + SH_IPR;
    const IEVAL: usize = CC + SHADOW_BASE + SH_IEVAL;

    // =========================================================================
    // Completion
    // =========================================================================

    #[test]
    fn completion_invokes_callback_once_and_clears() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();
        let lch = inst
            .alloc_logical_channel(Resource::Dma(ANY), ANY, ANY)
            .unwrap();
        let tcc = lch.tcc.unwrap();
        inst.register_tcc_callback(lch.channel, tcc, record_tcc, 7)
            .unwrap();
        take_tcc_events();

        controller.registers().set(IPR, 1 << tcc);
        controller.handle_completion();

        assert_eq!(
            take_tcc_events(),
            [(tcc, TccStatus::TransferComplete, 7)]
        );
        assert_reg_eq!(controller.registers(), IPR, 0);
        assert_reg_not_written!(controller.registers(), IEVAL);
    }

    #[test]
    fn completion_without_callback_stays_pending() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();
        inst.alloc_resource(Resource::Tcc(1)).unwrap();
        take_tcc_events();

        // TCC 5 is pending but not allocated: ignored
        controller.registers().set(IPR, (1 << 1) | (1 << 5));
        controller.handle_completion();

        assert!(take_tcc_events().is_empty());
        assert_reg_eq!(controller.registers(), IPR, (1 << 1) | (1 << 5));
        assert_eq!(controller.registers().writes_to(IEVAL), [1]);

        // still available to polling
        assert_eq!(inst.check_and_clear_tcc(1), Ok(true));
    }

    #[test]
    fn completion_ignores_unallocated_tccs() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let _inst = controller.open(all_params(controller, 0, true)).unwrap();

        controller.registers().set(IPR, 1 << 3);
        controller.handle_completion();
        assert_reg_not_written!(controller.registers(), IEVAL);
    }

    #[test]
    fn handlers_do_nothing_without_master() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let _inst = controller.open(all_params(controller, 0, false)).unwrap();
        let regs = controller.registers();
        regs.set(IPR, 1);
        regs.set(CC + EMR, 1);
        regs.clear_writes();

        controller.handle_completion();
        controller.handle_cc_error();
        assert!(regs.writes().is_empty());
    }

    // =========================================================================
    // CC Errors
    // =========================================================================

    #[test]
    fn missed_dma_event_reaches_routed_callback() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();
        let lch = inst
            .alloc_logical_channel(Resource::Dma(2), ANY, ANY)
            .unwrap();
        inst.register_tcc_callback(lch.channel, 2, record_tcc, 1)
            .unwrap();
        take_tcc_events();
        let regs = controller.registers();
        regs.set(CC + EMR, 1 << 2);

        controller.handle_cc_error();

        assert_eq!(take_tcc_events(), [(2, TccStatus::DmaEventMiss, 1)]);
        assert_reg_eq!(regs, CC + EMR, 0);
        assert_eq!(regs.writes_to(CC + SHADOW_BASE + SH_SECR).last(), Some(&(1 << 2)));
        assert_eq!(regs.writes_to(CC + EEVAL), [1]);
    }

    #[test]
    fn missed_qdma_event_reaches_routed_callback() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 0, true)).unwrap();
        let lch = inst
            .alloc_logical_channel(Resource::Qdma(1), ANY, 4)
            .unwrap();
        inst.register_tcc_callback(lch.channel, 4, record_tcc, 2)
            .unwrap();
        take_tcc_events();
        let regs = controller.registers();
        regs.set(CC + QEMR, 1 << 1);

        controller.handle_cc_error();

        assert_eq!(take_tcc_events(), [(4, TccStatus::QdmaEventMiss, 2)]);
        assert_reg_eq!(regs, CC + QEMR, 0);
        assert_eq!(regs.writes_to(CC + SHADOW_BASE + SH_QSECR).last(), Some(&(1 << 1)));
    }

    #[test]
    fn unrouted_missed_events_are_cleared() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let _inst = controller.open(all_params(controller, 0, true)).unwrap();
        let regs = controller.registers();
        regs.set(CC + EMR, 1 << 6);
        regs.set(CC + QEMR, 1);

        controller.handle_cc_error();
        assert_reg_eq!(regs, CC + EMR, 0);
        assert_reg_eq!(regs, CC + QEMR, 0);
    }

    #[test]
    fn unrouted_missed_events_kept_when_disabled() {
        let mut registry: ControllerRegistry<MockRegisters> = ControllerRegistry::new();
        let config = small_config().with_clear_unowned_errors(false);
        let controller = registry
            .create(0, config, MockRegisters::edma3(CC, &[]), false)
            .unwrap();
        let _inst = controller.open(all_params(controller, 0, true)).unwrap();
        let regs = controller.registers();
        regs.set(CC + EMR, 1 << 6);

        controller.handle_cc_error();
        assert_reg_eq!(regs, CC + EMR, 1 << 6);
        // gave up, but re-armed the error interrupt
        assert_eq!(regs.writes_to(CC + EEVAL), [1]);
    }

    #[test]
    fn high_missed_events_follow_tcc_count() {
        let mut registry: ControllerRegistry<MockRegisters> = ControllerRegistry::new();
        let config = small_config().with_counts(8, 2, 64, 16);
        let controller = registry
            .create(0, config, MockRegisters::edma3(CC, &[]), false)
            .unwrap();
        let _inst = controller.open(all_params(controller, 0, true)).unwrap();
        let regs = controller.registers();
        regs.set(CC + EMRH, 1 << 8);

        controller.handle_cc_error();
        assert_reg_eq!(regs, CC + EMRH, 0);
        assert_eq!(regs.writes_to(CC + EMCRH), [1 << 8]);
    }

    #[test]
    fn high_missed_events_ignored_with_32_tccs_or_fewer() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let _inst = controller.open(all_params(controller, 0, true)).unwrap();
        let regs = controller.registers();
        regs.set(CC + EMRH, 1 << 8);

        controller.handle_cc_error();
        assert_reg_eq!(regs, CC + EMRH, 1 << 8);
        assert_reg_not_written!(regs, CC + EMCRH);
    }

    #[test]
    fn queue_threshold_is_broadcast_to_master_region() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let master = all_params(controller, 0, true).with_global_error_callback(record_global, 10);
        let peer = all_params(controller, 0, false).with_global_error_callback(record_global, 20);
        let other = all_params(controller, 1, false).with_global_error_callback(record_global, 30);
        let _a = controller.open(master).unwrap();
        let _b = controller.open(peer).unwrap();
        let _c = controller.open(other).unwrap();
        take_global_events();

        controller.registers().set(CC + CCERR, (1 << 1) | (1 << 16));
        controller.handle_cc_error();

        assert_eq!(
            take_global_events(),
            [
                (GlobalError::QueueThresholdExceeded, 1, 10),
                (GlobalError::QueueThresholdExceeded, 1, 20),
                (GlobalError::TccError, 0, 10),
                (GlobalError::TccError, 0, 20),
            ]
        );
        assert_reg_eq!(controller.registers(), CC + CCERR, 0);
    }

    // =========================================================================
    // TC Errors
    // =========================================================================

    #[test]
    fn tc_bus_error_is_classified_and_cleared() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let params = all_params(controller, 0, true).with_global_error_callback(record_global, 5);
        let _inst = controller.open(params).unwrap();
        take_global_events();
        let regs = controller.registers();

        regs.set(TC1 + ERRSTAT, 0b1);
        regs.set(TC1 + ERRDET, 0x9);
        controller.handle_tc_error(1).unwrap();
        assert_eq!(take_global_events(), [(GlobalError::TcWriteError, 1, 5)]);
        assert_reg_eq!(regs, TC1 + ERRSTAT, 0);

        regs.set(TC0 + ERRSTAT, 0b1);
        regs.set(TC0 + ERRDET, 0x0);
        controller.handle_tc_error(0).unwrap();
        assert!(take_global_events().is_empty());
        assert_reg_eq!(regs, TC0 + ERRSTAT, 0);
    }

    #[test]
    fn tc_errors_are_handled_one_per_call() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let params = all_params(controller, 0, true).with_global_error_callback(record_global, 0);
        let _inst = controller.open(params).unwrap();
        take_global_events();
        let regs = controller.registers();

        regs.set(TC0 + ERRSTAT, 0b1100);
        controller.handle_tc_error(0).unwrap();
        assert_eq!(
            take_global_events(),
            [(GlobalError::TcTransferRequestError, 0, 0)]
        );
        assert_reg_eq!(regs, TC0 + ERRSTAT, 0b1000);

        controller.handle_tc_error(0).unwrap();
        assert_eq!(take_global_events(), [(GlobalError::TcInvalidAddress, 0, 0)]);
        assert_reg_eq!(regs, TC0 + ERRSTAT, 0);
    }

    #[test]
    fn unknown_tc_is_rejected() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        assert_eq!(
            controller.handle_tc_error(2),
            Err(Error::Request(RequestError::InvalidParameter))
        );
    }

    #[test]
    fn completion_uses_master_region_window() {
        let registry = small_registry();
        let controller = registry.controller(0).unwrap();
        let inst = controller.open(all_params(controller, 2, true)).unwrap();
        let lch = inst
            .alloc_logical_channel(Resource::Dma(ANY), ANY, ANY)
            .unwrap();
        inst.register_tcc_callback(lch.channel, 0, record_tcc, 3)
            .unwrap();
        take_tcc_events();

        let region2 = CC + SHADOW_BASE + 2 * SHADOW_STRIDE;
        controller.registers().set(IPR, 1);
        controller.handle_completion();
        assert!(take_tcc_events().is_empty());

        controller.registers().set(region2 + SH_IPR, 1);
        controller.handle_completion();
        assert_eq!(take_tcc_events(), [(0, TccStatus::TransferComplete, 3)]);
    }
}
