//! Hardware IRQ lines on top of the vector dispatch table.
//!
//! Registering a line installs [`irq_vector_entry`] on the vector the PIC
//! delivers that line on, then unmasks it. Every delivery is acknowledged
//! exactly once, except spurious ones, which [`ChainedPics::is_spurious`]
//! has already dealt with.

use kestrel_core::{clear_handler, set_handler};
use kestrel_lib::{InterruptFrame, IrqMutex, PortIo, klog_debug, klog_info, klog_warn};

use kestrel_abi::arch::x86::idt::{FIRST_NON_EXCEPTION_VECTOR, IRQ_LINES};

use crate::pic::{
    ChainedPics, PICS, PicState, pic_mask_line, pic_state, pic_unmask_line, pic_vector_for_line,
};

/// Line handler, called with the line number and the saved frame.
pub type IrqHandler = fn(u8, &mut InterruptFrame);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrqError {
    InvalidLine,
    /// The controllers still deliver on the BIOS vectors.
    NotRemapped,
    /// The line is mapped onto a CPU exception vector.
    ExceptionVector,
}

/// What [`irq_dispatch`] did with a delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrqOutcome {
    Handled,
    Unhandled,
    Spurious,
    /// The vector does not belong to either controller.
    NotIrq,
}

#[derive(Clone, Copy)]
struct IrqEntry {
    handler: Option<IrqHandler>,
    name: &'static str,
    count: u64,
    masked: bool,
    reported_unhandled: bool,
}

impl IrqEntry {
    const fn new() -> Self {
        Self {
            handler: None,
            name: "",
            count: 0,
            masked: true,
            reported_unhandled: false,
        }
    }
}

/// Snapshot of one line's bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IrqLineStats {
    pub name: &'static str,
    pub count: u64,
    pub masked: bool,
    pub registered: bool,
}

static IRQ_TABLE: IrqMutex<[IrqEntry; IRQ_LINES]> = IrqMutex::new([IrqEntry::new(); IRQ_LINES]);

#[inline]
fn with_irq_table<R>(f: impl FnOnce(&mut [IrqEntry; IRQ_LINES]) -> R) -> R {
    let mut table = IRQ_TABLE.lock();
    f(&mut table)
}

fn valid_line(line: u8) -> Result<usize, IrqError> {
    let idx = line as usize;
    if idx < IRQ_LINES {
        Ok(idx)
    } else {
        Err(IrqError::InvalidLine)
    }
}

/// Vector-table entry shared by every registered line.
pub fn irq_vector_entry(frame: &mut InterruptFrame) {
    irq_dispatch(frame);
}

/// Attach `handler` to `line` and unmask it.
pub fn irq_register(line: u8, name: &'static str, handler: IrqHandler) -> Result<(), IrqError> {
    let idx = valid_line(line).inspect_err(|_| {
        klog_warn!("IRQ: register for invalid line {}", line);
    })?;
    if pic_state() != PicState::Remapped {
        klog_warn!("IRQ: line {} registered before PIC remap", line);
        return Err(IrqError::NotRemapped);
    }
    let vector = pic_vector_for_line(line).ok_or(IrqError::InvalidLine)?;
    if vector < FIRST_NON_EXCEPTION_VECTOR {
        klog_warn!("IRQ: line {} maps to exception vector {}", line, vector);
        return Err(IrqError::ExceptionVector);
    }

    with_irq_table(|table| {
        let entry = &mut table[idx];
        entry.handler = Some(handler);
        entry.name = name;
        entry.reported_unhandled = false;
        entry.masked = false;
    });
    set_handler(vector, irq_vector_entry);
    pic_unmask_line(line);

    klog_debug!("IRQ: line {} ({}) on vector {}", line, name, vector);
    Ok(())
}

/// Detach the handler on `line` and mask it.
pub fn irq_unregister(line: u8) -> Result<(), IrqError> {
    let idx = valid_line(line)?;
    with_irq_table(|table| {
        let entry = &mut table[idx];
        entry.handler = None;
        entry.name = "";
        entry.reported_unhandled = false;
        entry.masked = true;
    });
    pic_mask_line(line);
    if let Some(vector) = pic_vector_for_line(line) {
        clear_handler(vector);
    }
    klog_debug!("IRQ: unregistered line {}", line);
    Ok(())
}

fn mask_unhandled<B: PortIo>(pics: &IrqMutex<ChainedPics<B>>, idx: usize, line: u8, vector: u8) {
    let first_report = with_irq_table(|table| {
        let entry = &mut table[idx];
        entry.masked = true;
        !core::mem::replace(&mut entry.reported_unhandled, true)
    });
    if first_report {
        klog_info!("IRQ: unhandled line {} (vector {}), masking", line, vector);
    }
    pics.lock().mask_line(line);
}

/// Route a PIC delivery to its line handler and acknowledge it.
pub fn irq_dispatch(frame: &mut InterruptFrame) -> IrqOutcome {
    dispatch_line(&PICS, frame)
}

// The PIC lock is never held across the line handler.
fn dispatch_line<B: PortIo>(
    pics: &IrqMutex<ChainedPics<B>>,
    frame: &mut InterruptFrame,
) -> IrqOutcome {
    let vector = frame.vector();
    let Some(line) = pics.lock().line_for_vector(vector) else {
        klog_warn!("IRQ: vector {} is not a PIC line", vector);
        return IrqOutcome::NotIrq;
    };

    if pics.lock().is_spurious(line) {
        klog_debug!("IRQ: spurious line {}", line);
        return IrqOutcome::Spurious;
    }

    let idx = line as usize;
    let handler = with_irq_table(|table| {
        let entry = &mut table[idx];
        entry.count = entry.count.wrapping_add(1);
        entry.handler
    });

    let outcome = match handler {
        Some(handler) => {
            handler(line, frame);
            IrqOutcome::Handled
        }
        None => {
            mask_unhandled(pics, idx, line, vector);
            IrqOutcome::Unhandled
        }
    };

    pics.lock().signal_eoi(line);
    outcome
}

pub fn irq_line_stats(line: u8) -> Option<IrqLineStats> {
    let idx = valid_line(line).ok()?;
    Some(with_irq_table(|table| {
        let entry = &table[idx];
        IrqLineStats {
            name: entry.name,
            count: entry.count,
            masked: entry.masked,
            registered: entry.handler.is_some(),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pic::model::ModelBus;
    use crate::pic::pic_remap;
    use core::sync::atomic::{AtomicU32, Ordering};
    use kestrel_abi::arch::x86::pic::PIC_CASCADE_LINE;
    use kestrel_core::{DispatchOutcome, InterruptHandler, dispatch, get_handler};
    use kestrel_lib::cpu::HOSTED_CPU_LOCK;

    static SEEN: AtomicU32 = AtomicU32::new(0);

    fn count_line(line: u8, frame: &mut InterruptFrame) {
        SEEN.fetch_add(1, Ordering::SeqCst);
        frame.eax = line as u32;
    }

    #[test]
    fn register_routes_vector_through_dispatch() {
        let _cpu = HOSTED_CPU_LOCK.lock();
        pic_remap(32, 40);

        irq_register(5, "test-line", count_line).expect("register");
        assert!(get_handler(37).is_some());

        let mut frame = InterruptFrame::for_vector(37);
        let before = SEEN.load(Ordering::SeqCst);
        assert_eq!(dispatch(&mut frame), DispatchOutcome::Handled);
        assert_eq!(SEEN.load(Ordering::SeqCst), before + 1);
        assert_eq!(frame.eax, 5);

        let stats = irq_line_stats(5).expect("stats");
        assert_eq!(stats.name, "test-line");
        assert!(stats.registered);
        assert!(stats.count >= 1);

        irq_unregister(5).expect("unregister");
        assert!(get_handler(37).is_none());
        assert!(irq_line_stats(5).is_some_and(|s| s.masked && !s.registered));
    }

    #[test]
    fn unhandled_line_is_masked() {
        let _cpu = HOSTED_CPU_LOCK.lock();
        pic_remap(32, 40);

        let mut frame = InterruptFrame::for_vector(32 + 9);
        assert_eq!(irq_dispatch(&mut frame), IrqOutcome::Unhandled);
        assert!(irq_line_stats(9).is_some_and(|s| s.masked && !s.registered));
    }

    #[test]
    fn non_pic_vector_is_rejected() {
        let _cpu = HOSTED_CPU_LOCK.lock();
        pic_remap(32, 40);

        let mut frame = InterruptFrame::for_vector(0x80);
        assert_eq!(irq_dispatch(&mut frame), IrqOutcome::NotIrq);
    }

    #[test]
    fn invalid_line_is_refused() {
        assert_eq!(
            irq_register(16, "bad", count_line),
            Err(IrqError::InvalidLine)
        );
        assert_eq!(irq_unregister(42), Err(IrqError::InvalidLine));
        assert_eq!(irq_line_stats(16), None);
    }

    static MODEL_RUNS: AtomicU32 = AtomicU32::new(0);

    fn model_line(_line: u8, _frame: &mut InterruptFrame) {
        MODEL_RUNS.fetch_add(1, Ordering::SeqCst);
    }

    fn remapped_model() -> IrqMutex<ChainedPics<ModelBus>> {
        let mut pics = ChainedPics::new(ModelBus::with_masks(0xFF, 0xFF));
        pics.remap(32, 40);
        IrqMutex::new(pics)
    }

    fn attach(line: u8, handler: Option<IrqHandler>) {
        with_irq_table(|table| {
            let entry = &mut table[line as usize];
            entry.handler = handler;
            entry.reported_unhandled = false;
        });
    }

    fn eois(pics: &IrqMutex<ChainedPics<ModelBus>>) -> (u32, u32) {
        let pics = pics.lock();
        (pics.bus().master.eois, pics.bus().slave.eois)
    }

    #[test]
    fn handled_lines_are_acknowledged_once_per_chip() {
        let _cpu = HOSTED_CPU_LOCK.lock();
        attach(3, Some(model_line));
        attach(10, Some(model_line));

        let pics = remapped_model();
        let mut frame = InterruptFrame::for_vector(32 + 3);
        assert_eq!(dispatch_line(&pics, &mut frame), IrqOutcome::Handled);
        assert_eq!(eois(&pics), (1, 0));

        let pics = remapped_model();
        let mut frame = InterruptFrame::for_vector(40 + 2);
        assert_eq!(dispatch_line(&pics, &mut frame), IrqOutcome::Handled);
        assert_eq!(eois(&pics), (1, 1));

        attach(3, None);
        attach(10, None);
    }

    #[test]
    fn unhandled_line_is_still_acknowledged() {
        let _cpu = HOSTED_CPU_LOCK.lock();
        attach(11, None);

        let pics = remapped_model();
        pics.lock().unmask_line(11);
        let mut frame = InterruptFrame::for_vector(40 + 3);
        assert_eq!(dispatch_line(&pics, &mut frame), IrqOutcome::Unhandled);
        assert_eq!(eois(&pics), (1, 1));
        assert!(pics.lock().is_masked(11));
    }

    #[test]
    fn spurious_deliveries_skip_the_handler_and_the_slave_eoi() {
        let _cpu = HOSTED_CPU_LOCK.lock();
        attach(7, Some(model_line));
        attach(15, Some(model_line));
        let runs = MODEL_RUNS.load(Ordering::SeqCst);

        let pics = remapped_model();
        let mut frame = InterruptFrame::for_vector(32 + 7);
        assert_eq!(dispatch_line(&pics, &mut frame), IrqOutcome::Spurious);
        assert_eq!(eois(&pics), (0, 0));

        let pics = remapped_model();
        pics.lock().bus_mut().master.isr = 1 << PIC_CASCADE_LINE;
        let mut frame = InterruptFrame::for_vector(40 + 7);
        assert_eq!(dispatch_line(&pics, &mut frame), IrqOutcome::Spurious);
        assert_eq!(eois(&pics), (1, 0));

        assert_eq!(MODEL_RUNS.load(Ordering::SeqCst), runs);
        attach(7, None);
        attach(15, None);
    }

    fn double_fault_diag(_frame: &mut InterruptFrame) {}

    #[test]
    fn lines_on_exception_vectors_are_refused() {
        let _cpu = HOSTED_CPU_LOCK.lock();
        set_handler(8, double_fault_diag);
        pic_remap(0x08, 0x70);

        assert_eq!(
            irq_register(0, "timer", count_line),
            Err(IrqError::ExceptionVector)
        );
        assert_eq!(
            get_handler(8).map(|h| h as usize),
            Some(double_fault_diag as InterruptHandler as usize)
        );
        assert!(irq_line_stats(0).is_some_and(|s| !s.registered));

        clear_handler(8);
        pic_remap(32, 40);
    }
}
