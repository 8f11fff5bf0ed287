use core::panic::PanicInfo;

use kestrel_lib::{StateFlag, cpu, klog_error};

static IN_PANIC: StateFlag = StateFlag::new();

/// Log the panic and stop the machine. A panic raised while reporting
/// another one halts without logging.
pub fn panic_handler_impl(info: &PanicInfo) -> ! {
    cpu::disable_interrupts();
    if !IN_PANIC.enter() {
        cpu::halt_forever();
    }

    klog_error!("=== KERNEL PANIC ===");
    match info.location() {
        Some(location) => klog_error!(
            "PANIC at {}:{}: {}",
            location.file(),
            location.line(),
            info.message()
        ),
        None => klog_error!("PANIC: {}", info.message()),
    }
    klog_error!("System halted.");

    cpu::halt_forever()
}
