//! Boot sequencer: from the multiboot hand-off to the idle loop.

use core::ffi::{CStr, c_char};

use kestrel_abi::arch::x86::gdt::FLAT_KERNEL_CODE;
use kestrel_abi::arch::x86::idt::{
    EXCEPTION_BREAKPOINT, FIRST_NON_EXCEPTION_VECTOR, SYSCALL_VECTOR, exception_name,
};
use kestrel_abi::multiboot::{BootInfoFlags, MULTIBOOT_BOOTLOADER_MAGIC, MultibootInfo};
use kestrel_core::interrupts::unhandled_interrupt;
use kestrel_core::set_handler;
use kestrel_drivers::pic::{pic_disable, pic_init};
use kestrel_lib::klog::{KlogLevel, klog_init, klog_set_level};
use kestrel_lib::{InitFlag, InterruptFrame, cpu, klog_debug, klog_error, klog_info};

use crate::{gdt, idt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootError {
    BadMagic(u32),
    /// GDTR does not read back the flat code segment.
    GdtReadBack,
    /// IDTR does not read back a present gate for the software vector.
    IdtReadBack,
}

/// One ordered step of the bring-up.
pub struct BootStep {
    pub name: &'static str,
    pub run: fn() -> Result<(), BootError>,
}

static BOOT_STEPS: [BootStep; 4] = [
    BootStep {
        name: "gdt",
        run: step_gdt,
    },
    BootStep {
        name: "pic",
        run: step_pic,
    },
    BootStep {
        name: "idt",
        run: step_idt,
    },
    BootStep {
        name: "handlers",
        run: step_handlers,
    },
];

static KERNEL_INITIALIZED: InitFlag = InitFlag::new();

pub fn boot_steps() -> &'static [BootStep] {
    &BOOT_STEPS
}

pub fn is_kernel_initialized() -> bool {
    KERNEL_INITIALIZED.is_set()
}

fn step_gdt() -> Result<(), BootError> {
    gdt::gdt_install();
    if gdt::gdt_read_back(1) != Some(FLAT_KERNEL_CODE) {
        return Err(BootError::GdtReadBack);
    }
    Ok(())
}

fn step_pic() -> Result<(), BootError> {
    pic_init();
    pic_disable();
    Ok(())
}

fn step_idt() -> Result<(), BootError> {
    idt::idt_build();
    idt::idt_install();
    match idt::idt_read_back(SYSCALL_VECTOR) {
        Some(gate) if gate.is_present() => Ok(()),
        _ => Err(BootError::IdtReadBack),
    }
}

fn step_handlers() -> Result<(), BootError> {
    for vector in 0..FIRST_NON_EXCEPTION_VECTOR {
        set_handler(vector, exception_fatal);
    }
    set_handler(EXCEPTION_BREAKPOINT, exception_breakpoint);
    set_handler(SYSCALL_VECTOR, software_vector);
    Ok(())
}

fn exception_fatal(frame: &mut InterruptFrame) {
    klog_error!(
        "EXCEPTION: {} (vector {}, error code 0x{:x}) at 0x{:08x}",
        exception_name(frame.vector()),
        frame.vector,
        frame.error_code,
        frame.eip
    );
    unhandled_interrupt(frame);
}

fn exception_breakpoint(frame: &mut InterruptFrame) {
    klog_info!("BREAKPOINT at 0x{:08x}", frame.eip);
}

fn software_vector(frame: &mut InterruptFrame) {
    klog_debug!("INT 0x80: eax=0x{:08x}", frame.eax);
}

/// Run every step in order. The first failure stops the sequence.
pub fn boot_run_steps(steps: &[BootStep]) -> Result<(), (&'static str, BootError)> {
    for step in steps {
        klog_debug!("[boot:init] step {}", step.name);
        (step.run)().map_err(|err| (step.name, err))?;
    }
    Ok(())
}

/// Map a `klog=` value to a level.
pub fn parse_klog_level(value: &str) -> Option<KlogLevel> {
    let level = match value {
        "error" => KlogLevel::Error,
        "warn" => KlogLevel::Warn,
        "info" => KlogLevel::Info,
        "debug" => KlogLevel::Debug,
        "trace" => KlogLevel::Trace,
        _ => return None,
    };
    Some(level)
}

fn apply_cmdline(cmdline: &str) {
    let level = cmdline
        .split_whitespace()
        .filter_map(|token| token.strip_prefix("klog="))
        .filter_map(parse_klog_level)
        .last();
    if let Some(level) = level {
        klog_set_level(level);
    }
}

/// Borrow the boot command line, if the loader passed one.
///
/// # Safety
/// `info` must be the record handed over by a multiboot loader, with memory
/// still identity mapped.
unsafe fn boot_cmdline(info: &MultibootInfo) -> Option<&'static str> {
    if !info.has(BootInfoFlags::CMDLINE) || info.cmdline_addr == 0 {
        return None;
    }
    let raw = info.cmdline_addr as usize as *const c_char;
    unsafe { CStr::from_ptr(raw) }.to_str().ok()
}

fn report_boot_info(info: &MultibootInfo) {
    let flags = info.info_flags();
    klog_info!("BOOT: multiboot flags 0x{:08x}", info.flags);
    if flags.contains(BootInfoFlags::MEM) {
        klog_info!(
            "BOOT: memory lower {}KiB, upper {}KiB",
            info.mem_lower,
            info.mem_upper
        );
    }
    if flags.contains(BootInfoFlags::MMAP) {
        klog_info!("BOOT: memory map, {} bytes", info.mmap_length);
    }
    if info.has_symbols() {
        klog_info!("BOOT: symbol table present");
    }
    if flags.contains(BootInfoFlags::CMDLINE) {
        klog_debug!("BOOT: command line present");
    }
    if flags.contains(BootInfoFlags::MODULES) {
        klog_info!("BOOT: {} module(s)", info.mods_count);
    }
}

#[cfg(feature = "builtin-tests")]
fn run_builtin_tests(cmdline: Option<&str>) {
    use kestrel_lib::testing::{TestRunSummary, config_from_cmdline};

    let config = config_from_cmdline(cmdline);
    let mut summary = TestRunSummary::default();
    let rc = kestrel_tests::tests_run_all(&config, &mut summary, kestrel_tests::tests_registry());
    if config.enabled && config.shutdown {
        kestrel_tests::tests_request_shutdown(rc != 0);
    }
}

/// Interrupt self-check: `int 0x80` must come back through the trampoline.
#[cfg(target_os = "none")]
fn software_vector_self_check() {
    use kestrel_core::delivery_count;

    let before = delivery_count(SYSCALL_VECTOR);
    // SAFETY: the IDT is installed and vector 0x80 has a handler.
    unsafe { cpu::raise_software_interrupt() };
    if delivery_count(SYSCALL_VECTOR) == before.wrapping_add(1) {
        klog_info!("BOOT: software interrupt self-check passed");
    } else {
        klog_error!("BOOT: software interrupt 0x80 was not delivered");
    }
}

/// Entered from `_start` with the loader's registers.
#[unsafe(no_mangle)]
pub extern "C" fn kernel_main(magic: u32, info: *const MultibootInfo) -> ! {
    klog_init();
    klog_info!("Kestrel: protected-mode bring-up");

    if magic != MULTIBOOT_BOOTLOADER_MAGIC {
        klog_error!(
            "BOOT: {:?}, not loaded by a multiboot loader",
            BootError::BadMagic(magic)
        );
        cpu::halt_forever();
    }

    // SAFETY: the loader hands over a valid record, or none at all.
    let info = unsafe { info.as_ref() };
    let cmdline = match info {
        Some(info) => {
            report_boot_info(info);
            // SAFETY: memory is identity mapped until paging, which never happens.
            unsafe { boot_cmdline(info) }
        }
        None => {
            klog_info!("BOOT: no boot information record");
            None
        }
    };
    if let Some(cmdline) = cmdline {
        apply_cmdline(cmdline);
    }

    if let Err((step, err)) = boot_run_steps(boot_steps()) {
        klog_error!("[boot:init] FAILURE in {}: {:?}", step, err);
        cpu::halt_forever();
    }

    cpu::enable_interrupts();
    KERNEL_INITIALIZED.mark_set();
    klog_info!("BOOT: interrupts enabled");

    #[cfg(target_os = "none")]
    software_vector_self_check();

    #[cfg(feature = "builtin-tests")]
    run_builtin_tests(cmdline);

    cpu::halt_loop()
}
