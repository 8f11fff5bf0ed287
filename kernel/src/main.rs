#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod entry {
    use core::arch::global_asm;
    use core::panic::PanicInfo;

    use kestrel_abi::multiboot::{
        MULTIBOOT_HEADER_CHECKSUM, MULTIBOOT_HEADER_FLAGS, MULTIBOOT_HEADER_MAGIC,
    };

    // Ensure the boot crate is linked so kernel_main is available for `_start`.
    #[used]
    static BOOT_ENTRY: extern "C" fn(u32, *const kestrel_abi::MultibootInfo) -> ! =
        kestrel_boot::kernel_main;

    const BOOT_STACK_SIZE: usize = 16 * 1024;

    global_asm!(
        ".section .multiboot, \"a\"",
        ".balign 4",
        ".long {magic}",
        ".long {flags}",
        ".long {checksum}",
        "",
        ".section .bss",
        ".balign 16",
        "boot_stack_bottom:",
        ".skip {stack_size}",
        "boot_stack_top:",
        "",
        ".section .text",
        ".global _start",
        "_start:",
        "    cli",
        "    movl $boot_stack_top, %esp",
        "    xorl %ebp, %ebp",
        "    pushl %ebx",
        "    pushl %eax",
        "    call kernel_main",
        "2:  hlt",
        "    jmp 2b",
        magic = const MULTIBOOT_HEADER_MAGIC,
        flags = const MULTIBOOT_HEADER_FLAGS,
        checksum = const MULTIBOOT_HEADER_CHECKSUM,
        stack_size = const BOOT_STACK_SIZE,
        options(att_syntax)
    );

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        kestrel_boot::panic_handler_impl(info)
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("kernel: build for the i686-kestrel target to produce a bootable image");
}
