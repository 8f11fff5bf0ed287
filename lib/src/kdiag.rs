//! Diagnostics for faults: the saved interrupt frame and its dump.

use kestrel_abi::arch::x86::idt::exception_name;

/// Register state saved by the common interrupt entry path.
///
/// Field order is the stack layout built by the entry stubs, lowest address
/// first: data segments, `pushal` image, vector and error code pushed by the
/// stub, then the frame pushed by the CPU for a same-privilege interrupt.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InterruptFrame {
    pub gs: u32,
    pub fs: u32,
    pub es: u32,
    pub ds: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    /// ESP before `pushal`: the address of `vector`, not the interrupted
    /// stack pointer.
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub vector: u32,
    pub error_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

impl InterruptFrame {
    /// Frame for `vector` as software would see it before any registers are
    /// filled in. Used by tests and by the hosted dispatch path.
    pub const fn for_vector(vector: u8) -> Self {
        Self {
            gs: 0,
            fs: 0,
            es: 0,
            ds: 0,
            edi: 0,
            esi: 0,
            ebp: 0,
            esp: 0,
            ebx: 0,
            edx: 0,
            ecx: 0,
            eax: 0,
            vector: vector as u32,
            error_code: 0,
            eip: 0,
            cs: 0,
            eflags: 0,
        }
    }

    #[inline]
    pub fn vector(&self) -> u8 {
        self.vector as u8
    }
}

const _: () = assert!(core::mem::size_of::<InterruptFrame>() == 17 * 4);

pub fn kdiag_dump_interrupt_frame(frame: &InterruptFrame) {
    let f = frame;
    crate::klog_error!("=== INTERRUPT FRAME DUMP ===");
    crate::klog_error!(
        "Vector: {} ({}) Error Code: 0x{:x}",
        f.vector,
        exception_name(f.vector()),
        f.error_code
    );
    crate::klog_error!(
        "EIP: 0x{:08x}  CS: 0x{:04x}  EFLAGS: 0x{:08x}",
        f.eip,
        f.cs,
        f.eflags
    );
    crate::klog_error!(
        "EAX: 0x{:08x}  EBX: 0x{:08x}  ECX: 0x{:08x}  EDX: 0x{:08x}",
        f.eax,
        f.ebx,
        f.ecx,
        f.edx
    );
    crate::klog_error!(
        "ESI: 0x{:08x}  EDI: 0x{:08x}  EBP: 0x{:08x}  ESP: 0x{:08x}",
        f.esi,
        f.edi,
        f.ebp,
        f.esp
    );
    crate::klog_error!(
        "DS: 0x{:04x}  ES: 0x{:04x}  FS: 0x{:04x}  GS: 0x{:04x}",
        f.ds,
        f.es,
        f.fs,
        f.gs
    );
    crate::klog_error!("=== END INTERRUPT FRAME DUMP ===");
}
