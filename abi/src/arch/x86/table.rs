//! Descriptor table register image (GDTR / IDTR).

/// Operand of `lgdt` / `lidt` and result of `sgdt` / `sidt`.
///
/// On i686 this is the 6-byte hardware image: a 16-bit limit followed by a
/// 32-bit linear base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C, packed(2))]
pub struct DescriptorTablePointer {
    /// Size of the table in bytes, minus one.
    pub limit: u16,
    /// Linear address of the first entry.
    pub base: usize,
}

impl DescriptorTablePointer {
    pub const NULL: Self = Self { limit: 0, base: 0 };

    /// Pointer covering every element of `table`.
    pub fn for_table<T>(table: &[T]) -> Self {
        Self {
            limit: core::mem::size_of_val(table).saturating_sub(1) as u16,
            base: table.as_ptr() as usize,
        }
    }

    /// Number of `T` sized entries covered by `limit`.
    pub const fn entry_count<T>(&self) -> usize {
        (self.limit as usize + 1) / core::mem::size_of::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_covers_whole_table() {
        let table = [0u64; 8];
        let ptr = DescriptorTablePointer::for_table(&table);
        let limit = ptr.limit;
        let base = ptr.base;
        assert_eq!(limit, 63);
        assert_eq!(base, table.as_ptr() as usize);
        assert_eq!(ptr.entry_count::<u64>(), 8);
    }

    #[test]
    fn empty_table_has_zero_limit() {
        let table: [u64; 0] = [];
        let limit = DescriptorTablePointer::for_table(&table).limit;
        assert_eq!(limit, 0);
    }
}
