pub trait Math {
    fn pow2(self) -> u64;
}

impl Math for usize {
    /// Panics for exponents of 64 and above.
    #[inline]
    fn pow2(self) -> u64 {
        1u64 << self
    }
}

/// Whether `index` addresses a leaf of a tree with `levels` levels.
#[inline]
pub fn index_fits(index: u64, levels: usize) -> bool {
    levels >= 64 || index < levels.pow2()
}
