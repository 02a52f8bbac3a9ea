/// Set bit `bit` of `x` on if `toggle` is true, otherwise off.
pub fn bit(bit: u64, x: u64, toggle: bool) -> u64 {
    if toggle {
        x | (1 << bit)
    } else {
        x & !(1 << bit)
    }
}

/// Test whether bit `bit` of `x` is set.
pub fn test_bit(bit: u64, x: u64) -> bool {
    (x >> bit) & 1 == 1
}

/// Alignment unit of every padded OpenFlow structure.
pub const ALIGNMENT: usize = 8;

/// Number of zero bytes needed to round `len` up to the alignment unit.
pub fn pad_len(len: usize) -> usize {
    (ALIGNMENT - len % ALIGNMENT) % ALIGNMENT
}

/// `len` rounded up to the alignment unit.
pub fn padded(len: usize) -> usize {
    len + pad_len(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_toggles_single_position() {
        assert_eq!(bit(3, 0, true), 8);
        assert_eq!(bit(3, 0xff, false), 0xf7);
        assert!(test_bit(0, 1));
        assert!(!test_bit(1, 1));
    }

    #[test]
    fn padding_rounds_to_eight() {
        assert_eq!(pad_len(0), 0);
        assert_eq!(pad_len(10), 6);
        assert_eq!(pad_len(16), 0);
        assert_eq!(padded(28), 32);
        assert_eq!(padded(22), 24);
    }
}
