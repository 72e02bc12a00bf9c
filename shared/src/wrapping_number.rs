//! Wrap-aware comparison of 16 bit sequence numbers. Packet and message ids
//! wrap around, so "newer" means "less than half the id space ahead".

/// Returns whether `s1` is newer than `s2`.
/// sequence_greater_than(2, 1) is true, sequence_greater_than(0, 65535) is
/// true, sequence_greater_than(1, 1) is false
pub fn sequence_greater_than(s1: u16, s2: u16) -> bool {
    ((s1 > s2) && (s1 - s2 <= 32768)) || ((s1 < s2) && (s2 - s1 > 32768))
}

/// Returns whether `s1` is older than `s2`
pub fn sequence_less_than(s1: u16, s2: u16) -> bool {
    sequence_greater_than(s2, s1)
}

/// Signed distance from `a` to `b`, taking the shorter way around.
///
/// ```
/// # use channelwire::wrapping_diff;
/// assert_eq!(wrapping_diff(1, 2), 1);
/// assert_eq!(wrapping_diff(2, 1), -1);
/// assert_eq!(wrapping_diff(65535, 0), 1);
/// assert_eq!(wrapping_diff(0, 65535), -1);
/// ```
pub fn wrapping_diff(a: u16, b: u16) -> i16 {
    i16::from_ne_bytes(b.wrapping_sub(a).to_ne_bytes())
}
