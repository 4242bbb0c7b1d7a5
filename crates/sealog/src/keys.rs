//! Reserved keys of a log object's map.
//!
//! Position keys are the `pos.` prefix plus the position as 20 zero-padded
//! decimal digits: wide enough for the full u64 range, and sorting
//! byte-lexicographically in numeric order. The decimal format is a
//! compatibility constraint carried over from existing on-disk data; it must
//! be preserved exactly.

/// Current sealed epoch, bare u64. Absent until the first seal.
pub const EPOCH: &str = "epoch";
/// Projection counter, bare u64. Absent until the first set_projection.
pub const PROJECTION: &str = "projection";
/// Largest written position, bare u64. Absent until the first write.
pub const MAX_POSITION: &str = "max_position";
/// Prefix of the per-position entry keys.
pub const POS_PREFIX: &str = "pos.";

/// The entry key of a position.
pub fn position(position: u64) -> String {
    format!("{POS_PREFIX}{position:020}")
}

/// Recover the position from an entry key. Returns None for reserved keys
/// and anything else outside the position key family.
pub fn parse_position(key: &str) -> Option<u64> {
    let digits = key.strip_prefix(POS_PREFIX)?;
    if digits.len() != 20 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_position_key_format() {
        assert_eq!(position(0), "pos.00000000000000000000");
        assert_eq!(position(42), "pos.00000000000000000042");
        assert_eq!(position(u64::MAX), "pos.18446744073709551615");
    }

    #[test]
    fn test_key_order_matches_numeric_order() {
        let positions = [0u64, 1, 9, 10, 11, 99, 100, 1 << 32, u64::MAX - 1, u64::MAX];

        let mut keys: Vec<String> = positions.iter().map(|p| position(*p)).collect();
        keys.sort();

        let sorted: Vec<u64> = keys.iter().map(|k| parse_position(k).unwrap()).collect();
        assert_eq!(sorted, positions);
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position(&position(7)), Some(7));
        assert_eq!(parse_position("epoch"), None);
        assert_eq!(parse_position("pos.42"), None);
        assert_eq!(parse_position("pos.0000000000000000004x"), None);
        // 20 digits, but past u64::MAX.
        assert_eq!(parse_position("pos.99999999999999999999"), None);
    }
}
