//! 32-bit multiplicative rolling hash shared by all runtypes.
//!
//! `h = h * 31 + x`, wrapping at 32 bits, so results match a JS `| 0` fold.

use ordered_float::OrderedFloat;

// one constant per runtype kind
pub const TYPEOF: i32 = 1;
pub const ANY: i32 = 2;
pub const NULLISH: i32 = 3;
pub const NEVER: i32 = 4;
pub const CONST: i32 = 5;
pub const REGEX: i32 = 6;
pub const DATE: i32 = 7;
pub const BIGINT: i32 = 8;
pub const STRING_WITH_FORMATS: i32 = 9;
pub const NUMBER_WITH_FORMATS: i32 = 10;
pub const ANY_OF_CONSTS: i32 = 11;
pub const TUPLE: i32 = 12;
pub const ALL_OF: i32 = 13;
pub const ANY_OF: i32 = 14;
pub const ARRAY: i32 = 15;
pub const ANY_OF_DISCRIMINATED: i32 = 16;
pub const OPTIONAL_FIELD: i32 = 17;
pub const OBJECT: i32 = 18;
pub const REF: i32 = 19;

#[inline]
pub fn combine(h: i32, x: i32) -> i32 {
    h.wrapping_mul(31).wrapping_add(x)
}

pub fn combine_all(seed: i32, xs: impl IntoIterator<Item = i32>) -> i32 {
    xs.into_iter().fold(seed, combine)
}

/// String hash over UTF-16 code units, like `charCodeAt`.
pub fn hash_str(s: &str) -> i32 {
    s.encode_utf16().fold(0i32, |h, unit| combine(h, unit as i32))
}

pub fn hash_number(n: f64) -> i32 {
    hash_str(&crate::value::format_number(n))
}

/// Sort key for numbers that may be NaN; used when ordering const sets.
pub fn number_key(n: f64) -> OrderedFloat<f64> {
    OrderedFloat(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_hash_matches_js_fold() {
        // "ab" => (0*31 + 97)*31 + 98
        assert_eq!(hash_str("ab"), 97 * 31 + 98);
        assert_eq!(hash_str(""), 0);
    }

    #[test]
    fn combine_wraps_instead_of_overflowing() {
        let h = combine_all(i32::MAX, [i32::MAX, 7]);
        assert_eq!(h, i32::MAX.wrapping_mul(31).wrapping_add(i32::MAX).wrapping_mul(31).wrapping_add(7));
    }
}
