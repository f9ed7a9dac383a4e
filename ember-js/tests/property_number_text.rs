//! Property 1: number text round-trip
//!
//! For any finite number, the string a script sees for it converts back to
//! the same number, and integers print without a fractional part.

use ember_js::coerce::{number_to_string, string_to_number, to_int32, to_uint32};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn finite_numbers_round_trip(n in any::<f64>().prop_filter("finite", |n| n.is_finite())) {
        let text = number_to_string(n);
        prop_assert_eq!(string_to_number(&text), n, "text was {}", text);
    }

    #[test]
    fn integers_print_like_integers(i in any::<i32>()) {
        prop_assert_eq!(number_to_string(i as f64), i.to_string());
    }

    #[test]
    fn surrounding_whitespace_is_ignored(i in any::<i32>(), left in "[ \t\n]{0,3}", right in "[ \t\n]{0,3}") {
        let text = format!("{}{}{}", left, i, right);
        prop_assert_eq!(string_to_number(&text), i as f64);
    }

    #[test]
    fn non_numeric_text_is_nan(word in "[g-z]{1,8}") {
        prop_assert!(string_to_number(&word).is_nan());
    }

    #[test]
    fn int32_conversions_wrap(i in -(1i64 << 53)..(1i64 << 53)) {
        prop_assert_eq!(to_int32(i as f64), i as i32);
        prop_assert_eq!(to_uint32(i as f64), i as u32);
    }
}
