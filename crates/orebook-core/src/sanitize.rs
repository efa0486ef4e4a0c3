//! Value sanitizer: one noisy raw figure in, one finite signed float (or
//! nothing) out.
//!
//! Raw figures arrive as free text scraped from financial pages: `"$1.2B"`,
//! `"(500K)"`, `"N/A"`, `"1,234.5"`, sometimes with chart-caption debris or
//! growth annotations glued on. The sanitizer is deliberately a pure
//! function so every parsing decision is reproducible and testable.

use crate::RawValue;

/// Sentinel tokens that mean "no value" rather than zero.
const SENTINELS: [&str; 3] = ["n/a", "--", "-"];

/// Markers that identify a string as page furniture rather than a figure.
/// A raw string containing any of these is rejected outright.
const REJECT_MARKERS: [&str; 4] = ["©", "copyright", "all rights reserved", "tradingview"];

/// Annotation tokens stripped before parsing. Matched against a token with
/// surrounding punctuation removed, case-insensitively.
const ANNOTATION_TOKENS: [&str; 4] = ["yoy", "qoq", "ttm", "est"];

/// Magnitude multipliers for trailing suffixes, case-insensitive.
fn suffix_multiplier(ch: char) -> Option<f64> {
    match ch.to_ascii_lowercase() {
        't' => Some(1e12),
        'b' => Some(1e9),
        'm' => Some(1e6),
        'k' => Some(1e3),
        _ => None,
    }
}

/// Parse one raw financial value into a finite signed float.
///
/// Returns `None` for sentinels, page noise, and anything that does not
/// survive as a finite number. `field` is carried only for trace context.
pub fn sanitize(raw: &RawValue, field: &str) -> Option<f64> {
    match raw {
        RawValue::Null => None,
        RawValue::Number(value) => {
            if !value.is_finite() {
                return None;
            }
            // Normalize -0 to 0.
            Some(if *value == 0.0 { 0.0 } else { *value })
        }
        RawValue::Text(text) => sanitize_text(text, field),
    }
}

fn sanitize_text(text: &str, field: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lowered = trimmed.to_ascii_lowercase();
    if SENTINELS.contains(&lowered.as_str()) {
        return None;
    }
    if REJECT_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        tracing::trace!(field, raw = text, "rejected page-noise value");
        return None;
    }

    let denoised = strip_annotations(trimmed);

    // Parenthesized figures are negative: "(500K)" == -500000.
    let (unwrapped, negative) = match denoised.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (inner.trim().to_owned(), true),
        None => (denoised, false),
    };

    // The magnitude suffix must be read before the character strip removes it.
    let multiplier = trailing_suffix(&unwrapped).unwrap_or(1.0);

    let literal: String = unwrapped
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == '-')
        .collect();
    if literal.is_empty() {
        return None;
    }

    let parsed: f64 = match literal.parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::trace!(field, raw = text, literal, "unparseable numeric literal");
            return None;
        }
    };
    if !parsed.is_finite() {
        return None;
    }

    let mut value = parsed * multiplier;
    if negative {
        value = -value;
    }
    if !value.is_finite() {
        return None;
    }
    Some(if value == 0.0 { 0.0 } else { value })
}

/// Remove growth/percentage annotations, bare 4-digit year tokens, and
/// known annotation words, keeping everything else intact.
fn strip_annotations(input: &str) -> String {
    input
        .split_whitespace()
        .filter(|token| !is_annotation(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_annotation(token: &str) -> bool {
    if token.contains('%') {
        return true;
    }

    let bare: String = token
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect();
    if bare.len() == 4 && bare.chars().all(|ch| ch.is_ascii_digit()) {
        // Bare year tokens (chart axis labels) in a plausible range.
        if let Ok(year) = bare.parse::<u32>() {
            return (1900..=2099).contains(&year);
        }
    }

    ANNOTATION_TOKENS.contains(&bare.to_ascii_lowercase().as_str())
}

/// Detect a trailing magnitude suffix in the pre-strip string. The suffix
/// must follow a non-alphabetic character so words are never misread as
/// magnitudes.
fn trailing_suffix(input: &str) -> Option<f64> {
    let trimmed = input.trim_end();
    let mut chars = trimmed.chars().rev();
    let last = chars.next()?;
    let multiplier = suffix_multiplier(last)?;

    match chars.next() {
        Some(prev) if prev.is_ascii_alphabetic() => None,
        _ => Some(multiplier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(raw: &str) -> RawValue {
        RawValue::Text(raw.to_owned())
    }

    #[test]
    fn parses_magnitude_suffixes() {
        assert_eq!(sanitize(&text("$1.2B"), "market_cap_value"), Some(1.2e9));
        assert_eq!(sanitize(&text("450.2B"), "market_cap_value"), Some(4.502e11));
        assert_eq!(sanitize(&text("4.1B"), "shares_outstanding"), Some(4.1e9));
        assert_eq!(sanitize(&text("350M"), "revenue_value"), Some(3.5e8));
        assert_eq!(sanitize(&text("2T"), "market_cap_value"), Some(2e12));
        assert_eq!(sanitize(&text("500k"), "cash_value"), Some(5e5));
    }

    #[test]
    fn parenthesized_values_are_negative() {
        assert_eq!(sanitize(&text("(500K)"), "debt_value"), Some(-500_000.0));
        assert_eq!(sanitize(&text("($1.5M)"), "net_income_value"), Some(-1.5e6));
    }

    #[test]
    fn sentinels_return_none() {
        assert_eq!(sanitize(&text("N/A"), "cash_value"), None);
        assert_eq!(sanitize(&text("n/a"), "cash_value"), None);
        assert_eq!(sanitize(&text("--"), "x"), None);
        assert_eq!(sanitize(&text("-"), "x"), None);
        assert_eq!(sanitize(&text(""), "x"), None);
        assert_eq!(sanitize(&text("   "), "x"), None);
        assert_eq!(sanitize(&RawValue::Null, "x"), None);
    }

    #[test]
    fn strips_thousands_separators() {
        assert_eq!(sanitize(&text("1,234.5"), "x"), Some(1234.5));
        assert_eq!(sanitize(&text("12,345,678"), "x"), Some(12_345_678.0));
    }

    #[test]
    fn rejects_page_noise() {
        assert_eq!(
            sanitize(&text("© 2024 Example Financial Data"), "x"),
            None
        );
        assert_eq!(sanitize(&text("Chart by TradingView"), "x"), None);
    }

    #[test]
    fn strips_growth_annotations_and_year_tokens() {
        assert_eq!(sanitize(&text("1.5B +4.2%"), "revenue_value"), Some(1.5e9));
        assert_eq!(sanitize(&text("350M (12% YoY)"), "revenue_value"), Some(3.5e8));
        assert_eq!(sanitize(&text("2023 1.5B"), "revenue_value"), Some(1.5e9));
    }

    #[test]
    fn bare_suffix_without_digits_is_none() {
        assert_eq!(sanitize(&text("B"), "x"), None);
        assert_eq!(sanitize(&text("$K"), "x"), None);
    }

    #[test]
    fn words_ending_in_suffix_letters_are_not_magnitudes() {
        // "ok" ends in 'k' but follows an alphabetic character.
        assert_eq!(sanitize(&text("weak"), "x"), None);
    }

    #[test]
    fn normalizes_negative_zero() {
        let sanitized = sanitize(&RawValue::Number(-0.0), "x").expect("finite");
        assert_eq!(sanitized, 0.0);
        assert!(sanitized.is_sign_positive());

        let textual = sanitize(&text("-0"), "x").expect("finite");
        assert_eq!(textual, 0.0);
        assert!(textual.is_sign_positive());
    }

    #[test]
    fn non_finite_numbers_are_none() {
        assert_eq!(sanitize(&RawValue::Number(f64::NAN), "x"), None);
        assert_eq!(sanitize(&RawValue::Number(f64::INFINITY), "x"), None);
    }

    #[test]
    fn passes_through_plain_numbers() {
        assert_eq!(sanitize(&RawValue::Number(42.5), "x"), Some(42.5));
        assert_eq!(sanitize(&text("1234"), "x"), Some(1234.0));
        assert_eq!(sanitize(&text("-17.25"), "x"), Some(-17.25));
    }

    proptest! {
        #[test]
        fn suffix_scales_any_mantissa(
            mantissa in 0.001f64..9999.0,
            suffix_index in 0usize..4,
        ) {
            let (suffix, multiplier) = [("T", 1e12), ("B", 1e9), ("M", 1e6), ("K", 1e3)][suffix_index];
            let raw = text(&format!("{mantissa}{suffix}"));
            let sanitized = sanitize(&raw, "prop").expect("must parse");
            let expected = mantissa * multiplier;
            prop_assert!((sanitized - expected).abs() <= expected.abs() * 1e-9);
        }

        #[test]
        fn lowercase_suffix_matches_uppercase(mantissa in 0.001f64..9999.0) {
            let upper = sanitize(&text(&format!("{mantissa}B")), "prop");
            let lower = sanitize(&text(&format!("{mantissa}b")), "prop");
            prop_assert_eq!(upper, lower);
        }
    }
}
