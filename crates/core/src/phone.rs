//! E.164 destination construction from stored country + raw digits.
//!
//! Contacts store a two-letter country code and whatever digits were typed
//! in. Before handing a number to the SMS provider we strip international
//! and trunk prefixes per country and prepend the dial code.

use crate::error::CoreError;

/// The `00` international call prefix used in most of the world.
const INTERNATIONAL_PREFIX: &str = "00";

/// Dialing rules for one country.
struct CountryRule {
    /// ISO 3166-1 alpha-2 code, uppercase.
    iso: &'static str,
    /// Country dial code, no `+`.
    dial: &'static str,
    /// Whether domestic numbers carry a trunk `0` that must be stripped.
    strip_trunk_zero: bool,
}

/// Countries the product currently operates in. NANP countries share dial
/// code 1 and have no trunk prefix.
const COUNTRY_RULES: &[CountryRule] = &[
    CountryRule { iso: "US", dial: "1", strip_trunk_zero: false },
    CountryRule { iso: "CA", dial: "1", strip_trunk_zero: false },
    CountryRule { iso: "GB", dial: "44", strip_trunk_zero: true },
    CountryRule { iso: "IE", dial: "353", strip_trunk_zero: true },
    CountryRule { iso: "AU", dial: "61", strip_trunk_zero: true },
    CountryRule { iso: "NZ", dial: "64", strip_trunk_zero: true },
    CountryRule { iso: "DE", dial: "49", strip_trunk_zero: true },
    CountryRule { iso: "FR", dial: "33", strip_trunk_zero: true },
    CountryRule { iso: "NL", dial: "31", strip_trunk_zero: true },
    CountryRule { iso: "ES", dial: "34", strip_trunk_zero: false },
    CountryRule { iso: "ZA", dial: "27", strip_trunk_zero: true },
];

/// Build an E.164 number (`+<dial><subscriber>`) from a country code and raw
/// user-entered digits.
///
/// Accepts numbers already in international form (`+…` or `00…`), numbers
/// with the trunk prefix (`07700 900123` for GB), and plain subscriber
/// digits. Punctuation and whitespace are ignored.
pub fn to_e164(country: &str, raw: &str) -> Result<String, CoreError> {
    let rule = COUNTRY_RULES
        .iter()
        .find(|r| r.iso.eq_ignore_ascii_case(country.trim()))
        .ok_or_else(|| {
            CoreError::Validation(format!("unsupported phone country: {country:?}"))
        })?;

    let has_plus = raw.trim_start().starts_with('+');
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(CoreError::Validation(format!(
            "phone number contains no digits: {raw:?}"
        )));
    }

    // `+<dial>…` and `00<dial>…` are already international.
    if has_plus {
        return Ok(format!("+{digits}"));
    }
    if let Some(rest) = digits.strip_prefix(INTERNATIONAL_PREFIX) {
        if rest.is_empty() {
            return Err(CoreError::Validation(format!("malformed phone number: {raw:?}")));
        }
        return Ok(format!("+{rest}"));
    }

    // Domestic form: strip the trunk zero where the country uses one.
    if rule.strip_trunk_zero {
        digits = digits.trim_start_matches('0').to_string();
        if digits.is_empty() {
            return Err(CoreError::Validation(format!("malformed phone number: {raw:?}")));
        }
    }

    Ok(format!("+{}{}", rule.dial, digits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn gb_trunk_zero_is_stripped() {
        assert_eq!(to_e164("GB", "07700 900123").unwrap(), "+447700900123");
    }

    #[test]
    fn us_number_keeps_leading_digits() {
        assert_eq!(to_e164("US", "(555) 013-4567").unwrap(), "+15550134567");
    }

    #[test]
    fn plus_form_passes_through() {
        assert_eq!(to_e164("AU", "+61 412 345 678").unwrap(), "+61412345678");
    }

    #[test]
    fn double_zero_international_prefix() {
        assert_eq!(to_e164("GB", "0044 7700 900123").unwrap(), "+447700900123");
    }

    #[test]
    fn lowercase_country_code_accepted() {
        assert_eq!(to_e164("nz", "021 123 456").unwrap(), "+6421123456");
    }

    #[test]
    fn unknown_country_is_rejected() {
        assert_matches!(to_e164("XX", "12345"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn digitless_input_is_rejected() {
        assert_matches!(to_e164("US", "call me"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn all_zero_gb_number_is_rejected() {
        assert_matches!(to_e164("GB", "0000"), Err(CoreError::Validation(_)));
    }
}
