//! Phone number value object used by challenge issuance.

use crate::error::ValidationError;

/// E.164-normalized phone number.
///
/// Normalization happens at construction; every consumer may assume the
/// leading `+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    value: String,
}

impl PhoneNumber {
    /// National number length collected by signup forms.
    pub const NATIONAL_DIGITS: usize = 10;

    /// Create a phone number from free-form input, enforcing a leading
    /// `+` when absent.
    ///
    /// Spaces, dashes, dots and parentheses are stripped first.
    ///
    /// # Errors
    ///
    /// Returns `Err` if anything but 7 to 15 digits remains after
    /// stripping.
    pub fn normalize(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let rest = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let digits: String = rest
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
            .collect();

        if !(7..=15).contains(&digits.len())
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationError::MalformedPhone);
        }

        Ok(Self {
            value: format!("+{digits}"),
        })
    }

    /// Compose from a country code and the 10-digit national number
    /// collected by signup forms.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the country code is not 1 to 3 digits or
    /// `national` is not exactly 10 digits.
    pub fn from_parts(
        country_code: &str,
        national: &str,
    ) -> Result<Self, ValidationError> {
        let country = country_code.trim().trim_start_matches('+');
        if country.is_empty()
            || country.len() > 3
            || !country.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationError::MalformedPhone);
        }

        let national = national.trim();
        if national.len() != Self::NATIONAL_DIGITS
            || !national.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationError::MalformedPhone);
        }

        Ok(Self {
            value: format!("+{country}{national}"),
        })
    }

    /// Returns the E.164 string, always `+`-prefixed.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefixes_plus() {
        let phone = PhoneNumber::normalize("5551234567").unwrap();
        assert_eq!(phone.as_str(), "+5551234567");
    }

    #[test]
    fn test_normalize_keeps_existing_plus() {
        let phone = PhoneNumber::normalize("+15551234567").unwrap();
        assert_eq!(phone.as_str(), "+15551234567");
    }

    #[test]
    fn test_normalize_strips_separators() {
        let phone = PhoneNumber::normalize("(555) 123-4567").unwrap();
        assert_eq!(phone.as_str(), "+5551234567");
    }

    #[test]
    fn test_normalize_rejects_letters() {
        let err = PhoneNumber::normalize("555CALLNOW").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedPhone));
    }

    #[test]
    fn test_normalize_rejects_out_of_range_lengths() {
        assert!(PhoneNumber::normalize("123456").is_err());
        assert!(PhoneNumber::normalize("1234567890123456").is_err());

        // Edge case: exactly at both bounds.
        assert!(PhoneNumber::normalize("1234567").is_ok());
        assert!(PhoneNumber::normalize("123456789012345").is_ok());
    }

    #[test]
    fn test_from_parts() {
        let phone = PhoneNumber::from_parts("+1", "5551234567").unwrap();
        assert_eq!(phone.as_str(), "+15551234567");

        let phone = PhoneNumber::from_parts("33", "5551234567").unwrap();
        assert_eq!(phone.as_str(), "+335551234567");
    }

    #[test]
    fn test_from_parts_rejects_bad_national_number() {
        assert!(PhoneNumber::from_parts("+1", "555123").is_err());
        assert!(PhoneNumber::from_parts("+1", "555123456789").is_err());
        assert!(PhoneNumber::from_parts("", "5551234567").is_err());
    }
}
