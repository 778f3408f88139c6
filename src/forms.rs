//! Login and signup form records.
//!
//! Forms are structured, validated records: every field the flows rely
//! on is declared here, nothing travels as loose key/value pairs.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Deserialize;
use validator::Validate;

use crate::backend::Registration;
use crate::error::ValidationError;
use crate::phone::PhoneNumber;

static NATIONAL_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").unwrap());

fn validate_national_number(
    value: &str,
) -> Result<(), validator::ValidationError> {
    if NATIONAL_NUMBER.is_match(value) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("phone_number"))
    }
}

fn default_country_code() -> String {
    "+1".to_owned()
}

/// Login form: the credential pair checked before any phone challenge.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

impl LoginForm {
    /// Run field validation.
    pub fn validated(self) -> Result<Self, ValidationError> {
        self.validate()?;
        Ok(self)
    }
}

/// Signup form: the registration profile collected before the challenge.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupForm {
    #[validate(length(min = 1, max = 64, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 64, message = "Last name is required."))]
    pub last_name: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 255,
        message = "Password must contain at least 6 characters."
    ))]
    pub password: String,
    pub confirm_password: String,
    /// Country dial prefix from the selector, `+`-prefixed or bare digits.
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[validate(custom(
        function = "validate_national_number",
        message = "Phone number must contain exactly 10 digits."
    ))]
    pub phone_number: String,
    pub address: Option<String>,
    #[serde(default)]
    pub user_types: Vec<String>,
}

impl SignupForm {
    /// Run field validation plus the password equality rule.
    pub fn validated(self) -> Result<Self, ValidationError> {
        self.validate()?;

        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }

        Ok(self)
    }

    /// E.164 number assembled from the selector and the national number.
    pub fn phone(&self) -> Result<PhoneNumber, ValidationError> {
        PhoneNumber::from_parts(&self.country_code, &self.phone_number)
    }

    /// Registration record submitted once the phone number is verified.
    pub fn registration(&self, phone: &PhoneNumber) -> Registration {
        Registration {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone_number: phone.as_str().to_owned(),
            address: self.address.clone(),
            user_types: self.user_types.clone(),
            phone_verified: true,
        }
    }
}
