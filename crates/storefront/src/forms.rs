//! Login and registration form handling.
//!
//! Validation happens before any network call; a failed check is reported to
//! the shopper as-is and the API is never contacted.

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use shopfront_core::Email;

use crate::api::{LoginCredentials, Registration};

const MIN_PASSWORD_LEN: usize = 6;

/// A form failed validation. The display text is shown to the shopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("All fields are required")]
    MissingFields,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
}

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Where to go after a successful login.
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

fn parse_email(raw: &str) -> Result<Email, FormError> {
    Email::parse(raw.trim()).map_err(|_| FormError::InvalidEmail)
}

impl LoginForm {
    /// Validate into credentials.
    ///
    /// # Errors
    ///
    /// Returns the first failed check.
    pub fn validate(self) -> Result<LoginCredentials, FormError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(FormError::MissingCredentials);
        }

        Ok(LoginCredentials {
            email: parse_email(&self.email)?,
            password: SecretString::from(self.password),
        })
    }
}

impl RegisterForm {
    /// Validate into registration details.
    ///
    /// # Errors
    ///
    /// Returns the first failed check.
    pub fn validate(self) -> Result<Registration, FormError> {
        let name = self.name.trim();
        if name.is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(FormError::MissingFields);
        }

        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FormError::PasswordTooShort);
        }

        Ok(Registration {
            name: name.to_string(),
            email: parse_email(&self.email)?,
            password: SecretString::from(self.password),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn login(email: &str, password: &str) -> LoginForm {
        LoginForm {
            email: email.to_string(),
            password: password.to_string(),
            next: None,
        }
    }

    fn register(name: &str, email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_login_valid() {
        let credentials = login(" john@mail.com ", "changeme").validate().unwrap();
        assert_eq!(credentials.email.as_str(), "john@mail.com");
        assert_eq!(credentials.password.expose_secret(), "changeme");
    }

    #[test]
    fn test_login_missing_fields() {
        assert_eq!(
            login("", "changeme").validate().err(),
            Some(FormError::MissingCredentials)
        );
        assert_eq!(
            login("john@mail.com", "").validate().err(),
            Some(FormError::MissingCredentials)
        );
    }

    #[test]
    fn test_login_invalid_email() {
        assert_eq!(
            login("john.mail.com", "changeme").validate().err(),
            Some(FormError::InvalidEmail)
        );
        assert_eq!(
            FormError::InvalidEmail.to_string(),
            "Invalid email format"
        );
    }

    #[test]
    fn test_register_valid() {
        let registration = register("Jhon", "john@mail.com", "secret1", "secret1")
            .validate()
            .unwrap();
        assert_eq!(registration.name, "Jhon");
    }

    #[test]
    fn test_register_check_order() {
        assert_eq!(
            register("", "john@mail.com", "secret1", "secret1").validate().err(),
            Some(FormError::MissingFields)
        );
        assert_eq!(
            register("Jhon", "john@mail.com", "secret1", "secret2").validate().err(),
            Some(FormError::PasswordMismatch)
        );
        assert_eq!(
            register("Jhon", "john@mail.com", "abc", "abc").validate().err(),
            Some(FormError::PasswordTooShort)
        );
        // Email format is checked last
        assert_eq!(
            register("Jhon", "not-an-email", "secret1", "secret1").validate().err(),
            Some(FormError::InvalidEmail)
        );
    }

    #[test]
    fn test_password_too_short_message() {
        assert_eq!(
            FormError::PasswordTooShort.to_string(),
            "Password must be at least 6 characters"
        );
    }
}
