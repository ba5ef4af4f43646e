//! Login credentials and account registration input.

use std::fmt;

use crate::error::{Error, InvalidInputError};

/// Login credentials for the token-pairing endpoint.
///
/// The dashboard backend authenticates by email address and password.
///
/// # Security
///
/// The password is never exposed in Debug output to prevent accidental logging.
///
/// # Example
///
/// ```
/// use sktrack_core::Credentials;
///
/// let creds = Credentials::new("ops@example.com", "hunter22").unwrap();
/// assert_eq!(creds.email(), "ops@example.com");
/// ```
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// Create new credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if either field is blank.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Result<Self, Error> {
        let email = email.into().trim().to_string();
        let password = password.into();

        if email.is_empty() {
            return Err(InvalidInputError::Other {
                message: "email is required".to_string(),
            }
            .into());
        }
        if password.trim().is_empty() {
            return Err(InvalidInputError::Other {
                message: "password is required".to_string(),
            }
            .into());
        }

        Ok(Self { email, password })
    }

    /// Returns the email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the password.
    ///
    /// # Security
    ///
    /// Use this only when constructing authentication requests.
    /// Never log or display this value.
    pub fn password(&self) -> &str {
        &self.password
    }
}

// Intentionally hide password in Debug output
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Shortest password the registration form accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A new account to register.
///
/// Checked locally before anything is sent: the email must look like an
/// address, the password must have at least [`MIN_PASSWORD_LEN`] characters
/// and the confirmation must match it.
#[derive(Clone)]
pub struct Registration {
    email: String,
    password: String,
    confirm_password: String,
}

impl Registration {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Result<Self, Error> {
        let email = email.into().trim().to_string();
        let password = password.into();
        let confirm_password = confirm_password.into();

        let invalid = |message: &str| -> Error {
            InvalidInputError::Other {
                message: message.to_string(),
            }
            .into()
        };

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(invalid("please enter a valid email")),
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(invalid("password must be at least 6 characters"));
        }
        if password != confirm_password {
            return Err(invalid("passwords do not match"));
        }

        Ok(Self {
            email,
            password,
            confirm_password,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the password. Only for building the registration request.
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn confirm_password(&self) -> &str {
        &self.confirm_password
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}
