//! Input validation for menu service operations

use crate::contract::MenuError;

fn validation(message: impl Into<String>) -> MenuError {
    MenuError::Validation {
        message: message.into(),
    }
}

/// Acting admin label recorded on audit rows
pub fn validate_admin_name(name: &str) -> Result<&str, MenuError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(validation("Acting admin name is required"));
    }
    Ok(name)
}

/// Email/password pair for sign-in
pub fn validate_credentials(email: &str, password: &str) -> Result<(), MenuError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(validation("Email is required"));
    }
    // Full address validation is left to the identity provider
    if !email.contains('@') {
        return Err(validation(format!("'{}' is not an email address", email)));
    }
    if password.is_empty() {
        return Err(validation("Password is required"));
    }
    Ok(())
}

/// Sign-up form: credentials plus display name
pub fn validate_sign_up(email: &str, password: &str, name: &str) -> Result<(), MenuError> {
    if name.trim().is_empty() {
        return Err(validation("Name is required"));
    }
    validate_credentials(email, password)
}
