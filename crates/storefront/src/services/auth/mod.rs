//! Authentication service.
//!
//! Customers are `user` items in the item store. Accounts created at guest
//! checkout carry no password; registering with the same email claims them.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use tracing::instrument;

use atelier_core::store::ItemStoreClient;
use atelier_core::{Customer, Email, ItemId};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
///
/// Handles customer registration and password login.
pub struct AuthService<'a> {
    store: &'a ItemStoreClient,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a ItemStoreClient) -> Self {
        Self { store }
    }

    /// Find the customer holding `email`, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the lookup fails.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, AuthError> {
        let matches = self
            .store
            .find_records::<Customer>("email", email.as_str())
            .await?;
        Ok(matches.into_iter().next())
    }

    /// Register a customer with email and password.
    ///
    /// A password-less account for the same email (created at guest
    /// checkout) is claimed rather than duplicated.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email already has a password.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Customer, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        let email = Email::parse(email)?;
        validate_password(password)?;

        let customer = match self.find_by_email(&email).await? {
            Some(existing) if existing.password_hash.is_some() => {
                return Err(AuthError::UserAlreadyExists);
            }
            Some(existing) => Customer {
                name: name.to_string(),
                password_hash: Some(hash_password(password)?),
                ..existing
            },
            None => Customer {
                id: ItemId::generate(),
                name: name.to_string(),
                email,
                phone: None,
                password_hash: Some(hash_password(password)?),
                created_at: Utc::now(),
                extra: serde_json::Map::new(),
            },
        };

        self.store.save_record(customer.clone()).await?;
        tracing::info!(user_id = %customer.id, "Customer registered");
        Ok(customer)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// or the account has no password yet.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Customer, AuthError> {
        let email = Email::parse(email)?;

        let customer = self
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = customer
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, hash)?;
        Ok(customer)
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("kiln-fired-42").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("kiln-fired-42", &hash).is_ok());
        assert!(matches!(
            verify_password("kiln-fired-43", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }
}
