//! Buyer session state: bearer token and cart session key.
//!
//! A `Session` is constructed once at start-up over the persisted store and
//! shared (cheaply cloned) by the order and payment clients. `logout` clears
//! everything the session owns.

use std::fmt;
use std::sync::Arc;

use secrecy::SecretString;
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StoreError, keys};

/// Explicit holder for the values that identify the current buyer.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The bearer token, if the buyer is logged in.
    ///
    /// Store read failures are treated as "not logged in".
    #[must_use]
    pub fn auth_token(&self) -> Option<SecretString> {
        match self.store.get(keys::AUTH_TOKEN) {
            Ok(Some(token)) if !token.trim().is_empty() => Some(SecretString::from(token)),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read auth token");
                None
            }
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.auth_token().is_some()
    }

    /// Store a bearer token obtained from the login flow.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the token cannot be persisted.
    pub fn login(&self, token: &str) -> Result<(), StoreError> {
        self.store.set(keys::AUTH_TOKEN, token.trim())?;
        debug!("Session token stored");
        Ok(())
    }

    /// Forget the bearer token and the cart session key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be updated.
    pub fn logout(&self) -> Result<(), StoreError> {
        self.store.remove(keys::AUTH_TOKEN)?;
        self.store.remove(keys::CART_SESSION_KEY)?;
        debug!("Session cleared");
        Ok(())
    }

    /// The cart session key, generating and persisting a new one if absent.
    ///
    /// If the store cannot be written the freshly generated key is still
    /// returned for this request.
    #[must_use]
    pub fn cart_session_key(&self) -> String {
        if let Ok(Some(key)) = self.store.get(keys::CART_SESSION_KEY)
            && !key.is_empty()
        {
            return key;
        }
        let key = uuid::Uuid::new_v4().simple().to_string();
        if let Err(e) = self.store.set(keys::CART_SESSION_KEY, &key) {
            warn!(error = %e, "Failed to persist cart session key");
        }
        key
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::storage::MemoryStore;

    fn session() -> (Session, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Session::load(store.clone()), store)
    }

    #[test]
    fn test_login_logout() {
        let (session, store) = session();
        assert!(!session.is_authenticated());

        session.login("  tok-123 ").unwrap();
        assert_eq!(session.auth_token().unwrap().expose_secret(), "tok-123");

        let cart_key = session.cart_session_key();
        session.logout().unwrap();
        assert!(session.auth_token().is_none());
        assert_eq!(store.get(keys::CART_SESSION_KEY).unwrap(), None);
        assert_ne!(session.cart_session_key(), cart_key);
    }

    #[test]
    fn test_blank_token_is_anonymous() {
        let (session, store) = session();
        store.set(keys::AUTH_TOKEN, "   ").unwrap();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_cart_session_key_is_stable() {
        let (session, _store) = session();
        let first = session.cart_session_key();
        assert_eq!(first.len(), 32);
        assert_eq!(session.cart_session_key(), first);
    }

    #[test]
    fn test_debug_hides_token() {
        let (session, _store) = session();
        session.login("very-secret").unwrap();
        let out = format!("{session:?}");
        assert!(!out.contains("very-secret"));
        assert!(out.contains("authenticated: true"));
    }
}
