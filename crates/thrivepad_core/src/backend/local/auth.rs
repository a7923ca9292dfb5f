//! Email/password identities for the local backend.
//!
//! # Invariants
//! - Emails are unique case-insensitively.
//! - Passwords are stored as salted SHA-256 digests, never in clear.
//! - Successful `authenticate`/`create_identity` make the identity current.

use super::{Inner, LocalBackend, OFFLINE_MESSAGE};
use crate::backend::{AuthProvider, Identity, IdentityId, Listener, ListenerRegistration};
use crate::error::AuthError;
use async_trait::async_trait;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use std::sync::{Arc, MutexGuard};
use uuid::Uuid;

const MIN_PASSWORD_CHARS: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

struct StoredCredential {
    identity: Identity,
    salt: String,
    hash: String,
}

impl LocalBackend {
    /// Marks an identity's email as verified, as following the emailed link
    /// would.
    pub fn verify_email(&self, email: &str) -> Result<(), AuthError> {
        let inner = &self.inner;
        let changed = inner
            .auth_conn()?
            .execute(
                "UPDATE identities SET email_verified = 1 WHERE email = ?1;",
                [email.trim()],
            )
            .map_err(transport)?;
        if changed == 0 {
            return Err(AuthError::InvalidCredentials);
        }

        let refreshed = inner.current_identity().map(|mut identity| {
            if identity.email.eq_ignore_ascii_case(email.trim()) {
                identity.email_verified = true;
            }
            identity
        });
        inner.set_current(refreshed);
        info!("event=email_verified module=local_backend status=ok");
        Ok(())
    }

    /// Number of verification messages dispatched to `email`.
    pub fn verification_requests(&self, email: &str) -> Result<u32, AuthError> {
        self.inner
            .auth_conn()?
            .query_row(
                "SELECT verification_requests FROM identities WHERE email = ?1;",
                [email.trim()],
                |row| row.get(0),
            )
            .optional()
            .map_err(transport)?
            .ok_or(AuthError::InvalidCredentials)
    }
}

#[async_trait]
impl AuthProvider for LocalBackend {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let inner = &self.inner;
        let stored = {
            let conn = inner.auth_conn()?;
            load_credential(&conn, email.trim())?
        };
        let Some(stored) = stored else {
            return Err(AuthError::InvalidCredentials);
        };
        if hash_password(&stored.salt, password) != stored.hash {
            return Err(AuthError::InvalidCredentials);
        }

        info!(
            "event=authenticate module=local_backend status=ok identity={}",
            stored.identity.id
        );
        inner.set_current(Some(stored.identity.clone()));
        Ok(stored.identity)
    }

    async fn create_identity(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let inner = &self.inner;
        let email = email.trim();
        if !EMAIL_RE.is_match(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::WeakPassword);
        }

        let identity = Identity {
            id: IdentityId::new(Uuid::new_v4().simple().to_string()),
            email: email.to_string(),
            display_name: None,
            email_verified: false,
        };
        {
            let conn = inner.auth_conn()?;
            if load_credential(&conn, email)?.is_some() {
                return Err(AuthError::EmailAlreadyInUse);
            }
            let salt = Uuid::new_v4().simple().to_string();
            conn.execute(
                "INSERT INTO identities (
                    id,
                    email,
                    password_salt,
                    password_hash,
                    email_verified,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, 0, ?5);",
                params![
                    identity.id.as_str(),
                    identity.email.as_str(),
                    salt.as_str(),
                    hash_password(&salt, password),
                    inner.clock.utc().timestamp_millis(),
                ],
            )
            .map_err(transport)?;
        }

        info!(
            "event=create_identity module=local_backend status=ok identity={}",
            identity.id
        );
        inner.set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn send_verification(&self, identity: &Identity) {
        let result = self.inner.auth_conn().and_then(|conn| {
            conn.execute(
                "UPDATE identities
                 SET verification_requests = verification_requests + 1
                 WHERE id = ?1;",
                [identity.id.as_str()],
            )
            .map_err(transport)
        });
        match result {
            Ok(_) => info!(
                "event=send_verification module=local_backend status=ok identity={}",
                identity.id
            ),
            Err(err) => warn!(
                "event=send_verification module=local_backend status=error identity={} error={err}",
                identity.id
            ),
        }
    }

    async fn set_display_name(&self, id: &IdentityId, name: &str) -> Result<(), AuthError> {
        let inner = &self.inner;
        let changed = inner
            .auth_conn()?
            .execute(
                "UPDATE identities SET display_name = ?1 WHERE id = ?2;",
                params![name, id.as_str()],
            )
            .map_err(transport)?;
        if changed == 0 {
            return Err(AuthError::InvalidCredentials);
        }

        let refreshed = inner.current_identity().map(|mut identity| {
            if identity.id == *id {
                identity.display_name = Some(name.to_string());
            }
            identity
        });
        inner.set_current(refreshed);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        // Local session teardown needs no connectivity.
        self.inner.set_current(None);
        info!("event=sign_out module=local_backend status=ok");
        Ok(())
    }

    fn observe_auth_state(&self, listener: Listener<Option<Identity>>) -> ListenerRegistration {
        let inner = &self.inner;
        let current = inner.current_identity();
        listener(current);
        let id = inner.auth_listeners.register((), listener);

        let weak = Arc::downgrade(inner);
        ListenerRegistration::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.auth_listeners.remove(id);
            }
        })
    }
}

impl Inner {
    fn auth_conn(&self) -> Result<MutexGuard<'_, Connection>, AuthError> {
        if self.is_offline() {
            return Err(AuthError::Transport(OFFLINE_MESSAGE.to_string()));
        }
        self.lock_conn()
            .map_err(|err| AuthError::Transport(err.to_string()))
    }
}

fn load_credential(conn: &Connection, email: &str) -> Result<Option<StoredCredential>, AuthError> {
    conn.query_row(
        "SELECT
            id,
            email,
            display_name,
            email_verified,
            password_salt,
            password_hash
         FROM identities
         WHERE email = ?1;",
        [email],
        |row| {
            Ok(StoredCredential {
                identity: parse_identity_row(row)?,
                salt: row.get("password_salt")?,
                hash: row.get("password_hash")?,
            })
        },
    )
    .optional()
    .map_err(transport)
}

fn parse_identity_row(row: &Row<'_>) -> rusqlite::Result<Identity> {
    Ok(Identity {
        id: IdentityId::new(row.get::<_, String>("id")?),
        email: row.get("email")?,
        display_name: row.get("display_name")?,
        email_verified: row.get::<_, i64>("email_verified")? == 1,
    })
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn transport(err: rusqlite::Error) -> AuthError {
    AuthError::Transport(err.to_string())
}
