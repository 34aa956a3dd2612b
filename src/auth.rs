// ABOUTME: Credential persistence and lifecycle (load, validate, refresh, logout)
// ABOUTME: Stores are passed explicitly so tests can swap in memory-backed ones

use crate::error::RemoteErrorKind;
use crate::oauth::{OAuthFlow, TokenGrant, SCOPES};
use crate::storage::{remove_if_exists, write_atomic};
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Refresh this long before the recorded expiry.
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expiry: DateTime<Utc>,
    #[serde(default)]
    pub scopes: BTreeSet<String>,
}

impl Credential {
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Self {
        let scopes = match &grant.scope {
            Some(scope) => split_scopes(scope),
            None => SCOPES.iter().map(|s| s.to_string()).collect(),
        };
        Credential {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expiry: now + Duration::seconds(grant.expires_in),
            scopes,
        }
    }

    /// Fold a refresh response into this credential. The refresh token is
    /// kept unless the server rotated it.
    pub fn apply_refresh(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.access_token = grant.access_token;
        self.expiry = now + Duration::seconds(grant.expires_in);
        if let Some(rotated) = grant.refresh_token {
            self.refresh_token = Some(rotated);
        }
        if let Some(scope) = &grant.scope {
            self.scopes = split_scopes(scope);
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }

    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expiry <= now + margin
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

fn split_scopes(scope: &str) -> BTreeSet<String> {
    scope.split_whitespace().map(str::to_string).collect()
}

/// Where the credential lives between invocations.
pub trait CredentialStore {
    fn load(&self) -> Result<Option<Credential>>;
    fn save(&self, credential: &Credential) -> Result<()>;
    /// Remove any stored credential. Returns whether one existed.
    fn clear(&self) -> Result<bool>;
}

/// JSON file store. Saves go through write-temp-then-rename.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        FileCredentialStore { path }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let credential = serde_json::from_str(&content).map_err(|e| {
            Error::Auth(format!(
                "Stored credential at {} is unreadable ({}). Run: gdocs auth logout",
                self.path.display(),
                e
            ))
        })?;
        Ok(Some(credential))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let json = serde_json::to_string_pretty(credential)?;
        write_atomic(&self.path, json.as_bytes())
    }

    fn clear(&self) -> Result<bool> {
        remove_if_exists(&self.path)
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new(credential: Option<Credential>) -> Self {
        MemoryCredentialStore {
            slot: Mutex::new(credential),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Credential>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self.slot().clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        *self.slot() = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        Ok(self.slot().take().is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Valid,
    Refreshing,
    Expired,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AuthState::Unauthenticated => "not authenticated",
            AuthState::Authenticating => "authenticating",
            AuthState::Valid => "authenticated",
            AuthState::Refreshing => "refreshing",
            AuthState::Expired => "expired",
        };
        f.write_str(label)
    }
}

/// Drives a credential through its lifecycle against a store and an
/// authorization server.
pub struct Authenticator<'a> {
    store: &'a dyn CredentialStore,
    flow: &'a dyn OAuthFlow,
    state: AuthState,
    credential: Option<Credential>,
    margin: Duration,
}

impl<'a> Authenticator<'a> {
    pub fn new(store: &'a dyn CredentialStore, flow: &'a dyn OAuthFlow) -> Self {
        Authenticator {
            store,
            flow,
            state: AuthState::Unauthenticated,
            credential: None,
            margin: Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Read the persisted credential and classify it. A credential is
    /// usable while unexpired or refreshable.
    pub fn load(&mut self) -> Result<AuthState> {
        self.credential = self.store.load()?;
        self.state = match &self.credential {
            None => AuthState::Unauthenticated,
            Some(c) if c.is_expired(Utc::now()) && !c.can_refresh() => AuthState::Expired,
            Some(_) => AuthState::Valid,
        };
        Ok(self.state)
    }

    /// Return a credential good for at least the refresh margin, refreshing
    /// and persisting it first when needed.
    pub fn ensure_valid(&mut self) -> Result<&Credential> {
        match self.state {
            AuthState::Valid => {}
            AuthState::Expired => {
                return Err(Error::AuthenticationRequired(
                    "stored credential expired and cannot be refreshed".into(),
                ))
            }
            _ => return Err(Error::AuthenticationRequired("no stored credential".into())),
        }

        let mut credential = self
            .credential
            .take()
            .ok_or_else(|| Error::AuthenticationRequired("no stored credential".into()))?;
        let now = Utc::now();

        if !credential.expires_within(self.margin, now) {
            return Ok(self.credential.insert(credential));
        }

        // Another process may have refreshed since this one loaded.
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                self.credential = Some(credential);
                return Err(e);
            }
        };
        if let Some(stored) = stored.filter(|s| !s.expires_within(self.margin, now)) {
            tracing::debug!("adopting credential refreshed by another process");
            return Ok(self.credential.insert(stored));
        }

        let Some(refresh_token) = credential.refresh_token.clone().filter(|t| !t.is_empty()) else {
            let expired = credential.is_expired(now);
            self.credential = Some(credential);
            if expired {
                self.state = AuthState::Expired;
                return Err(Error::AuthenticationRequired(
                    "access token expired and no refresh token is stored".into(),
                ));
            }
            return self
                .credential
                .as_ref()
                .ok_or_else(|| Error::AuthenticationRequired("no stored credential".into()));
        };

        self.state = AuthState::Refreshing;
        tracing::info!(expiry = %credential.expiry, "refreshing access token");

        match self.flow.refresh(&refresh_token) {
            Ok(grant) => {
                credential.apply_refresh(grant, Utc::now());
                self.state = AuthState::Valid;
                tracing::info!(expiry = %credential.expiry, "access token refreshed");

                // The refreshed token stays usable in memory even if it
                // cannot be persisted.
                let saved = self.store.save(&credential);
                let credential: &Credential = self.credential.insert(credential);
                match saved {
                    Ok(()) => Ok(credential),
                    Err(e) => Err(e),
                }
            }
            Err(e) if is_rejection(&e) => {
                self.state = AuthState::Unauthenticated;
                Err(Error::AuthenticationRequired(format!(
                    "refresh token was rejected ({})",
                    e
                )))
            }
            Err(e) => {
                self.state = AuthState::Valid;
                if !credential.is_expired(Utc::now()) {
                    tracing::warn!("token refresh failed, using current token until expiry: {}", e);
                    return Ok(self.credential.insert(credential));
                }
                self.credential = Some(credential);
                Err(e)
            }
        }
    }

    /// Run the interactive flow and persist the resulting credential.
    pub fn login(&mut self) -> Result<&Credential> {
        self.state = AuthState::Authenticating;
        tracing::info!("starting interactive authorization");

        let grant = match self.flow.authorize(SCOPES) {
            Ok(grant) => grant,
            Err(e) => {
                self.state = AuthState::Unauthenticated;
                return Err(match e {
                    Error::Auth(_) => e,
                    other => Error::Auth(format!("Failed to complete OAuth flow: {}", other)),
                });
            }
        };

        let credential = Credential::from_grant(grant, Utc::now());
        self.store.save(&credential)?;
        self.state = AuthState::Valid;
        Ok(self.credential.insert(credential))
    }

    /// Forget the credential. Logging out while logged out is fine.
    pub fn logout(&mut self) -> Result<bool> {
        let removed = self.store.clear()?;
        self.credential = None;
        self.state = AuthState::Unauthenticated;
        Ok(removed)
    }
}

/// The authorization server refused the refresh token itself, as opposed to
/// being unreachable or failing.
fn is_rejection(err: &Error) -> bool {
    matches!(
        err.remote_kind(),
        Some(RemoteErrorKind::BadRequest | RemoteErrorKind::Unauthorized | RemoteErrorKind::Forbidden)
    )
}

/// Short, non-secret preview of a token for display.
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 || !token.is_char_boundary(8) {
        return "***".to_string();
    }
    format!("{}...", &token[..8])
}
