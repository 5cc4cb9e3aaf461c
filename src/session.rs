use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde::Deserialize;
use tracing::warn;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const ADMIN_TOKEN_KEY: &str = "admin_token";
pub const USER_DATA_KEY: &str = "user_data";

/// Key-value store backing a session. Mirrors the browser storage the
/// storefront previously leaned on, made explicit so the 401-clearing side
/// effect is testable without a real storage backend.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

/// Membership classification, normalized once at session load. The backend
/// historically sent the tier under two different field spellings; both are
/// accepted here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipTier {
    Basic,
    Premium,
    Admin,
    Unknown,
}

impl MembershipTier {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "basic" => Self::Basic,
            "premium" => Self::Premium,
            "admin" => Self::Admin,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub email: Option<String>,
    #[serde(
        default = "unknown_tier",
        alias = "membershipTier",
        deserialize_with = "tier_from_str"
    )]
    pub membership_tier: MembershipTier,
}

fn unknown_tier() -> MembershipTier {
    MembershipTier::Unknown
}

fn tier_from_str<'de, D>(deserializer: D) -> Result<MembershipTier, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .map(MembershipTier::parse)
        .unwrap_or(MembershipTier::Unknown))
}

/// Explicit session context handed to the request helper and the widgets.
#[derive(Clone)]
pub struct Session {
    storage: Arc<dyn Storage>,
}

impl Session {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Bearer token for backend calls. Customer tokens win over admin
    /// tokens when both are present.
    pub fn token(&self) -> Option<String> {
        self.storage
            .get(ACCESS_TOKEN_KEY)
            .or_else(|| self.storage.get(ADMIN_TOKEN_KEY))
    }

    pub fn set_token(&self, token: &str) {
        self.storage.set(ACCESS_TOKEN_KEY, token);
    }

    pub fn set_admin_token(&self, token: &str) {
        self.storage.set(ADMIN_TOKEN_KEY, token);
    }

    pub fn set_user(&self, user_data: &str) {
        self.storage.set(USER_DATA_KEY, user_data);
    }

    /// Parse the stored user blob into a normalized profile. Unparseable
    /// blobs are treated as anonymous rather than failing the page.
    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.storage.get(USER_DATA_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(%err, "discarding unparseable user_data blob");
                None
            }
        }
    }

    /// Drop the authenticated state after an unauthorized response. Touches
    /// exactly the token keys and the user blob.
    pub fn clear_auth(&self) {
        self.storage.remove(ACCESS_TOKEN_KEY);
        self.storage.remove(ADMIN_TOKEN_KEY);
        self.storage.remove(USER_DATA_KEY);
    }
}
