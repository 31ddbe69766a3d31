use crate::core::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

/// Capability groups mirrored from profile role flags. Group membership
/// is one of the three sources the role resolver ORs together.
pub const CAPABILITY_GROUPS: &[&str] = &[
    "Admin",
    "Master",
    "DataEntry",
    "Reports",
    "Accounting",
    "RecoveryAgent",
    "Auditor",
    "Manager",
];

/// One login account. Profiles provision these as a side effect of
/// saving; the bootstrap administrator is created at startup.
#[derive(Debug, Clone)]
pub struct Identity {
    username: String,
    password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub groups: BTreeSet<String>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Accounts provisioned without a password carry an empty hash and
    /// cannot log in until one is set.
    pub fn has_usable_password(&self) -> bool {
        !self.password_hash.is_empty()
    }
}

/// The outcome of provisioning an identity from a profile save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    Updated,
}

/// In-memory account directory keyed by username.
pub struct IdentityDirectory {
    identities: RwLock<HashMap<String, Identity>>,
}

impl IdentityDirectory {
    pub fn new() -> Self {
        Self {
            identities: RwLock::new(HashMap::new()),
        }
    }

    fn hash_password(password: &str) -> Result<String> {
        bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|err| EngineError::Unexpected(format!("password hashing failed: {}", err)))
    }

    fn verify_password(password: &str, hash: &str) -> bool {
        if hash.is_empty() {
            return false;
        }
        bcrypt::verify(password, hash).unwrap_or(false)
    }

    /// Create the super-administrator account unless it already exists.
    pub async fn bootstrap_admin(&self, username: &str, password: &str) -> Result<()> {
        let mut identities = self.identities.write().await;
        if identities.contains_key(username) {
            return Ok(());
        }
        identities.insert(
            username.to_string(),
            Identity {
                username: username.to_string(),
                password_hash: Self::hash_password(password)?,
                is_active: true,
                is_staff: true,
                is_superuser: true,
                groups: BTreeSet::new(),
                last_login: None,
            },
        );
        tracing::info!(username, "bootstrap administrator created");
        Ok(())
    }

    /// Check credentials. Unknown users, wrong passwords and disabled
    /// accounts all come back as the same unauthorized error.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Identity> {
        let identities = self.identities.read().await;
        let identity = identities
            .get(username)
            .ok_or_else(|| EngineError::Unauthorized("Invalid username or password".into()))?;
        if !Self::verify_password(password, &identity.password_hash) {
            return Err(EngineError::Unauthorized(
                "Invalid username or password".into(),
            ));
        }
        if !identity.is_active {
            return Err(EngineError::Unauthorized("This account is disabled".into()));
        }
        Ok(identity.clone())
    }

    pub async fn get(&self, username: &str) -> Option<Identity> {
        self.identities.read().await.get(username).cloned()
    }

    pub async fn record_login(&self, username: &str) {
        let mut identities = self.identities.write().await;
        if let Some(identity) = identities.get_mut(username) {
            identity.last_login = Some(Utc::now());
        }
    }

    pub async fn set_password(&self, username: &str, password: &str) -> Result<()> {
        let hash = Self::hash_password(password)?;
        let mut identities = self.identities.write().await;
        let identity = identities.get_mut(username).ok_or_else(|| {
            EngineError::Unauthorized(format!("No account named '{}'", username))
        })?;
        identity.password_hash = hash;
        Ok(())
    }

    /// Create or update the account backing a profile: always active,
    /// staff when any role flag is set, superuser for admins, and the
    /// capability groups replaced wholesale to mirror the flags.
    pub async fn provision(
        &self,
        username: &str,
        password: Option<&str>,
        is_staff: bool,
        is_superuser: bool,
        groups: BTreeSet<String>,
    ) -> Result<ProvisionOutcome> {
        let password_hash = match password {
            Some(raw) => Some(Self::hash_password(raw)?),
            None => None,
        };
        let mut identities = self.identities.write().await;
        match identities.get_mut(username) {
            Some(identity) => {
                identity.is_active = true;
                identity.is_staff = is_staff;
                identity.is_superuser = is_superuser;
                identity.groups = groups;
                if let Some(hash) = password_hash {
                    identity.password_hash = hash;
                }
                Ok(ProvisionOutcome::Updated)
            }
            None => {
                identities.insert(
                    username.to_string(),
                    Identity {
                        username: username.to_string(),
                        password_hash: password_hash.unwrap_or_default(),
                        is_active: true,
                        is_staff,
                        is_superuser,
                        groups,
                        last_login: None,
                    },
                );
                Ok(ProvisionOutcome::Created)
            }
        }
    }

    /// Every capability group with its member usernames, sorted, for the
    /// permissions screen.
    pub async fn group_members(&self) -> BTreeMap<String, Vec<String>> {
        let identities = self.identities.read().await;
        let mut groups: BTreeMap<String, Vec<String>> = CAPABILITY_GROUPS
            .iter()
            .map(|g| (g.to_string(), Vec::new()))
            .collect();
        for identity in identities.values() {
            for group in &identity.groups {
                if let Some(members) = groups.get_mut(group) {
                    members.push(identity.username.clone());
                }
            }
        }
        for members in groups.values_mut() {
            members.sort();
        }
        groups
    }

    pub async fn count(&self) -> usize {
        self.identities.read().await.len()
    }
}

impl Default for IdentityDirectory {
    fn default() -> Self {
        Self::new()
    }
}
