use crate::auth::ThrottlePolicy;
use std::path::PathBuf;

/// Application configuration
///
/// Collected from the CLI at startup; tests build one directly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind host for the HTTP server
    pub host: String,

    /// Bind port (0 lets the OS choose, used by tests)
    pub port: u16,

    /// Bootstrap super-administrator username
    pub admin_username: String,

    /// Bootstrap super-administrator password
    pub admin_password: String,

    /// Snapshot file to load at startup and save on demand
    pub snapshot_path: Option<PathBuf>,

    /// Tables left unprovisioned (mirrors a half-migrated deployment)
    pub skip_tables: Vec<String>,

    /// Login throttle policy
    pub throttle: ThrottlePolicy,

    /// "Remember me" session lifetime in days
    pub session_remember_days: i64,

    /// Plain session lifetime in hours
    pub session_hours: i64,

    /// Credit bureau integration toggle
    pub bureau_enabled: bool,

    /// Bureau provider API key; absent means simulated scores
    pub bureau_api_key: Option<String>,

    /// Bureau provider endpoint; absent means a stubbed provider
    pub bureau_url: Option<String>,

    /// NPA summary toggle
    pub npa_enabled: bool,

    /// Rendered create-form cache capacity
    pub fragment_cache_size: usize,
}

impl AppConfig {
    pub fn new(admin_username: &str, admin_password: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            admin_username: admin_username.to_string(),
            admin_password: admin_password.to_string(),
            snapshot_path: None,
            skip_tables: Vec::new(),
            throttle: ThrottlePolicy::default(),
            session_remember_days: 14,
            session_hours: 12,
            bureau_enabled: false,
            bureau_api_key: None,
            bureau_url: None,
            npa_enabled: false,
            fragment_cache_size: 64,
        }
    }

    /// Set the bind host
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the bind port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the snapshot file path
    pub fn snapshot_path(mut self, path: PathBuf) -> Self {
        self.snapshot_path = Some(path);
        self
    }

    /// Leave a table unprovisioned
    pub fn skip_table(mut self, entity: &str) -> Self {
        self.skip_tables.push(entity.to_string());
        self
    }

    /// Set the throttle policy
    pub fn throttle(mut self, policy: ThrottlePolicy) -> Self {
        self.throttle = policy;
        self
    }

    /// Enable the credit bureau feature
    pub fn bureau(mut self, api_key: Option<&str>, url: Option<&str>) -> Self {
        self.bureau_enabled = true;
        self.bureau_api_key = api_key.map(str::to_string);
        self.bureau_url = url.map(str::to_string);
        self
    }

    /// Enable the NPA summary feature
    pub fn npa(mut self) -> Self {
        self.npa_enabled = true;
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.admin_username.is_empty() {
            return Err("Admin username cannot be empty".to_string());
        }

        if self.admin_password.is_empty() {
            return Err("Admin password cannot be empty".to_string());
        }

        if self.session_remember_days <= 0 || self.session_hours <= 0 {
            return Err("Session lifetimes must be positive".to_string());
        }

        if self.fragment_cache_size == 0 {
            return Err("fragment_cache_size must be > 0".to_string());
        }

        if self.bureau_url.is_some() && self.bureau_api_key.is_none() {
            return Err("A bureau URL requires an API key".to_string());
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new("admin", "adminpass")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.admin_username, "admin");
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert!(!config.bureau_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = AppConfig::new("root", "branchpass")
            .host("0.0.0.0")
            .port(9001)
            .skip_table("appointment")
            .bureau(Some("key-123"), None)
            .npa();

        assert_eq!(config.bind_addr(), "0.0.0.0:9001");
        assert_eq!(config.skip_tables, vec!["appointment"]);
        assert!(config.bureau_enabled);
        assert!(config.npa_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(AppConfig::new("", "pass").validate().is_err());
        assert!(AppConfig::new("admin", "").validate().is_err());

        let mut config = AppConfig::default();
        config.session_hours = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.bureau_url = Some("https://bureau.example".to_string());
        assert!(config.validate().is_err());
    }
}
