//! Configuration types, built from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Wait between reconnect attempts after a bridge transport failure.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// WhatsApp channel configuration.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    /// WebSocket endpoint of the Node.js bridge process.
    pub bridge_url: String,
    /// Group JIDs whose chatter is logged for digests. Empty = log all groups.
    pub monitor_groups: Vec<String>,
    /// Base directory for the per-group digest logs.
    pub group_log_dir: PathBuf,
    /// Delay before attempting to reconnect after a transport failure.
    pub reconnect_delay: Duration,
}

impl WhatsAppConfig {
    /// Build config from environment variables, defaulting to a local
    /// bridge setup.
    pub fn from_env() -> Self {
        let bridge_url =
            std::env::var("WA_BRIDGE_URL").unwrap_or_else(|_| "ws://localhost:3001".to_string());

        let monitor_groups: Vec<String> = std::env::var("WA_MONITOR_GROUPS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let group_log_dir = std::env::var("WA_GROUP_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_group_log_dir());

        Self {
            bridge_url,
            monitor_groups,
            group_log_dir,
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    /// Whether chatter from `group_jid` should be logged.
    ///
    /// An empty monitor set means every group is logged.
    pub fn monitors_group(&self, group_jid: &str) -> bool {
        self.monitor_groups.is_empty() || self.monitor_groups.iter().any(|g| g == group_jid)
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            bridge_url: "ws://localhost:3001".to_string(),
            monitor_groups: Vec::new(),
            group_log_dir: default_group_log_dir(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

fn default_group_log_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".wa-bridge/group-logs")
}

// ── Email ───────────────────────────────────────────────────────────

/// Email account configuration for the fetch tool (IMAP, read-only).
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub username: String,
    pub password: String,
}

impl EmailConfig {
    /// Build config from environment variables.
    /// Returns `None` if `EMAIL_IMAP_HOST` is not set (tool disabled).
    pub fn from_env() -> Option<Self> {
        let imap_host = std::env::var("EMAIL_IMAP_HOST").ok()?;

        let imap_port: u16 = std::env::var("EMAIL_IMAP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(993);

        let username = std::env::var("EMAIL_USERNAME").unwrap_or_default();
        let password = std::env::var("EMAIL_PASSWORD").unwrap_or_default();

        Some(Self {
            imap_host,
            imap_port,
            username,
            password,
        })
    }
}
