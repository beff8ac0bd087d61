//! Server configuration, read from environment variables with typed
//! defaults.

use std::env;
use std::time::Duration;

use uuid::Uuid;

/// The full recognized configuration set.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen port.
    pub port: u16,
    /// Durable store connection. Empty selects the in-memory store.
    pub database_url: String,
    /// Reconcile loop period.
    pub reconcile_interval: Duration,
    /// Substrate credentials. Empty selects the no-op orchestrator.
    pub kubeconfig_path: String,
    /// Substrate namespace for services without a tenant.
    pub default_namespace: String,
    /// Default invitation lifetime.
    pub invite_expiration: Duration,
    /// Relax auth to a fixed tenant and expose invitation tokens in
    /// responses.
    pub dev_mode: bool,
    /// Tenant id used by dev mode.
    pub dev_org_uid: Option<Uuid>,
    /// Audience/hostname for registry token issuance.
    pub registry_url: String,
    /// HS256 signing key. Unset makes token requests fail.
    pub registry_jwt_secret: String,
    /// Registry token lifetime.
    pub registry_token_expiry: Duration,
    /// Sender address for invitation mail.
    pub email_from: String,
    /// Resend API key. Required outside dev mode.
    pub resend_api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: String::new(),
            reconcile_interval: Duration::from_secs(5),
            kubeconfig_path: String::new(),
            default_namespace: "default".to_string(),
            invite_expiration: Duration::from_secs(168 * 3600),
            dev_mode: false,
            dev_org_uid: None,
            registry_url: "registry.maxcloud.dev".to_string(),
            registry_jwt_secret: String::new(),
            registry_token_expiry: Duration::from_secs(3600),
            email_from: "noreply@maxcloud.dev".to_string(),
            resend_api_key: String::new(),
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to the
    /// defaults above for unset or unparseable values.
    pub fn load() -> Self {
        let defaults = Config::default();
        Self {
            port: env_parse("PORT", defaults.port),
            database_url: env_string("DATABASE_URL", ""),
            reconcile_interval: env_duration("RECONCILE_INTERVAL", defaults.reconcile_interval),
            kubeconfig_path: env_string("KUBECONFIG", ""),
            default_namespace: env_string("DEFAULT_NAMESPACE", &defaults.default_namespace),
            invite_expiration: env_duration("INVITE_EXPIRATION", defaults.invite_expiration),
            dev_mode: env::var("DEV_MODE").is_ok_and(|v| v == "true"),
            dev_org_uid: env::var("DEV_ORG_UID")
                .ok()
                .and_then(|v| Uuid::parse_str(&v).ok()),
            registry_url: env_string("REGISTRY_URL", &defaults.registry_url),
            registry_jwt_secret: env_string("REGISTRY_JWT_SECRET", ""),
            registry_token_expiry: env_duration(
                "REGISTRY_TOKEN_EXPIRY",
                defaults.registry_token_expiry,
            ),
            email_from: env_string("EMAIL_FROM", &defaults.email_from),
            resend_api_key: env_string("RESEND_API_KEY", ""),
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_duration(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| parse_duration(&v))
        .unwrap_or(default)
}

/// Parse durations of the form `30s`, `5m`, `168h`, or a bare number
/// of seconds.
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let (value, unit) = s.split_at(s.len() - 1);
    let value: u64 = value.parse().ok()?;
    match unit {
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value * 60)),
        "h" => Some(Duration::from_secs(value * 3600)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_parse_units_and_bare_seconds() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("168h"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_duration("45"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("5x"), None);
        assert_eq!(parse_duration("x"), None);
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.reconcile_interval, Duration::from_secs(5));
        assert_eq!(config.invite_expiration, Duration::from_secs(168 * 3600));
        assert_eq!(config.registry_token_expiry, Duration::from_secs(3600));
        assert!(!config.dev_mode);
    }
}
