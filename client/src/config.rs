use crate::{Error, Result};
use rumqttc::{MqttOptions, Transport};
use std::{fmt, time::Duration};
use url::Url;

pub const BROKER_URL_VAR: &str = "ROULETTE_BROKER_URL";
pub const CLIENT_ID_VAR: &str = "ROULETTE_CLIENT_ID";
pub const USERNAME_VAR: &str = "ROULETTE_USERNAME";
pub const PASSWORD_VAR: &str = "ROULETTE_PASSWORD";
pub const CLEAN_SESSION_VAR: &str = "ROULETTE_CLEAN_SESSION";
pub const KEEP_ALIVE_VAR: &str = "ROULETTE_KEEP_ALIVE_SECS";
pub const CONNECT_TIMEOUT_VAR: &str = "ROULETTE_CONNECT_TIMEOUT_MS";

pub const DEFAULT_CLIENT_ID: &str = "roulette-table";
const DEFAULT_KEEP_ALIVE_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const TLS_PORT: u16 = 8883;
const PLAIN_PORT: u16 = 1883;

/// Parameters for reaching the table broker.
///
/// Credentials are passed to the broker untouched.
#[derive(Clone)]
pub struct BrokerConfig {
    url: Url,
    tls: bool,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub clean_session: bool,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("url", &self.url.as_str())
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("clean_session", &self.clean_session)
            .field("keep_alive", &self.keep_alive)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl BrokerConfig {
    /// Config for `url` with default client id, no credentials and a clean session.
    ///
    /// `ssl://` and `mqtts://` connect over TLS; `tcp://` and `mqtt://` connect in the clear.
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        let tls = match url.scheme() {
            "ssl" | "mqtts" => true,
            "tcp" | "mqtt" => false,
            other => return Err(Error::InvalidScheme(other.to_string())),
        };
        if url.host_str().map_or(true, str::is_empty) {
            return Err(Error::InvalidConfig(format!("missing broker host in {url}")));
        }
        Ok(Self {
            url,
            tls,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            username: None,
            password: None,
            clean_session: true,
            keep_alive: Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        })
    }

    /// Load the config from `ROULETTE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load the config from an arbitrary variable lookup.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = get(BROKER_URL_VAR)
            .ok_or_else(|| Error::InvalidConfig(format!("{BROKER_URL_VAR} is not set")))?;
        let mut config = Self::new(&url)?;
        if let Some(client_id) = get(CLIENT_ID_VAR) {
            config.client_id = client_id;
        }
        config.username = get(USERNAME_VAR);
        config.password = get(PASSWORD_VAR);
        config.clean_session = read_bool(&get, CLEAN_SESSION_VAR, true);
        config.keep_alive =
            Duration::from_secs(read_u64(&get, KEEP_ALIVE_VAR, DEFAULT_KEEP_ALIVE_SECS));
        config.connect_timeout = Duration::from_millis(read_u64(
            &get,
            CONNECT_TIMEOUT_VAR,
            DEFAULT_CONNECT_TIMEOUT_MS,
        ));
        config.validate()?;
        Ok(config)
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Reject settings the MQTT layer cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::InvalidConfig("client id must not be empty".to_string()));
        }
        if self.client_id.starts_with(char::is_whitespace) {
            return Err(Error::InvalidConfig(
                "client id must not start with whitespace".to_string(),
            ));
        }
        if self.keep_alive < Duration::from_secs(1) {
            return Err(Error::InvalidConfig(
                "keep alive must be at least one second".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "connect timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.url
            .port()
            .unwrap_or(if self.tls { TLS_PORT } else { PLAIN_PORT })
    }

    pub(crate) fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host(), self.port());
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(self.clean_session);
        if let Some(username) = &self.username {
            options.set_credentials(username.clone(), self.password.clone().unwrap_or_default());
        }
        if self.tls {
            options.set_transport(Transport::tls_with_default_config());
        }
        options
    }
}

fn read_u64(get: &impl Fn(&str) -> Option<String>, key: &str, fallback: u64) -> u64 {
    get(key)
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(fallback)
}

fn read_bool(get: &impl Fn(&str) -> Option<String>, key: &str, fallback: bool) -> bool {
    match get(key).map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_tls_schemes_default_to_8883() {
        for url in ["ssl://broker.example.com", "mqtts://broker.example.com"] {
            let config = BrokerConfig::new(url).unwrap();
            assert!(config.is_tls());
            assert_eq!(config.host(), "broker.example.com");
            assert_eq!(config.port(), 8883);
        }
    }

    #[test]
    fn test_plain_schemes_default_to_1883() {
        let config = BrokerConfig::new("tcp://localhost").unwrap();
        assert!(!config.is_tls());
        assert_eq!(config.port(), 1883);

        let config = BrokerConfig::new("mqtt://127.0.0.1:2883").unwrap();
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(config.port(), 2883);
    }

    #[test]
    fn test_invalid_scheme() {
        let err = BrokerConfig::new("http://localhost:8080").unwrap_err();
        assert!(matches!(err, Error::InvalidScheme(_)));
        assert_eq!(
            err.to_string(),
            "invalid URL scheme: http (expected ssl, mqtts, tcp or mqtt)"
        );
    }

    #[test]
    fn test_unparseable_url() {
        assert!(matches!(BrokerConfig::new("not a url"), Err(Error::Url(_))));
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = BrokerConfig::from_vars(vars(&[(BROKER_URL_VAR, "ssl://broker:8883")])).unwrap();
        assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
        assert!(config.username.is_none());
        assert!(config.clean_session);
        assert_eq!(config.keep_alive, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = BrokerConfig::from_vars(vars(&[
            (BROKER_URL_VAR, "ssl://broker:8883"),
            (CLIENT_ID_VAR, "table-7"),
            (USERNAME_VAR, "phone1"),
            (PASSWORD_VAR, "secret"),
            (CLEAN_SESSION_VAR, "false"),
            (KEEP_ALIVE_VAR, "15"),
            (CONNECT_TIMEOUT_VAR, "2500"),
        ]))
        .unwrap();
        assert_eq!(config.client_id, "table-7");
        assert_eq!(config.username.as_deref(), Some("phone1"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert!(!config.clean_session);
        assert_eq!(config.keep_alive, Duration::from_secs(15));
        assert_eq!(config.connect_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_from_vars_requires_url() {
        let err = BrokerConfig::from_vars(vars(&[])).unwrap_err();
        assert_eq!(err.to_string(), "invalid config: ROULETTE_BROKER_URL is not set");
    }

    #[test]
    fn test_from_vars_rejects_empty_client_id() {
        let err = BrokerConfig::from_vars(vars(&[
            (BROKER_URL_VAR, "tcp://localhost"),
            (CLIENT_ID_VAR, "  "),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_settings_the_transport_cannot_use() {
        let config = BrokerConfig::new("tcp://localhost").unwrap();
        assert!(config.validate().is_ok());

        let mut leading_space = config.clone();
        leading_space.client_id = " table".to_string();
        assert!(matches!(leading_space.validate(), Err(Error::InvalidConfig(_))));

        let mut short_keep_alive = config.clone();
        short_keep_alive.keep_alive = Duration::from_millis(999);
        assert!(matches!(short_keep_alive.validate(), Err(Error::InvalidConfig(_))));

        let mut no_timeout = config;
        no_timeout.connect_timeout = Duration::ZERO;
        assert!(matches!(no_timeout.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = BrokerConfig::new("ssl://broker")
            .unwrap()
            .with_credentials("phone1", "hunter2");
        let rendered = format!("{config:?}");
        assert!(rendered.contains("phone1"));
        assert!(!rendered.contains("hunter2"));
    }
}
