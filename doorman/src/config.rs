use serde::Deserialize;
use std::fs::File;

#[derive(Deserialize, Debug)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

#[derive(Deserialize, Debug)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,
    pub sentry_dsn: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
            sentry_dsn: None,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub gateway: gateway::config::Config,
    pub geo: geo::config::Config,
    pub relay: relay::config::Config,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(metrics) = &self.common.metrics
            && metrics.statsd_port == 0
        {
            return Err(ConfigError::ZeroStatsdPort);
        }

        self.gateway.validate()?;
        self.geo.validate()?;
        self.relay.validate()?;
        Ok(())
    }
}

fn default_level() -> String {
    "info".into()
}

fn default_metrics_prefix() -> String {
    "doorman".into()
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid gateway config: {0}")]
    Gateway(#[from] gateway::config::ValidationError),
    #[error("invalid geo config: {0}")]
    Geo(#[from] geo::config::ValidationError),
    #[error("invalid relay config: {0}")]
    Relay(#[from] relay::config::ValidationError),
    #[error("statsd port cannot be 0")]
    ZeroStatsdPort,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    const FULL_CONFIG: &str = r#"
            logging:
                level: debug
                sentry_dsn: "https://key@sentry.example.com/1"
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            gateway:
                listener:
                    host: 0.0.0.0
                    port: 8080
                admin_listener:
                    host: 0.0.0.0
                    port: 8081
                oauth:
                    client_id: "1234"
                    client_secret: secret
                    redirect_uri: "https://verify.example.com/callback"
                    scopes: [identify, email, guilds.join]
                access_log: /var/lib/doorman/access_log.json
                join_guild: true
            geo:
                providers:
                    - type: ip_api
                      lang: ja
                    - type: ipinfo
                      token: ipinfo-token
                timeout_ms: 4000
            relay:
                bot_token: bot-token
                log_channel_id: 111
                guild_id: 222
                role_id: 333
            "#;

    #[test]
    fn full_config() {
        let tmp = write_tmp_file(FULL_CONFIG);
        let config = Config::from_file(tmp.path()).expect("load config");
        config.validate().expect("valid config");

        assert_eq!(config.common.logging.level, "debug");
        assert!(config.common.logging.sentry_dsn.is_some());
        let metrics = config.common.metrics.as_ref().expect("metrics config");
        assert_eq!(metrics.statsd_port, 8125);
        assert_eq!(metrics.prefix, "doorman");

        assert_eq!(config.gateway.listener.port, 8080);
        assert!(config.gateway.join_guild);
        assert_eq!(config.geo.providers.len(), 2);
        assert_eq!(config.geo.timeout_ms, 4000);
        assert_eq!(config.relay.guild_id, Some(222));
        assert_eq!(
            config.relay.api_base_url.as_str(),
            "https://discord.com/api/v10"
        );
    }

    #[test]
    fn minimal_config() {
        let yaml = r#"
            gateway:
                oauth:
                    client_id: "1234"
                    redirect_uri: "https://verify.example.com/callback"
            geo:
                providers: [{type: ipapi_co}]
            relay:
                bot_token: bot-token
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");
        config.validate().expect("valid config");

        assert_eq!(config.common.logging.level, "info");
        assert!(config.common.metrics.is_none());
        assert_eq!(config.relay.log_channel_id, None);
    }

    #[test]
    fn invalid_sections() {
        let tmp = write_tmp_file(&FULL_CONFIG.replace("port: 8080", "port: 0"));
        let config = Config::from_file(tmp.path()).expect("load config");
        assert!(matches!(config.validate(), Err(ConfigError::Gateway(_))));

        let tmp = write_tmp_file(&FULL_CONFIG.replace("bot_token: bot-token", "bot_token: \"\""));
        let config = Config::from_file(tmp.path()).expect("load config");
        assert!(matches!(config.validate(), Err(ConfigError::Relay(_))));

        let tmp = write_tmp_file(&FULL_CONFIG.replace("statsd_port: 8125", "statsd_port: 0"));
        let config = Config::from_file(tmp.path()).expect("load config");
        assert!(matches!(config.validate(), Err(ConfigError::ZeroStatsdPort)));
    }

    #[test]
    fn load_errors() {
        assert!(matches!(
            Config::from_file(std::path::Path::new("/nonexistent/doorman.yaml")),
            Err(ConfigError::LoadError(_))
        ));

        let tmp = write_tmp_file("gateway: [");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
