use crate::application::pagination::PageSettings;
use crate::application::session::SessionSettings;
use crate::domain::range::RangeKind;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub source: SourceSettings,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub server: ServerSettings,
}

impl DashboardConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let session = &self.session;
        if session.devices.is_empty() {
            anyhow::bail!("session.devices must name at least one device");
        }
        if !session.devices.contains(&session.default_device) {
            anyhow::bail!(
                "session.default_device {} is not one of {:?}",
                session.default_device,
                session.devices
            );
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    pub endpoint: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub devices: Vec<String>,
    pub default_device: String,
    pub poll_interval_secs: u64,
    pub page_limit: u32,
    pub max_pages: usize,
    pub history_capacity: usize,
    pub default_range_secs: i64,
    pub alert_temperature: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            devices: vec!["B1".to_string(), "B2".to_string(), "B3".to_string()],
            default_device: "B2".to_string(),
            poll_interval_secs: 10,
            page_limit: 500,
            max_pages: 50,
            history_capacity: 5000,
            default_range_secs: 86_400,
            alert_temperature: 32.0,
        }
    }
}

impl SessionConfig {
    pub fn to_settings(&self) -> SessionSettings {
        SessionSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            pages: PageSettings {
                page_limit: self.page_limit.max(1),
                max_pages: self.max_pages.max(1),
            },
            history_capacity: self.history_capacity,
            default_range: RangeKind::preset(self.default_range_secs),
            alert_temperature: self.alert_temperature,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    15
}

/// Load `config/dashboard.*`, overridden by `DASHBOARD__SECTION__KEY` variables.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("session.devices")
                .try_parsing(true),
        )
        .build()?;

    let config: DashboardConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn parse(toml: &str) -> DashboardConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = parse(
            r#"
            [source]
            endpoint = "https://telemetry.example.com/graphql"
            "#,
        );

        assert_eq!(config.source.token, None);
        assert_eq!(config.source.request_timeout_secs, 15);
        assert_eq!(config.session.devices, vec!["B1", "B2", "B3"]);
        assert_eq!(config.session.default_device, "B2");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_session_settings_conversion() {
        let config = parse(
            r#"
            [source]
            endpoint = "https://telemetry.example.com/graphql"
            token = "secret"

            [session]
            poll_interval_secs = 0
            page_limit = 100
            max_pages = 3
            history_capacity = 250
            default_range_secs = 3600
            "#,
        );

        let settings = config.session.to_settings();
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.pages, PageSettings { page_limit: 100, max_pages: 3 });
        assert_eq!(settings.history_capacity, 250);
        assert_eq!(settings.default_range, RangeKind::preset(3600));
        assert_eq!(config.source.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_default_device_must_be_listed() {
        let config = parse(
            r#"
            [source]
            endpoint = "https://telemetry.example.com/graphql"

            [session]
            devices = ["B1", "B3"]
            default_device = "B2"
            "#,
        );

        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("B2"));
    }

    #[test]
    fn test_empty_device_list_is_rejected() {
        let mut config = parse(
            r#"
            [source]
            endpoint = "https://telemetry.example.com/graphql"
            "#,
        );
        assert!(config.validate().is_ok());

        config.session.devices.clear();
        assert!(config.validate().is_err());
    }
}
