//! Configuration model loaded from external sources.

use serde::Deserialize;

fn default_batch_size() -> usize {
    500
}

#[derive(Clone, Debug, Deserialize)]
/// Settings shared by the command line and the background worker.
pub struct AppConfig {
    pub database_url: String,
    /// Endpoint the forecast worker subscribes to.
    #[serde(default)]
    pub zmq_forecast_sub: Option<String>,
    /// Rows written per statement in bulk forecast operations.
    #[serde(default = "default_batch_size")]
    pub bulk_batch_size: usize,
}

#[cfg(feature = "cli")]
impl AppConfig {
    /// Layers `config/default.yaml`, the `config/{APP_ENV}` profile
    /// (`local` when unset) and `APP_*` environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "local".into());

        config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{app_env}")).required(false))
            .add_source(config::Environment::with_prefix("APP"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_defaults_when_missing() {
        let config: AppConfig =
            serde_json::from_str(r#"{"database_url": "app.db"}"#).expect("valid config");
        assert_eq!(config.bulk_batch_size, 500);
        assert!(config.zmq_forecast_sub.is_none());
    }
}
