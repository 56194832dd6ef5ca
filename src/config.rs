use crate::engine::Endpoint;
use crate::{DisplayError, Result};
use log::debug;
use std::env;
use std::fs;
use std::path::Path;

/// Stream destination used when nothing is configured.
pub const DEFAULT_ENDPOINT: &str = "rtmp://localhost:1935/live/stream";
/// Notification title used when nothing is configured.
pub const DEFAULT_NOTIFICATION_TITLE: &str = "RTP Display Stream";

const CONFIG_PATHS: [&str; 2] = ["./config.toml", "./rtp_display_config.toml"];

/// Runtime settings for the capture service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Destination used when the user toggles streaming on
    pub endpoint: String,
    /// Title of status notifications
    pub notification_title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            notification_title: DEFAULT_NOTIFICATION_TITLE.to_string(),
        }
    }
}

impl Config {
    /// Defaults, then environment variables, then the first config file found.
    pub fn load() -> Self {
        let mut config = Config::default();

        if let Ok(endpoint) = env::var("RTP_DISPLAY_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(title) = env::var("RTP_DISPLAY_TITLE") {
            config.notification_title = title;
        }

        for path in &CONFIG_PATHS {
            if let Ok(content) = fs::read_to_string(path) {
                debug!("Loading config from {}", path);
                config.apply_contents(&content);
                break;
            }
        }

        config
    }

    /// Parses `key = "value"` lines on top of the defaults.
    pub fn from_str_contents(content: &str) -> Self {
        let mut config = Config::default();
        config.apply_contents(content);
        config
    }

    fn apply_contents(&mut self, content: &str) {
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "endpoint" => self.endpoint = value.to_string(),
                "notification_title" => self.notification_title = value.to_string(),
                other => debug!("Ignoring unknown config key {}", other),
            }
        }
    }

    /// Checks that the configured endpoint is usable.
    pub fn validate(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.endpoint)
            .map_err(|e| DisplayError::Config(format!("endpoint: {}", e)))
    }
}

/// Template written for new installations.
pub const CONFIG_TEMPLATE: &str = r#"# RTP Display Configuration
# Copy this file to 'config.toml' and fill in your actual values

# Stream destination (rtmp:// or rtmps://)
endpoint = "rtmp://localhost:1935/live/stream"

# Title of status notifications
notification_title = "RTP Display Stream"
"#;

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        fs::write(path, CONFIG_TEMPLATE)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_contents() {
        let config = Config::from_str_contents(
            "# comment\nendpoint = \"rtmp://media.example.com/live/key\"\nnotification_title='Cam'\nunknown = 1\n",
        );
        assert_eq!(config.endpoint, "rtmp://media.example.com/live/key");
        assert_eq!(config.notification_title, "Cam");
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = Config::from_str_contents("endpoint = \"\"\nnot a pair\n");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_template_round_trips_defaults() {
        assert_eq!(Config::from_str_contents(CONFIG_TEMPLATE), Config::default());
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());
        let config = Config::from_str_contents("endpoint = \"srt://host:9000\"");
        assert!(matches!(config.validate(), Err(DisplayError::Config(_))));
    }

    #[test]
    fn test_create_template() {
        let path = std::env::temp_dir().join(format!(
            "rtp_display_template_{}.toml",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        create_default_config_template(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), CONFIG_TEMPLATE);

        // existing files are left alone
        fs::write(&path, "endpoint = \"rtmp://other/app/s\"").unwrap();
        create_default_config_template(&path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("other"));
        let _ = fs::remove_file(&path);
    }
}
