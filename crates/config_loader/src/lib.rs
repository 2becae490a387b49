//! # Config Loader
//!
//! Reads the session file that drives one lane-detection run: which town to
//! load, where the simulator listens, the ego vehicle and its camera, the
//! validation gate, recording and loop pacing.
//!
//! Every section is optional. A missing key keeps its `SessionConfig`
//! default, so an empty file is a valid session. Values are checked after
//! parsing and the first offending field is reported by its dotted path
//! (`camera.fov`, `recording.output_dir`).
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let session = ConfigLoader::load_from_path(Path::new("session.toml"))?;
//! println!(
//!     "{} via {}:{}, camera {}x{}",
//!     session.town, session.carla.host, session.carla.port,
//!     session.camera.width, session.camera.height,
//! );
//! # Ok::<(), contracts::ContractError>(())
//! ```

mod parser;
mod validator;

pub use contracts::SessionConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Entry point for session files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a session file, picking TOML or JSON from its extension
    ///
    /// # Errors
    /// Unknown extension, unreadable file, malformed content, or a value
    /// outside its allowed range.
    pub fn load_from_path(path: &Path) -> Result<SessionConfig, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and check session content already in memory
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SessionConfig, ContractError> {
        let session = parser::parse(content, format)?;
        validator::validate(&session)?;
        Ok(session)
    }

    /// Re-check a session after command-line flags changed it
    pub fn validate(session: &SessionConfig) -> Result<(), ContractError> {
        validator::validate(session)
    }

    /// Effective session as TOML, in the same layout `load_from_str` accepts
    pub fn to_toml(session: &SessionConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(session)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Effective session as JSON
    pub fn to_json(session: &SessionConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(session)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SESSION_TOML: &str = r#"
town = "Town05"
enable_recording = false
validation_mode = true

[carla]
host = "localhost"
port = 2000
timeout_sec = 10.0

[vehicle]
blueprint = "vehicle.tesla.model3"
spawn_seed = 7

[camera]
width = 1280
height = 720
fov = 90.0
[camera.transform.location]
x = 2.0
y = 0.0
z = 1.3
[camera.transform.rotation]
pitch = -8.0
yaw = 0.0
roll = 0.0

[validation]
start_after_sec = 5.0
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.town, "Town05");
        assert_eq!(config.vehicle.spawn_seed, Some(7));
    }

    #[test]
    fn test_cli_overrides_are_rechecked() {
        let mut session = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml).unwrap();
        assert!(ConfigLoader::validate(&session).is_ok());

        session.town.clear();
        assert!(ConfigLoader::validate(&session).is_err());
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config.town, config2.town);
        assert_eq!(config.camera.transform, config2.camera.transform);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.town, config2.town);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
town = "Town01"
[camera]
fov = 200.0
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("camera.fov"));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SESSION_TOML.as_bytes()).unwrap();
        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.town, "Town05");

        let yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(yaml.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
