use super::{default_global_config_path, ConfigError, Settings};
use std::path::Path;

pub fn load_global_settings() -> Result<Settings, ConfigError> {
    let path = default_global_config_path()?;
    load_settings_or_default(&path)
}

/// Load settings from `path`, falling back to defaults when the file does not
/// exist. Malformed YAML and invalid values are still fatal; only absence is
/// forgiven.
pub fn load_settings_or_default(path: &Path) -> Result<Settings, ConfigError> {
    let settings = if path.exists() {
        Settings::from_path(path)?
    } else {
        Settings::default()
    };
    settings.validate()?;
    Ok(settings)
}
