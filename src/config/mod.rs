mod overrides;

pub use overrides::{apply_env, apply_run_args, ENV_VARS};
pub use vf_core::Config;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = Config::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    for warning in config.validate() {
        tracing::debug!("{:?}: {}", path, warning);
    }

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./vodforge.toml",
        "~/.config/vodforge/config.toml",
        "/etc/vodforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Load the file config, then layer the process environment over it.
pub fn load_effective(custom_path: Option<&Path>) -> Result<Config> {
    let mut config = load_config_or_default(custom_path)?;
    apply_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}
