//! Merge rules: defaults, override order, conflict handling.

use crate::config::default_env_file;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default(
            "storage.env_file",
            default_env_file().to_string_lossy().into_owned(),
        )?
        .set_default("notify.tag", "")?
        .set_default("logging.level", "info")
}
