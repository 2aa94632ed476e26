//! Environment variable source: `MACROENV__SECTION__KEY`, e.g.
//! `MACROENV__NOTIFY__TAG=ms01`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("MACROENV")
            .prefix_separator("__")
            .separator("__"),
    )
}
