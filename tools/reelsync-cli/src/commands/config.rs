//! Show or initialize the user configuration.

use reelsync_common::config::AppConfig;

pub fn run(config: AppConfig, init: bool) -> anyhow::Result<()> {
    if init {
        let defaults = AppConfig::default();
        defaults.save()?;
        tracing::info!("Wrote default configuration");
        return super::print_json(&defaults);
    }
    super::print_json(&config)
}
