use crate::config::{
    data_dir, init_config, load_settings, locate_config, render_settings, ConfigLocation,
    ConfigSource, Settings,
};
use crate::logging;
use crate::ui;
use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

pub fn tui(config: Option<PathBuf>, log_level: Option<String>) -> Result<()> {
    let (settings, location) = load_current_settings(config)?;
    let level = log_level.unwrap_or_else(|| settings.log_level.clone());
    let log_path = logging::init_logging(&level, &data_dir()?)?;
    info!(
        config = %location.path.display(),
        log = %log_path.display(),
        "starting board"
    );
    ui::run(settings)
}

pub fn config(config: Option<PathBuf>, init: bool) -> Result<()> {
    let location = locate_config(config)?;
    if init {
        if init_config(&location.path)? {
            println!("Wrote default config to {}", location.path.display());
        } else {
            println!("Config already exists at {}", location.path.display());
        }
    }
    let settings = load_settings(&location)?;
    println!(
        "# {} ({}{})",
        location.path.display(),
        match location.source {
            ConfigSource::Explicit => "explicit",
            ConfigSource::UserDir => "user",
        },
        if location.path.exists() {
            ""
        } else {
            ", not present; defaults"
        }
    );
    print!("{}", render_settings(&settings)?);
    Ok(())
}

fn load_current_settings(config: Option<PathBuf>) -> Result<(Settings, ConfigLocation)> {
    let location = locate_config(config)?;
    let settings = load_settings(&location)?;
    Ok((settings, location))
}
