use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MAX_CELL_WIDTH_PX: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Widths at or below this many logical pixels show one column at a time.
    pub breakpoint_px: u32,
    /// Logical pixels per terminal cell.
    pub cell_width_px: u32,
    pub log_level: String,
    pub timings: Timings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timings {
    pub search_debounce_ms: u64,
    pub search_highlight_ms: u64,
    pub done_pulse_ms: u64,
    pub hover_linger_ms: u64,
    pub title_error_ms: u64,
    pub focus_delay_ms: u64,
    pub drag_style_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            breakpoint_px: 600,
            cell_width_px: 8,
            log_level: "info".into(),
            timings: Timings::default(),
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            search_debounce_ms: 400,
            search_highlight_ms: 2500,
            done_pulse_ms: 1000,
            hover_linger_ms: 800,
            title_error_ms: 1200,
            focus_delay_ms: 50,
            drag_style_delay_ms: 0,
        }
    }
}

impl Timings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn search_highlight(&self) -> Duration {
        Duration::from_millis(self.search_highlight_ms)
    }

    pub fn done_pulse(&self) -> Duration {
        Duration::from_millis(self.done_pulse_ms)
    }

    pub fn hover_linger(&self) -> Duration {
        Duration::from_millis(self.hover_linger_ms)
    }

    pub fn title_error(&self) -> Duration {
        Duration::from_millis(self.title_error_ms)
    }

    pub fn focus_delay(&self) -> Duration {
        Duration::from_millis(self.focus_delay_ms)
    }

    pub fn drag_style_delay(&self) -> Duration {
        Duration::from_millis(self.drag_style_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit,
    UserDir,
}

#[derive(Debug, Clone)]
pub struct ConfigLocation {
    pub path: PathBuf,
    pub source: ConfigSource,
}

pub fn locate_config(explicit: Option<PathBuf>) -> Result<ConfigLocation> {
    if let Some(path) = explicit {
        return Ok(ConfigLocation {
            path,
            source: ConfigSource::Explicit,
        });
    }
    let dirs = project_dirs()?;
    Ok(ConfigLocation {
        path: dirs.config_dir().join("config.yml"),
        source: ConfigSource::UserDir,
    })
}

/// Reads settings from `location`. A missing file in the user dir means defaults; a
/// missing explicit file is an error.
pub fn load_settings(location: &ConfigLocation) -> Result<Settings> {
    if !location.path.exists() {
        if location.source == ConfigSource::Explicit {
            anyhow::bail!("config file {:?} does not exist", location.path);
        }
        return Ok(Settings::default());
    }
    let data = fs::read_to_string(&location.path)
        .with_context(|| format!("reading {:?}", location.path))?;
    parse_settings(&data).with_context(|| format!("parsing {:?}", location.path))
}

pub fn parse_settings(data: &str) -> Result<Settings> {
    if data.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings = serde_yaml::from_str(data)?;
    if settings.cell_width_px == 0 || settings.cell_width_px > MAX_CELL_WIDTH_PX {
        anyhow::bail!("cell_width_px must be between 1 and {MAX_CELL_WIDTH_PX}");
    }
    Ok(settings)
}

/// Writes the default settings to `path` unless a file already exists there.
/// Returns whether a file was written.
pub fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = render_settings(&Settings::default())?;
    fs::write(path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(true)
}

pub fn render_settings(settings: &Settings) -> Result<String> {
    serde_yaml::to_string(settings).context("serializing settings")
}

pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "taskboard").context("locating config directory")
}
