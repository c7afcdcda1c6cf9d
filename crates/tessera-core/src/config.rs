//! Configuration system
//!
//! TOML configuration with a serde default for every section, so a file
//! only needs the keys it changes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::input::Binding;
use crate::output::{Mode, ModeFlags, OutputFlags, OutputInfo};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Output magnification
    pub zoom: ZoomConfig,

    /// Fade and surface animation springs
    pub animation: AnimationConfig,

    /// Bindings
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,

    /// Outputs created by the headless backend
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            zoom: ZoomConfig::default(),
            animation: AnimationConfig::default(),
            bindings: default_bindings(),
            outputs: vec![OutputConfig::default()],
        }
    }
}

impl Config {
    /// Defaults without any bindings or outputs.
    pub fn empty() -> Self {
        Self {
            bindings: Vec::new(),
            outputs: Vec::new(),
            ..Self::default()
        }
    }

    /// Load configuration from `path`, or from the first config file found
    /// in the standard locations. Missing files fall back to defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = path.map(PathBuf::from).or_else(Self::find_config_file);

        match config_path {
            Some(path) if path.exists() => Self::load_from_path(&path),
            Some(path) => {
                warn!("Config file not found at {:?}, using defaults", path);
                Ok(Self::default())
            },
            None => {
                info!("No config file found, using defaults");
                Ok(Self::default())
            },
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        info!("Loading configuration from {:?}", path);
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file
    fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            dirs::config_dir().map(|p| p.join("tessera/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/tessera/config.toml")),
            Some(PathBuf::from("/etc/tessera/config.toml")),
        ];

        candidates.into_iter().flatten().find(|p| p.exists())
    }

    /// Generate default configuration as a string
    pub fn default_config_string() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }

    /// Check everything that is only interpreted later: binding chords and
    /// output modes.
    pub fn validate(&self) -> Result<()> {
        for binding in &self.bindings {
            Binding::parse(&binding.keys, &binding.action, &self.general.binding_modifier)
                .with_context(|| format!("Invalid binding '{}'", binding.keys))?;
        }
        for output in &self.outputs {
            output.info()?;
        }
        if !(0.0..1.0).contains(&self.zoom.max_level) {
            bail!("zoom.max_level must be in [0, 1), got {}", self.zoom.max_level);
        }
        Ok(())
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Inactivity before the screen fades out
    pub idle_timeout_ms: u32,
    /// Modifier substituted for `$mod` in binding chords
    pub binding_modifier: String,
    /// Whether clicking a window activates it
    pub click_to_activate: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 300_000,
            binding_modifier: "Super".to_string(),
            click_to_activate: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Level change per zoom step
    pub increment: f32,
    /// Highest level; magnification is `1 / (1 - level)`
    pub max_level: f32,
    pub spring_k: f64,
    pub friction: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            increment: 0.07,
            max_level: 0.95,
            spring_k: 250.0,
            friction: 1000.0,
        }
    }
}

/// Animation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Fade to black on idle instead of blanking at once
    pub fade: bool,
    pub fade_k: f64,
    pub surface_k: f64,
    pub surface_friction: f64,
    pub slide_k: f64,
    pub slide_friction: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fade: true,
            fade_k: 30.0,
            surface_k: 200.0,
            surface_friction: 700.0,
            slide_k: 300.0,
            slide_friction: 900.0,
        }
    }
}

/// Binding configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Chord (e.g., "$mod+PageUp", "Super+BTN_LEFT", "Super+Axis")
    pub keys: String,
    /// Action name (e.g., "move", "zoom-in"); unknown names are forwarded
    pub action: String,
}

impl BindingConfig {
    fn new(keys: &str, action: &str) -> Self {
        Self {
            keys: keys.to_string(),
            action: action.to_string(),
        }
    }
}

/// Headless output description
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub name: String,
    /// Resolution (e.g., "1024x640")
    pub resolution: String,
    /// Refresh rate in mHz
    pub refresh: u32,
    pub position: (i32, i32),
    /// Framebuffer is bottom-up
    pub flipped: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            name: "HEADLESS-1".to_string(),
            resolution: "1024x640".to_string(),
            refresh: 60_000,
            position: (0, 0),
            flipped: false,
        }
    }
}

impl OutputConfig {
    /// Output descriptor with a single preferred mode.
    pub fn info(&self) -> Result<OutputInfo> {
        let (w, h) = self
            .resolution
            .split_once('x')
            .with_context(|| format!("Invalid resolution '{}' for {}", self.resolution, self.name))?;
        let width: i32 = w.trim().parse().with_context(|| format!("Invalid width '{}'", w))?;
        let height: i32 = h.trim().parse().with_context(|| format!("Invalid height '{}'", h))?;
        if width <= 0 || height <= 0 || self.refresh == 0 {
            bail!("Output {} needs a positive size and refresh", self.name);
        }

        let mut mode = Mode::new(width, height, self.refresh);
        mode.flags = ModeFlags::CURRENT | ModeFlags::PREFERRED;
        let flags = if self.flipped {
            OutputFlags::FLIPPED
        } else {
            OutputFlags::empty()
        };
        Ok(OutputInfo {
            name: self.name.clone(),
            x: self.position.0,
            y: self.position.1,
            // Assume 96 dpi.
            mm_width: width * 254 / 960,
            mm_height: height * 254 / 960,
            flags,
            modes: vec![mode],
        })
    }
}

/// Default bindings of the desktop shell.
fn default_bindings() -> Vec<BindingConfig> {
    vec![
        BindingConfig::new("Ctrl+Alt+Backspace", "terminate"),
        BindingConfig::new("BTN_LEFT", "click-to-activate"),
        BindingConfig::new("$mod+Alt+Axis", "opacity"),
        BindingConfig::new("$mod+Axis", "zoom-axis"),
        BindingConfig::new("$mod+PageUp", "zoom-in"),
        BindingConfig::new("$mod+PageDown", "zoom-out"),
        BindingConfig::new("$mod+BTN_LEFT", "move"),
        BindingConfig::new("$mod+BTN_MIDDLE", "resize"),
        BindingConfig::new("$mod+BTN_RIGHT", "rotate"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.zoom.increment, 0.07);
        assert!(!config.bindings.is_empty());
        assert!(config.validate().is_ok());
        assert!(Config::empty().bindings.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let text = Config::default_config_string();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.bindings, Config::default().bindings);
        assert_eq!(parsed.general.idle_timeout_ms, 300_000);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[general]\nidle_timeout_ms = 1000\n\n[[outputs]]\nname = \"A\"\nresolution = \"800x600\"\nflipped = true\n"
        )
        .unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.general.idle_timeout_ms, 1000);
        assert_eq!(config.general.binding_modifier, "Super");
        assert!(config.animation.fade);

        let info = config.outputs[0].info().unwrap();
        assert_eq!((info.modes[0].width, info.modes[0].height), (800, 600));
        assert_eq!(info.modes[0].refresh, 60_000);
        assert!(info.flags.contains(OutputFlags::FLIPPED));
    }

    #[test]
    fn broken_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[general\nidle_timeout_ms = ").unwrap();
        assert!(Config::load_from_path(file.path()).is_err());
    }

    #[test]
    fn validate_rejects_bad_entries() {
        let mut config = Config::empty();
        config.bindings.push(BindingConfig::new("Super+", "move"));
        assert!(config.validate().is_err());

        let mut config = Config::empty();
        config.outputs.push(OutputConfig {
            resolution: "wide".to_string(),
            ..OutputConfig::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_explicit_path_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let config = Config::load(path.to_str()).unwrap();
        assert_eq!(config.bindings.len(), default_bindings().len());
    }
}
