use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use supports_color::Stream;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub service: ServiceConfig,
    pub speed: SpeedConfig,
    pub theme: ThemeConfig,
}

/// Remote catalog service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the pump test catalog API
    pub url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Rated-speed behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Rated speed (RPM) used before the catalog suggests an average
    pub fallback_rpm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub background: String,
    pub error: String,
    pub warning: String,
    pub dimmed: String,
    pub controls_bg: String,
    pub text_primary: String,
    pub text_secondary: String,
    pub table_header: String,
    pub table_header_bg: String,
    pub table_selected: String,
    pub table_highlight: String,
    pub sidebar_border: String,
    pub sidebar_border_active: String,
    pub modal_border: String,
    pub chart_line: String,
    pub chart_highlight: String,
    pub chart_eff_1: String,
    pub chart_eff_2: String,
    pub chart_eff_3: String,
    pub chart_eff_4: String,
    pub chart_eff_5: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            service: ServiceConfig::default(),
            speed: SpeedConfig::default(),
            theme: ThemeConfig::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000/api".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            fallback_rpm: 3000.0,
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            colors: ColorConfig::default(),
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            background: "black".to_string(),
            error: "red".to_string(),
            warning: "yellow".to_string(),
            dimmed: "dark_gray".to_string(),
            controls_bg: "indexed(236)".to_string(),
            text_primary: "white".to_string(),
            text_secondary: "dark_gray".to_string(),
            table_header: "white".to_string(),
            table_header_bg: "indexed(236)".to_string(),
            table_selected: "cyan".to_string(),
            table_highlight: "yellow".to_string(),
            sidebar_border: "cyan".to_string(),
            sidebar_border_active: "yellow".to_string(),
            modal_border: "cyan".to_string(),
            chart_line: "blue".to_string(),
            chart_highlight: "red".to_string(),
            // Low-to-high efficiency ramp for curve marks
            chart_eff_1: "indexed(54)".to_string(),
            chart_eff_2: "indexed(31)".to_string(),
            chart_eff_3: "indexed(37)".to_string(),
            chart_eff_4: "indexed(71)".to_string(),
            chart_eff_5: "indexed(148)".to_string(),
        }
    }
}

impl AppConfig {
    /// The default configuration file content, as shipped.
    pub fn default_template() -> &'static str {
        DEFAULT_CONFIG_TEMPLATE
    }

    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let mut config = AppConfig::default();

        if let Ok(user_config) = Self::load_user_config(app_name) {
            config.merge(user_config);
        }

        config.validate()?;

        Ok(config)
    }

    /// Load user configuration from ~/.config/pumptui/config.toml
    fn load_user_config(app_name: &str) -> Result<AppConfig> {
        let config_manager = ConfigManager::new(app_name)?;
        let config_path = config_manager.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.service.merge(other.service);
        self.speed.merge(other.speed);
        self.theme.colors.merge(other.theme.colors);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.service.url.is_empty() {
            return Err(eyre!("service.url must not be empty"));
        }

        if self.service.timeout_secs == 0 {
            return Err(eyre!("service.timeout_secs must be greater than 0"));
        }

        if !self.speed.fallback_rpm.is_finite() || self.speed.fallback_rpm <= 0.0 {
            return Err(eyre!("speed.fallback_rpm must be a positive number"));
        }

        let parser = ColorParser::new();
        self.theme.colors.validate(&parser)?;

        Ok(())
    }
}

impl ServiceConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ServiceConfig::default();
        if other.url != default.url {
            self.url = other.url;
        }
        if other.timeout_secs != default.timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
    }
}

impl SpeedConfig {
    pub fn merge(&mut self, other: Self) {
        let default = SpeedConfig::default();
        if other.fallback_rpm != default.fallback_rpm {
            self.fallback_rpm = other.fallback_rpm;
        }
    }
}

impl ColorConfig {
    /// Validate all color strings can be parsed
    fn validate(&self, parser: &ColorParser) -> Result<()> {
        for (name, value) in self.entries() {
            parser
                .parse(&value)
                .map_err(|e| eyre!("Invalid color for '{}': {}", name, e))?;
        }
        Ok(())
    }

    pub fn merge(&mut self, other: Self) {
        let default = ColorConfig::default();
        let theirs = other.entries();
        let fallback = default.entries();
        for (slot, (their, fall)) in self
            .entries_mut()
            .into_iter()
            .zip(theirs.iter().zip(fallback.iter()))
        {
            if their.1 != fall.1 {
                *slot.1 = their.1.clone();
            }
        }
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("background", self.background.clone()),
            ("error", self.error.clone()),
            ("warning", self.warning.clone()),
            ("dimmed", self.dimmed.clone()),
            ("controls_bg", self.controls_bg.clone()),
            ("text_primary", self.text_primary.clone()),
            ("text_secondary", self.text_secondary.clone()),
            ("table_header", self.table_header.clone()),
            ("table_header_bg", self.table_header_bg.clone()),
            ("table_selected", self.table_selected.clone()),
            ("table_highlight", self.table_highlight.clone()),
            ("sidebar_border", self.sidebar_border.clone()),
            ("sidebar_border_active", self.sidebar_border_active.clone()),
            ("modal_border", self.modal_border.clone()),
            ("chart_line", self.chart_line.clone()),
            ("chart_highlight", self.chart_highlight.clone()),
            ("chart_eff_1", self.chart_eff_1.clone()),
            ("chart_eff_2", self.chart_eff_2.clone()),
            ("chart_eff_3", self.chart_eff_3.clone()),
            ("chart_eff_4", self.chart_eff_4.clone()),
            ("chart_eff_5", self.chart_eff_5.clone()),
        ]
    }

    fn entries_mut(&mut self) -> Vec<(&'static str, &mut String)> {
        vec![
            ("background", &mut self.background),
            ("error", &mut self.error),
            ("warning", &mut self.warning),
            ("dimmed", &mut self.dimmed),
            ("controls_bg", &mut self.controls_bg),
            ("text_primary", &mut self.text_primary),
            ("text_secondary", &mut self.text_secondary),
            ("table_header", &mut self.table_header),
            ("table_header_bg", &mut self.table_header_bg),
            ("table_selected", &mut self.table_selected),
            ("table_highlight", &mut self.table_highlight),
            ("sidebar_border", &mut self.sidebar_border),
            ("sidebar_border_active", &mut self.sidebar_border_active),
            ("modal_border", &mut self.modal_border),
            ("chart_line", &mut self.chart_line),
            ("chart_highlight", &mut self.chart_highlight),
            ("chart_eff_1", &mut self.chart_eff_1),
            ("chart_eff_2", &mut self.chart_eff_2),
            ("chart_eff_3", &mut self.chart_eff_3),
            ("chart_eff_4", &mut self.chart_eff_4),
            ("chart_eff_5", &mut self.chart_eff_5),
        ]
    }
}

/// Color parser with terminal capability detection
pub struct ColorParser {
    supports_true_color: bool,
    supports_256: bool,
    no_color: bool,
}

impl ColorParser {
    /// Create a new ColorParser with automatic terminal capability detection
    pub fn new() -> Self {
        let no_color = std::env::var("NO_COLOR").is_ok();
        let support = supports_color::on(Stream::Stdout);

        Self {
            supports_true_color: support.as_ref().map(|s| s.has_16m).unwrap_or(false),
            supports_256: support.as_ref().map(|s| s.has_256).unwrap_or(false),
            no_color,
        }
    }

    /// Parse a color string (hex, indexed, or named) to a terminal color
    pub fn parse(&self, s: &str) -> Result<Color> {
        if self.no_color {
            return Ok(Color::Reset);
        }

        let trimmed = s.trim();

        // Hex format: "#ff0000" or "#FF0000" (6-character hex)
        if trimmed.starts_with('#') && trimmed.len() == 7 {
            let (r, g, b) = parse_hex(trimmed)?;
            return Ok(self.convert_rgb_to_terminal_color(r, g, b));
        }

        // Indexed colors: "indexed(236)" for explicit 256-color palette
        if trimmed.to_lowercase().starts_with("indexed(") && trimmed.ends_with(')') {
            let num_str = &trimmed[8..trimmed.len() - 1];
            let num = num_str.parse::<u8>().map_err(|_| {
                eyre!(
                    "Invalid indexed color: '{}'. Expected format: indexed(0-255)",
                    trimmed
                )
            })?;
            return Ok(Color::Indexed(num));
        }

        // Named colors (case-insensitive)
        let lower = trimmed.to_lowercase();
        match lower.as_str() {
            "black" => Ok(Color::Black),
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "yellow" => Ok(Color::Yellow),
            "blue" => Ok(Color::Blue),
            "magenta" => Ok(Color::Magenta),
            "cyan" => Ok(Color::Cyan),
            "white" => Ok(Color::White),

            "bright_black" | "bright black" => Ok(Color::Indexed(8)),
            "bright_red" | "bright red" => Ok(Color::Indexed(9)),
            "bright_green" | "bright green" => Ok(Color::Indexed(10)),
            "bright_yellow" | "bright yellow" => Ok(Color::Indexed(11)),
            "bright_blue" | "bright blue" => Ok(Color::Indexed(12)),
            "bright_magenta" | "bright magenta" => Ok(Color::Indexed(13)),
            "bright_cyan" | "bright cyan" => Ok(Color::Indexed(14)),
            "bright_white" | "bright white" => Ok(Color::Indexed(15)),

            "gray" | "grey" => Ok(Color::Indexed(8)),
            "dark_gray" | "dark gray" | "dark_grey" | "dark grey" => Ok(Color::Indexed(8)),
            "light_gray" | "light gray" | "light_grey" | "light grey" => Ok(Color::Indexed(7)),

            "reset" => Ok(Color::Reset),

            _ => Err(eyre!(
                "Unknown color name: '{}'. Supported: basic ANSI colors (red, blue, etc.), \
                 bright variants (bright_red, etc.), or hex colors (#ff0000)",
                trimmed
            )),
        }
    }

    /// Convert RGB values to appropriate terminal color based on capabilities
    fn convert_rgb_to_terminal_color(&self, r: u8, g: u8, b: u8) -> Color {
        if self.supports_true_color {
            Color::Rgb(r, g, b)
        } else if self.supports_256 {
            Color::Indexed(rgb_to_256_color(r, g, b))
        } else {
            rgb_to_basic_ansi(r, g, b)
        }
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse hex color string (#ff0000) to RGB components
fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    if !s.starts_with('#') || s.len() != 7 {
        return Err(eyre!(
            "Invalid hex color format: '{}'. Expected format: #rrggbb",
            s
        ));
    }

    let r = u8::from_str_radix(&s[1..3], 16)
        .map_err(|_| eyre!("Invalid red component in hex color: {}", s))?;
    let g = u8::from_str_radix(&s[3..5], 16)
        .map_err(|_| eyre!("Invalid green component in hex color: {}", s))?;
    let b = u8::from_str_radix(&s[5..7], 16)
        .map_err(|_| eyre!("Invalid blue component in hex color: {}", s))?;

    Ok((r, g, b))
}

/// Convert RGB to nearest 256-color palette index (standard xterm palette)
pub fn rgb_to_256_color(r: u8, g: u8, b: u8) -> u8 {
    // Gray shades (r ≈ g ≈ b) map to the grayscale ramp (232-255)
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 10 {
        let gray = (r as u16 + g as u16 + b as u16) / 3;
        if gray < 8 {
            return 16; // Black
        } else if gray > 247 {
            return 231; // White
        } else {
            return 232 + ((gray - 8) / 10) as u8;
        }
    }

    // 6x6x6 color cube (16-231)
    let to_cube = |v: u8| -> u8 {
        if v < 48 {
            0
        } else if v < 114 {
            1
        } else {
            ((v as u16 - 35) / 40) as u8
        }
    };
    16 + 36 * to_cube(r) + 6 * to_cube(g) + to_cube(b)
}

/// Convert RGB to the closest of the 16 basic ANSI colors
pub fn rgb_to_basic_ansi(r: u8, g: u8, b: u8) -> Color {
    let bright = (r as u16 + g as u16 + b as u16) > 384;
    match (r > 127, g > 127, b > 127) {
        (false, false, false) => Color::Black,
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (true, true, false) => Color::Yellow,
        (false, false, true) => Color::Blue,
        (true, false, true) => Color::Magenta,
        (false, true, true) => Color::Cyan,
        (true, true, true) => {
            if bright {
                Color::White
            } else {
                Color::Gray
            }
        }
    }
}

/// Theme containing parsed colors ready for use
#[derive(Debug, Clone, Default)]
pub struct Theme {
    pub colors: HashMap<String, Color>,
}

impl Theme {
    /// Create a Theme from a ThemeConfig by parsing all color strings
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        let parser = ColorParser::new();
        let mut colors = HashMap::new();

        for (name, value) in config.colors.entries() {
            colors.insert(name.to_string(), parser.parse(&value)?);
        }

        Ok(Self { colors })
    }

    /// Get a color by name, returns Reset if not found
    pub fn get(&self, name: &str) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::Reset)
    }

    /// Get a color by name, returns None if not found
    pub fn get_optional(&self, name: &str) -> Option<Color> {
        self.colors.get(name).copied()
    }
}

// Default configuration template
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");
