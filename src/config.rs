use std::path::PathBuf;
use std::time::Duration;

use crate::canvas::DEFAULT_LINE_WIDTH;
use crate::log_warn;

/// Environment variable that overrides the configured service URL.
pub const API_URL_ENV: &str = "INKCALC_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:8900";

/// User settings, persisted as `key=value` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Base URL of the evaluation service (without `/calculate`).
    pub api_url: String,
    /// Upper bound on a single request, in seconds.
    pub timeout_secs: u64,
    /// Stroke width in canvas pixels.
    pub line_width: f32,
    /// Point size of rendered results.
    pub font_size: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
            line_width: DEFAULT_LINE_WIDTH,
            font_size: 30.0,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Path to the settings file.
    ///
    /// On Linux:   ~/.config/inkcalc/inkcalc_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\InkCalc\inkcalc_settings.cfg
    /// On macOS:   ~/Library/Application Support/InkCalc/inkcalc_settings.cfg
    pub(crate) fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").ok()?;
            return Some(PathBuf::from(appdata).join("InkCalc").join("inkcalc_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("InkCalc")
                    .join("inkcalc_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = match std::env::var("XDG_CONFIG_HOME") {
                Ok(dir) => PathBuf::from(dir),
                Err(_) => PathBuf::from(std::env::var("HOME").ok()?).join(".config"),
            };
            return Some(config_dir.join("inkcalc").join("inkcalc_settings.cfg"));
        }
    }

    /// Load from disk, falling back to defaults for a missing file or key.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        Self::parse(&content)
    }

    /// Like [`Settings::load`], but writes a default file on first run so
    /// there is something to edit.
    pub fn load_or_create() -> Self {
        if let Some(path) = Self::settings_path()
            && !path.exists()
        {
            let defaults = Self::default();
            defaults.save();
            return defaults;
        }
        Self::load()
    }

    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = std::fs::write(&path, self.to_cfg_string()) {
            log_warn!("Could not save settings to {}: {}", path.display(), e);
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "api_url" if !val.is_empty() => s.api_url = val.to_string(),
                "timeout_secs" => s.timeout_secs = val.parse().unwrap_or(s.timeout_secs),
                "line_width" => {
                    s.line_width = val
                        .parse::<f32>()
                        .ok()
                        .filter(|w| *w > 0.0)
                        .unwrap_or(s.line_width)
                }
                "font_size" => {
                    s.font_size = val
                        .parse::<f32>()
                        .ok()
                        .filter(|f| *f > 0.0)
                        .unwrap_or(s.font_size)
                }
                _ => {}
            }
        }
        s
    }

    pub fn to_cfg_string(&self) -> String {
        format!(
            "api_url={}\ntimeout_secs={}\nline_width={}\nfont_size={}\n",
            self.api_url, self.timeout_secs, self.line_width, self.font_size
        )
    }

    /// Apply overrides: an explicit flag beats the environment, which beats
    /// the file.
    pub fn with_overrides(mut self, cli_api_url: Option<&str>, env_api_url: Option<&str>) -> Self {
        if let Some(url) = cli_api_url.or(env_api_url).filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        self
    }

    /// `load_or_create()` plus the `--api-url` flag and [`API_URL_ENV`].
    pub fn resolve(cli_api_url: Option<&str>) -> Self {
        let env = std::env::var(API_URL_ENV).ok();
        Self::load_or_create().with_overrides(cli_api_url, env.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Settings::parse(""), Settings::default());
    }

    #[test]
    fn parses_known_keys_and_skips_junk() {
        let s = Settings::parse(
            "# comment\napi_url = https://calc.example.com\ntimeout_secs=5\nnonsense\ncolor=red\nline_width=4.5\n",
        );
        assert_eq!(s.api_url, "https://calc.example.com");
        assert_eq!(s.timeout_secs, 5);
        assert_eq!(s.line_width, 4.5);
        assert_eq!(s.font_size, 30.0);
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let s = Settings::parse("timeout_secs=soon\nline_width=-2\nfont_size=abc\napi_url=\n");
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn saved_text_parses_back() {
        let s = Settings {
            api_url: "http://10.0.0.2:9000".into(),
            timeout_secs: 12,
            line_width: 6.0,
            font_size: 24.0,
        };
        assert_eq!(Settings::parse(&s.to_cfg_string()), s);
    }

    #[test]
    fn flag_beats_environment() {
        let s = Settings::default().with_overrides(Some("http://flag"), Some("http://env"));
        assert_eq!(s.api_url, "http://flag");
        let s = Settings::default().with_overrides(None, Some("http://env"));
        assert_eq!(s.api_url, "http://env");
        let s = Settings::default().with_overrides(None, Some("  "));
        assert_eq!(s.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let s = Settings {
            timeout_secs: 0,
            ..Settings::default()
        };
        assert_eq!(s.timeout(), Duration::from_secs(1));
    }
}
