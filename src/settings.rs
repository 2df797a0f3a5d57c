// ============================================================================
// SETTINGS — booth preferences persisted as a key=value .cfg file
// ============================================================================

use std::path::{Path, PathBuf};

use crate::components::colors::StripColor;
use crate::ops::export::{DEFAULT_EXPORT_SCALE, ExportOptions};
use crate::log_warn;

pub const DEFAULT_BRAND: &str = "fondairena";
const MAX_EXPORT_SCALE: f32 = 8.0;

/// Booth preferences that persist across sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct BoothSettings {
    /// Handle used for watermarks, file names and the share text.
    pub brand: String,
    /// Where downloads land. Empty = current directory.
    pub output_dir: String,
    /// Font file path or family name for notes and labels. Empty = auto.
    pub text_font: String,
    /// Font file path or family name for stickers. Empty = auto.
    pub emoji_font: String,
    /// Colour a fresh session starts with.
    pub strip_color: StripColor,
    pub export_scale: f32,
}

impl Default for BoothSettings {
    fn default() -> Self {
        Self {
            brand: DEFAULT_BRAND.to_string(),
            output_dir: String::new(),
            text_font: String::new(),
            emoji_font: String::new(),
            strip_color: StripColor::default(),
            export_scale: DEFAULT_EXPORT_SCALE,
        }
    }
}

impl BoothSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/photobooth/photobooth_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\Photobooth\photobooth_settings.cfg
    /// On macOS:   ~/Library/Application Support/Photobooth/photobooth_settings.cfg
    /// Fallback:   same directory as the executable.
    pub(crate) fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("photobooth");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("photobooth_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).unwrap_or_else(|_| {
                std::env::current_exe()
                    .ok()
                    .and_then(|p| p.parent().map(|d| d.to_string_lossy().into_owned()))
                    .unwrap_or_default()
            });
            let config_dir = PathBuf::from(appdata).join("Photobooth");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("photobooth_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("Photobooth");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("photobooth_settings.cfg"));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join("photobooth_settings.cfg")))
        }
    }

    /// Save settings to the platform config file.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            log_warn!("Settings: could not write {}: {}", path.display(), e);
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_config_string())
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else { return Self::default() };
        Self::from_config_str(&content)
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "brand={}\n\
             output_dir={}\n\
             text_font={}\n\
             emoji_font={}\n\
             strip_color={}\n\
             export_scale={}\n",
            self.brand,
            self.output_dir,
            self.text_font,
            self.emoji_font,
            self.strip_color.name(),
            self.export_scale,
        )
    }

    /// Parse `key=value` lines. Unknown keys and bad values are ignored.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "brand" => {
                    let brand = val.trim_start_matches('@');
                    if !brand.is_empty() {
                        s.brand = brand.to_string();
                    }
                }
                "output_dir" => {
                    s.output_dir = val.to_string();
                }
                "text_font" => {
                    s.text_font = val.to_string();
                }
                "emoji_font" => {
                    s.emoji_font = val.to_string();
                }
                "strip_color" => {
                    s.strip_color = val.parse().unwrap_or_default();
                }
                "export_scale" => {
                    s.export_scale = val
                        .parse::<f32>()
                        .ok()
                        .filter(|v| v.is_finite() && *v > 0.0 && *v <= MAX_EXPORT_SCALE)
                        .unwrap_or(DEFAULT_EXPORT_SCALE);
                }
                _ => {}
            }
        }
        s
    }

    /// Watermark text, e.g. `@fondairena`.
    pub fn watermark(&self) -> String {
        format!("@{}", self.brand)
    }

    pub fn output_dir(&self) -> PathBuf {
        if self.output_dir.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&self.output_dir)
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            scale: self.export_scale,
            watermark: self.watermark(),
        }
    }

    fn font_pref(value: &str) -> Option<&str> {
        Some(value).filter(|v| !v.is_empty())
    }

    pub fn text_font(&self) -> Option<&str> {
        Self::font_pref(&self.text_font)
    }

    pub fn emoji_font(&self) -> Option<&str> {
        Self::font_pref(&self.emoji_font)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_settings_load_back() {
        let settings = BoothSettings {
            brand: "snapshack".into(),
            output_dir: "/tmp/strips".into(),
            text_font: "Noto Sans".into(),
            emoji_font: String::new(),
            strip_color: StripColor::Sky,
            export_scale: 3.0,
        };
        let path = std::env::temp_dir().join(format!("photobooth_settings_{}.cfg", uuid::Uuid::new_v4()));
        settings.save_to(&path).unwrap();
        let loaded = BoothSettings::load_from(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let s = BoothSettings::from_config_str("brand=\nstrip_color=chartreuse\nexport_scale=-4\nnot a line\nfoo=bar\n");
        assert_eq!(s, BoothSettings::default());
        assert_eq!(BoothSettings::from_config_str("export_scale=NaN").export_scale, DEFAULT_EXPORT_SCALE);
    }

    #[test]
    fn brand_drives_watermark() {
        let s = BoothSettings::from_config_str("brand=@snapshack");
        assert_eq!(s.brand, "snapshack");
        assert_eq!(s.watermark(), "@snapshack");
        assert_eq!(s.export_options().watermark, "@snapshack");
        assert_eq!(BoothSettings::default().output_dir(), PathBuf::from("."));
        assert!(s.text_font().is_none());
    }
}
