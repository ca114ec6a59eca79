use std::fmt;
use std::path::{Path, PathBuf};

use egui::Color32;
use image::Rgba;

use crate::components::history::DEFAULT_MAX_UNDO_STEPS;
use crate::keybindings::KeyBindings;

pub const DEFAULT_CANVAS_WIDTH: u32 = 800;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 600;
pub const DEFAULT_RESIZE_DEBOUNCE_MS: u64 = 50;
pub const DEFAULT_EXPORT_PREFIX: &str = "notepad";

const DARK_BACKGROUND: Rgba<u8> = Rgba([0x1f, 0x29, 0x37, 0xff]);
const LIGHT_BACKGROUND: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    /// Fill for opaque layers.
    pub fn background(&self) -> Rgba<u8> {
        match self {
            ThemeMode::Light => LIGHT_BACKGROUND,
            ThemeMode::Dark => DARK_BACKGROUND,
        }
    }

    /// Ink that contrasts with the background.
    pub fn default_ink(&self) -> Color32 {
        match self {
            ThemeMode::Light => Color32::BLACK,
            ThemeMode::Dark => Color32::WHITE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Engine tunables, stored as `key=value` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub theme_mode: ThemeMode,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Undo depth per layer, the initial state not counted.
    pub max_undo_steps: usize,
    pub resize_debounce_ms: u64,
    pub show_grid: bool,
    pub export_prefix: String,
    pub keybindings: KeyBindings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            theme_mode: ThemeMode::Light,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            max_undo_steps: DEFAULT_MAX_UNDO_STEPS,
            resize_debounce_ms: DEFAULT_RESIZE_DEBOUNCE_MS,
            show_grid: false,
            export_prefix: DEFAULT_EXPORT_PREFIX.to_string(),
            keybindings: KeyBindings::default(),
        }
    }
}

impl EngineSettings {
    pub fn default_path() -> PathBuf {
        crate::logger::data_dir()
            .join("Sketchpad")
            .join("sketchpad_settings.cfg")
    }

    /// Load from the platform data directory (defaults if missing).
    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Load settings from `path` (returns default if file missing or unreadable).
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                log_info!("Settings loaded from {}", path.display());
                Self::from_cfg_str(&content)
            }
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_cfg_string())
    }

    pub fn to_cfg_string(&self) -> String {
        let mut content = format!(
            "theme_mode={}\n\
             canvas_width={}\n\
             canvas_height={}\n\
             max_undo_steps={}\n\
             resize_debounce_ms={}\n\
             show_grid={}\n\
             export_prefix={}\n",
            self.theme_mode,
            self.canvas_width,
            self.canvas_height,
            self.max_undo_steps,
            self.resize_debounce_ms,
            self.show_grid,
            self.export_prefix,
        );
        for line in self.keybindings.to_config_lines() {
            content.push_str(&line);
            content.push('\n');
        }
        content
    }

    /// Unknown keys are ignored; a malformed value keeps that key's default.
    pub fn from_cfg_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            if let Some(action) = key.strip_prefix("keybind.") {
                if !s.keybindings.load_config_line(action, val) {
                    log_warn!("Settings: ignoring keybinding '{}={}'", key, val);
                }
                continue;
            }
            match key {
                "theme_mode" => {
                    s.theme_mode = match val {
                        "dark" => ThemeMode::Dark,
                        _ => ThemeMode::Light,
                    };
                }
                "canvas_width" => {
                    s.canvas_width = val.parse().unwrap_or(DEFAULT_CANVAS_WIDTH);
                }
                "canvas_height" => {
                    s.canvas_height = val.parse().unwrap_or(DEFAULT_CANVAS_HEIGHT);
                }
                "max_undo_steps" => {
                    s.max_undo_steps = val.parse().unwrap_or(DEFAULT_MAX_UNDO_STEPS);
                }
                "resize_debounce_ms" => {
                    s.resize_debounce_ms = val.parse().unwrap_or(DEFAULT_RESIZE_DEBOUNCE_MS);
                }
                "show_grid" => {
                    s.show_grid = val == "true";
                }
                "export_prefix" => {
                    if !val.is_empty() {
                        s.export_prefix = val.to_string();
                    }
                }
                _ => {}
            }
        }
        s
    }
}
