use serde::Serialize;

pub const DEFAULT_THEME: &str = "tokyo_night";
const BASE_STYLESHEET: &str = "themes/tokyo_night.tcss";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ThemeOption {
    pub key: &'static str,
    pub label: &'static str,
    pub override_css: &'static str,
}

pub const THEMES: &[ThemeOption] = &[
    ThemeOption {
        key: "tokyo_night",
        label: "Tokyo Night (default)",
        override_css: "themes/overrides/tokyo_night.tcss",
    },
    ThemeOption {
        key: "dracula",
        label: "Dracula",
        override_css: "themes/overrides/dracula.tcss",
    },
    ThemeOption {
        key: "nord",
        label: "Nord",
        override_css: "themes/overrides/nord.tcss",
    },
    ThemeOption {
        key: "gruvbox",
        label: "Gruvbox",
        override_css: "themes/overrides/gruvbox.tcss",
    },
];

pub fn is_known(key: &str) -> bool {
    THEMES.iter().any(|t| t.key == key)
}

/// Look up a theme, falling back to the default for unknown keys.
pub fn get_theme(key: &str) -> &'static ThemeOption {
    THEMES.iter().find(|t| t.key == key).unwrap_or(&THEMES[0])
}

/// Base stylesheet followed by the theme's override.
pub fn css_paths_for(key: &str) -> [&'static str; 2] {
    [BASE_STYLESHEET, get_theme(key).override_css]
}
