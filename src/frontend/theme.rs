//! Color themes for graphical front ends
//!
//! Themes are plain data registered up front. Palettes may be partial; any
//! key they lack is taken from the base theme.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Color name to `#rrggbb` value
pub type Palette = BTreeMap<String, String>;

/// Name of the built-in base theme
pub const BASE_THEME_NAME: &str = "Discord + Steam";

/// Name of the built-in terminal theme
pub const RETRO_TERMINAL_NAME: &str = "Retro Terminal";

const BASE_PALETTE: [(&str, &str); 8] = [
    ("bg", "#1e2127"),
    ("panel", "#242833"),
    ("panel_outline", "#2e3442"),
    ("text", "#e9eef7"),
    ("muted", "#a6b3c6"),
    ("accent", "#5865f2"),
    ("accent_alt", "#66c0f4"),
    ("warning", "#fcbf49"),
];

const RETRO_TERMINAL_PALETTE: [(&str, &str); 8] = [
    ("bg", "#0b0f0c"),
    ("panel", "#111a13"),
    ("panel_outline", "#1c2b1e"),
    ("text", "#e2ffe5"),
    ("muted", "#8ac58f"),
    ("accent", "#3aff7a"),
    ("accent_alt", "#f5b971"),
    ("warning", "#f8d66d"),
];

/// A named palette with metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// Unique theme name
    pub name: String,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Author
    #[serde(default)]
    pub author: String,
    /// Colors, possibly partial
    #[serde(default)]
    pub palette: Palette,
}

impl Theme {
    /// Create a theme with an empty palette
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            author: String::new(),
            palette: Palette::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set one color
    pub fn with_color(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.palette.insert(key.into(), value.into());
        self
    }

    /// The built-in base theme
    pub fn discord_steam() -> Self {
        BASE_PALETTE.iter().fold(
            Theme::new(BASE_THEME_NAME).with_description("Blend of Discord blurple and Steam blues."),
            |theme, (key, value)| theme.with_color(*key, *value),
        )
    }

    /// The built-in terminal theme
    pub fn retro_terminal() -> Self {
        RETRO_TERMINAL_PALETTE.iter().fold(
            Theme::new(RETRO_TERMINAL_NAME)
                .with_description("High-contrast terminal greens with warm highlights.")
                .with_author("Bambu2Prusa"),
            |theme, (key, value)| theme.with_color(*key, *value),
        )
    }

    /// This palette with missing keys filled from `fallback`
    pub fn resolved_palette(&self, fallback: &Palette) -> Palette {
        let mut merged = fallback.clone();
        merged.extend(self.palette.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}

/// Registered themes, in registration order
#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    base: Theme,
    themes: Vec<Theme>,
}

impl ThemeRegistry {
    /// Create a registry whose base theme is `base`
    pub fn new(base: Theme) -> Self {
        let themes = vec![base.clone()];
        Self { base, themes }
    }

    /// Registry with the built-in themes
    pub fn with_builtin_themes() -> Self {
        let mut registry = Self::new(Theme::discord_steam());
        registry.register(Theme::retro_terminal());
        registry
    }

    /// Register a theme, replacing one with the same name in place
    pub fn register(&mut self, theme: Theme) {
        match self.themes.iter_mut().find(|t| t.name == theme.name) {
            Some(existing) => *existing = theme,
            None => self.themes.push(theme),
        }
    }

    /// Names of all themes
    pub fn available_themes(&self) -> Vec<&str> {
        self.themes.iter().map(|t| t.name.as_str()).collect()
    }

    /// Look up a theme by name
    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.name == name)
    }

    /// The base theme
    pub fn base(&self) -> &Theme {
        &self.base
    }

    /// Complete palette of `name`; unknown names give the base palette
    pub fn palette_for(&self, name: &str) -> Palette {
        self.get(name)
            .unwrap_or(&self.base)
            .resolved_palette(&self.base.palette)
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::with_builtin_themes()
    }
}
