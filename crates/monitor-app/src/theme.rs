//! Theme variable resolution: a `$variable`-indirected base palette
//! with a bounded recursion limit, resolved into packed `0xAARRGGBB`
//! `u32` colors (matching `scopewatch_core::ColorSpan`) rather than a
//! GPU color type, since the rendering backend itself is out of scope.

use std::collections::{BTreeMap, HashMap};

pub const THEME_RECURSION_LIMIT: usize = 6;
const FALLBACK_COLOR: u32 = 0xFFFF_00FF; // hot pink: impossible to miss if a theme fails to resolve

#[derive(thiserror::Error, Debug)]
pub enum ThemeError {
    #[error("theme variable recursion limit reached resolving `{0}`")]
    RecursionLimitReached(String),
    #[error("theme variable `{0}` could not be resolved")]
    VariableNotFound(String),
    #[error("invalid color literal `{0}`")]
    InvalidColor(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SystemAppearance {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorPreference {
    #[default]
    Light,
    Dark,
    HighContrastDark,
    HighContrastLight,
}

impl ColorPreference {
    /// Resolves a color preference from the OS appearance signal and an
    /// explicit high-contrast request.
    pub fn resolve(system: SystemAppearance, high_contrast: bool) -> Self {
        match (system, high_contrast) {
            (SystemAppearance::Light, false) => ColorPreference::Light,
            (SystemAppearance::Dark, false) => ColorPreference::Dark,
            (SystemAppearance::Light, true) => ColorPreference::HighContrastLight,
            (SystemAppearance::Dark, true) => ColorPreference::HighContrastDark,
        }
    }
}

/// Raw `$variable`-indirected base palette as authored in a theme
/// definition.
#[derive(Debug, Clone, Default)]
pub struct ThemeBase(pub BTreeMap<String, String>);

/// A base palette with all variables resolved into concrete colors.
#[derive(Debug, Clone, Default)]
pub struct ResolvedBase(HashMap<String, u32>);

impl ResolvedBase {
    pub fn get(&self, name: &str) -> Option<u32> {
        self.0.get(name).copied()
    }
}

impl ThemeBase {
    /// Resolves every entry, falling back to `default`'s value (and, if
    /// that's also a variable, recursively further into `default`) when
    /// a variable isn't defined locally — this lets an override theme
    /// leave most of the palette untouched and only restate what
    /// differs.
    pub fn resolve(&self, default: Option<&ThemeBase>) -> ResolvedBase {
        let default = default.cloned().unwrap_or_default();
        let mut resolved = HashMap::new();
        for (key, value) in &self.0 {
            match self.resolve_variable(&default, key, value, 0) {
                Ok(literal) => match parse_color(literal) {
                    Ok(color) => {
                        resolved.insert(key.clone(), color);
                    }
                    Err(_) => {
                        tracing::warn!(key, value = literal, "unparseable theme color, using fallback");
                        resolved.insert(key.clone(), FALLBACK_COLOR);
                    }
                },
                Err(err) => {
                    tracing::warn!(key, %err, "failed to resolve theme variable");
                }
            }
        }
        ResolvedBase(resolved)
    }

    fn resolve_variable<'a>(&'a self, default: &'a ThemeBase, key: &str, value: &'a str, depth: usize) -> Result<&'a str, ThemeError> {
        let Some(var_name) = value.strip_prefix('$') else {
            return Ok(value);
        };
        if depth > THEME_RECURSION_LIMIT {
            return Err(ThemeError::RecursionLimitReached(key.to_string()));
        }
        let target = self
            .0
            .get(var_name)
            .or_else(|| default.0.get(var_name))
            .ok_or_else(|| ThemeError::VariableNotFound(var_name.to_string()))?;
        self.resolve_variable(default, var_name, target, depth + 1)
    }
}

fn parse_color(literal: &str) -> Result<u32, ThemeError> {
    let hex = literal.strip_prefix('#').unwrap_or(literal);
    match hex.len() {
        6 => u32::from_str_radix(hex, 16).map(|rgb| 0xFF00_0000 | rgb).map_err(|_| ThemeError::InvalidColor(literal.to_string())),
        8 => {
            // input is RRGGBBAA; repack to our AARRGGBB convention.
            let value = u32::from_str_radix(hex, 16).map_err(|_| ThemeError::InvalidColor(literal.to_string()))?;
            let rgb = value >> 8;
            let alpha = value & 0xFF;
            Ok((alpha << 24) | rgb)
        }
        _ => Err(ThemeError::InvalidColor(literal.to_string())),
    }
}

/// A fully authored theme: a base palette plus named UI overlay colors
/// (gutter, selection, search highlight, caret, per-message-type text
/// colors).
#[derive(Debug, Clone, Default)]
pub struct ThemeDefinition {
    pub id: String,
    pub name: String,
    pub high_contrast: bool,
    pub base: ThemeBase,
    pub ui: BTreeMap<String, String>,
}

/// Recognized overlay keys a [`ThemeDefinition::ui`] map may populate;
/// anything else is ignored rather than rejected, so future keys don't
/// break old theme files.
pub const UI_KEY_BACKGROUND: &str = "monitor.textView.bg";
pub const UI_KEY_FOREGROUND: &str = "monitor.textView.fg";
pub const UI_KEY_CARET: &str = "monitor.textView.caret";
pub const UI_KEY_SELECTION: &str = "monitor.textView.selection";
pub const UI_KEY_SEARCH_HIGHLIGHT: &str = "monitor.textView.searchHighlight";
pub const UI_KEY_GUTTER_BACKGROUND: &str = "monitor.textView.gutterBg";
pub const UI_KEY_GUTTER_FOREGROUND: &str = "monitor.textView.gutterFg";
pub const UI_KEY_TEXT_PLAIN: &str = "monitor.textView.metaText";
pub const UI_KEY_TEXT_ERROR: &str = "monitor.textView.metaError";
pub const UI_KEY_TEXT_WARNING: &str = "monitor.textView.metaWarning";
pub const UI_KEY_TEXT_INFO: &str = "monitor.textView.metaInfo";
pub const UI_KEY_TEXT_DEBUG: &str = "monitor.textView.metaDebug";

pub struct ResolvedTheme {
    pub base: ResolvedBase,
    pub ui: HashMap<String, u32>,
}

impl ThemeDefinition {
    pub fn resolve(&self, default: Option<&ThemeDefinition>) -> ResolvedTheme {
        let base = self.base.resolve(default.map(|d| &d.base));
        let mut ui = HashMap::new();
        for (key, value) in &self.ui {
            let color = if let Some(var_name) = value.strip_prefix('$') {
                base.get(var_name)
                    .or_else(|| default.and_then(|d| d.ui.get(key)).and_then(|v| v.strip_prefix('$')).and_then(|v| base.get(v)))
                    .unwrap_or(FALLBACK_COLOR)
            } else {
                parse_color(value).unwrap_or(FALLBACK_COLOR)
            };
            ui.insert(key.clone(), color);
        }
        ResolvedTheme { base, ui }
    }
}

pub fn builtin_light() -> ThemeDefinition {
    let mut base = BTreeMap::new();
    base.insert("background".to_string(), "#FFFFFF".to_string());
    base.insert("foreground".to_string(), "#1E1E1E".to_string());
    base.insert("accent".to_string(), "#0B6FCE".to_string());

    let mut ui = BTreeMap::new();
    ui.insert(UI_KEY_BACKGROUND.to_string(), "$background".to_string());
    ui.insert(UI_KEY_FOREGROUND.to_string(), "$foreground".to_string());
    ui.insert(UI_KEY_GUTTER_BACKGROUND.to_string(), "#F3F3F3".to_string());
    ui.insert(UI_KEY_GUTTER_FOREGROUND.to_string(), "#6A6A6A".to_string());
    ui.insert(UI_KEY_SELECTION.to_string(), "#ADD6FF".to_string());
    ui.insert(UI_KEY_SEARCH_HIGHLIGHT.to_string(), "#FFE564".to_string());
    ui.insert(UI_KEY_CARET.to_string(), "$accent".to_string());
    ui.insert(UI_KEY_TEXT_PLAIN.to_string(), "$foreground".to_string());
    ui.insert(UI_KEY_TEXT_ERROR.to_string(), "#C62828".to_string());
    ui.insert(UI_KEY_TEXT_WARNING.to_string(), "#B26A00".to_string());
    ui.insert(UI_KEY_TEXT_INFO.to_string(), "$foreground".to_string());
    ui.insert(UI_KEY_TEXT_DEBUG.to_string(), "#6A6A6A".to_string());

    ThemeDefinition { id: "light".to_string(), name: "Light".to_string(), high_contrast: false, base: ThemeBase(base), ui }
}

pub fn builtin_dark() -> ThemeDefinition {
    let mut base = BTreeMap::new();
    base.insert("background".to_string(), "#1E1E1E".to_string());
    base.insert("foreground".to_string(), "#D4D4D4".to_string());
    base.insert("accent".to_string(), "#4FC1FF".to_string());

    let mut ui = BTreeMap::new();
    ui.insert(UI_KEY_BACKGROUND.to_string(), "$background".to_string());
    ui.insert(UI_KEY_FOREGROUND.to_string(), "$foreground".to_string());
    ui.insert(UI_KEY_GUTTER_BACKGROUND.to_string(), "#252526".to_string());
    ui.insert(UI_KEY_GUTTER_FOREGROUND.to_string(), "#808080".to_string());
    ui.insert(UI_KEY_SELECTION.to_string(), "#264F78".to_string());
    ui.insert(UI_KEY_SEARCH_HIGHLIGHT.to_string(), "#515C00".to_string());
    ui.insert(UI_KEY_CARET.to_string(), "$accent".to_string());
    ui.insert(UI_KEY_TEXT_PLAIN.to_string(), "$foreground".to_string());
    ui.insert(UI_KEY_TEXT_ERROR.to_string(), "#F48771".to_string());
    ui.insert(UI_KEY_TEXT_WARNING.to_string(), "#DDB100".to_string());
    ui.insert(UI_KEY_TEXT_INFO.to_string(), "$foreground".to_string());
    ui.insert(UI_KEY_TEXT_DEBUG.to_string(), "#808080".to_string());

    ThemeDefinition { id: "dark".to_string(), name: "Dark".to_string(), high_contrast: false, base: ThemeBase(base), ui }
}

pub fn builtin_high_contrast_dark() -> ThemeDefinition {
    let mut theme = builtin_dark();
    theme.id = "high-contrast-dark".to_string();
    theme.name = "High Contrast Dark".to_string();
    theme.high_contrast = true;
    theme.base.0.insert("background".to_string(), "#000000".to_string());
    theme.base.0.insert("foreground".to_string(), "#FFFFFF".to_string());
    theme
}

pub fn builtin_for_preference(preference: ColorPreference) -> ThemeDefinition {
    match preference {
        ColorPreference::Light | ColorPreference::HighContrastLight => builtin_light(),
        ColorPreference::Dark => builtin_dark(),
        ColorPreference::HighContrastDark => builtin_high_contrast_dark(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_variable_indirection() {
        let theme = builtin_dark();
        let resolved = theme.resolve(None);
        let caret = resolved.ui[UI_KEY_CARET];
        let accent = resolved.base.get("accent").unwrap();
        assert_eq!(caret, accent);
    }

    #[test]
    fn unresolvable_variable_falls_back_to_hot_pink() {
        let mut base = BTreeMap::new();
        base.insert("a".to_string(), "$missing".to_string());
        let theme = ThemeBase(base);
        let resolved = theme.resolve(None);
        assert_eq!(resolved.get("a"), None, "unresolved variables are skipped, not inserted with a bogus color");
    }

    #[test]
    fn six_digit_hex_gets_full_alpha() {
        assert_eq!(parse_color("#FFFFFF").unwrap(), 0xFFFF_FFFF);
    }

    #[test]
    fn recursion_limit_is_enforced() {
        let mut base = BTreeMap::new();
        for i in 0..(THEME_RECURSION_LIMIT + 2) {
            base.insert(format!("v{i}"), format!("$v{}", i + 1));
        }
        base.insert(format!("v{}", THEME_RECURSION_LIMIT + 2), "#000000".to_string());
        let theme = ThemeBase(base);
        let resolved = theme.resolve(None);
        assert!(resolved.get("v0").is_none());
    }

    #[test]
    fn high_contrast_dark_overrides_background() {
        let theme = builtin_high_contrast_dark();
        let resolved = theme.resolve(None);
        assert_eq!(resolved.base.get("background"), Some(0xFF00_0000));
    }
}
