use std::collections::BTreeMap;

/// Theme applied when a user has no preference.
pub const DEFAULT_THEME: &str = "default";

/// Themes the console ships with.
pub const THEMES: [&str; 2] = ["default", "slate"];

/// Which of the known themes is active. At most one is, and none is when an
/// unknown theme was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Themes {
    active: BTreeMap<String, bool>,
}

impl Default for Themes {
    fn default() -> Self {
        Self {
            active: THEMES.iter().map(|t| (t.to_string(), false)).collect(),
        }
    }
}

impl Themes {
    pub fn select(&mut self, theme: &str) {
        for (name, active) in self.active.iter_mut() {
            *active = name == theme;
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.active
            .iter()
            .find(|(_, active)| **active)
            .map(|(name, _)| name.as_str())
    }

    pub fn is_active(&self, theme: &str) -> bool {
        self.active.get(theme).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_is_exclusive() {
        let mut themes = Themes::default();
        assert_eq!(themes.current(), None);

        themes.select("slate");
        assert_eq!(themes.current(), Some("slate"));
        assert!(!themes.is_active("default"));

        themes.select("default");
        assert_eq!(themes.current(), Some("default"));
        assert!(!themes.is_active("slate"));
    }

    #[test]
    fn test_unknown_theme_deactivates_all() {
        let mut themes = Themes::default();
        themes.select("slate");
        themes.select("neon");
        assert_eq!(themes.current(), None);
        assert!(!themes.is_active("neon"));
    }
}
