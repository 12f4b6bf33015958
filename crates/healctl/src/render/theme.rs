// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::heal::HealthClass;
use colored::{Color, Colorize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThemeKey {
    Heal,
    HealBackgroundTitle,
    HealBackground,
    HealUpdateUI,
    HealStopped,
    HealDetached,
    Error,
    Health(HealthClass),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Style {
    pub color: Option<Color>,
    pub bold: bool,
}

impl Style {
    pub const fn new(color: Option<Color>, bold: bool) -> Self {
        Self { color, bold }
    }

    pub fn paint(&self, text: &str) -> String {
        let mut s = match self.color {
            Some(color) => text.color(color),
            None => text.normal(),
        };
        if self.bold {
            s = s.bold();
        }
        s.to_string()
    }
}

/// Name to style table handed to the renderer at construction.
#[derive(Clone, Debug)]
pub struct Theme {
    styles: HashMap<ThemeKey, Style>,
    enabled: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self::colored()
    }
}

impl Theme {
    pub fn colored() -> Self {
        let styles = HashMap::from([
            (ThemeKey::Heal, Style::new(Some(Color::Green), true)),
            (ThemeKey::HealBackgroundTitle, Style::new(Some(Color::Green), true)),
            (ThemeKey::HealBackground, Style::new(None, true)),
            (ThemeKey::HealUpdateUI, Style::new(Some(Color::Yellow), true)),
            (ThemeKey::HealStopped, Style::new(Some(Color::Green), true)),
            (ThemeKey::HealDetached, Style::new(Some(Color::Yellow), false)),
            (ThemeKey::Error, Style::new(Some(Color::Red), true)),
            (ThemeKey::Health(HealthClass::Green), Style::new(Some(Color::Green), false)),
            (ThemeKey::Health(HealthClass::Yellow), Style::new(Some(Color::Yellow), false)),
            (ThemeKey::Health(HealthClass::Red), Style::new(Some(Color::Red), false)),
            (ThemeKey::Health(HealthClass::Grey), Style::new(Some(Color::BrightBlack), false)),
            (ThemeKey::Health(HealthClass::Unknown), Style::new(Some(Color::Magenta), false)),
        ]);
        Self { styles, enabled: true }
    }

    /// Theme that never emits escape sequences.
    pub fn plain() -> Self {
        Self {
            styles: HashMap::new(),
            enabled: false,
        }
    }

    pub fn with_style(mut self, key: ThemeKey, style: Style) -> Self {
        self.styles.insert(key, style);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn paint(&self, key: ThemeKey, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        match self.styles.get(&key) {
            Some(style) => style.paint(text),
            None => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_theme_passes_text_through() {
        let theme = Theme::plain();
        assert!(!theme.is_enabled());
        assert_eq!(theme.paint(ThemeKey::Heal, "healing"), "healing");
    }

    #[test]
    #[serial_test::serial(colored)]
    fn test_override_style() {
        colored::control::set_override(true);
        let theme = Theme::colored().with_style(ThemeKey::HealStopped, Style::new(Some(Color::Blue), false));
        let painted = theme.paint(ThemeKey::HealStopped, "stopped");
        assert!(painted.contains("stopped"));
        assert!(painted.starts_with("\u{1b}[34m"));
        colored::control::unset_override();
    }

    #[test]
    fn test_every_health_class_has_a_style() {
        let theme = Theme::colored();
        for class in HealthClass::DISPLAY_ORDER {
            assert!(theme.styles.contains_key(&ThemeKey::Health(class)));
        }
    }
}
