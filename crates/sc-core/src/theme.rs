//! Light/dark theme reaction.
//!
//! Theme persistence lives outside the core. The adapter only rewrites the
//! scene when told the theme changed: pure black text flips to white and
//! back, and the canvas takes the palette background. A background the user
//! picked is set aside when the theme overrides it and comes back when the
//! theme it was picked under returns.

use crate::color::Color;
use crate::config::EditorConfig;
use crate::error::SceneError;
use crate::id::ObjectId;
use crate::scene::{BackgroundOrigin, SceneStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(SceneError::Config(format!("unknown theme `{other}`"))),
        }
    }
}

/// What one `apply` pass changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeReport {
    pub remapped: Vec<ObjectId>,
    pub background: Option<Color>,
}

impl ThemeReport {
    pub fn is_empty(&self) -> bool {
        self.remapped.is_empty() && self.background.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ThemeAdapter {
    current: Theme,
    /// User background displaced by a theme switch, with the theme it was
    /// chosen under.
    saved_background: Option<(Color, Theme)>,
}

impl ThemeAdapter {
    pub fn new(initial: Theme) -> Self {
        Self {
            current: initial,
            saved_background: None,
        }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    pub fn saved_background(&self) -> Option<Color> {
        self.saved_background.map(|(c, _)| c)
    }

    /// Rewrite the scene for a switch to `theme`. Text is only remapped on
    /// a real transition, so re-applying the current theme never touches
    /// colours the user picked.
    pub fn apply(&mut self, store: &mut SceneStore, theme: Theme, config: &EditorConfig) -> ThemeReport {
        let mut report = ThemeReport::default();
        if theme != self.current {
            report.remapped = remap_text(store, theme);
        }
        report.background = self.apply_background(store, theme, config);
        log::debug!(
            "theme {} -> {theme}: {} text remapped, background {:?}",
            self.current,
            report.remapped.len(),
            report.background
        );
        self.current = theme;
        report
    }

    /// Bring a scene whose colours were last themed for `scene_theme` in
    /// line with the current theme. Used after a snapshot restore; the
    /// adapter's remembered background is left as it is.
    pub fn reconcile(
        &self,
        store: &mut SceneStore,
        scene_theme: Theme,
        config: &EditorConfig,
    ) -> ThemeReport {
        let mut report = ThemeReport::default();
        if scene_theme == self.current {
            return report;
        }
        report.remapped = remap_text(store, self.current);
        if store.background_origin() == BackgroundOrigin::Theme {
            let fixed = config.palette(self.current).canvas_background;
            if store.background() != fixed {
                store.set_background_color(fixed, BackgroundOrigin::Theme);
                report.background = Some(fixed);
            }
        }
        log::debug!(
            "reconciled {scene_theme} scene to {}: {} text remapped",
            self.current,
            report.remapped.len()
        );
        report
    }

    fn apply_background(
        &mut self,
        store: &mut SceneStore,
        theme: Theme,
        config: &EditorConfig,
    ) -> Option<Color> {
        let before = store.background();
        if store.background_origin() == BackgroundOrigin::User {
            if theme == self.current {
                return None;
            }
            self.saved_background = Some((before, self.current));
        }

        match self.saved_background {
            Some((color, chosen_under)) if chosen_under == theme => {
                self.saved_background = None;
                store.set_background_color(color, BackgroundOrigin::User);
            }
            _ => {
                let fixed = config.palette(theme).canvas_background;
                store.set_background_color(fixed, BackgroundOrigin::Theme);
            }
        }
        let after = store.background();
        (after != before).then_some(after)
    }
}

/// Flip pure black text to white going dark, and white text back to its
/// recorded original (or black) going light.
fn remap_text(store: &mut SceneStore, target: Theme) -> Vec<ObjectId> {
    let text_ids: Vec<ObjectId> = store
        .objects()
        .iter()
        .filter(|o| o.is_text())
        .map(|o| o.id)
        .collect();

    let mut remapped = Vec::new();
    for id in text_ids {
        // The closure never fails, so the outer result is always Ok.
        let changed = store
            .update(id, |obj| {
                Ok(match target {
                    Theme::Dark if obj.style.fill == Color::BLACK => {
                        obj.theme_original_fill = Some(obj.style.fill);
                        obj.style.fill = Color::WHITE;
                        true
                    }
                    Theme::Light if obj.style.fill == Color::WHITE => {
                        obj.style.fill = obj.theme_original_fill.take().unwrap_or(Color::BLACK);
                        true
                    }
                    _ => false,
                })
            })
            .ok()
            .flatten()
            .unwrap_or(false);
        if changed {
            remapped.push(id);
        }
    }
    remapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThemePalette;
    use crate::model::DrawableObject;
    use pretty_assertions::assert_eq;

    fn setup() -> (SceneStore, ThemeAdapter, EditorConfig) {
        let config = EditorConfig::default();
        (
            SceneStore::from_config(&config),
            ThemeAdapter::new(Theme::Light),
            config,
        )
    }

    #[test]
    fn parses_theme_names() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(" light ".parse::<Theme>().unwrap(), Theme::Light);
        assert!("sepia".parse::<Theme>().is_err());
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
    }

    #[test]
    fn black_text_round_trips() {
        let (mut store, mut adapter, config) = setup();
        let id = store
            .add_object(DrawableObject::text("Hello", 48.0, &ThemePalette::light()))
            .unwrap();

        adapter.apply(&mut store, Theme::Dark, &config);
        let obj = store.get(id).unwrap();
        assert_eq!(obj.style.fill.to_hex(), "#ffffff");
        assert_eq!(obj.theme_original_fill, Some(Color::BLACK));

        adapter.apply(&mut store, Theme::Light, &config);
        let obj = store.get(id).unwrap();
        assert_eq!(obj.style.fill.to_hex(), "#000000");
        assert_eq!(obj.theme_original_fill, None);
    }

    #[test]
    fn brand_colors_and_shapes_are_untouched() {
        let (mut store, mut adapter, config) = setup();
        let mut brand = DrawableObject::text("Sale", 48.0, &ThemePalette::light());
        brand.set_fill(Color::rgb(0xe1, 0x1d, 0x48));
        let brand = store.add_object(brand).unwrap();
        let mut rect = DrawableObject::rectangle(10.0, 10.0, &ThemePalette::light());
        rect.set_fill(Color::BLACK);
        let rect = store.add_object(rect).unwrap();

        let report = adapter.apply(&mut store, Theme::Dark, &config);
        assert!(report.remapped.is_empty());
        assert_eq!(store.get(brand).unwrap().style.fill, Color::rgb(0xe1, 0x1d, 0x48));
        assert_eq!(store.get(rect).unwrap().style.fill, Color::BLACK);
    }

    #[test]
    fn applying_twice_changes_nothing_further() {
        let (mut store, mut adapter, config) = setup();
        store
            .add_object(DrawableObject::text("Hello", 48.0, &ThemePalette::light()))
            .unwrap();
        store.set_background("#222222").unwrap();

        let first = adapter.apply(&mut store, Theme::Dark, &config);
        assert!(!first.is_empty());
        let rev = store.revision();
        let second = adapter.apply(&mut store, Theme::Dark, &config);
        assert!(second.is_empty());
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn same_theme_keeps_user_text_colors() {
        let (mut store, mut adapter, config) = setup();
        let mut white = DrawableObject::text("Hello", 48.0, &ThemePalette::light());
        white.set_fill(Color::WHITE);
        let white = store.add_object(white).unwrap();

        let report = adapter.apply(&mut store, Theme::Light, &config);
        assert!(report.remapped.is_empty());
        assert_eq!(store.get(white).unwrap().style.fill, Color::WHITE);

        let mut adapter = ThemeAdapter::new(Theme::Dark);
        let black = store
            .add_object(DrawableObject::text("Hello", 48.0, &ThemePalette::light()))
            .unwrap();
        let report = adapter.apply(&mut store, Theme::Dark, &config);
        assert!(report.remapped.is_empty());
        assert_eq!(store.get(black).unwrap().style.fill, Color::BLACK);
    }

    #[test]
    fn reconcile_remaps_a_scene_from_the_other_theme() {
        let (mut store, _, config) = setup();
        let id = store
            .add_object(DrawableObject::text("Hello", 48.0, &ThemePalette::light()))
            .unwrap();
        let adapter = ThemeAdapter::new(Theme::Dark);

        assert!(adapter.reconcile(&mut store, Theme::Dark, &config).is_empty());
        assert_eq!(store.get(id).unwrap().style.fill, Color::BLACK);

        let report = adapter.reconcile(&mut store, Theme::Light, &config);
        assert_eq!(report.remapped, vec![id]);
        assert_eq!(store.get(id).unwrap().style.fill, Color::WHITE);
        assert_eq!(store.background().to_hex(), "#1a1a1a");
    }

    #[test]
    fn reconcile_keeps_a_user_background() {
        let (mut store, _, config) = setup();
        store.set_background("#223344").unwrap();
        let adapter = ThemeAdapter::new(Theme::Dark);
        let report = adapter.reconcile(&mut store, Theme::Light, &config);
        assert_eq!(report.background, None);
        assert_eq!(store.background().to_hex(), "#223344");
    }

    #[test]
    fn palette_background_follows_theme() {
        let (mut store, mut adapter, config) = setup();
        adapter.apply(&mut store, Theme::Dark, &config);
        assert_eq!(store.background().to_hex(), "#1a1a1a");
        adapter.apply(&mut store, Theme::Light, &config);
        assert_eq!(store.background(), Color::WHITE);
    }

    #[test]
    fn user_background_is_restored_on_return() {
        let (mut store, mut adapter, config) = setup();
        store.set_background("#223344").unwrap();

        adapter.apply(&mut store, Theme::Dark, &config);
        assert_eq!(store.background().to_hex(), "#1a1a1a");
        assert_eq!(adapter.saved_background(), Some(Color::rgb(0x22, 0x33, 0x44)));

        adapter.apply(&mut store, Theme::Light, &config);
        assert_eq!(store.background().to_hex(), "#223344");
        assert_eq!(store.background_origin(), BackgroundOrigin::User);
        assert_eq!(adapter.saved_background(), None);
    }

    #[test]
    fn user_background_in_current_theme_is_kept() {
        let (mut store, mut adapter, config) = setup();
        store.set_background("#223344").unwrap();
        let report = adapter.apply(&mut store, Theme::Light, &config);
        assert!(report.is_empty());
        assert_eq!(store.background().to_hex(), "#223344");
    }
}
