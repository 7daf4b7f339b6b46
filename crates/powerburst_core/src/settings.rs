//! # Effect Settings
//!
//! Defaults merged with user overrides, one field at a time:
//!
//! ```text
//! [powerburst]            (user table, every key optional)
//!     │
//!     ├── present + truthy + right type ──► user value
//!     └── anything else                 ──► default
//!     │
//!     ▼
//! clamp: minSpawnCount >= 0, maxSpawnCount >= minSpawnCount
//! ```
//!
//! Truthiness follows the host configuration's rules: `false`, `0`, `0.0` and
//! `""` mean "not set". Arrays and tables count as set even when empty.
//! A value of the wrong type never raises an error, it is dropped with a
//! debug log and the default wins.
//!
//! A snapshot is never patched. Every change notification produces a new
//! [`EffectSettings`] that replaces the old one in the [`SettingsHandle`].

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use toml::{Table, Value};

use crate::color::ColorMode;

/// Key of the effect section inside the host configuration.
pub const SETTINGS_SECTION: &str = "powerburst";

/// A complete, validated settings snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectSettings {
    /// Shake the terminal container on cursor movement.
    pub shake: bool,
    /// Where particle colors come from.
    pub color_mode: ColorMode,
    /// Color strings used in [`ColorMode::Custom`].
    pub colors: Vec<String>,
    /// Side length of a particle square, in pixels.
    pub particle_size: u32,
    /// Fewest particles per burst.
    pub min_spawn_count: u32,
    /// Most particles per burst. Never below `min_spawn_count`.
    pub max_spawn_count: u32,
    /// Cap on the live particle set.
    pub maximum_particles: u32,
}

impl EffectSettings {
    /// Default for `shake`.
    pub const DEFAULT_SHAKE: bool = false;
    /// Default for `particleSize`.
    pub const DEFAULT_PARTICLE_SIZE: u32 = 3;
    /// Default for `minSpawnCount`.
    pub const DEFAULT_MIN_SPAWN_COUNT: u32 = 10;
    /// Default for `maxSpawnCount`.
    pub const DEFAULT_MAX_SPAWN_COUNT: u32 = 12;
    /// Default for `maximumParticles`.
    pub const DEFAULT_MAXIMUM_PARTICLES: u32 = 500;

    /// Default for `colors`.
    #[must_use]
    pub fn default_colors() -> Vec<String> {
        ["red", "green", "blue"].iter().map(ToString::to_string).collect()
    }

    /// Renders the snapshot as a `[powerburst]` TOML document.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures; with this flat struct there are none in
    /// practice.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        let mut root = Table::new();
        root.insert(SETTINGS_SECTION.to_string(), Value::try_from(self)?);
        toml::to_string_pretty(&root)
    }
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            shake: Self::DEFAULT_SHAKE,
            color_mode: ColorMode::default(),
            colors: Self::default_colors(),
            particle_size: Self::DEFAULT_PARTICLE_SIZE,
            min_spawn_count: Self::DEFAULT_MIN_SPAWN_COUNT,
            max_spawn_count: Self::DEFAULT_MAX_SPAWN_COUNT,
            maximum_particles: Self::DEFAULT_MAXIMUM_PARTICLES,
        }
    }
}

/// Stateless merge of user overrides onto defaults.
pub struct SettingsStore;

impl SettingsStore {
    /// Builds a snapshot from the effect section of the user configuration.
    ///
    /// `overrides` is the `[powerburst]` table itself, not the whole document.
    #[must_use]
    pub fn load(overrides: &Table) -> EffectSettings {
        let defaults = EffectSettings::default();

        let shake = lookup(overrides, "shake", Value::as_bool).unwrap_or(defaults.shake);

        let color_mode = lookup(overrides, "colorMode", Value::as_str)
            .map(|keyword| {
                ColorMode::from_keyword(keyword).unwrap_or_else(|| {
                    tracing::debug!("unknown colorMode {:?}, using custom", keyword);
                    ColorMode::Custom
                })
            })
            .unwrap_or(defaults.color_mode);

        let colors = lookup(overrides, "colors", string_list).unwrap_or(defaults.colors);

        let particle_size = lookup(overrides, "particleSize", positive_u32)
            .unwrap_or(defaults.particle_size);

        // Negative counts are truthy, they survive the merge and get clamped.
        let min_spawn_count = lookup(overrides, "minSpawnCount", Value::as_integer)
            .map_or(defaults.min_spawn_count, clamp_count);

        let max_spawn_count = lookup(overrides, "maxSpawnCount", Value::as_integer)
            .map_or(defaults.max_spawn_count, clamp_count)
            .max(min_spawn_count);

        let maximum_particles = lookup(overrides, "maximumParticles", positive_u32)
            .unwrap_or(defaults.maximum_particles);

        EffectSettings {
            shake,
            color_mode,
            colors,
            particle_size,
            min_spawn_count,
            max_spawn_count,
            maximum_particles,
        }
    }

    /// Builds a snapshot from a whole configuration document.
    ///
    /// A missing section, or one that is not a table, yields the defaults.
    #[must_use]
    pub fn load_root(root: &Table) -> EffectSettings {
        match root.get(SETTINGS_SECTION) {
            Some(Value::Table(section)) => Self::load(section),
            Some(other) => {
                tracing::debug!(
                    "[{}] is a {}, not a table; using defaults",
                    SETTINGS_SECTION,
                    other.type_str()
                );
                EffectSettings::default()
            }
            None => EffectSettings::default(),
        }
    }
}

/// Reads `key` if it is truthy and of the type `extract` accepts.
fn lookup<'a, T>(table: &'a Table, key: &str, extract: impl Fn(&'a Value) -> Option<T>) -> Option<T> {
    let value = table.get(key)?;
    if !is_truthy(value) {
        return None;
    }
    let extracted = extract(value);
    if extracted.is_none() {
        tracing::debug!("ignoring {} = {} (wrong type)", key, value);
    }
    extracted
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Boolean(b) => *b,
        Value::Integer(i) => *i != 0,
        Value::Float(f) => *f != 0.0 && !f.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Table(_) | Value::Datetime(_) => true,
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn positive_u32(value: &Value) -> Option<u32> {
    value
        .as_integer()
        .filter(|i| *i > 0)
        .map(|i| u32::try_from(i).unwrap_or(u32::MAX))
}

fn clamp_count(raw: i64) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

/// A shared, versioned settings snapshot.
///
/// Cloning the handle shares the snapshot. Readers get an `Arc` to an
/// immutable [`EffectSettings`]; writers replace it wholesale.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Versioned>>,
}

#[derive(Debug)]
struct Versioned {
    settings: Arc<EffectSettings>,
    version: u64,
}

impl SettingsHandle {
    /// Creates a handle holding `settings` as version 0.
    #[must_use]
    pub fn new(settings: EffectSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Versioned {
                settings: Arc::new(settings),
                version: 0,
            })),
        }
    }

    /// Re-derives the snapshot from a whole configuration document.
    /// Returns the new version number.
    pub fn reload(&self, root: &Table) -> u64 {
        self.replace(SettingsStore::load_root(root))
    }

    /// Replaces the snapshot. Returns the new version number.
    pub fn replace(&self, settings: EffectSettings) -> u64 {
        let mut guard = self.inner.write();
        guard.settings = Arc::new(settings);
        guard.version += 1;
        tracing::debug!("settings reloaded (version {})", guard.version);
        guard.version
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<EffectSettings> {
        Arc::clone(&self.inner.read().settings)
    }

    /// How many times the snapshot has been replaced.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::new(EffectSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(src: &str) -> Table {
        src.parse::<Table>().unwrap()
    }

    #[test]
    fn test_empty_overrides_give_defaults() {
        assert_eq!(SettingsStore::load(&Table::new()), EffectSettings::default());
    }

    #[test]
    fn test_overrides_applied_independently() {
        let settings = SettingsStore::load(&table(
            r##"
            shake = true
            colorMode = "rainbow"
            colors = ["#fff", "black"]
            particleSize = 5
            minSpawnCount = 2
            maxSpawnCount = 4
            maximumParticles = 50
            "##,
        ));
        assert!(settings.shake);
        assert_eq!(settings.color_mode, ColorMode::Rainbow);
        assert_eq!(settings.colors, vec!["#fff".to_string(), "black".to_string()]);
        assert_eq!(settings.particle_size, 5);
        assert_eq!(settings.min_spawn_count, 2);
        assert_eq!(settings.max_spawn_count, 4);
        assert_eq!(settings.maximum_particles, 50);
    }

    #[test]
    fn test_max_spawn_read_from_its_own_key() {
        let settings = SettingsStore::load(&table("minSpawnCount = 3\nmaxSpawnCount = 30"));
        assert_eq!(settings.min_spawn_count, 3);
        assert_eq!(settings.max_spawn_count, 30);
    }

    #[test]
    fn test_falsy_values_fall_back() {
        let settings = SettingsStore::load(&table(
            "particleSize = 0\nminSpawnCount = 0\ncolorMode = \"\"\nmaximumParticles = 0",
        ));
        assert_eq!(settings.particle_size, EffectSettings::DEFAULT_PARTICLE_SIZE);
        assert_eq!(settings.min_spawn_count, EffectSettings::DEFAULT_MIN_SPAWN_COUNT);
        assert_eq!(settings.color_mode, ColorMode::Custom);
        assert_eq!(settings.maximum_particles, EffectSettings::DEFAULT_MAXIMUM_PARTICLES);
    }

    #[test]
    fn test_wrong_types_fall_back_silently() {
        let settings = SettingsStore::load(&table(
            "shake = \"yes\"\nparticleSize = 2.5\ncolors = [\"red\", 3]\nmaxSpawnCount = \"many\"",
        ));
        assert!(!settings.shake);
        assert_eq!(settings.particle_size, EffectSettings::DEFAULT_PARTICLE_SIZE);
        assert_eq!(settings.colors, EffectSettings::default_colors());
        assert_eq!(settings.max_spawn_count, EffectSettings::DEFAULT_MAX_SPAWN_COUNT);
    }

    #[test]
    fn test_empty_color_list_is_kept() {
        let settings = SettingsStore::load(&table("colors = []"));
        assert!(settings.colors.is_empty());
    }

    #[test]
    fn test_negative_min_clamped_to_zero() {
        let settings = SettingsStore::load(&table("minSpawnCount = -5\nmaxSpawnCount = -1"));
        assert_eq!(settings.min_spawn_count, 0);
        assert_eq!(settings.max_spawn_count, 0);
    }

    #[test]
    fn test_max_clamped_up_to_min() {
        let settings = SettingsStore::load(&table("minSpawnCount = 40\nmaxSpawnCount = 7"));
        assert_eq!(settings.min_spawn_count, 40);
        assert_eq!(settings.max_spawn_count, 40);

        // Only min given: the default max is below it.
        let settings = SettingsStore::load(&table("minSpawnCount = 20"));
        assert_eq!(settings.max_spawn_count, 20);
    }

    #[test]
    fn test_min_never_exceeds_max() {
        for min in -3i64..=15 {
            for max in -3i64..=15 {
                let settings = SettingsStore::load(&table(&format!(
                    "minSpawnCount = {min}\nmaxSpawnCount = {max}"
                )));
                assert!(settings.min_spawn_count <= settings.max_spawn_count);
            }
        }
    }

    #[test]
    fn test_unknown_color_mode_is_custom() {
        let settings = SettingsStore::load(&table("colorMode = \"plaid\""));
        assert_eq!(settings.color_mode, ColorMode::Custom);
    }

    #[test]
    fn test_load_root_section() {
        let root = table("[powerburst]\nshake = true\n[other]\nshake = false");
        assert!(SettingsStore::load_root(&root).shake);
        assert_eq!(
            SettingsStore::load_root(&table("powerburst = 3")),
            EffectSettings::default()
        );
    }

    #[test]
    fn test_handle_replaces_wholesale() {
        let handle = SettingsHandle::default();
        let before = handle.snapshot();
        let version = handle.reload(&table("[powerburst]\nparticleSize = 9"));
        assert_eq!(version, 1);
        assert_eq!(handle.snapshot().particle_size, 9);
        // Old readers keep their snapshot.
        assert_eq!(before.particle_size, EffectSettings::DEFAULT_PARTICLE_SIZE);

        handle.reload(&Table::new());
        assert_eq!(handle.version(), 2);
        assert_eq!(*handle.snapshot(), EffectSettings::default());
    }

    #[test]
    fn test_to_toml_uses_schema_keys() {
        let text = EffectSettings::default().to_toml().unwrap();
        assert!(text.contains("[powerburst]"));
        assert!(text.contains("colorMode = \"custom\""));
        assert!(text.contains("maximumParticles = 500"));
        let reparsed = table(&text);
        assert_eq!(SettingsStore::load_root(&reparsed), EffectSettings::default());
    }
}
