//! Loading configuration from TOML files, with optional overlays.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use toml::Table;
use tracing::{debug, info};

use crate::error::Result;

/// Default tolerance used for epsilon comparisons and planarity checks.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// A configuration stored at a fixed path below a configuration root.
pub trait Config: DeserializeOwned {
    /// Path of the configuration file, relative to the configuration root.
    const PATH: &'static str;

    /// Loads the configuration from `root`.
    fn load(root: impl AsRef<Path>) -> Result<Self> {
        let path = root.as_ref().join(Self::PATH);
        let config = toml::Value::Table(read_table(&path)?).try_into()?;
        info!(path = %path.display(), "loaded configuration");

        Ok(config)
    }

    /// Loads the configuration from `root`, with the values in `overlay_root` taking precedence.
    ///
    /// A missing overlay file leaves the main configuration as is.
    fn load_with_overlay(root: impl AsRef<Path>, overlay_root: impl AsRef<Path>) -> Result<Self> {
        let path = root.as_ref().join(Self::PATH);
        let overlay_path = overlay_root.as_ref().join(Self::PATH);

        let main = read_table(&path)?;
        let merged = if overlay_path.exists() {
            merge(main, read_table(&overlay_path)?)
        } else {
            debug!(path = %overlay_path.display(), "no overlay found");
            main
        };

        let config = toml::Value::Table(merged).try_into()?;
        info!(
            path = %path.display(),
            overlay = %overlay_path.display(),
            "loaded configuration with overlay"
        );

        Ok(config)
    }
}

fn read_table(path: &Path) -> Result<Table> {
    Ok(toml::from_str(&fs::read_to_string(path)?)?)
}

/// Deep-merges `overlay` on top of `main`.
///
/// Nested tables are merged key by key, any other overlay value replaces the main one.
#[must_use]
pub fn merge(main: Table, overlay: Table) -> Table {
    let mut merged = main;

    for (key, overlay_value) in overlay {
        let value = match (merged.remove(&key), overlay_value) {
            (Some(toml::Value::Table(main_table)), toml::Value::Table(overlay_table)) => {
                toml::Value::Table(merge(main_table, overlay_table))
            }
            (_, overlay_value) => overlay_value,
        };
        merged.insert(key, value);
    }

    merged
}

/// Configuration of the spatial crate, stored in `spatial.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct SpatialConfig {
    pub tree: TreeConfig,
    pub tolerance: ToleranceConfig,
}

impl Config for SpatialConfig {
    const PATH: &'static str = "spatial.toml";
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Name of the root frame.
    pub world_name: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            world_name: "world".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    pub epsilon: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::error::Error;
    use crate::tree::FrameTree;

    #[test]
    fn overlay_takes_precedence() {
        let temp_dir = tempdir().unwrap();
        let config_dir = temp_dir.path().join("config");
        let overlay_dir = config_dir.join("overlay/robot");
        fs::create_dir_all(&overlay_dir).unwrap();

        fs::write(
            config_dir.join(SpatialConfig::PATH),
            "[tree]\nworld_name = \"field\"\n\n[tolerance]\nepsilon = 1e-6\n",
        )
        .unwrap();
        fs::write(
            overlay_dir.join(SpatialConfig::PATH),
            "[tolerance]\nepsilon = 1e-3\n",
        )
        .unwrap();

        let main = SpatialConfig::load(&config_dir).unwrap();
        assert_eq!(main.tree.world_name, "field");
        assert_eq!(main.tolerance.epsilon, 1e-6);

        let config = SpatialConfig::load_with_overlay(&config_dir, &overlay_dir).unwrap();
        assert_eq!(config.tree.world_name, "field");
        assert_eq!(config.tolerance.epsilon, 1e-3);

        let tree = FrameTree::with_config(&config);
        assert_eq!(tree.name(tree.world()).unwrap(), "field");
        assert_eq!(tree.epsilon(), 1e-3);
    }

    #[test]
    fn missing_overlay_uses_main() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join(SpatialConfig::PATH), "").unwrap();

        let config =
            SpatialConfig::load_with_overlay(temp_dir.path(), temp_dir.path().join("none"))
                .unwrap();
        assert_eq!(config, SpatialConfig::default());
    }

    #[test]
    fn load_errors() {
        let temp_dir = tempdir().unwrap();
        assert!(matches!(
            SpatialConfig::load(temp_dir.path()),
            Err(Error::Io(_))
        ));

        fs::write(
            temp_dir.path().join(SpatialConfig::PATH),
            "[tolerance]\nepsilon = \"tight\"\n",
        )
        .unwrap();
        assert!(matches!(
            SpatialConfig::load(temp_dir.path()),
            Err(Error::Deserialize(_))
        ));
    }

    #[test]
    fn nested_tables_are_merged() {
        let main: Table = toml::from_str("a = 1\n[b]\nc = 2\nd = 3\n").unwrap();
        let overlay: Table = toml::from_str("e = 4\n[b]\nd = 5\n").unwrap();

        let merged = merge(main, overlay);
        let b = merged["b"].as_table().unwrap();

        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["e"].as_integer(), Some(4));
        assert_eq!(b["c"].as_integer(), Some(2));
        assert_eq!(b["d"].as_integer(), Some(5));
    }
}
