use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub fn config_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("dockyard").join("config.toml"))
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub drag: DragSettings,
    #[serde(default)]
    pub stack: StackSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Pixel thickness of the splitter between two siblings of a row or column.
    #[serde(default = "default_splitter_size")]
    pub splitter_size: f64,
    /// Upper bound on clamp-and-redistribute passes per container layout.
    #[serde(default = "default_max_distribution_passes")]
    pub max_distribution_passes: usize,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct DragSettings {
    /// Pointer travel (px) before a press turns into a drag.
    #[serde(default = "default_drag_threshold")]
    pub threshold: f64,
    /// Keep the dragged pointer inside the host bounds.
    #[serde(default = "yes")]
    pub clamp_to_host: bool,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct StackSettings {
    #[serde(default = "default_header_size")]
    pub header_size: f64,
    #[serde(default = "default_tab_width")]
    pub tab_width: f64,
    /// Make a tab active once it is dropped onto a header.
    #[serde(default = "yes")]
    pub activate_on_drop: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            splitter_size: default_splitter_size(),
            max_distribution_passes: default_max_distribution_passes(),
        }
    }
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            threshold: default_drag_threshold(),
            clamp_to_host: true,
        }
    }
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            header_size: default_header_size(),
            tab_width: default_tab_width(),
            activate_on_drop: true,
        }
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.splitter_size < 0.0 {
            issues.push(format!(
                "layout.splitter_size must be non-negative, got {}",
                self.splitter_size
            ));
        }

        if self.max_distribution_passes == 0 {
            issues.push("layout.max_distribution_passes must be at least 1".to_string());
        }

        issues
    }
}

impl DragSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.threshold < 0.0 {
            issues.push(format!(
                "drag.threshold must be non-negative, got {}",
                self.threshold
            ));
        }

        issues
    }
}

impl StackSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.header_size < 0.0 {
            issues.push(format!(
                "stack.header_size must be non-negative, got {}",
                self.header_size
            ));
        }

        if self.tab_width <= 0.0 {
            issues.push(format!(
                "stack.tab_width must be positive, got {}",
                self.tab_width
            ));
        }

        issues
    }
}

fn yes() -> bool { true }

fn default_splitter_size() -> f64 { 5.0 }

fn default_max_distribution_passes() -> usize { 8 }

fn default_drag_threshold() -> f64 { 25.0 }

fn default_header_size() -> f64 { 30.0 }

fn default_tab_width() -> f64 { 120.0 }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&buf)
    }

    /// Reads `path` when given, otherwise the per-user config file if it exists.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        if let Some(path) = path {
            return Self::read(path);
        }
        match config_file() {
            Some(path) if path.exists() => Self::read(&path),
            _ => Ok(Config::default()),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.layout.validate());
        issues.extend(self.drag.validate());
        issues.extend(self.stack.validate());
        issues
    }

    /// Sets a single value addressed by a dot-separated path, e.g.
    /// `stack.tab_width = 96`. The value is parsed as TOML, falling back to a
    /// bare string.
    pub fn set(&mut self, key: &str, raw: &str) -> anyhow::Result<()> {
        let value: Value = match toml::from_str::<toml::Table>(&format!("v = {raw}")) {
            Ok(mut table) => match table.remove("v") {
                Some(v) => serde_json::to_value(v)?,
                None => Value::String(raw.to_string()),
            },
            Err(_) => Value::String(raw.to_string()),
        };

        let mut tree = serde_json::to_value(&*self)?;
        let mut slot = &mut tree;
        for part in key.split('.') {
            let Some(next) = slot.get_mut(part) else {
                bail!("unknown config key `{key}`");
            };
            slot = next;
        }
        *slot = value;

        let updated: Config = serde_json::from_value(tree)
            .with_context(|| format!("invalid value for `{key}`: {raw}"))?;
        let issues = updated.validate();
        if !issues.is_empty() {
            bail!("{}", issues.join("\n"));
        }
        *self = updated;
        Ok(())
    }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(buf)?;
        let issues = config.validate();
        if !issues.is_empty() {
            bail!("invalid config:\n{}", issues.join("\n"));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.layout.splitter_size, 5.0);
        assert_eq!(config.layout.max_distribution_passes, 8);
        assert_eq!(config.drag.threshold, 25.0);
        assert!(config.drag.clamp_to_host);
        assert_eq!(config.stack.header_size, 30.0);
        assert_eq!(config.stack.tab_width, 120.0);
        assert!(config.stack.activate_on_drop);
    }

    #[test]
    fn test_config_partial_sections() {
        let toml = r#"
            [layout]
            splitter_size = 8

            [stack]
            activate_on_drop = false
        "#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.layout.splitter_size, 8.0);
        assert_eq!(config.layout.max_distribution_passes, 8);
        assert!(!config.stack.activate_on_drop);
        assert_eq!(config.drag, DragSettings::default());
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        assert!(Config::parse("[layout]\ngutter = 3\n").is_err());
        assert!(Config::parse("[panels]\n").is_err());
    }

    #[test]
    fn test_config_validation_negative_values() {
        let mut config = Config::default();
        config.layout.splitter_size = -1.0;
        config.drag.threshold = -2.0;
        config.stack.tab_width = 0.0;
        let issues = config.validate();
        assert_eq!(issues.len(), 3);
        assert!(issues[0].contains("splitter_size"));
        assert!(issues[1].contains("threshold"));
        assert!(issues[2].contains("tab_width"));
    }

    #[test]
    fn test_config_validation_zero_passes() {
        let mut config = Config::default();
        config.layout.max_distribution_passes = 0;
        assert_eq!(config.validate().len(), 1);
        assert!(Config::parse("[layout]\nmax_distribution_passes = 0\n").is_err());
    }

    #[test]
    fn test_config_set_dotted_key() {
        let mut config = Config::default();
        config.set("stack.tab_width", "96").unwrap();
        assert_eq!(config.stack.tab_width, 96.0);
        config.set("drag.clamp_to_host", "false").unwrap();
        assert!(!config.drag.clamp_to_host);

        assert!(config.set("stack.nope", "1").is_err());
        assert!(config.set("layout.splitter_size", "-4").is_err());
        assert_eq!(config.layout.splitter_size, 5.0);
    }

    #[test]
    fn test_config_save_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.layout.splitter_size = 2.0;
        config.save(&path).unwrap();
        assert_eq!(Config::read(&path).unwrap(), config);
        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }
}
