// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tablenav_core::{
    DEFAULT_ACTIVE_LINK_CLASS, DEFAULT_ACTIVE_ROW_CLASS, DEFAULT_CONTAINER_SELECTOR,
    DEFAULT_FOCUSABLE_SELECTOR, NavigatorConfig, Selector,
};

const CONFIG_VERSION: i64 = 1;
pub const APP_NAME: &str = "tablenav";
const LOG_FILE_NAME: &str = "tablenav.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub navigator: Navigator,
    #[serde(default)]
    pub layout: LayoutSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            navigator: Navigator::default(),
            layout: LayoutSection::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Navigator {
    pub selector: Option<String>,
    #[serde(flatten)]
    pub behavior: NavigatorConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutSection {
    pub path: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("TABLENAV_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set TABLENAV_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put settings under [navigator] and [layout]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(selector) = &self.navigator.selector {
            Selector::parse(selector).with_context(|| {
                format!("navigator.selector in {} is not usable", path.display())
            })?;
        }

        self.navigator
            .behavior
            .validate()
            .with_context(|| format!("invalid [navigator] in {}", path.display()))?;

        if let Some(layout) = &self.layout.path
            && layout.trim().is_empty()
        {
            bail!(
                "layout.path in {} is empty; remove it or point it at a layout file",
                path.display()
            );
        }

        Ok(())
    }

    pub fn selector(&self) -> &str {
        self.navigator
            .selector
            .as_deref()
            .unwrap_or(DEFAULT_CONTAINER_SELECTOR)
    }

    pub fn navigator_config(&self) -> NavigatorConfig {
        self.navigator.behavior.clone()
    }

    /// Layout path from the config, resolved against the config file's
    /// directory when relative.
    pub fn layout_path(&self, config_path: &Path) -> Option<PathBuf> {
        let raw = self.layout.path.as_deref()?;
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            return Some(path);
        }
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        Some(base.join(path))
    }

    pub fn log_path(config_path: &Path) -> PathBuf {
        config_path.with_file_name(LOG_FILE_NAME)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# tablenav config\n# Place this file at: {}\n\nversion = 1\n\n[navigator]\n# Tables to navigate; any selector matching tables or regions holding them.\nselector = \"{}\"\nactive_row_class = \"{}\"\nactive_link_class = \"{}\"\nfocusable_selector = \"{}\"\n\n[layout]\n# Optional. Relative paths resolve against this file's directory.\n# path = \"layout.toml\"\n",
            path.display(),
            DEFAULT_CONTAINER_SELECTOR,
            DEFAULT_ACTIVE_ROW_CLASS,
            DEFAULT_ACTIVE_LINK_CLASS,
            DEFAULT_FOCUSABLE_SELECTOR,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use anyhow::Result;
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, OnceLock};

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.selector(), "table.tablenav");
        assert_eq!(config.navigator_config().active_row_class, "info");
        assert_eq!(config.layout_path(Path::new("/etc/tablenav/config.toml")), None);
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[navigator]\nselector = \"table\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[navigator] and [layout]"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[navigator]\nselector = \"div.region\"\nactive_row_class = \"row-on\"\nactive_link_class = \"link-on\"\nfocusable_selector = \"a, button\"\n[layout]\npath = \"grid.toml\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.selector(), "div.region");
        let navigator = config.navigator_config();
        assert_eq!(navigator.active_row_class, "row-on");
        assert_eq!(navigator.active_link_class, "link-on");
        assert_eq!(navigator.focusable_selector, "a, button");
        assert_eq!(config.layout_path(&path), path.parent().map(|dir| dir.join("grid.toml")));
        Ok(())
    }

    #[test]
    fn partial_navigator_section_keeps_other_defaults() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[navigator]\nactive_row_class = \"hot\"\n")?;
        let config = Config::load(&path)?;
        let navigator = config.navigator_config();
        assert_eq!(navigator.active_row_class, "hot");
        assert_eq!(navigator.active_link_class, "btn-info");
        assert_eq!(config.selector(), "table.tablenav");
        Ok(())
    }

    #[test]
    fn absolute_layout_path_is_kept() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[layout]\npath = \"/srv/layout.toml\"\n")?;
        let config = Config::load(&path)?;
        assert_eq!(config.layout_path(&path), Some(PathBuf::from("/srv/layout.toml")));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn invalid_navigator_values_are_rejected() -> Result<()> {
        let cases = [
            ("version = 1\n[navigator]\nselector = \"table >\"\n", "navigator.selector"),
            (
                "version = 1\n[navigator]\nactive_row_class = \"same\"\nactive_link_class = \"same\"\n",
                "invalid [navigator]",
            ),
            (
                "version = 1\n[navigator]\nfocusable_selector = \"\"\n",
                "invalid [navigator]",
            ),
            ("version = 1\n[layout]\npath = \"  \"\n", "layout.path"),
        ];
        for (content, expected) in cases {
            let (_temp, path) = write_config(content)?;
            let error = Config::load(&path).expect_err("invalid config should fail");
            let message = format!("{error:#}");
            assert!(message.contains(expected), "{content:?} gave {message}");
        }
        Ok(())
    }

    #[test]
    fn example_config_round_trips() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example_config(&path))?;
        let config = Config::load(&path)?;
        assert_eq!(config.selector(), "table.tablenav");
        assert_eq!(config.layout_path(&path), None);
        Ok(())
    }

    #[test]
    fn log_file_sits_next_to_the_config() {
        assert_eq!(
            Config::log_path(Path::new("/home/me/.config/tablenav/config.toml")),
            PathBuf::from("/home/me/.config/tablenav/tablenav.log")
        );
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("TABLENAV_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("TABLENAV_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("TABLENAV_CONFIG_PATH");
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("config.toml"));
        Ok(())
    }
}
