// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::Selector;
use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const DEFAULT_CONTAINER_SELECTOR: &str = "table.tablenav";
pub const DEFAULT_ACTIVE_ROW_CLASS: &str = "info";
pub const DEFAULT_ACTIVE_LINK_CLASS: &str = "btn-info";
pub const DEFAULT_FOCUSABLE_SELECTOR: &str = "a";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    pub active_row_class: String,
    pub active_link_class: String,
    pub focusable_selector: String,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            active_row_class: DEFAULT_ACTIVE_ROW_CLASS.to_owned(),
            active_link_class: DEFAULT_ACTIVE_LINK_CLASS.to_owned(),
            focusable_selector: DEFAULT_FOCUSABLE_SELECTOR.to_owned(),
        }
    }
}

impl NavigatorConfig {
    pub fn validate(&self) -> Result<()> {
        validate_class_name("active_row_class", &self.active_row_class)?;
        validate_class_name("active_link_class", &self.active_link_class)?;
        if self.active_row_class == self.active_link_class {
            bail!(
                "active_row_class and active_link_class are both {:?}; use two different classes",
                self.active_row_class
            );
        }
        Selector::parse(&self.focusable_selector)
            .with_context(|| format!("focusable_selector {:?}", self.focusable_selector))?;
        Ok(())
    }
}

fn validate_class_name(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        bail!("{field} must not be empty");
    }
    if let Some(bad) = value
        .chars()
        .find(|ch| !(ch.is_alphanumeric() || *ch == '-' || *ch == '_'))
    {
        bail!("{field} {value:?} contains {bad:?}; class names use letters, digits, - and _");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::NavigatorConfig;

    #[test]
    fn defaults_match_bootstrap_classes() {
        let config = NavigatorConfig::default();
        assert_eq!(config.active_row_class, "info");
        assert_eq!(config.active_link_class, "btn-info");
        assert_eq!(config.focusable_selector, "a");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_classes_and_selectors() {
        let cases = [
            (
                NavigatorConfig {
                    active_row_class: String::new(),
                    ..NavigatorConfig::default()
                },
                "must not be empty",
            ),
            (
                NavigatorConfig {
                    active_link_class: "btn info".to_owned(),
                    ..NavigatorConfig::default()
                },
                "contains ' '",
            ),
            (
                NavigatorConfig {
                    active_link_class: "info".to_owned(),
                    ..NavigatorConfig::default()
                },
                "two different classes",
            ),
            (
                NavigatorConfig {
                    focusable_selector: "a:visible".to_owned(),
                    ..NavigatorConfig::default()
                },
                "focusable_selector",
            ),
        ];

        for (config, needle) in cases {
            let error = config.validate().expect_err("config should be rejected");
            assert!(
                format!("{error:#}").contains(needle),
                "unexpected message: {error:#}"
            );
        }
    }
}
