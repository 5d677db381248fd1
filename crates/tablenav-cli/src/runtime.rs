// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use tablenav_tui::{ActivationOutcome, LinkInfo, LinkRuntime};
use tracing::info;

/// Activation handling for the terminal host. In pick mode the first
/// activation ends the session and is remembered for printing.
#[derive(Debug, Default)]
pub struct HostRuntime {
    pick: bool,
    picked: Option<String>,
    activations: usize,
}

impl HostRuntime {
    pub fn new(pick: bool) -> Self {
        Self {
            pick,
            ..Self::default()
        }
    }

    pub fn picked(&self) -> Option<&str> {
        self.picked.as_deref()
    }

    pub fn activations(&self) -> usize {
        self.activations
    }
}

impl LinkRuntime for HostRuntime {
    fn activate(&mut self, link: &LinkInfo) -> Result<ActivationOutcome> {
        self.activations += 1;
        let action = link.action.as_deref().unwrap_or(&link.label);
        info!(label = %link.label, action, node = link.node.get(), "link activated");

        if self.pick {
            self.picked = Some(action.to_owned());
            return Ok(ActivationOutcome::Quit);
        }
        match &link.action {
            Some(action) => Ok(ActivationOutcome::Continue(format!(
                "{}: {action}",
                link.label
            ))),
            None => Ok(ActivationOutcome::Continue(format!(
                "activated {}",
                link.label
            ))),
        }
    }
}
