// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tablenav_core::{Document, NodeId, TableTree};

const DEMO_LAYOUT: &str = r#"
[[region]]
id = "mail"
classes = ["region"]

[[region.table]]
id = "inbox"
classes = ["tablenav"]
header = ["from", "subject", "actions"]

[[region.table.row]]
links = [
  { label = "ada", action = "open ada" },
  { label = "Re: engines", action = "read engines" },
  { label = "archive", action = "archive engines" },
]

[[region.table.row]]
links = [
  { label = "grace", action = "open grace" },
  { label = "compilers", action = "read compilers" },
]

[[region.table.row]]
links = [{ label = "linus", action = "open linus" }]

[[region.table.row]]
links = []

[[region.table.row]]
links = [
  { label = "ken", action = "open ken" },
  { label = "unix", action = "read unix" },
  { label = "spam", action = "mark spam", hidden = true },
  { label = "archive", action = "archive unix" },
]

[[region]]
id = "tasks"
classes = ["region"]
links = [{ label = "outside the tables", action = "noop" }]

[[region.table]]
id = "todo"
classes = ["tablenav"]
header = ["task", "owner", "due"]

[[region.table.row]]
links = [
  { label = "ship release", action = "open release" },
  { label = "barbara", action = "open barbara" },
  { label = "friday", action = "open friday" },
]

[[region.table.row]]
links = [{ label = "write docs", action = "open docs" }]

[[region.table]]
id = "ignored"
classes = ["plain"]
header = ["not navigable"]

[[region.table.row]]
links = [{ label = "skip me", action = "should not be reachable by rows" }]
"#;

/// Description of the tables a host document is built from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    #[serde(default, rename = "region")]
    pub regions: Vec<RegionSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionSpec {
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default, rename = "table")]
    pub tables: Vec<TableSpec>,
    /// Links placed in the region after its tables.
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub header: Vec<String>,
    #[serde(default, rename = "row")]
    pub rows: Vec<RowSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RowSpec {
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkSpec {
    pub label: String,
    pub action: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub classes: Vec<String>,
}

impl Layout {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read layout file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("load layout {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let layout: Layout = toml::from_str(raw).context("parse TOML layout")?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn demo() -> Result<Self> {
        Self::parse(DEMO_LAYOUT).context("parse built-in demo layout")
    }

    fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            bail!("layout has no [[region]] entries");
        }
        for (region_index, region) in self.regions.iter().enumerate() {
            let at = format!("region {}", region_index + 1);
            validate_classes(&at, &region.classes)?;
            validate_links(&at, &region.links)?;
            for (table_index, table) in region.tables.iter().enumerate() {
                let at = format!("{at} table {}", table_index + 1);
                validate_classes(&at, &table.classes)?;
                for (row_index, row) in table.rows.iter().enumerate() {
                    validate_links(&format!("{at} row {}", row_index + 1), &row.links)?;
                }
            }
        }
        Ok(())
    }

    pub fn table_count(&self) -> usize {
        self.regions.iter().map(|region| region.tables.len()).sum()
    }

    /// Build `body > div > table > (thead > tr > th, tbody > tr > td > a)`.
    pub fn to_document(&self) -> Result<Document> {
        let mut document = Document::new();
        for region in &self.regions {
            let region_node = document.append_element(document.root(), "div")?;
            decorate(&mut document, region_node, region.id.as_deref(), &region.classes)?;

            for table in &region.tables {
                append_table(&mut document, region_node, table)?;
            }
            for link in &region.links {
                append_link(&mut document, region_node, link)?;
            }
        }
        Ok(document)
    }
}

fn validate_classes(at: &str, classes: &[String]) -> Result<()> {
    for class in classes {
        if class.is_empty()
            || !class
                .chars()
                .all(|ch| ch.is_alphanumeric() || ch == '-' || ch == '_')
        {
            bail!("{at} has invalid class {class:?}; class names use letters, digits, - and _");
        }
    }
    Ok(())
}

fn validate_links(at: &str, links: &[LinkSpec]) -> Result<()> {
    for (index, link) in links.iter().enumerate() {
        if link.label.trim().is_empty() {
            bail!("{at} link {} has an empty label", index + 1);
        }
        validate_classes(&format!("{at} link {}", index + 1), &link.classes)?;
    }
    Ok(())
}

fn decorate(
    document: &mut Document,
    node: NodeId,
    id: Option<&str>,
    classes: &[String],
) -> Result<()> {
    for class in classes {
        document.add_class(&node, class);
    }
    if let Some(id) = id {
        document
            .element_mut(node)
            .ok_or_else(|| anyhow!("layout node {} vanished", node.get()))?
            .id = Some(id.to_owned());
    }
    Ok(())
}

fn append_table(document: &mut Document, parent: NodeId, spec: &TableSpec) -> Result<()> {
    let table = document.append_element(parent, "table")?;
    decorate(document, table, spec.id.as_deref(), &spec.classes)?;

    if !spec.header.is_empty() {
        let head = document.append_element(table, "thead")?;
        let head_row = document.append_element(head, "tr")?;
        for title in &spec.header {
            let cell = document.append_element(head_row, "th")?;
            document.set_label(cell, title.clone())?;
        }
    }

    let body = document.append_element(table, "tbody")?;
    for row_spec in &spec.rows {
        let row = document.append_element(body, "tr")?;
        if row_spec.hidden {
            document.set_hidden(row, true)?;
        }
        for link in &row_spec.links {
            let cell = document.append_element(row, "td")?;
            append_link(document, cell, link)?;
        }
    }
    Ok(())
}

fn append_link(document: &mut Document, parent: NodeId, spec: &LinkSpec) -> Result<NodeId> {
    let link = document.append_element(parent, "a")?;
    document.set_label(link, spec.label.clone())?;
    document.set_hidden(link, spec.hidden)?;
    decorate(document, link, None, &spec.classes)?;
    if let Some(action) = &spec.action {
        document
            .element_mut(link)
            .ok_or_else(|| anyhow!("layout link {} vanished", link.get()))?
            .action = Some(action.clone());
    }
    Ok(link)
}
