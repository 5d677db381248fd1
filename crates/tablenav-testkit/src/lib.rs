// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use tablenav_core::{Document, NodeId, Selector, TableTree};

pub const REGION_CLASS: &str = "region";
pub const TABLE_CLASS: &str = "tablenav";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub row: NodeId,
    pub links: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTable {
    pub table: NodeId,
    pub rows: Vec<GridRow>,
}

/// A document of tables plus handles to everything that was built, so
/// tests can address nodes without querying.
#[derive(Debug, Clone)]
pub struct Grid {
    pub document: Document,
    pub tables: Vec<GridTable>,
}

impl Grid {
    pub fn link(&self, label: &str) -> Result<NodeId> {
        self.tables
            .iter()
            .flat_map(|table| &table.rows)
            .flat_map(|row| &row.links)
            .copied()
            .find(|link| self.document.label(*link) == label)
            .ok_or_else(|| anyhow!("no link labeled {label:?} in grid"))
    }

    pub fn row(&self, table: usize, row: usize) -> Result<NodeId> {
        self.tables
            .get(table)
            .and_then(|grid_table| grid_table.rows.get(row))
            .map(|grid_row| grid_row.row)
            .ok_or_else(|| anyhow!("grid has no row {row} in table {table}"))
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|table| table.rows.len()).sum()
    }

    pub fn hide(&mut self, label: &str) -> Result<()> {
        let link = self.link(label)?;
        self.document.set_hidden(link, true)
    }
}

#[derive(Debug, Clone)]
enum PlannedTable {
    Tracked(Vec<Vec<String>>),
    Untracked(Vec<Vec<String>>),
}

/// Builds `div.region > table > (thead, tbody > tr > td > a)` documents.
#[derive(Debug, Clone, Default)]
pub struct GridBuilder {
    tables: Vec<PlannedTable>,
}

impl GridBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `table.tablenav`; each inner slice is one body row of link labels.
    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        self.tables.push(PlannedTable::Tracked(owned_rows(rows)));
        self
    }

    /// Add a table without the `tablenav` class.
    pub fn untracked_table(mut self, rows: &[&[&str]]) -> Self {
        self.tables.push(PlannedTable::Untracked(owned_rows(rows)));
        self
    }

    pub fn build(self) -> Result<Grid> {
        let mut document = Document::new();
        let mut tables = Vec::new();

        for planned in self.tables {
            let (rows, tracked) = match planned {
                PlannedTable::Tracked(rows) => (rows, true),
                PlannedTable::Untracked(rows) => (rows, false),
            };
            let region = document.append_element(document.root(), "div")?;
            document.add_class(&region, REGION_CLASS);
            let table = append_table(&mut document, region, &rows)?;
            if tracked {
                document.add_class(&table.table, TABLE_CLASS);
                tables.push(table);
            }
        }

        Ok(Grid { document, tables })
    }
}

fn owned_rows(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|label| (*label).to_owned()).collect())
        .collect()
}

fn append_table(
    document: &mut Document,
    parent: NodeId,
    rows: &[Vec<String>],
) -> Result<GridTable> {
    let table = document.append_element(parent, "table")?;
    let head = document.append_element(table, "thead")?;
    let head_row = document.append_element(head, "tr")?;
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for column in 0..width {
        let header = document.append_element(head_row, "th")?;
        document.set_label(header, format!("col {column}"))?;
    }

    let body = document.append_element(table, "tbody")?;
    let mut grid_rows = Vec::with_capacity(rows.len());
    for labels in rows {
        let row = document.append_element(body, "tr")?;
        let mut links = Vec::with_capacity(labels.len());
        for label in labels {
            let cell = document.append_element(row, "td")?;
            let link = document.append_element(cell, "a")?;
            document.set_label(link, label.clone())?;
            links.push(link);
        }
        grid_rows.push(GridRow { row, links });
    }

    Ok(GridTable {
        table,
        rows: grid_rows,
    })
}

/// Table A holds rows `(a1, a2)` and `(b1)`; table B holds `(c1, c2, c3)`.
pub fn scenario_grid() -> Result<Grid> {
    GridBuilder::new()
        .table(&[&["a1", "a2"], &["b1"]])
        .table(&[&["c1", "c2", "c3"]])
        .build()
        .context("build scenario grid")
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of irregular grids: uneven row widths, empty rows and
/// hidden links.
#[derive(Debug, Clone)]
pub struct GridFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl GridFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_range(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        min + self.rng.int_n(max - min + 1)
    }

    /// Labels are `t{table}r{row}l{link}`. Roughly one link in six is hidden.
    pub fn grid(&mut self) -> Result<Grid> {
        let mut planned: Vec<Vec<Vec<String>>> = Vec::new();
        for table in 0..self.int_range(1, 3) {
            let mut rows = Vec::new();
            for row in 0..self.int_range(1, 4) {
                let links: Vec<String> = (0..self.int_range(0, 4))
                    .map(|link| format!("t{table}r{row}l{link}"))
                    .collect();
                rows.push(links);
            }
            planned.push(rows);
        }

        let mut builder = GridBuilder::new();
        for rows in &planned {
            let borrowed: Vec<Vec<&str>> = rows
                .iter()
                .map(|row| row.iter().map(String::as_str).collect())
                .collect();
            let slices: Vec<&[&str]> = borrowed.iter().map(Vec::as_slice).collect();
            builder = builder.table(&slices);
        }
        let mut grid = builder.build()?;

        let links: Vec<NodeId> = grid
            .tables
            .iter()
            .flat_map(|table| &table.rows)
            .flat_map(|row| row.links.iter().copied())
            .collect();
        for link in links {
            if self.rng.int_n(6) == 0 {
                grid.document.set_hidden(link, true)?;
            }
        }
        Ok(grid)
    }

    /// Like [`Self::grid`], but every row keeps at least one visible link.
    pub fn dense_grid(&mut self) -> Result<Grid> {
        let mut grid = self.grid()?;
        for table in &grid.tables {
            for row in &table.rows {
                match row.links.first() {
                    Some(first) => grid.document.set_hidden(*first, false)?,
                    None => {
                        let cell = grid.document.append_element(row.row, "td")?;
                        let link = grid.document.append_element(cell, "a")?;
                        grid.document.set_label(link, "filler")?;
                    }
                }
            }
        }
        // refresh handles for the filler links
        let refreshed: Vec<GridTable> = grid
            .tables
            .iter()
            .map(|table| GridTable {
                table: table.table,
                rows: table
                    .rows
                    .iter()
                    .map(|row| GridRow {
                        row: row.row,
                        links: grid.document.find(&row.row, &Selector::tag("a")),
                    })
                    .collect(),
            })
            .collect();
        grid.tables = refreshed;
        Ok(grid)
    }
}

pub fn temp_layout_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("layout.toml");
    Ok((dir, path))
}
