// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{DEFAULT_CONTAINER_SELECTOR, NavigatorConfig, Selector, TableTree};
use tracing::{debug, warn};

/// Where the navigator currently is. Ids may go stale when the tree changes;
/// [`Navigator::resolve_current_link`] repairs them on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position<N> {
    link: Option<N>,
    row: Option<N>,
    column: usize,
    preferred_column: usize,
}

impl<N> Default for Position<N> {
    fn default() -> Self {
        Self {
            link: None,
            row: None,
            column: 0,
            preferred_column: 0,
        }
    }
}

impl<N> Position<N> {
    pub fn link(&self) -> Option<&N> {
        self.link.as_ref()
    }

    pub fn row(&self) -> Option<&N> {
        self.row.as_ref()
    }

    /// Column of the current link among its row's visible links.
    pub const fn column(&self) -> usize {
        self.column
    }

    /// Column that row moves try to land on. Survives passing through rows
    /// that are too short for it.
    pub const fn preferred_column(&self) -> usize {
        self.preferred_column
    }

    pub const fn is_set(&self) -> bool {
        self.link.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation<N> {
    Activated(N),
    NothingToActivate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

impl Direction {
    const fn delta(self) -> isize {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Landing {
    /// Row moves keep the preferred column.
    Vertical,
    /// Everything else re-derives it from where the link sits.
    Direct,
}

#[derive(Debug, Clone)]
struct Queries {
    container: Option<Selector>,
    focusable: Option<Selector>,
    table: Selector,
    body_row: Selector,
    row: Selector,
    feedback: Selector,
}

#[derive(Debug)]
pub struct Navigator<T: TableTree> {
    tree: T,
    selector: String,
    config: NavigatorConfig,
    queries: Queries,
    position: Position<T::Node>,
    observing_focus: bool,
}

impl<T: TableTree> Navigator<T> {
    /// Build a navigator over `tree`. A selector that does not parse behaves
    /// like one that matches nothing.
    pub fn new(tree: T, selector: impl Into<String>, config: NavigatorConfig) -> Self {
        let selector = selector.into();
        let container = match Selector::parse(&selector) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                warn!(%selector, %error, "container selector does not parse; container is empty");
                None
            }
        };
        let focusable = match Selector::parse(&config.focusable_selector) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                warn!(
                    selector = %config.focusable_selector,
                    %error,
                    "focusable selector does not parse; no links are navigable"
                );
                None
            }
        };
        let feedback = Selector::any_class([
            config.active_row_class.clone(),
            config.active_link_class.clone(),
        ]);

        Self {
            tree,
            selector,
            config,
            queries: Queries {
                container,
                focusable,
                table: Selector::tag("table"),
                body_row: Selector::descendants(&["tbody", "tr"]),
                row: Selector::tag("tr"),
                feedback,
            },
            position: Position::default(),
            observing_focus: false,
        }
    }

    pub fn with_defaults(tree: T) -> Self {
        Self::new(tree, DEFAULT_CONTAINER_SELECTOR, NavigatorConfig::default())
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn position(&self) -> &Position<T::Node> {
        &self.position
    }

    pub fn is_observing_focus(&self) -> bool {
        self.observing_focus
    }

    /// Tables making up the container. When the selector resolves to tables
    /// those are used as is; otherwise the tables inside the resolved
    /// elements are.
    pub fn tables(&self) -> Vec<T::Node> {
        let Some(container) = &self.queries.container else {
            return Vec::new();
        };
        let resolved = self.tree.select(container);

        let direct: Vec<T::Node> = resolved
            .iter()
            .filter(|node| self.tree.matches(node, &self.queries.table))
            .cloned()
            .collect();
        if !direct.is_empty() {
            return direct;
        }

        let mut tables = Vec::new();
        for root in &resolved {
            for table in self.tree.find(root, &self.queries.table) {
                if !tables.contains(&table) {
                    tables.push(table);
                }
            }
        }
        tables
    }

    pub fn rows_of(&self, table: &T::Node) -> Vec<T::Node> {
        self.tree
            .find(table, &self.queries.body_row)
            .into_iter()
            .filter(|row| self.tree.closest(row, &self.queries.table).as_ref() == Some(table))
            .collect()
    }

    pub fn visible_links(&self, row: &T::Node) -> Vec<T::Node> {
        let Some(focusable) = &self.queries.focusable else {
            return Vec::new();
        };
        self.tree
            .find(row, focusable)
            .into_iter()
            .filter(|link| {
                self.tree.is_visible(link)
                    && self.tree.closest(link, &self.queries.row).as_ref() == Some(row)
            })
            .collect()
    }

    fn all_rows(&self) -> Vec<T::Node> {
        self.tables()
            .iter()
            .flat_map(|table| self.rows_of(table))
            .collect()
    }

    fn in_container(&self, node: &T::Node) -> bool {
        if !self.tree.is_attached(node) {
            return false;
        }
        let Some(table) = self.tree.closest(node, &self.queries.table) else {
            return false;
        };
        self.tables().contains(&table)
    }

    /// First row with a visible link, at the preferred column when that row
    /// is wide enough.
    pub fn home(&self) -> Option<T::Node> {
        self.all_rows().iter().find_map(|row| {
            let links = self.visible_links(row);
            pick_column(links, self.position.preferred_column)
        })
    }

    /// The link the navigator is on, repaired against the live tree. Does not
    /// modify anything.
    pub fn resolve_current_link(&self) -> Option<T::Node> {
        if let Some(link) = &self.position.link
            && self.in_container(link)
        {
            return Some(link.clone());
        }
        if let Some(row) = &self.position.row
            && self.in_container(row)
            && let Some(first) = self.visible_links(row).into_iter().next()
        {
            return Some(first);
        }
        self.home()
    }

    pub fn current_row(&self) -> Option<T::Node> {
        let link = self.resolve_current_link()?;
        self.tree.closest(&link, &self.queries.row)
    }

    pub fn current_table(&self) -> Option<T::Node> {
        let row = self.current_row()?;
        self.tree.closest(&row, &self.queries.table)
    }

    pub fn current_table_index(&self) -> usize {
        if !self.position.is_set() {
            return 0;
        }
        let Some(table) = self.current_table() else {
            return 0;
        };
        self.tables()
            .iter()
            .position(|candidate| *candidate == table)
            .unwrap_or(0)
    }

    /// Jump straight to `link`, resyncing both columns from where it sits.
    /// Links outside the container are ignored.
    pub fn set_position(&mut self, link: T::Node) -> &mut Self {
        if !self.in_container(&link) {
            debug!(?link, "ignoring position outside the container");
            return self;
        }
        self.land(link, Landing::Direct);
        self
    }

    pub fn next_row(&mut self) -> &mut Self {
        if !self.start_navigation() {
            self.step_row(Direction::Forward);
        }
        self
    }

    pub fn prev_row(&mut self) -> &mut Self {
        if !self.start_navigation() {
            self.step_row(Direction::Backward);
        }
        self
    }

    pub fn next_link(&mut self) -> &mut Self {
        if !self.start_navigation() {
            self.step_link(Direction::Forward);
        }
        self
    }

    pub fn prev_link(&mut self) -> &mut Self {
        if !self.start_navigation() {
            self.step_link(Direction::Backward);
        }
        self
    }

    pub fn activate_current_link(&mut self) -> Activation<T::Node> {
        if !self.position.is_set() {
            return Activation::NothingToActivate;
        }
        let Some(link) = self.resolve_current_link() else {
            return Activation::NothingToActivate;
        };
        if self.tree.activate(&link) {
            debug!(?link, "activated link");
            Activation::Activated(link)
        } else {
            Activation::NothingToActivate
        }
    }

    /// Start following focus changes reported through [`Self::observe_focus`].
    pub fn attach_focus_observer(&mut self) -> &mut Self {
        self.observing_focus = true;
        self
    }

    /// Feed an externally originated focus change. Only visible links inside
    /// the container move the position, and only while the observer is
    /// attached. Returns whether the position followed.
    pub fn observe_focus(&mut self, node: &T::Node) -> bool {
        if !self.observing_focus {
            return false;
        }
        let Some(focusable) = &self.queries.focusable else {
            return false;
        };
        if !self.tree.matches(node, focusable)
            || !self.tree.is_visible(node)
            || !self.in_container(node)
        {
            return false;
        }
        self.set_position(node.clone());
        true
    }

    pub fn reset(&mut self) -> &mut Self {
        self.position = Position::default();
        self
    }

    /// Drop all feedback classes and forget the position.
    pub fn stop(&mut self) -> &mut Self {
        self.clear_ui();
        self.reset()
    }

    pub fn clear_ui(&mut self) -> &mut Self {
        let marked: Vec<T::Node> = self
            .tables()
            .iter()
            .flat_map(|table| {
                let mut nodes = Vec::new();
                if self.tree.matches(table, &self.queries.feedback) {
                    nodes.push(table.clone());
                }
                nodes.extend(self.tree.find(table, &self.queries.feedback));
                nodes
            })
            .collect();
        for node in &marked {
            self.tree.remove_class(node, &self.config.active_row_class);
            self.tree.remove_class(node, &self.config.active_link_class);
        }
        self
    }

    pub fn refresh_ui(&mut self) -> &mut Self {
        self.clear_ui();
        if !self.position.is_set() {
            return self;
        }
        if let Some(link) = self.resolve_current_link() {
            self.decorate(&link);
        }
        self
    }

    fn decorate(&mut self, link: &T::Node) {
        self.tree.add_class(link, &self.config.active_link_class);
        self.tree.focus(link);
        if let Some(row) = self.tree.closest(link, &self.queries.row) {
            self.tree.add_class(&row, &self.config.active_row_class);
        }
    }

    /// Materialize the implicit home position on the first command. Returns
    /// true when that consumed the command.
    fn start_navigation(&mut self) -> bool {
        if self.position.is_set() {
            return false;
        }
        match self.home() {
            Some(home) => self.land(home, Landing::Direct),
            None => debug!(selector = %self.selector, "no visible links in container"),
        }
        true
    }

    fn step_row(&mut self, direction: Direction) {
        let rows = self.all_rows();
        let len = rows.len();
        let current = self
            .current_row()
            .and_then(|row| rows.iter().position(|candidate| *candidate == row));

        // an unknown start behaves as if sitting just outside the list
        let start = match (direction, current) {
            (_, Some(start)) => start as isize,
            (Direction::Forward, None) => -1,
            (Direction::Backward, None) => len as isize,
        };
        for step in 1..=len {
            let index = wrap_index(start, direction.delta() * step as isize, len);
            let links = self.visible_links(&rows[index]);
            if let Some(link) = pick_column(links, self.position.preferred_column) {
                self.land(link, Landing::Vertical);
                return;
            }
        }

        self.fall_back_home();
    }

    fn step_link(&mut self, direction: Direction) {
        let Some(row) = self.current_row() else {
            self.fall_back_home();
            return;
        };
        let links = self.visible_links(&row);
        if links.is_empty() {
            self.fall_back_home();
            return;
        }

        let len = links.len();
        let current = self
            .resolve_current_link()
            .and_then(|link| links.iter().position(|candidate| *candidate == link));
        let index = match (direction, current) {
            (_, Some(at)) => wrap_index(at as isize, direction.delta(), len),
            (Direction::Forward, None) => 0,
            (Direction::Backward, None) => len - 1,
        };
        self.land(links[index].clone(), Landing::Direct);
    }

    fn fall_back_home(&mut self) {
        match self.home() {
            Some(home) => {
                debug!(?home, "no candidate found; returning home");
                self.land(home, Landing::Direct);
            }
            None => debug!(selector = %self.selector, "no visible links in container"),
        }
    }

    fn land(&mut self, link: T::Node, landing: Landing) {
        let row = self.tree.closest(&link, &self.queries.row);
        let column = row
            .as_ref()
            .and_then(|row| {
                self.visible_links(row)
                    .iter()
                    .position(|candidate| *candidate == link)
            })
            .unwrap_or(0);

        self.position.row = row;
        self.position.column = column;
        if landing == Landing::Direct {
            self.position.preferred_column = column;
        }
        debug!(
            link = ?link,
            column,
            preferred_column = self.position.preferred_column,
            "position changed"
        );
        self.clear_ui();
        self.decorate(&link);
        self.position.link = Some(link);
    }
}

fn wrap_index(start: isize, delta: isize, len: usize) -> usize {
    let len = len as isize;
    (start + delta).rem_euclid(len) as usize
}

fn pick_column<N>(links: Vec<N>, column: usize) -> Option<N> {
    if column < links.len() {
        links.into_iter().nth(column)
    } else {
        links.into_iter().next()
    }
}
