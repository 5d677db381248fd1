// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::Selector;
use std::fmt;

/// The tree-query capability a [`crate::Navigator`] drives.
///
/// Implementations own the live tree; the navigator never caches what these
/// methods return, so the tree may change freely between calls. Every query
/// returns nodes in document order.
pub trait TableTree {
    type Node: Clone + PartialEq + fmt::Debug;

    /// Resolve a selector against the whole tree.
    fn select(&self, selector: &Selector) -> Vec<Self::Node>;

    /// Descendants of `scope` (excluding `scope`) matching `selector`.
    fn find(&self, scope: &Self::Node, selector: &Selector) -> Vec<Self::Node>;

    fn matches(&self, node: &Self::Node, selector: &Selector) -> bool;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Whether the node still hangs off the tree root.
    fn is_attached(&self, node: &Self::Node) -> bool;

    /// Whether the node is currently displayed. Hidden ancestors hide it too.
    fn is_visible(&self, node: &Self::Node) -> bool;

    fn add_class(&mut self, node: &Self::Node, class: &str);

    fn remove_class(&mut self, node: &Self::Node, class: &str);

    fn focus(&mut self, node: &Self::Node);

    /// Trigger the node's default activation (a click). Returns false when the
    /// node could not be activated.
    fn activate(&mut self, node: &Self::Node) -> bool;

    /// Nearest node, starting with `node` itself, that matches `selector`.
    fn closest(&self, node: &Self::Node, selector: &Selector) -> Option<Self::Node> {
        let mut cursor = Some(node.clone());
        while let Some(candidate) = cursor {
            if self.matches(&candidate, selector) {
                return Some(candidate);
            }
            cursor = self.parent(&candidate);
        }
        None
    }
}
