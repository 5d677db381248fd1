// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ElementView, Selector, TableTree};
use anyhow::{Result, anyhow, bail};
use std::collections::BTreeSet;

const ROOT_TAG: &str = "body";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn get(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: BTreeSet<String>,
    pub label: String,
    pub action: Option<String>,
    pub hidden: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: BTreeSet::new(),
            label: String::new(),
            action: None,
            hidden: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

/// Arena-backed element tree. Nodes are never freed; detaching a node only
/// unlinks it, which is how removal is observed by navigators holding ids.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Element>,
    root: NodeId,
    focused: Option<NodeId>,
    activations: Vec<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Element::new(ROOT_TAG)],
            root: NodeId(0),
            focused: None,
            activations: Vec::new(),
        }
    }

    pub const fn root(&self) -> NodeId {
        self.root
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        self.nodes.get(node.0)
    }

    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(node.0)
    }

    pub fn label(&self, node: NodeId) -> &str {
        self.element(node).map_or("", |element| element.label.as_str())
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Every node activated so far, oldest first.
    pub fn activations(&self) -> &[NodeId] {
        &self.activations
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Element::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId> {
        let node = self.create_element(tag);
        self.append_child(parent, node)?;
        Ok(node)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let index = self.existing(parent)?.children.len();
        self.insert_child(parent, index, child)
    }

    /// Insert `child` at `index` among `parent`'s children, moving it out of
    /// its current parent first. Indexes past the end append.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.existing(parent)?;
        self.existing(child)?;
        if child == self.root {
            bail!("cannot move the document root");
        }
        if child == parent || self.is_descendant_of(parent, child) {
            bail!("cannot insert node {} into its own subtree", child.get());
        }

        self.unlink(child);
        let siblings = &mut self.nodes[parent.0].children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    /// Remove `node` and its subtree from the tree. Focus inside the subtree
    /// is dropped.
    pub fn detach(&mut self, node: NodeId) -> Result<()> {
        self.existing(node)?;
        if node == self.root {
            bail!("cannot detach the document root");
        }
        if let Some(focused) = self.focused
            && (focused == node || self.is_descendant_of(focused, node))
        {
            self.focused = None;
        }
        self.unlink(node);
        Ok(())
    }

    pub fn set_hidden(&mut self, node: NodeId, hidden: bool) -> Result<()> {
        self.existing_mut(node)?.hidden = hidden;
        Ok(())
    }

    pub fn set_label(&mut self, node: NodeId, label: impl Into<String>) -> Result<()> {
        self.existing_mut(node)?.label = label.into();
        Ok(())
    }

    /// Preorder descendants of `scope`, excluding `scope` itself.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.element(scope) {
            Some(element) => element.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(node) = stack.pop() {
            out.push(node);
            if let Some(element) = self.element(node) {
                stack.extend(element.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.element(node).and_then(Element::parent);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.element(current).and_then(Element::parent);
        }
        false
    }

    fn existing(&self, node: NodeId) -> Result<&Element> {
        self.element(node)
            .ok_or_else(|| anyhow!("node {} does not exist in this document", node.get()))
    }

    fn existing_mut(&mut self, node: NodeId) -> Result<&mut Element> {
        self.nodes
            .get_mut(node.0)
            .ok_or_else(|| anyhow!("node {} does not exist in this document", node.get()))
    }

    fn unlink(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
    }
}

impl ElementView for Document {
    type Node = NodeId;

    fn tag(&self, node: &NodeId) -> Option<&str> {
        self.element(*node).map(|element| element.tag.as_str())
    }

    fn element_id(&self, node: &NodeId) -> Option<&str> {
        self.element(*node).and_then(|element| element.id.as_deref())
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.element(*node)
            .is_some_and(|element| element.has_class(class))
    }

    fn parent_of(&self, node: &NodeId) -> Option<NodeId> {
        self.element(*node).and_then(Element::parent)
    }
}

impl TableTree for Document {
    type Node = NodeId;

    fn select(&self, selector: &Selector) -> Vec<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .filter(|node| selector.matches(self, node))
            .collect()
    }

    fn find(&self, scope: &NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(*scope)
            .into_iter()
            .filter(|node| selector.matches(self, node))
            .collect()
    }

    fn matches(&self, node: &NodeId, selector: &Selector) -> bool {
        self.element(*node).is_some() && selector.matches(self, node)
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.parent_of(node)
    }

    fn is_attached(&self, node: &NodeId) -> bool {
        *node == self.root
            || (self.element(*node).is_some() && self.is_descendant_of(*node, self.root))
    }

    fn is_visible(&self, node: &NodeId) -> bool {
        if !self.is_attached(node) {
            return false;
        }
        let mut cursor = Some(*node);
        while let Some(current) = cursor {
            let Some(element) = self.element(current) else {
                return false;
            };
            if element.hidden {
                return false;
            }
            cursor = element.parent;
        }
        true
    }

    fn add_class(&mut self, node: &NodeId, class: &str) {
        if let Some(element) = self.element_mut(*node) {
            element.classes.insert(class.to_owned());
        }
    }

    fn remove_class(&mut self, node: &NodeId, class: &str) {
        if let Some(element) = self.element_mut(*node) {
            element.classes.remove(class);
        }
    }

    fn focus(&mut self, node: &NodeId) {
        if self.is_attached(node) {
            self.focused = Some(*node);
        }
    }

    fn activate(&mut self, node: &NodeId) -> bool {
        if !self.is_attached(node) {
            return false;
        }
        self.activations.push(*node);
        true
    }
}
