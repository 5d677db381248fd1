// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use std::fmt;

/// Read-only view of an element tree, enough to evaluate a [`Selector`].
pub trait ElementView {
    type Node;

    fn tag(&self, node: &Self::Node) -> Option<&str>;
    fn element_id(&self, node: &Self::Node) -> Option<&str>;
    fn has_class(&self, node: &Self::Node, class: &str) -> bool;
    fn parent_of(&self, node: &Self::Node) -> Option<Self::Node>;
}

/// A small CSS-like selector: comma separated groups of descendant chains
/// built from `tag`, `*`, `.class` and `#id` parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Chain>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Chain {
    // Outermost ancestor first, subject last.
    compounds: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            bail!("selector is empty; use something like \"table.tablenav\"");
        }

        let mut groups = Vec::new();
        for group in trimmed.split(',') {
            let group = group.trim();
            if group.is_empty() {
                bail!("selector {source:?} has an empty group around a comma");
            }
            let compounds = group
                .split_whitespace()
                .map(|token| parse_compound(token, source))
                .collect::<Result<Vec<_>>>()?;
            groups.push(Chain { compounds });
        }
        Ok(Self { groups })
    }

    /// Matches elements with the given tag name.
    pub fn tag(name: &str) -> Self {
        Self::descendants(&[name])
    }

    /// Matches the last tag when nested inside the preceding ones, e.g.
    /// `descendants(&["tbody", "tr"])` is `tbody tr`.
    pub fn descendants(tags: &[&str]) -> Self {
        let compounds = tags
            .iter()
            .map(|tag| Compound {
                tag: Some(tag.to_ascii_lowercase()),
                ..Compound::default()
            })
            .collect();
        Self {
            groups: vec![Chain { compounds }],
        }
    }

    /// Matches elements carrying any of the given classes.
    pub fn any_class<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let groups = classes
            .into_iter()
            .map(|class| Chain {
                compounds: vec![Compound {
                    classes: vec![class.into()],
                    ..Compound::default()
                }],
            })
            .collect();
        Self { groups }
    }

    pub fn matches<V: ElementView>(&self, view: &V, node: &V::Node) -> bool {
        self.groups.iter().any(|chain| chain.matches(view, node))
    }
}

impl Chain {
    fn matches<V: ElementView>(&self, view: &V, node: &V::Node) -> bool {
        let Some((subject, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !subject.matches(view, node) {
            return false;
        }

        // Descendant-only chains can be matched greedily from the nearest ancestor.
        let mut cursor = view.parent_of(node);
        for compound in ancestors.iter().rev() {
            loop {
                let Some(candidate) = cursor else {
                    return false;
                };
                cursor = view.parent_of(&candidate);
                if compound.matches(view, &candidate) {
                    break;
                }
            }
        }
        true
    }
}

impl Compound {
    fn matches<V: ElementView>(&self, view: &V, node: &V::Node) -> bool {
        if let Some(tag) = &self.tag
            && !view
                .tag(node)
                .is_some_and(|actual| actual.eq_ignore_ascii_case(tag))
        {
            return false;
        }
        if let Some(id) = &self.id
            && view.element_id(node) != Some(id.as_str())
        {
            return false;
        }
        self.classes.iter().all(|class| view.has_class(node, class))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (group_index, chain) in self.groups.iter().enumerate() {
            if group_index > 0 {
                f.write_str(", ")?;
            }
            for (index, compound) in chain.compounds.iter().enumerate() {
                if index > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{compound}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => f.write_str(tag)?,
            None if self.id.is_none() && self.classes.is_empty() => f.write_str("*")?,
            None => {}
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        Ok(())
    }
}

fn parse_compound(token: &str, source: &str) -> Result<Compound> {
    let mut compound = Compound::default();
    let mut rest = token;

    if let Some(after_star) = rest.strip_prefix('*') {
        rest = after_star;
    } else {
        let (name, tail) = split_ident(rest);
        if !name.is_empty() {
            compound.tag = Some(name.to_ascii_lowercase());
        }
        rest = tail;
    }

    while let Some(marker) = rest.chars().next() {
        let (name, tail) = split_ident(&rest[marker.len_utf8()..]);
        if name.is_empty() {
            bail!("selector {source:?} has {marker:?} without a name after it");
        }
        match marker {
            '.' => compound.classes.push(name.to_owned()),
            '#' => {
                if compound.id.replace(name.to_owned()).is_some() {
                    bail!("selector {source:?} names more than one #id in {token:?}");
                }
            }
            other => {
                bail!(
                    "unsupported character {other:?} in selector {source:?}; only tag, *, .class and #id parts are allowed"
                )
            }
        }
        rest = tail;
    }

    Ok(compound)
}

fn split_ident(input: &str) -> (&str, &str) {
    let end = input
        .char_indices()
        .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '-' || *ch == '_'))
        .map_or(input.len(), |(index, _)| index);
    input.split_at(end)
}
