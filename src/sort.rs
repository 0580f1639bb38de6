//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Schema-directed sibling ordering, lookup and matching.
//!
//! All primitives here are total: they never fail, and nodes without a
//! bound schema statement compare equal so that stable sorting preserves
//! their arrival order.

use std::cmp::Ordering;

use crate::data::{DataNodeRef, DataTree, NodeId};
use crate::schema::{DataValue, SchemaNode, SchemaNodeKind};

/// Keyword-specific match parameters for [`search_child`] and the merge
/// and diff matcher.
#[derive(Clone, Copy, Debug)]
pub enum SearchKey<'a> {
    /// `container` and `leaf`: match by element name only.
    None,
    /// `leaf-list`: the single entry value.
    Value(&'a str),
    /// `list`: key values in declared key order.
    Keys(&'a [&'a str]),
}

// ===== child comparator =====

/// Total ordering of two sibling elements under a bound parent:
/// YANG order indices first, then keyword-specific key comparison.
/// Unbound, state-data and `ordered-by user` siblings compare equal so
/// that stable sorting pins their arrival order.
pub(crate) fn cmp_siblings(
    tree: &DataTree<'_>,
    a: NodeId,
    b: NodeId,
) -> Ordering {
    let spec = tree.context.spec();
    let (sa, sb) = match (tree.node(a).schema, tree.node(b).schema) {
        (Some(sa), Some(sb)) => (sa, sb),
        _ => return Ordering::Equal,
    };
    if sa != sb {
        return spec.node(sa).order().cmp(&spec.node(sb).order());
    }

    let snode = spec.node(sa);
    if snode.is_state() || snode.is_user_ordered() {
        return Ordering::Equal;
    }
    match snode.kind() {
        SchemaNodeKind::LeafList => cmp_bodies(tree, &snode, a, b),
        SchemaNodeKind::List => {
            for key in snode.list_keys() {
                let ka = key_body(tree, a, key);
                let kb = key_body(tree, b, key);
                match ka.cmp(kb) {
                    Ordering::Equal => (),
                    unequal => return unequal,
                }
            }
            Ordering::Equal
        }
        _ => Ordering::Equal,
    }
}

/// Compare two leaf-list entries by typed value; a missing body sorts
/// strictly before a present one, and bodies that do not parse under the
/// resolved type fall back to code-point comparison.
fn cmp_bodies(
    tree: &DataTree<'_>,
    snode: &SchemaNode<'_>,
    a: NodeId,
    b: NodeId,
) -> Ordering {
    let ba = tree.node(a).body.as_deref();
    let bb = tree.node(b).body.as_deref();
    match (ba, bb) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(ba), Some(bb)) => cmp_body_to(tree, snode, a, bb)
            .unwrap_or_else(|| ba.cmp(bb)),
    }
}

/// Typed comparison of a node body against a target body string.
fn cmp_body_to(
    tree: &DataTree<'_>,
    snode: &SchemaNode<'_>,
    a: NodeId,
    target: &str,
) -> Option<Ordering> {
    let ltype = snode.leaf_type()?;
    let va = match &tree.node(a).cached {
        Some(cached) => cached.clone(),
        None => {
            DataValue::parse(tree.node(a).body.as_deref()?, &ltype).ok()?
        }
    };
    let vb = DataValue::parse(target, &ltype).ok()?;
    va.partial_cmp(&vb)
}

fn key_body<'a>(tree: &'a DataTree<'_>, id: NodeId, key: &str) -> &'a str {
    tree.node(id)
        .children
        .iter()
        .map(|child| tree.node(*child))
        .find(|child| child.name == key)
        .and_then(|child| child.body.as_deref())
        .unwrap_or("")
}

// ===== sort / verify =====

impl<'a> DataTree<'a> {
    /// Total ordering of two sibling nodes, as used by the sorter.
    pub fn cmp_siblings(&self, a: NodeId, b: NodeId) -> Ordering {
        cmp_siblings(self, a, b)
    }

    /// Sort the element children of a single node (stable). Skipped
    /// entirely when the node itself holds state data, whose arrival
    /// order is authoritative.
    pub fn sort_children(&mut self, id: NodeId) {
        if let Some(snode) = self.node(id).schema {
            if self.context.spec().node(snode).is_state() {
                return;
            }
        }
        let mut children = std::mem::take(&mut self.node_mut(id).children);
        children.sort_by(|a, b| cmp_siblings(self, *a, *b));
        self.node_mut(id).children = children;
    }

    /// Sort the whole tree, top-level siblings included.
    pub fn sort(&mut self) {
        let mut roots = std::mem::take(&mut self.roots);
        roots.sort_by(|a, b| cmp_siblings(self, *a, *b));
        self.roots = roots;

        let ids: Vec<NodeId> =
            self.traverse().map(|dnode| dnode.id()).collect();
        for id in ids {
            self.sort_children(id);
        }
    }

    /// Verify sibling order over the whole tree. Returns the first
    /// offending pair on failure.
    pub fn verify_sorted(&self) -> Result<(), (NodeId, NodeId)> {
        self.verify_run(&self.roots)?;
        for dnode in self.traverse() {
            let node = self.node(dnode.id());
            if let Some(snode) = node.schema {
                if self.context.spec().node(snode).is_state() {
                    continue;
                }
            }
            self.verify_run(&node.children)?;
        }
        Ok(())
    }

    fn verify_run(&self, siblings: &[NodeId]) -> Result<(), (NodeId, NodeId)> {
        for pair in siblings.windows(2) {
            if cmp_siblings(self, pair[0], pair[1]) == Ordering::Greater {
                return Err((pair[0], pair[1]));
            }
        }
        Ok(())
    }
}

// ===== search / insert position =====

fn sibling_slice<'a>(
    tree: &'a DataTree<'_>,
    parent: Option<NodeId>,
) -> &'a [NodeId] {
    match parent {
        Some(parent) => &tree.node(parent).children,
        None => &tree.roots,
    }
}

fn child_order(tree: &DataTree<'_>, id: NodeId) -> Option<usize> {
    tree.node(id)
        .schema
        .map(|snode| tree.context.spec().node(snode).order())
}

/// Binary search for the child of `parent` matching the given name and
/// keyword-specific key. Falls back to a linear sweep when the siblings
/// are not fully schema-bound or the statement is `ordered-by user`.
pub(crate) fn search_child<'a>(
    tree: &'a DataTree<'a>,
    parent: Option<NodeId>,
    name: &str,
    key: SearchKey<'_>,
) -> Option<DataNodeRef<'a>> {
    let spec = tree.context.spec();
    let siblings = sibling_slice(tree, parent);

    // Resolve the governing statement from the parent.
    let snode = match parent {
        Some(parent) => {
            let pstmt = tree.node(parent).schema?;
            spec.node(pstmt).find_data_child(name)?
        }
        None => {
            // No schema anchor at top level: locate the statement through
            // any bound sibling of that name.
            let snode = siblings.iter().find_map(|id| {
                let node = tree.node(*id);
                if node.name == name {
                    node.schema
                } else {
                    None
                }
            })?;
            spec.node(snode)
        }
    };

    if siblings.iter().any(|id| tree.node(*id).schema.is_none()) {
        return siblings
            .iter()
            .copied()
            .find(|id| node_matches(tree, *id, &snode, &key))
            .map(|id| DataNodeRef::new(tree, id));
    }

    binsearch(tree, siblings, &snode, &key)
        .map(|id| DataNodeRef::new(tree, id))
}

/// Binary search over fully-bound siblings: locate the equal-order run,
/// then resolve within it with the keyword-specific predicate.
fn binsearch(
    tree: &DataTree<'_>,
    siblings: &[NodeId],
    snode: &SchemaNode<'_>,
    key: &SearchKey<'_>,
) -> Option<NodeId> {
    let yorder = snode.order();
    let lo = siblings
        .partition_point(|id| child_order(tree, *id) < Some(yorder));
    let hi = lo
        + siblings[lo..]
            .partition_point(|id| child_order(tree, *id) <= Some(yorder));
    let run = &siblings[lo..hi];
    if run.is_empty() {
        return None;
    }

    // Order within a user-ordered run is arbitrary: sweep it linearly.
    if snode.is_user_ordered() {
        return run
            .iter()
            .copied()
            .find(|id| node_matches(tree, *id, snode, key));
    }

    match snode.kind() {
        SchemaNodeKind::Container | SchemaNodeKind::Leaf => match key {
            SearchKey::None => run.first().copied(),
            _ => None,
        },
        SchemaNodeKind::LeafList => {
            let value = match key {
                SearchKey::Value(value) => *value,
                _ => return None,
            };
            run.binary_search_by(|id| {
                match tree.node(*id).body.as_deref() {
                    None => Ordering::Less,
                    Some(body) => cmp_body_to(tree, snode, *id, value)
                        .unwrap_or_else(|| body.cmp(value)),
                }
            })
            .ok()
            .map(|index| run[index])
        }
        SchemaNodeKind::List => {
            let values = match key {
                SearchKey::Keys(values) => *values,
                _ => return None,
            };
            run.binary_search_by(|id| {
                cmp_keys_to(tree, *id, snode, values)
            })
            .ok()
            .map(|index| run[index])
        }
        _ => run
            .iter()
            .copied()
            .find(|id| node_matches(tree, *id, snode, key)),
    }
}

fn cmp_keys_to(
    tree: &DataTree<'_>,
    id: NodeId,
    snode: &SchemaNode<'_>,
    values: &[&str],
) -> Ordering {
    for (key, value) in snode.list_keys().zip(values.iter()) {
        match key_body(tree, id, key).cmp(value) {
            Ordering::Equal => (),
            unequal => return unequal,
        }
    }
    Ordering::Equal
}

/// Keyword-specific equality predicate, shared by search, match and the
/// linear fallbacks.
fn node_matches(
    tree: &DataTree<'_>,
    id: NodeId,
    snode: &SchemaNode<'_>,
    key: &SearchKey<'_>,
) -> bool {
    let node = tree.node(id);
    if node.name != snode.name() {
        return false;
    }
    if let Some(bound) = node.schema {
        if bound != snode.id() {
            return false;
        }
    }
    match (snode.kind(), key) {
        (SchemaNodeKind::LeafList, SearchKey::Value(value)) => {
            node.body.as_deref() == Some(*value)
        }
        (SchemaNodeKind::LeafList, _) => false,
        (SchemaNodeKind::List, SearchKey::Keys(values)) => snode
            .list_keys()
            .zip(values.iter())
            .all(|(key, value)| key_body(tree, id, key) == *value),
        (SchemaNodeKind::List, _) => false,
        (_, SearchKey::None) => true,
        _ => false,
    }
}

/// Index at which a detached node belongs among its future siblings:
/// after every sibling that does not sort strictly greater. Within a
/// user-ordered or state-data run this appends at the end of the run.
pub(crate) fn insert_position(
    tree: &DataTree<'_>,
    parent: Option<NodeId>,
    child: NodeId,
) -> usize {
    let siblings = sibling_slice(tree, parent);
    if let Some(parent) = parent {
        // State data keeps arrival order: append.
        if let Some(snode) = tree.node(parent).schema {
            if tree.context.spec().node(snode).is_state() {
                return siblings.len();
            }
        }
    }
    siblings.partition_point(|existing| {
        cmp_siblings(tree, *existing, child) != Ordering::Greater
    })
}

// ===== diff-pair match =====

/// Locate the counterpart of the "modification" child `m` inside the
/// children of `base_parent` in the base tree. Both trees must be bound
/// against the same context.
pub(crate) fn match_in_base(
    base: &DataTree<'_>,
    base_parent: Option<NodeId>,
    mod_tree: &DataTree<'_>,
    m: NodeId,
) -> Option<NodeId> {
    let spec = base.context.spec();
    let mnode = mod_tree.node(m);
    let siblings = sibling_slice(base, base_parent);

    let ym = match mnode.schema {
        Some(ym) => spec.node(ym),
        None => {
            // Unbound modification node: all we can go by is the name.
            return siblings
                .iter()
                .copied()
                .find(|id| base.node(*id).name == mnode.name);
        }
    };

    // Keyword-specific parameters extracted from the modification node.
    let key_values: Vec<&str> = match ym.kind() {
        SchemaNodeKind::List => ym
            .list_keys()
            .map(|key| key_body(mod_tree, m, key))
            .collect(),
        _ => Vec::new(),
    };
    let key = match ym.kind() {
        SchemaNodeKind::LeafList => {
            SearchKey::Value(mnode.body.as_deref().unwrap_or(""))
        }
        SchemaNodeKind::List => SearchKey::Keys(&key_values),
        _ => SearchKey::None,
    };

    // Same-statement counterpart first: binary search over bound
    // siblings, linear sweep otherwise.
    let bound = siblings.iter().all(|id| base.node(*id).schema.is_some());
    let found = if bound {
        binsearch(base, siblings, &ym, &key)
    } else {
        siblings
            .iter()
            .copied()
            .find(|id| node_matches(base, *id, &ym, &key))
    };
    if found.is_some() {
        return found;
    }

    // A sibling from another case of the same choice counts as the
    // counterpart: its lexical name may differ.
    if let Some(choice) = ym.choice_parent() {
        return siblings.iter().copied().find(|id| {
            base.node(*id)
                .schema
                .map(|snode| {
                    snode != ym.id()
                        && spec.node(snode).choice_parent()
                            == Some(choice)
                })
                .unwrap_or(false)
        });
    }
    None
}
