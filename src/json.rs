//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! RFC 7951 JSON codec.
//!
//! Encoding walks the tree directly: member naming (module qualification),
//! array shape and value quoting are all schema-driven, which rules out a
//! static serde mapping. Decoding goes through `serde_json::Value` (with
//! member order preserved) and then the regular schema binding pass.

use crate::context::{Context, ContextFlags};
use crate::data::{DataPrinterFlags, DataTree, NodeId};
use crate::error::{Error, Result};
use crate::schema::{DataValue, DataValueType, ModuleId, SchemaNodeKind};
use crate::xml;

// ===== encoding =====

pub(crate) fn print_string(
    tree: &DataTree<'_>,
    roots: &[NodeId],
    options: DataPrinterFlags,
) -> Result<String> {
    let pretty = !options.contains(DataPrinterFlags::SHRINK);
    let mut out = String::new();
    out.push('{');
    let count = print_members(&mut out, tree, roots, None, 1, options)?;
    if pretty && count > 0 {
        out.push('\n');
    }
    out.push('}');
    Ok(out)
}

fn indent(out: &mut String, tree: &DataTree<'_>, level: usize) {
    out.push_str(&" ".repeat(level * tree.context.indent_width()));
}

/// Emit the members of one object: the sibling scan groups adjacent
/// same-name same-namespace elements into array runs.
fn print_members(
    out: &mut String,
    tree: &DataTree<'_>,
    siblings: &[NodeId],
    ancestor: Option<ModuleId>,
    level: usize,
    options: DataPrinterFlags,
) -> Result<usize> {
    let pretty = !options.contains(DataPrinterFlags::SHRINK);
    let visible: Vec<NodeId> = siblings
        .iter()
        .copied()
        .filter(|id| {
            !(tree.node(*id).default
                && options.contains(DataPrinterFlags::WD_TRIM))
        })
        .collect();

    let mut count = 0;
    let mut index = 0;
    while index < visible.len() {
        let id = visible[index];
        let mut end = index + 1;
        while end < visible.len() && same_run(tree, id, visible[end]) {
            end += 1;
        }
        let run = &visible[index..end];

        if count > 0 {
            out.push(',');
        }
        if pretty {
            out.push('\n');
            indent(out, tree, level);
        }
        let (name, module) = member_name(tree, id, ancestor);
        out.push_str(&quote(&name));
        out.push(':');
        if pretty {
            out.push(' ');
        }

        if is_array(tree, id, run.len()) {
            out.push('[');
            for (position, item) in run.iter().enumerate() {
                if position > 0 {
                    out.push(',');
                }
                if pretty {
                    out.push('\n');
                    indent(out, tree, level + 1);
                }
                print_value(
                    out,
                    tree,
                    *item,
                    module,
                    level + 1,
                    options,
                    true,
                )?;
            }
            if pretty {
                out.push('\n');
                indent(out, tree, level);
            }
            out.push(']');
        } else {
            print_value(out, tree, id, module, level, options, false)?;
        }
        count += 1;
        index = end;
    }
    Ok(count)
}

/// Two siblings belong to the same array run when they share the element
/// name and the effective namespace.
fn same_run(tree: &DataTree<'_>, a: NodeId, b: NodeId) -> bool {
    let (na, nb) = (tree.node(a), tree.node(b));
    if let (Some(sa), Some(sb)) = (na.schema, nb.schema) {
        return sa == sb;
    }
    na.name == nb.name
        && xml::effective_namespace(tree, a)
            == xml::effective_namespace(tree, b)
}

fn is_array(tree: &DataTree<'_>, id: NodeId, run_len: usize) -> bool {
    match node_schema_kind(tree, id) {
        Some(SchemaNodeKind::List) | Some(SchemaNodeKind::LeafList) => true,
        Some(_) => false,
        None => run_len > 1,
    }
}

fn node_schema_kind(
    tree: &DataTree<'_>,
    id: NodeId,
) -> Option<SchemaNodeKind> {
    tree.node(id)
        .schema
        .map(|snode| tree.context.spec().node(snode).kind())
}

/// Member name with RFC 7951 module qualification: qualified at the top
/// level and on every namespace crossing, bare otherwise.
fn member_name(
    tree: &DataTree<'_>,
    id: NodeId,
    ancestor: Option<ModuleId>,
) -> (String, Option<ModuleId>) {
    let node = tree.node(id);
    let module = match node.schema {
        Some(snode) => Some(tree.context.spec().node(snode).module()),
        None => xml::effective_namespace(tree, id).and_then(|namespace| {
            tree.context.get_module_by_namespace(&namespace)
        }),
    };
    match module {
        Some(module) if ancestor != Some(module.id()) => (
            format!("{}:{}", module.name(), node.name),
            Some(module.id()),
        ),
        Some(module) => (node.name.clone(), Some(module.id())),
        None => (node.name.clone(), ancestor),
    }
}

fn print_value(
    out: &mut String,
    tree: &DataTree<'_>,
    id: NodeId,
    module: Option<ModuleId>,
    level: usize,
    options: DataPrinterFlags,
    in_array: bool,
) -> Result<()> {
    let pretty = !options.contains(DataPrinterFlags::SHRINK);
    let node = tree.node(id);
    let children: Vec<NodeId> = node
        .children
        .iter()
        .copied()
        .filter(|child| {
            !(tree.node(*child).default
                && options.contains(DataPrinterFlags::WD_TRIM))
        })
        .collect();

    if !children.is_empty() {
        out.push('{');
        let count =
            print_members(out, tree, &children, module, level + 1, options)?;
        if pretty && count > 0 {
            out.push('\n');
            indent(out, tree, level);
        }
        out.push('}');
        return Ok(());
    }
    if let Some(body) = &node.body {
        return print_scalar(out, tree, id, body, in_array);
    }

    // No children and no body.
    match node_schema_kind(tree, id) {
        Some(SchemaNodeKind::Leaf) | Some(SchemaNodeKind::LeafList) => {
            out.push_str(if in_array { "null" } else { "[null]" })
        }
        Some(_) => out.push_str("{}"),
        None => out.push_str("null"),
    }
    Ok(())
}

/// Quote a body per the JSON base kind of the resolved type: integers,
/// `decimal64` and booleans unquoted, everything else (unresolved types
/// included) quoted. CDATA sections are unwrapped first.
fn print_scalar(
    out: &mut String,
    tree: &DataTree<'_>,
    id: NodeId,
    body: &str,
    in_array: bool,
) -> Result<()> {
    use std::fmt::Write;

    let body = xml::unwrap_cdata(body);
    let ltype = tree
        .node(id)
        .schema
        .map(|snode| tree.context.spec().node(snode))
        .and_then(|snode| snode.leaf_type());

    match ltype {
        Some(ltype) => match ltype.base_type() {
            DataValueType::Int8
            | DataValueType::Int16
            | DataValueType::Int32
            | DataValueType::Int64
            | DataValueType::Uint8
            | DataValueType::Uint16
            | DataValueType::Uint32
            | DataValueType::Uint64
            | DataValueType::Dec64
            | DataValueType::Bool => {
                match DataValue::parse(&body, &ltype) {
                    Ok(value) => {
                        let _ = write!(out, "{}", value);
                    }
                    // A body that does not parse under its type is still
                    // printed, as a string.
                    Err(_) => out.push_str(&quote(&body)),
                }
            }
            DataValueType::Empty => {
                out.push_str(if in_array { "null" } else { "[null]" })
            }
            DataValueType::IdentityRef => {
                let value = encode_identityref(tree, id, &body);
                out.push_str(&quote(&value));
            }
            _ => out.push_str(&quote(&body)),
        },
        None => out.push_str(&quote(&body)),
    }
    Ok(())
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

/// Rewrite an `identityref` body from XML prefix qualification to RFC
/// 7951 module qualification.
fn encode_identityref(
    tree: &DataTree<'_>,
    id: NodeId,
    body: &str,
) -> String {
    let context = tree.context;
    let (prefix, identity) = match body.split_once(':') {
        Some((prefix, identity)) => (prefix, identity),
        // Unprefixed: the identity lives in the enclosing default
        // namespace, which is the leaf's own module.
        None => return body.to_string(),
    };

    let module = match xml::resolve_prefix(tree, id, Some(prefix)) {
        Some(namespace) => context.get_module_by_namespace(&namespace),
        None if context
            .options()
            .contains(ContextFlags::IDENTITYREF_KLUDGE) =>
        {
            let module = context.get_module(prefix);
            if module.is_some() {
                log::warn!(
                    "identityref prefix '{}' has no xmlns declaration; \
                     interpreting it as a module name (identityref-kludge \
                     is deprecated)",
                    prefix
                );
            }
            module
        }
        None => None,
    };
    let module = match module {
        Some(module) => module,
        None => {
            log::debug!(
                "cannot resolve identityref prefix '{}'; printing body \
                 verbatim",
                prefix
            );
            return body.to_string();
        }
    };

    let leaf_module = tree
        .node(id)
        .schema
        .map(|snode| tree.context.spec().node(snode).module());
    if leaf_module.map(|leaf| leaf == module).unwrap_or(false) {
        identity.to_string()
    } else {
        format!("{}:{}", module.name(), identity)
    }
}

// ===== decoding =====

/// Parse an RFC 7951 JSON document into an unbound data tree. Member
/// prefixes are interpreted as module names and translated to default
/// namespaces on the fly; schema binding and the identityref value pass
/// happen afterwards.
pub(crate) fn parse_string<'a>(
    context: &'a Context,
    data: &str,
) -> Result<DataTree<'a>> {
    let value: serde_json::Value =
        serde_json::from_str(data).map_err(|err| {
            Error::malformed_message(&format!(
                "line {} column {}: {}",
                err.line(),
                err.column(),
                err
            ))
        })?;
    let members = value.as_object().ok_or_else(|| {
        Error::malformed_message("top-level JSON value is not an object")
    })?;

    let mut tree = DataTree::new(context);
    for (name, value) in members {
        // RFC 7951 section 4: top-level members must be module-qualified.
        let (module_name, local) = name.split_once(':').ok_or_else(|| {
            Error::malformed_message(&format!(
                "top-level member '{}' lacks a module qualifier",
                name
            ))
        })?;
        let module = context
            .get_module(module_name)
            .ok_or_else(|| Error::unknown_module(module_name))?;
        let namespace = module.namespace();
        build_member(
            &mut tree,
            context,
            None,
            local,
            Some(namespace),
            namespace,
            value,
        )?;
    }
    Ok(tree)
}

/// Create the element(s) of one object member; an array member yields one
/// element per item.
fn build_member(
    tree: &mut DataTree<'_>,
    context: &Context,
    parent: Option<NodeId>,
    local: &str,
    new_namespace: Option<&str>,
    namespace: &str,
    value: &serde_json::Value,
) -> Result<()> {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                if item.is_array() {
                    return Err(Error::malformed_message(&format!(
                        "nested array in member '{}'",
                        local
                    )));
                }
                build_element(
                    tree,
                    context,
                    parent,
                    local,
                    new_namespace,
                    namespace,
                    item,
                )?;
            }
            Ok(())
        }
        _ => build_element(
            tree,
            context,
            parent,
            local,
            new_namespace,
            namespace,
            value,
        ),
    }
}

fn build_element(
    tree: &mut DataTree<'_>,
    context: &Context,
    parent: Option<NodeId>,
    local: &str,
    new_namespace: Option<&str>,
    namespace: &str,
    value: &serde_json::Value,
) -> Result<()> {
    let id = tree.add_element(parent, local, None);
    if let Some(new_namespace) = new_namespace {
        xml::set_default_namespace(tree, id, new_namespace);
    }

    match value {
        serde_json::Value::Null => (),
        serde_json::Value::Bool(body) => {
            tree.node_mut(id).body = Some(body.to_string());
        }
        serde_json::Value::Number(body) => {
            tree.node_mut(id).body = Some(body.to_string());
        }
        serde_json::Value::String(body) => {
            tree.node_mut(id).body = Some(body.clone());
        }
        serde_json::Value::Object(members) => {
            for (name, value) in members {
                match name.split_once(':') {
                    Some((module_name, local)) => {
                        let module = context
                            .get_module(module_name)
                            .ok_or_else(|| {
                                Error::unknown_module(module_name)
                            })?;
                        let child_namespace = module.namespace();
                        let crossing = if child_namespace != namespace {
                            Some(child_namespace)
                        } else {
                            None
                        };
                        build_member(
                            tree,
                            context,
                            Some(id),
                            local,
                            crossing,
                            child_namespace,
                            value,
                        )?;
                    }
                    None => {
                        build_member(
                            tree,
                            context,
                            Some(id),
                            name,
                            None,
                            namespace,
                            value,
                        )?;
                    }
                }
            }
        }
        serde_json::Value::Array(_) => {
            return Err(Error::malformed_message(&format!(
                "nested array in member '{}'",
                local
            )));
        }
    }
    Ok(())
}

/// Post-binding pass: rewrite `identityref` bodies from RFC 7951 module
/// qualification (`module:identity`) to XML prefix qualification, adding
/// the `xmlns` declaration carrying the identity's namespace.
pub(crate) fn decode_identityrefs(tree: &mut DataTree<'_>) -> Result<()> {
    let targets: Vec<(NodeId, String)> = tree
        .traverse()
        .filter_map(|dnode| {
            let snode = dnode.schema()?;
            let ltype = snode.leaf_type()?;
            if ltype.base_type() != DataValueType::IdentityRef {
                return None;
            }
            let body = dnode.value_canonical()?;
            Some((dnode.id(), body.to_string()))
        })
        .collect();

    for (id, body) in targets {
        let (module_name, identity) = match body.split_once(':') {
            Some(split) => split,
            // Unqualified: the identity belongs to the leaf's module and
            // needs no translation.
            None => continue,
        };
        match tree.context.get_module(module_name) {
            Some(module) => {
                let namespace = module.namespace().to_string();
                let preferred = module.prefix().to_string();
                let prefix = xml::ensure_prefixed_namespace(
                    tree, id, &namespace, &preferred,
                );
                tree.node_mut(id).body =
                    Some(format!("{}:{}", prefix, identity));
                tree.cache_value(id);
            }
            None if tree
                .context
                .options()
                .contains(ContextFlags::IDENTITYREF_KLUDGE) =>
            {
                log::warn!(
                    "identityref value '{}' names unknown module '{}'; \
                     keeping it verbatim (identityref-kludge is \
                     deprecated)",
                    body,
                    module_name
                );
            }
            None => {
                return Err(Error::invalid_identityref(&body));
            }
        }
    }
    Ok(())
}
