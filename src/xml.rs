//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! NETCONF-flavor XML: event-based parsing, printing and the namespace
//! translation primitives shared with the JSON codec.

use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::context::Context;
use crate::data::{Attribute, DataPrinterFlags, DataTree, NodeId};
use crate::error::{Error, Result};

// ===== parsing =====

/// Parse an XML document (or fragment with multiple top-level elements)
/// into an unbound data tree.
pub(crate) fn parse_string<'a>(
    context: &'a Context,
    data: &str,
) -> Result<DataTree<'a>> {
    let mut tree = DataTree::new(context);
    let mut reader = Reader::from_str(data);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<NodeId> = Vec::new();
    loop {
        let event = reader
            .read_event()
            .map_err(|err| syntax_error(data, reader.buffer_position(), &err))?;
        match event {
            Event::Start(start) => {
                let id = open_element(&mut tree, stack.last().copied(), &start)
                    .map_err(|err| at_position(data, &reader, err))?;
                stack.push(id);
            }
            Event::Empty(start) => {
                open_element(&mut tree, stack.last().copied(), &start)
                    .map_err(|err| at_position(data, &reader, err))?;
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|err| {
                    syntax_error(data, reader.buffer_position(), &err)
                })?;
                if let Some(id) = stack.last() {
                    if !text.chars().all(char::is_whitespace) {
                        append_body(&mut tree, *id, &text);
                    }
                }
            }
            Event::CData(cdata) => {
                if let Some(id) = stack.last() {
                    let inner =
                        String::from_utf8_lossy(cdata.as_ref()).into_owned();
                    append_body(
                        &mut tree,
                        *id,
                        &format!("<![CDATA[{}]]>", inner),
                    );
                }
            }
            Event::Eof => break,
            // Declarations, comments and processing instructions are
            // tolerated and skipped; they never reach the data model.
            _ => (),
        }
    }
    if !stack.is_empty() {
        return Err(Error::malformed_message("unexpected end of XML input"));
    }
    Ok(tree)
}

fn open_element(
    tree: &mut DataTree<'_>,
    parent: Option<NodeId>,
    start: &BytesStart<'_>,
) -> Result<NodeId> {
    let qname = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let (prefix, local) = split_qname(&qname);
    let id = tree.add_element(parent, local, prefix);
    for attr in start.attributes() {
        let attr: XmlAttribute<'_> = attr.map_err(|err| {
            Error::malformed_message(&format!("bad attribute: {}", err))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let (prefix, local) = split_qname(&key);
        let value = attr
            .unescape_value()
            .map_err(|err| {
                Error::malformed_message(&format!("bad attribute: {}", err))
            })?
            .into_owned();
        tree.node_mut(id).attrs.push(Attribute {
            prefix: prefix.map(|prefix| prefix.to_string()),
            name: local.to_string(),
            value,
        });
    }
    Ok(id)
}

fn append_body(tree: &mut DataTree<'_>, id: NodeId, text: &str) {
    match &mut tree.node_mut(id).body {
        Some(body) => body.push_str(text),
        body @ None => *body = Some(text.to_string()),
    }
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

fn syntax_error(
    data: &str,
    offset: u64,
    err: &dyn std::fmt::Display,
) -> Error {
    let (line, col) = line_col(data, offset as usize);
    Error::malformed_message(&format!(
        "line {} column {}: {}",
        line, col, err
    ))
}

fn at_position(data: &str, reader: &Reader<&[u8]>, mut err: Error) -> Error {
    let (line, col) = line_col(data, reader.buffer_position() as usize);
    err.msg = match err.msg.take() {
        Some(msg) => Some(format!("line {} column {}: {}", line, col, msg)),
        None => Some(format!("line {} column {}", line, col)),
    };
    err
}

fn line_col(data: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(data.len());
    let before = &data[..offset];
    let line = before.bytes().filter(|byte| *byte == b'\n').count() + 1;
    let col = before
        .rfind('\n')
        .map(|pos| offset - pos)
        .unwrap_or(offset + 1);
    (line, col)
}

// ===== printing =====

pub(crate) fn print_string(
    tree: &DataTree<'_>,
    roots: &[NodeId],
    options: DataPrinterFlags,
) -> String {
    let pretty = !options.contains(DataPrinterFlags::SHRINK);
    let mut out = String::new();
    for root in roots {
        print_node(&mut out, tree, *root, 0, pretty, options);
    }
    out
}

fn print_node(
    out: &mut String,
    tree: &DataTree<'_>,
    id: NodeId,
    level: usize,
    pretty: bool,
    options: DataPrinterFlags,
) {
    let node = tree.node(id);
    if node.default && options.contains(DataPrinterFlags::WD_TRIM) {
        return;
    }
    let indent = tree.context.indent_width();
    let qname = match &node.prefix {
        Some(prefix) => format!("{}:{}", prefix, node.name),
        None => node.name.clone(),
    };

    if pretty {
        out.push_str(&" ".repeat(level * indent));
    }
    out.push('<');
    out.push_str(&qname);
    for attr in &node.attrs {
        out.push(' ');
        if let Some(prefix) = &attr.prefix {
            out.push_str(prefix);
            out.push(':');
        }
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&quick_xml::escape::escape(attr.value.as_str()));
        out.push('"');
    }

    let printable: Vec<NodeId> = node
        .children
        .iter()
        .copied()
        .filter(|child| {
            !(tree.node(*child).default
                && options.contains(DataPrinterFlags::WD_TRIM))
        })
        .collect();

    match (&node.body, printable.is_empty()) {
        (None, true) => out.push_str("/>"),
        (Some(body), true) => {
            out.push('>');
            print_body(out, body);
            out.push_str("</");
            out.push_str(&qname);
            out.push('>');
        }
        (body, false) => {
            out.push('>');
            if let Some(body) = body {
                print_body(out, body);
            }
            if pretty {
                out.push('\n');
            }
            for child in printable {
                print_node(out, tree, child, level + 1, pretty, options);
            }
            if pretty {
                out.push_str(&" ".repeat(level * indent));
            }
            out.push_str("</");
            out.push_str(&qname);
            out.push('>');
        }
    }
    if pretty {
        out.push('\n');
    }
}

/// Escape a body for XML output, leaving CDATA sections untouched.
fn print_body(out: &mut String, body: &str) {
    let mut rest = body;
    while let Some(start) = rest.find("<![CDATA[") {
        out.push_str(&quick_xml::escape::partial_escape(&rest[..start]));
        let after = &rest[start..];
        match after.find("]]>") {
            Some(end) => {
                out.push_str(&after[..end + 3]);
                rest = &after[end + 3..];
            }
            None => {
                // Unterminated section: escape it like regular text.
                out.push_str(&quick_xml::escape::partial_escape(after));
                return;
            }
        }
    }
    out.push_str(&quick_xml::escape::partial_escape(rest));
}

/// Strip CDATA wrappers from a body, as required by the JSON encoder.
pub(crate) fn unwrap_cdata(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(start) = rest.find("<![CDATA[") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 9..];
        match after.find("]]>") {
            Some(end) => {
                out.push_str(&after[..end]);
                rest = &after[end + 3..];
            }
            None => {
                out.push_str(after);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

// ===== namespace translation =====

/// Resolve a prefix (or the default namespace when absent) into a
/// namespace URI by walking the element and its ancestors.
pub(crate) fn resolve_prefix(
    tree: &DataTree<'_>,
    id: NodeId,
    prefix: Option<&str>,
) -> Option<String> {
    let mut current = Some(id);
    while let Some(id) = current {
        let node = tree.node(id);
        for attr in &node.attrs {
            let matched = match prefix {
                Some(prefix) => {
                    attr.prefix.as_deref() == Some("xmlns")
                        && attr.name == prefix
                }
                None => attr.prefix.is_none() && attr.name == "xmlns",
            };
            if matched {
                return Some(attr.value.clone());
            }
        }
        current = node.parent;
    }
    None
}

/// Effective namespace URI of an element: its own prefix (or the default
/// namespace) resolved against the inherited context.
pub(crate) fn effective_namespace(
    tree: &DataTree<'_>,
    id: NodeId,
) -> Option<String> {
    let prefix = tree.node(id).prefix.clone();
    resolve_prefix(tree, id, prefix.as_deref())
}

/// Make the element carry the given default namespace: a no-op when it is
/// already in effect, otherwise the local `xmlns` attribute is injected or
/// rewritten.
pub(crate) fn set_default_namespace(
    tree: &mut DataTree<'_>,
    id: NodeId,
    uri: &str,
) {
    if tree.node(id).prefix.is_none()
        && resolve_prefix(tree, id, None).as_deref() == Some(uri)
    {
        return;
    }
    tree.node_mut(id).prefix = None;
    let attrs = &mut tree.node_mut(id).attrs;
    match attrs
        .iter_mut()
        .find(|attr| attr.prefix.is_none() && attr.name == "xmlns")
    {
        Some(attr) => attr.value = uri.to_string(),
        None => attrs.insert(
            0,
            Attribute {
                prefix: None,
                name: "xmlns".to_string(),
                value: uri.to_string(),
            },
        ),
    }
}

/// Find a prefix bound to the given namespace URI in the scope of the
/// element, injecting an `xmlns:<preferred>` declaration when none exists.
/// Returns the usable prefix.
pub(crate) fn ensure_prefixed_namespace(
    tree: &mut DataTree<'_>,
    id: NodeId,
    uri: &str,
    preferred: &str,
) -> String {
    // Nearest declaration wins; shadowed prefixes are skipped.
    let mut seen: Vec<String> = Vec::new();
    let mut current = Some(id);
    while let Some(cid) = current {
        let node = tree.node(cid);
        for attr in &node.attrs {
            if attr.prefix.as_deref() != Some("xmlns") {
                continue;
            }
            if seen.iter().any(|name| *name == attr.name) {
                continue;
            }
            seen.push(attr.name.clone());
            if attr.value == uri {
                return attr.name.clone();
            }
        }
        current = node.parent;
    }

    // Synthesize a declaration, steering clear of taken prefixes.
    let mut prefix = preferred.to_string();
    let mut counter = 1;
    while seen.iter().any(|name| *name == prefix) {
        prefix = format!("{}{}", preferred, counter);
        counter += 1;
    }
    tree.node_mut(id).attrs.push(Attribute {
        prefix: Some("xmlns".to_string()),
        name: prefix.clone(),
        value: uri.to_string(),
    });
    prefix
}
