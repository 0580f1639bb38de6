//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG instance data.
//!
//! A [`DataTree`] owns an arena of XML-shaped nodes bound to the schema of
//! its [`Context`]. Node handles ([`NodeId`]) are generational indices;
//! [`DataNodeRef`] pairs a handle with a borrow of the tree for navigation.

use bitflags::bitflags;
use generational_arena::Arena;

use crate::context::{Context, ContextFlags};
use crate::error::{Error, ErrorTag, ErrorType, Result};
use crate::iter::{Ancestors, NodeIterable, Siblings, Traverse, WalkAction};
use crate::schema::{
    DataValue, SchemaModule, SchemaNode, SchemaNodeId, SchemaNodeKind,
};
use crate::sort::SearchKey;
use crate::{json, sort, xml};

/// Handle to a node inside a [`DataTree`] arena.
pub type NodeId = generational_arena::Index;

/// YANG data tree.
#[derive(Debug)]
pub struct DataTree<'a> {
    pub(crate) context: &'a Context,
    pub(crate) arena: Arena<NodeData>,
    pub(crate) roots: Vec<NodeId>,
    op: DataOperation,
}

/// YANG data node reference.
#[derive(Clone, Debug)]
pub struct DataNodeRef<'a> {
    tree: &'a DataTree<'a>,
    id: NodeId,
}

/// XML attribute of an element, `xmlns` declarations included. Attributes
/// never participate in ordering or keying.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    pub prefix: Option<String>,
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug)]
pub(crate) struct NodeData {
    pub(crate) name: String,
    pub(crate) prefix: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) attrs: Vec<Attribute>,
    pub(crate) body: Option<String>,
    pub(crate) schema: Option<SchemaNodeId>,
    pub(crate) cached: Option<DataValue>,
    pub(crate) default: bool,
}

/// YANG data tree diff: the operations turning one tree into another.
#[derive(Debug, Default)]
pub struct DataDiff {
    ops: Vec<DataDiffEntry>,
}

/// A single data change.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DataDiffEntry {
    pub op: DataDiffOp,
    pub path: String,
    pub value: Option<String>,
}

/// YANG data diff operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataDiffOp {
    Create,
    Delete,
    Replace,
}

/// Data input/output formats.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataFormat {
    /// XML instance data format (NETCONF flavor).
    XML,
    /// JSON instance data format (RFC 7951).
    JSON,
}

/// Data operation type, selecting the RPC binding direction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataOperation {
    /// Generic YANG instance data.
    Data,
    /// Instance of a YANG RPC request; children bind to `input`.
    RpcYang,
    /// Instance of a YANG RPC reply; children bind to `output`.
    ReplyYang,
    /// Instance of a YANG notification.
    NotificationYang,
}

bitflags! {
    /// Data parser options.
    ///
    /// Default parser behavior:
    /// - the complete input buffer is parsed; multiple top-level elements
    ///   are accepted.
    /// - data without a matching schema node definition is kept unbound
    ///   and silently ignored by the ordering machinery.
    /// - the parsed tree is sorted and validated.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct DataParserFlags: u32 {
        /// Data will be only parsed and no validation will be performed.
        const NO_VALIDATION = 0x01;
        /// Instead of silently keeping data without schema definition
        /// unbound, raise an error.
        const STRICT = 0x02;
        /// Forbid state data in the parsed data.
        const NO_STATE = 0x04;
    }
}

bitflags! {
    /// Data validation options.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct DataValidationFlags: u32 {
        /// Consider state data not allowed and raise an error if found.
        const NO_STATE = 0x01;
        /// Check mandatory top-level nodes only in modules whose data
        /// actually exist in the tree.
        const PRESENT = 0x02;
    }
}

bitflags! {
    /// Data printer flags.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct DataPrinterFlags: u32 {
        /// Flag for printing also the (following) sibling nodes of the
        /// data node.
        const WITH_SIBLINGS = 0x01;
        /// Flag for output without indentation and formatting new lines.
        const SHRINK = 0x02;
        /// Trim mode: avoid printing nodes created as implicit defaults.
        const WD_TRIM = 0x04;
    }
}

bitflags! {
    /// Implicit node creation options.
    ///
    /// Default behavior: missing default-valued leaves are created in both
    /// configuration and state subtrees; for RPC instances, `input`
    /// defaults are added.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct DataImplicitFlags: u32 {
        /// Do not add any implicit state nodes.
        const NO_STATE = 0x01;
        /// Do not add any implicit config nodes.
        const NO_CONFIG = 0x02;
        /// For RPC nodes, add output implicit nodes instead of input.
        const OUTPUT = 0x04;
    }
}

bitflags! {
    /// Data diff options.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct DataDiffFlags: u16 {
        /// Nodes created as implicit defaults are not ignored but treated
        /// similarly to explicit nodes.
        const DEFAULTS = 0x01;
    }
}

/// Methods common to data trees and data node references.
pub trait Data<'a> {
    #[doc(hidden)]
    fn tree(&self) -> &DataTree<'a>;

    #[doc(hidden)]
    fn print_roots(&self, options: DataPrinterFlags) -> Vec<NodeId>;

    #[doc(hidden)]
    fn context(&self) -> &'a Context {
        self.tree().context
    }

    /// Print data in the specified format to a `String`.
    fn print_string(
        &self,
        format: DataFormat,
        options: DataPrinterFlags,
    ) -> Result<String> {
        let roots = self.print_roots(options);
        match format {
            DataFormat::XML => {
                Ok(xml::print_string(self.tree(), &roots, options))
            }
            DataFormat::JSON => {
                json::print_string(self.tree(), &roots, options)
            }
        }
    }

    /// Print data in the specified format to the given writer.
    fn print_file<W: std::io::Write>(
        &self,
        mut file: W,
        format: DataFormat,
        options: DataPrinterFlags,
    ) -> Result<()> {
        let output = self.print_string(format, options)?;
        file.write_all(output.as_bytes()).map_err(|err| Error {
            etype: ErrorType::Application,
            tag: ErrorTag::OperationFailed,
            msg: Some(err.to_string()),
            ..Default::default()
        })
    }
}

// ===== impl DataTree =====

impl<'a> DataTree<'a> {
    /// Create new empty data tree.
    pub fn new(context: &'a Context) -> DataTree<'a> {
        DataTree {
            context,
            arena: Arena::new(),
            roots: Vec::new(),
            op: DataOperation::Data,
        }
    }

    /// Parse (and, unless disabled, sort and validate) input data as a
    /// YANG data tree.
    pub fn parse_string(
        context: &'a Context,
        data: &str,
        format: DataFormat,
        parser_options: DataParserFlags,
        validation_options: DataValidationFlags,
    ) -> Result<DataTree<'a>> {
        Self::parse_op(
            context,
            data,
            format,
            parser_options,
            validation_options,
            DataOperation::Data,
            None,
        )
    }

    /// Parse (and, unless disabled, sort and validate) input data read
    /// from a file or any other reader. This is the only entry point that
    /// may block on I/O.
    pub fn parse_file<F: std::io::Read>(
        context: &'a Context,
        mut file: F,
        format: DataFormat,
        parser_options: DataParserFlags,
        validation_options: DataValidationFlags,
    ) -> Result<DataTree<'a>> {
        let mut data = String::new();
        file.read_to_string(&mut data).map_err(|err| Error {
            msg: Some(err.to_string()),
            ..Default::default()
        })?;
        Self::parse_string(
            context,
            &data,
            format,
            parser_options,
            validation_options,
        )
    }

    /// Parse input data into an operation (RPC, reply or notification)
    /// data tree. The operation node itself is the top-level element.
    pub fn parse_op_string(
        context: &'a Context,
        data: &str,
        format: DataFormat,
        op: DataOperation,
    ) -> Result<DataTree<'a>> {
        Self::parse_op(
            context,
            data,
            format,
            DataParserFlags::STRICT,
            DataValidationFlags::empty(),
            op,
            None,
        )
    }

    /// Parse the `input` (or, for [`DataOperation::ReplyYang`], the
    /// `output`) portion of the given RPC, as used by RESTCONF operation
    /// resources: the top-level member names the direction, e.g.
    /// `{"module:input":{...}}`.
    pub fn parse_rpc_string(
        context: &'a Context,
        rpc: &SchemaNode<'_>,
        data: &str,
        format: DataFormat,
        op: DataOperation,
    ) -> Result<DataTree<'a>> {
        if rpc.kind() != SchemaNodeKind::Rpc {
            return Err(Error::other("schema node is not an rpc"));
        }
        Self::parse_op(
            context,
            data,
            format,
            DataParserFlags::STRICT,
            DataValidationFlags::empty(),
            op,
            Some(rpc.id()),
        )
    }

    fn parse_op(
        context: &'a Context,
        data: &str,
        format: DataFormat,
        parser_options: DataParserFlags,
        validation_options: DataValidationFlags,
        op: DataOperation,
        rpc: Option<SchemaNodeId>,
    ) -> Result<DataTree<'a>> {
        let mut tree = match format {
            DataFormat::XML => xml::parse_string(context, data)?,
            DataFormat::JSON => json::parse_string(context, data)?,
        };
        tree.op = op;
        tree.bind(parser_options, rpc)?;
        if format == DataFormat::JSON {
            json::decode_identityrefs(&mut tree)?;
        }
        tree.sort();
        if !parser_options.contains(DataParserFlags::NO_VALIDATION) {
            tree.validate(validation_options)?;
        }
        Ok(tree)
    }

    /// Returns a reference to the first top-level data node, unless the
    /// data tree is empty.
    pub fn reference(&self) -> Option<DataNodeRef<'_>> {
        self.roots
            .first()
            .map(|id| DataNodeRef { tree: self, id: *id })
    }

    /// Returns a reference to the given node.
    pub fn get(&self, id: NodeId) -> Option<DataNodeRef<'_>> {
        self.arena
            .get(id)
            .map(|_| DataNodeRef { tree: self, id })
    }

    /// Returns an iterator over all elements in the data tree and its
    /// sibling trees (depth-first search algorithm).
    pub fn traverse(&self) -> impl Iterator<Item = DataNodeRef<'_>> {
        self.roots
            .clone()
            .into_iter()
            .flat_map(move |id| Traverse::new(DataNodeRef { tree: self, id }))
    }

    /// Walk the tree with an explicit visitor. The visitor receives each
    /// node with its depth and steers the walk; returns `false` when the
    /// walk was aborted with [`WalkAction::Stop`].
    pub fn apply<F>(&self, f: &mut F) -> bool
    where
        F: FnMut(DataNodeRef<'_>, usize) -> WalkAction,
    {
        for id in &self.roots {
            if !self.apply_node(*id, 0, f) {
                return false;
            }
        }
        true
    }

    fn apply_node<F>(&self, id: NodeId, depth: usize, f: &mut F) -> bool
    where
        F: FnMut(DataNodeRef<'_>, usize) -> WalkAction,
    {
        match f(DataNodeRef { tree: self, id }, depth) {
            WalkAction::Stop => return false,
            WalkAction::SkipSubtree => return true,
            WalkAction::Continue => (),
        }
        for child in self.node(id).children.clone() {
            if !self.apply_node(child, depth + 1, f) {
                return false;
            }
        }
        true
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.arena[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.arena[id]
    }

    /// Append a new, unbound element node. Used by the parsers; schema
    /// binding happens in a separate pass.
    pub(crate) fn add_element(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        prefix: Option<&str>,
    ) -> NodeId {
        let id = self.arena.insert(NodeData {
            name: name.to_string(),
            prefix: prefix.map(|prefix| prefix.to_string()),
            parent,
            children: Vec::new(),
            attrs: Vec::new(),
            body: None,
            schema: None,
            cached: None,
            default: false,
        });
        match parent {
            Some(parent) => self.arena[parent].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Detach a node from its parent (or the root list) without freeing
    /// it. The caller is responsible for reattaching or freeing.
    pub(crate) fn unlink(&mut self, id: NodeId) {
        match self.node(id).parent {
            Some(parent) => {
                let children = &mut self.arena[parent].children;
                children.retain(|child| *child != id);
            }
            None => self.roots.retain(|root| *root != id),
        }
        self.arena[id].parent = None;
    }

    fn free_subtree(&mut self, id: NodeId) {
        for child in self.node(id).children.clone() {
            self.free_subtree(child);
        }
        self.arena.remove(id);
    }

    /// Remove a data node and its subtree.
    pub fn remove(&mut self, id: NodeId) {
        self.unlink(id);
        self.free_subtree(id);
    }

    // ===== schema binding =====

    /// Bind every element of the tree to its governing schema statement.
    fn bind(
        &mut self,
        options: DataParserFlags,
        rpc: Option<SchemaNodeId>,
    ) -> Result<()> {
        for id in self.roots.clone() {
            self.bind_node(id, options, rpc)?;
        }
        Ok(())
    }

    fn bind_node(
        &mut self,
        id: NodeId,
        options: DataParserFlags,
        rpc: Option<SchemaNodeId>,
    ) -> Result<()> {
        let strict = options.contains(DataParserFlags::STRICT);
        let snode = self.resolve_schema(id, rpc, strict)?;
        if let Some(snode) = snode {
            let stmt = self.context.spec().node(snode);
            if stmt.is_state()
                && options.contains(DataParserFlags::NO_STATE)
            {
                return Err(Error {
                    tag: ErrorTag::InvalidValue,
                    msg: Some(format!(
                        "state data node '{}' is not allowed",
                        self.node(id).name
                    )),
                    ..Default::default()
                });
            }
            self.node_mut(id).schema = Some(snode);
            self.cache_value(id);
        } else if strict {
            return Err(Error::unknown_element(&self.node(id).name));
        } else {
            log::debug!(
                "no YANG spec for element '{}'; keeping unbound",
                self.node(id).name
            );
        }
        for child in self.node(id).children.clone() {
            self.bind_node(child, options, None)?;
        }
        Ok(())
    }

    /// Resolve the schema statement governing a node (spec resolver). An
    /// `Err` is only possible in strict mode; otherwise unresolved nodes
    /// yield `Ok(None)`.
    fn resolve_schema(
        &self,
        id: NodeId,
        rpc: Option<SchemaNodeId>,
        strict: bool,
    ) -> Result<Option<SchemaNodeId>> {
        let spec = self.context.spec();
        let node = self.node(id);
        let output = self.op == DataOperation::ReplyYang;

        // RESTCONF-style operation parsing: the top-level element names the
        // direction of an externally selected RPC.
        if let Some(rpc) = rpc {
            let rpc = spec.node(rpc);
            let direction =
                if output { rpc.output() } else { rpc.input() };
            return match direction {
                Some(direction) if node.name == direction.name() => {
                    Ok(Some(direction.id()))
                }
                _ => Err(Error::unknown_element(&node.name)),
            };
        }

        match node.parent {
            Some(parent) => {
                let pstmt = match self.node(parent).schema {
                    Some(pstmt) => spec.node(pstmt),
                    None => return Ok(None),
                };
                let found = match pstmt.kind() {
                    // RPC re-entry: resolution continues inside the
                    // direction sub-statement.
                    SchemaNodeKind::Rpc => {
                        let direction = if output {
                            pstmt.output()
                        } else {
                            pstmt.input()
                        };
                        direction.and_then(|direction| {
                            direction.find_data_child(&node.name)
                        })
                    }
                    SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => None,
                    _ => pstmt.find_data_child(&node.name),
                };
                Ok(found.map(|snode| snode.id()))
            }
            None => {
                match xml::effective_namespace(self, id) {
                    Some(namespace) => {
                        match spec.get_module_by_namespace(&namespace) {
                            Some(module) => Ok(module
                                .find_top(&node.name)
                                .map(|snode| snode.id())),
                            None if self
                                .context
                                .options()
                                .contains(ContextFlags::NS_NONSTRICT) =>
                            {
                                Ok(spec
                                    .find_top_by_name(&node.name)
                                    .map(|snode| snode.id()))
                            }
                            None if strict => {
                                Err(Error::unknown_namespace(&namespace))
                            }
                            None => Ok(None),
                        }
                    }
                    None if self
                        .context
                        .options()
                        .contains(ContextFlags::NS_NONSTRICT) =>
                    {
                        Ok(spec
                            .find_top_by_name(&node.name)
                            .map(|snode| snode.id()))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    /// Refresh the cached typed value of a bound leaf from its body.
    pub(crate) fn cache_value(&mut self, id: NodeId) {
        let node = self.node(id);
        let cached = match node.schema.map(|s| self.context.spec().node(s)) {
            Some(snode)
                if matches!(
                    snode.kind(),
                    SchemaNodeKind::Leaf | SchemaNodeKind::LeafList
                ) =>
            {
                snode.leaf_type().and_then(|ltype| {
                    let body = node.body.as_deref().unwrap_or("");
                    DataValue::parse(body, &ltype).ok()
                })
            }
            _ => None,
        };
        self.node_mut(id).cached = cached;
    }

    // ===== editing =====

    fn resolve_new_child(
        &self,
        parent: Option<NodeId>,
        module: Option<&SchemaModule<'_>>,
        name: &str,
    ) -> Result<SchemaNodeId> {
        let spec = self.context.spec();
        let output = self.op == DataOperation::ReplyYang;
        let found = match parent {
            Some(parent) => {
                let pstmt = self
                    .node(parent)
                    .schema
                    .map(|pstmt| spec.node(pstmt))
                    .ok_or_else(|| {
                        Error::other("cannot create child of unbound node")
                    })?;
                match pstmt.kind() {
                    SchemaNodeKind::Rpc => {
                        let direction = if output {
                            pstmt.output()
                        } else {
                            pstmt.input()
                        };
                        direction
                            .and_then(|direction| {
                                direction.find_data_child(name)
                            })
                    }
                    _ => pstmt.find_data_child(name),
                }
            }
            None => {
                let module = module.ok_or_else(|| {
                    Error::other(
                        "a module is required to create top-level nodes",
                    )
                })?;
                module.find_top(name)
            }
        };
        found.map(|snode| snode.id()).ok_or_else(|| {
            Error::unknown_element(name)
        })
    }

    fn insert_bound(
        &mut self,
        parent: Option<NodeId>,
        snode: SchemaNodeId,
        name: &str,
    ) -> NodeId {
        let id = self.arena.insert(NodeData {
            name: name.to_string(),
            prefix: None,
            parent,
            children: Vec::new(),
            attrs: Vec::new(),
            body: None,
            schema: Some(snode),
            cached: None,
            default: false,
        });

        // Make the element carry its module namespace when it starts a new
        // namespace scope (top level or module crossing).
        let spec = self.context.spec();
        let module = spec.node(snode).module();
        let crossing = match parent {
            None => true,
            Some(parent) => match self.node(parent).schema {
                Some(pstmt) => spec.node(pstmt).module() != module,
                None => true,
            },
        };
        if crossing {
            xml::set_default_namespace(self, id, module.namespace());
        }

        let position = sort::insert_position(self, parent, id);
        self.node_mut(id).parent = parent;
        match parent {
            Some(parent) => {
                self.arena[parent].children.insert(position, id)
            }
            None => self.roots.insert(position, id),
        }
        id
    }

    /// Create a new inner node (container, RPC or notification) in the
    /// data tree, inserted at its canonical position.
    ///
    /// Returns the created node.
    pub fn new_inner(
        &mut self,
        parent: Option<NodeId>,
        module: Option<&SchemaModule<'_>>,
        name: &str,
    ) -> Result<NodeId> {
        let snode = self.resolve_new_child(parent, module, name)?;
        match self.context.spec().node(snode).kind() {
            SchemaNodeKind::Container
            | SchemaNodeKind::Rpc
            | SchemaNodeKind::Notification
            | SchemaNodeKind::Input
            | SchemaNodeKind::Output => (),
            kind => {
                return Err(Error::other(&format!(
                    "'{}' is not an inner node ({:?})",
                    name, kind
                )));
            }
        }
        Ok(self.insert_bound(parent, snode, name))
    }

    /// Create a new list node in the data tree, key leaves included. The
    /// `keys` parameter carries the key values in declared key order.
    ///
    /// Returns the created node.
    pub fn new_list(
        &mut self,
        parent: Option<NodeId>,
        module: Option<&SchemaModule<'_>>,
        name: &str,
        keys: &[&str],
    ) -> Result<NodeId> {
        let snode_id = self.resolve_new_child(parent, module, name)?;
        let snode = self.context.spec().node(snode_id);
        if snode.kind() != SchemaNodeKind::List {
            return Err(Error::other(&format!("'{}' is not a list", name)));
        }
        if snode.list_key_count() != keys.len() {
            return Err(Error::other(&format!(
                "list '{}' takes {} key(s), {} given",
                name,
                snode.list_key_count(),
                keys.len()
            )));
        }
        let key_names: Vec<String> =
            snode.list_keys().map(|key| key.to_string()).collect();

        // Key leaves must exist before the list instance is positioned.
        let id = self.arena.insert(NodeData {
            name: name.to_string(),
            prefix: None,
            parent: None,
            children: Vec::new(),
            attrs: Vec::new(),
            body: None,
            schema: Some(snode_id),
            cached: None,
            default: false,
        });
        for (key_name, key_value) in key_names.iter().zip(keys.iter()) {
            let key_snode = self
                .context
                .spec()
                .node(snode_id)
                .find_data_child(key_name)
                .expect("list keys are checked by the schema builder");
            let key_id = self.arena.insert(NodeData {
                name: key_name.clone(),
                prefix: None,
                parent: Some(id),
                children: Vec::new(),
                attrs: Vec::new(),
                body: Some(key_value.to_string()),
                schema: Some(key_snode.id()),
                cached: None,
                default: false,
            });
            self.cache_value(key_id);
            self.arena[id].children.push(key_id);
        }

        let position = sort::insert_position(self, parent, id);
        self.node_mut(id).parent = parent;
        match parent {
            Some(parent) => {
                self.arena[parent].children.insert(position, id)
            }
            None => self.roots.insert(position, id),
        }
        Ok(id)
    }

    /// Create a new term node (leaf or leaf-list entry) in the data tree,
    /// inserted at its canonical position.
    pub fn new_term(
        &mut self,
        parent: Option<NodeId>,
        module: Option<&SchemaModule<'_>>,
        name: &str,
        value: Option<&str>,
    ) -> Result<NodeId> {
        let snode_id = self.resolve_new_child(parent, module, name)?;
        let snode = self.context.spec().node(snode_id);
        match snode.kind() {
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => (),
            kind => {
                return Err(Error::other(&format!(
                    "'{}' is not a leaf or leaf-list ({:?})",
                    name, kind
                )));
            }
        }
        if let (Some(value), Some(ltype)) = (value, snode.leaf_type()) {
            DataValue::parse_or_error(value, &ltype, name)?;
        }

        // An existing leaf instance is updated in place.
        if snode.kind() == SchemaNodeKind::Leaf {
            let siblings = match parent {
                Some(parent) => &self.node(parent).children,
                None => &self.roots,
            };
            if let Some(existing) = siblings
                .iter()
                .copied()
                .find(|sibling| self.node(*sibling).schema == Some(snode_id))
            {
                let node = self.node_mut(existing);
                node.body = value.map(|value| value.to_string());
                node.default = false;
                self.cache_value(existing);
                return Ok(existing);
            }
        }

        let id = self.arena.insert(NodeData {
            name: name.to_string(),
            prefix: None,
            parent: None,
            children: Vec::new(),
            attrs: Vec::new(),
            body: value.map(|value| value.to_string()),
            schema: Some(snode_id),
            cached: None,
            default: false,
        });
        self.cache_value(id);
        let position = sort::insert_position(self, parent, id);
        self.node_mut(id).parent = parent;
        match parent {
            Some(parent) => {
                self.arena[parent].children.insert(position, id)
            }
            None => self.roots.insert(position, id),
        }
        Ok(id)
    }

    // ===== validation =====

    /// Fully validate the data tree against its schema.
    pub fn validate(&self, options: DataValidationFlags) -> Result<()> {
        // Top-level mandatory checks apply to plain data trees only;
        // operation trees hold a single operation node.
        if self.op == DataOperation::Data {
            self.validate_top(options)?;
        }
        for dnode in self.traverse() {
            self.validate_node(dnode.id, options)?;
        }
        Ok(())
    }

    fn validate_top(&self, options: DataValidationFlags) -> Result<()> {
        for module in self.context.modules() {
            if options.contains(DataValidationFlags::PRESENT)
                && !self.roots.iter().any(|root| {
                    self.node(*root)
                        .schema
                        .map(|snode| {
                            self.context.spec().node(snode).module() == module
                        })
                        .unwrap_or(false)
                })
            {
                continue;
            }
            let scope: Vec<SchemaNode<'_>> = module.data().collect();
            self.check_mandatory(&scope, &self.roots)?;
        }
        Ok(())
    }

    fn validate_node(
        &self,
        id: NodeId,
        options: DataValidationFlags,
    ) -> Result<()> {
        let node = self.node(id);
        let snode = match node.schema {
            Some(snode) => self.context.spec().node(snode),
            None => return Ok(()),
        };

        if snode.is_state()
            && options.contains(DataValidationFlags::NO_STATE)
        {
            return Err(Error {
                tag: ErrorTag::InvalidValue,
                msg: Some(format!(
                    "state data node '{}' is not allowed",
                    node.name
                )),
                ..Default::default()
            });
        }

        match snode.kind() {
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                if let Some(ltype) = snode.leaf_type() {
                    let body = node.body.as_deref().unwrap_or("");
                    DataValue::parse_or_error(
                        body,
                        &ltype,
                        &self.path_of(id),
                    )?;
                }
            }
            SchemaNodeKind::List => {
                // All declared keys must be present and non-empty.
                for key in snode.list_keys() {
                    let present = node.children.iter().any(|child| {
                        let child = self.node(*child);
                        child.name == key
                            && child
                                .body
                                .as_deref()
                                .map(|body| !body.is_empty())
                                .unwrap_or(false)
                    });
                    if !present {
                        return Err(Error::missing_element(
                            key,
                            "Mandatory variable",
                        ));
                    }
                }
                self.validate_children(id, &snode)?;
            }
            SchemaNodeKind::Container
            | SchemaNodeKind::Input
            | SchemaNodeKind::Output
            | SchemaNodeKind::Notification => {
                self.validate_children(id, &snode)?;
            }
            SchemaNodeKind::Rpc => {
                let direction = if self.op == DataOperation::ReplyYang {
                    snode.output()
                } else {
                    snode.input()
                };
                if let Some(direction) = direction {
                    self.validate_children(id, &direction)?;
                }
            }
            SchemaNodeKind::Choice | SchemaNodeKind::Case => (),
        }
        Ok(())
    }

    fn validate_children(
        &self,
        id: NodeId,
        scope: &SchemaNode<'_>,
    ) -> Result<()> {
        let children: Vec<SchemaNode<'_>> = scope.children().collect();
        self.check_mandatory(&children, &self.node(id).children)?;
        self.check_duplicates(&self.node(id).children)
    }

    /// Check the mandatory leaves and choices of a statement scope against
    /// the instance children.
    fn check_mandatory(
        &self,
        scope: &[SchemaNode<'_>],
        instances: &[NodeId],
    ) -> Result<()> {
        for snode in scope {
            match snode.kind() {
                SchemaNodeKind::Leaf if snode.is_mandatory() => {
                    if !self.has_instance_of(instances, snode) {
                        return Err(Error::missing_element(
                            snode.name(),
                            "Mandatory variable",
                        ));
                    }
                }
                SchemaNodeKind::Choice => {
                    let legs = snode.data_children();
                    let selected = legs
                        .iter()
                        .find(|leg| self.has_instance_of(instances, leg))
                        .and_then(|leg| leg.parent());
                    match selected {
                        // Mandatory statements inside a case apply only
                        // when that case is selected.
                        Some(case) => {
                            let scope: Vec<SchemaNode<'_>> =
                                case.children().collect();
                            self.check_mandatory(&scope, instances)?;
                        }
                        None if snode.is_mandatory() => {
                            return Err(Error::missing_choice(snode.name()));
                        }
                        None => (),
                    }
                }
                SchemaNodeKind::Case => (),
                _ => (),
            }
        }
        Ok(())
    }

    fn has_instance_of(
        &self,
        instances: &[NodeId],
        snode: &SchemaNode<'_>,
    ) -> bool {
        instances.iter().any(|id| {
            self.node(*id).schema == Some(snode.id())
        })
    }

    /// Duplicate list instances and leaf-list entries.
    fn check_duplicates(&self, children: &[NodeId]) -> Result<()> {
        use std::collections::{HashMap, HashSet};

        let mut seen: HashMap<SchemaNodeId, HashSet<Vec<String>>> =
            HashMap::new();
        for id in children {
            let node = self.node(*id);
            let snode = match node.schema {
                Some(snode) => self.context.spec().node(snode),
                None => continue,
            };
            let tuple = match snode.kind() {
                SchemaNodeKind::List => snode
                    .list_keys()
                    .map(|key| {
                        node.children
                            .iter()
                            .map(|child| self.node(*child))
                            .find(|child| child.name == key)
                            .and_then(|child| child.body.clone())
                            .unwrap_or_default()
                    })
                    .collect::<Vec<_>>(),
                SchemaNodeKind::LeafList => {
                    vec![node.body.clone().unwrap_or_default()]
                }
                _ => continue,
            };
            if !seen.entry(snode.id()).or_default().insert(tuple) {
                return Err(Error {
                    tag: ErrorTag::DataExists,
                    msg: Some(format!(
                        "duplicate entry for '{}'",
                        node.name
                    )),
                    ..Default::default()
                });
            }
        }
        Ok(())
    }

    // ===== implicit nodes =====

    /// Add any missing default-valued leaves declared by the schema.
    pub fn add_implicit(
        &mut self,
        options: DataImplicitFlags,
    ) -> Result<()> {
        let mut pending: Vec<NodeId> = self.traverse().map(|n| n.id).collect();
        for id in pending.drain(..) {
            self.add_implicit_node(id, options)?;
        }
        Ok(())
    }

    fn add_implicit_node(
        &mut self,
        id: NodeId,
        options: DataImplicitFlags,
    ) -> Result<()> {
        let spec = self.context.spec();
        let snode = match self.node(id).schema {
            Some(snode) => spec.node(snode),
            None => return Ok(()),
        };
        let output = options.contains(DataImplicitFlags::OUTPUT)
            || self.op == DataOperation::ReplyYang;
        let scope = match snode.kind() {
            SchemaNodeKind::Rpc => {
                match if output { snode.output() } else { snode.input() } {
                    Some(direction) => direction,
                    None => return Ok(()),
                }
            }
            SchemaNodeKind::Container
            | SchemaNodeKind::List
            | SchemaNodeKind::Input
            | SchemaNodeKind::Output
            | SchemaNodeKind::Notification => snode,
            _ => return Ok(()),
        };

        let defaults: Vec<(SchemaNodeId, String, String)> = scope
            .data_children()
            .into_iter()
            .filter(|child| child.kind() == SchemaNodeKind::Leaf)
            .filter(|child| {
                !(child.is_state()
                    && options.contains(DataImplicitFlags::NO_STATE))
            })
            .filter(|child| {
                !(child.is_config()
                    && options.contains(DataImplicitFlags::NO_CONFIG))
            })
            .filter_map(|child| {
                child.default_value_canonical().map(|default| {
                    (
                        child.id(),
                        child.name().to_string(),
                        default.to_string(),
                    )
                })
            })
            .collect();

        for (snode_id, name, default) in defaults {
            let exists = self.node(id).children.iter().any(|child| {
                self.node(*child).schema == Some(snode_id)
            });
            if exists {
                continue;
            }
            let new = self.arena.insert(NodeData {
                name,
                prefix: None,
                parent: None,
                children: Vec::new(),
                attrs: Vec::new(),
                body: Some(default),
                schema: Some(snode_id),
                cached: None,
                default: true,
            });
            self.cache_value(new);
            let position = sort::insert_position(self, Some(id), new);
            self.node_mut(new).parent = Some(id);
            self.arena[id].children.insert(position, new);
        }
        Ok(())
    }

    // ===== duplication, merge, diff =====

    /// Create a copy of the data tree.
    pub fn duplicate(&self) -> DataTree<'a> {
        let mut dup = DataTree::new(self.context);
        dup.op = self.op;
        for root in self.roots.clone() {
            dup.copy_subtree(self, root, None);
        }
        dup
    }

    /// Deep-copy a subtree of `source` into this tree, appending it under
    /// `parent`. Returns the new subtree root.
    pub(crate) fn copy_subtree(
        &mut self,
        source: &DataTree<'_>,
        sid: NodeId,
        parent: Option<NodeId>,
    ) -> NodeId {
        let mut data = source.node(sid).clone();
        data.parent = parent;
        data.children = Vec::new();
        let id = self.arena.insert(data);
        match parent {
            Some(parent) => self.arena[parent].children.push(id),
            None => self.roots.push(id),
        }
        for child in source.node(sid).children.clone() {
            self.copy_subtree(source, child, Some(id));
        }
        id
    }

    /// Merge the source data tree into the target data tree: leaf bodies
    /// are replaced, inner nodes merged recursively, missing subtrees
    /// deep-copied at their canonical position.
    pub fn merge(&mut self, source: &DataTree<'_>) -> Result<()> {
        for sid in source.roots.clone() {
            self.merge_node(None, source, sid)?;
        }
        Ok(())
    }

    fn merge_node(
        &mut self,
        parent: Option<NodeId>,
        source: &DataTree<'_>,
        sid: NodeId,
    ) -> Result<()> {
        match sort::match_in_base(self, parent, source, sid) {
            Some(tid) => {
                // A counterpart from another case of the same choice gets
                // replaced outright.
                if self.node(tid).schema != source.node(sid).schema {
                    self.remove(tid);
                    self.merge_copy(parent, source, sid);
                    return Ok(());
                }
                let snode = source.node(sid);
                if snode.body.is_some() {
                    let target = self.node_mut(tid);
                    target.body = snode.body.clone();
                    target.cached = snode.cached.clone();
                    target.default = snode.default;
                }
                for scid in source.node(sid).children.clone() {
                    self.merge_node(Some(tid), source, scid)?;
                }
            }
            None => {
                self.merge_copy(parent, source, sid);
            }
        }
        Ok(())
    }

    fn merge_copy(
        &mut self,
        parent: Option<NodeId>,
        source: &DataTree<'_>,
        sid: NodeId,
    ) {
        let id = self.copy_subtree(source, sid, parent);
        // copy_subtree appends; relocate to the canonical position.
        match parent {
            Some(parent) => self.arena[parent].children.pop(),
            None => self.roots.pop(),
        };
        let position = sort::insert_position(self, parent, id);
        match parent {
            Some(parent) => {
                self.arena[parent].children.insert(position, id)
            }
            None => self.roots.insert(position, id),
        }
    }

    /// Learn the differences between two data trees. The resulting diff
    /// lists the operations turning `self` into `dtree`, in document
    /// order of the base tree.
    pub fn diff(
        &self,
        dtree: &DataTree<'_>,
        options: DataDiffFlags,
    ) -> Result<DataDiff> {
        let mut diff = DataDiff { ops: Vec::new() };
        let mut matched = std::collections::HashSet::new();
        for id in self.roots.clone() {
            self.diff_node(id, None, dtree, options, &mut diff, &mut matched)?;
        }
        for id in dtree.roots.clone() {
            dtree.diff_created(id, options, &matched, &mut diff);
        }
        Ok(diff)
    }

    fn diff_node(
        &self,
        id: NodeId,
        parent_other: Option<NodeId>,
        other: &DataTree<'_>,
        options: DataDiffFlags,
        diff: &mut DataDiff,
        matched: &mut std::collections::HashSet<NodeId>,
    ) -> Result<()> {
        let node = self.node(id);
        if node.default && !options.contains(DataDiffFlags::DEFAULTS) {
            return Ok(());
        }
        match sort::match_in_base(other, parent_other, self, id) {
            Some(oid) => {
                // A counterpart from another case of the same choice is a
                // delete here and a create on the other side.
                if other.node(oid).schema != node.schema {
                    diff.ops.push(DataDiffEntry {
                        op: DataDiffOp::Delete,
                        path: self.path_of(id),
                        value: node.body.clone(),
                    });
                    return Ok(());
                }
                matched.insert(oid);
                let counterpart = other.node(oid);
                if node.body != counterpart.body {
                    diff.ops.push(DataDiffEntry {
                        op: DataDiffOp::Replace,
                        path: self.path_of(id),
                        value: counterpart.body.clone(),
                    });
                }
                for child in node.children.clone() {
                    self.diff_node(
                        child,
                        Some(oid),
                        other,
                        options,
                        diff,
                        matched,
                    )?;
                }
            }
            None => {
                diff.ops.push(DataDiffEntry {
                    op: DataDiffOp::Delete,
                    path: self.path_of(id),
                    value: node.body.clone(),
                });
            }
        }
        Ok(())
    }

    fn diff_created(
        &self,
        id: NodeId,
        options: DataDiffFlags,
        matched: &std::collections::HashSet<NodeId>,
        diff: &mut DataDiff,
    ) {
        let node = self.node(id);
        if node.default && !options.contains(DataDiffFlags::DEFAULTS) {
            return;
        }
        if !matched.contains(&id) {
            diff.ops.push(DataDiffEntry {
                op: DataDiffOp::Create,
                path: self.path_of(id),
                value: node.body.clone(),
            });
            return;
        }
        for child in node.children.clone() {
            self.diff_created(child, options, matched, diff);
        }
    }

    /// Create the reply skeleton for a parsed RPC request: a tree holding
    /// the bound `output` node of the same RPC, ready for
    /// [`DataTree::new_term`] and [`DataTree::add_implicit`].
    pub fn new_rpc_reply(&self) -> Result<DataTree<'a>> {
        let root = self
            .reference()
            .ok_or_else(|| Error::other("empty RPC request tree"))?;
        let snode = root
            .schema()
            .filter(|snode| snode.kind() == SchemaNodeKind::Rpc)
            .or_else(|| {
                // RESTCONF-style request: the root is the input node.
                root.schema()
                    .filter(|s| s.kind() == SchemaNodeKind::Input)
                    .and_then(|s| s.parent())
            })
            .ok_or_else(|| {
                Error::other("tree root is not bound to an rpc")
            })?;
        let output = snode
            .output()
            .ok_or_else(|| Error::other("rpc has no output statement"))?;

        let mut reply = DataTree::new(self.context);
        reply.op = DataOperation::ReplyYang;
        let id = reply.add_element(None, output.name(), None);
        reply.node_mut(id).schema = Some(output.id());
        xml::set_default_namespace(
            &mut reply,
            id,
            snode.module().namespace(),
        );
        Ok(reply)
    }

    pub(crate) fn path_of(&self, id: NodeId) -> String {
        match self.get(id) {
            Some(dnode) => dnode.path(),
            None => String::new(),
        }
    }
}

impl<'a> Data<'a> for DataTree<'a> {
    fn tree(&self) -> &DataTree<'a> {
        self
    }

    fn print_roots(&self, options: DataPrinterFlags) -> Vec<NodeId> {
        if options.contains(DataPrinterFlags::WITH_SIBLINGS) {
            self.roots.clone()
        } else {
            self.roots.first().copied().into_iter().collect()
        }
    }
}

// ===== impl DataNodeRef =====

impl<'a> DataNodeRef<'a> {
    pub(crate) fn new(tree: &'a DataTree<'a>, id: NodeId) -> DataNodeRef<'a> {
        DataNodeRef { tree, id }
    }

    /// Handle of this node inside its tree.
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn data_ref(&self) -> &'a NodeData {
        self.tree.node(self.id)
    }

    /// Element name.
    pub fn name(&self) -> &'a str {
        &self.data_ref().name
    }

    /// XML prefix of the element, if any.
    pub fn prefix(&self) -> Option<&'a str> {
        self.data_ref().prefix.as_deref()
    }

    /// Schema definition of this node, unless it is unbound.
    pub fn schema(&self) -> Option<SchemaNode<'a>> {
        self.data_ref()
            .schema
            .map(|snode| self.tree.context.spec().node(snode))
    }

    /// Owning module of the data node.
    pub fn module(&self) -> Option<SchemaModule<'a>> {
        self.schema().map(|snode| snode.module())
    }

    /// Effective namespace URI of the element.
    pub fn namespace(&self) -> Option<String> {
        xml::effective_namespace(self.tree, self.id)
    }

    /// XML attributes of the element.
    pub fn attributes(&self) -> &'a [Attribute] {
        &self.data_ref().attrs
    }

    /// Node's body (canonical string representation).
    pub fn value_canonical(&self) -> Option<&'a str> {
        self.data_ref().body.as_deref()
    }

    /// Node's value (typed representation). Uses the value cached at bind
    /// time when available.
    pub fn value(&self) -> Option<DataValue> {
        let data = self.data_ref();
        if let Some(cached) = &data.cached {
            return Some(cached.clone());
        }
        let snode = self.schema()?;
        let ltype = snode.leaf_type()?;
        DataValue::parse(data.body.as_deref().unwrap_or(""), &ltype).ok()
    }

    /// Check whether the node was created as an implicit default.
    pub fn is_default(&self) -> bool {
        self.data_ref().default
    }

    /// Returns an iterator over the ancestor data nodes.
    pub fn ancestors(&self) -> Ancestors<'a, DataNodeRef<'a>> {
        Ancestors::new(self.parent())
    }

    /// Returns an iterator over this data node and its ancestors.
    pub fn inclusive_ancestors(&self) -> Ancestors<'a, DataNodeRef<'a>> {
        Ancestors::new(Some(self.clone()))
    }

    /// Returns an iterator over the following sibling data nodes.
    pub fn siblings(&self) -> Siblings<'a, DataNodeRef<'a>> {
        Siblings::new(self.next_sibling())
    }

    /// Returns an iterator over this data node and its following siblings.
    pub fn inclusive_siblings(&self) -> Siblings<'a, DataNodeRef<'a>> {
        Siblings::new(Some(self.clone()))
    }

    /// Returns an iterator over the child data nodes.
    pub fn children(&self) -> Siblings<'a, DataNodeRef<'a>> {
        Siblings::new(self.first_child())
    }

    /// Returns an iterator over all elements in the subtree (depth-first
    /// search algorithm).
    pub fn traverse(&self) -> Traverse<'a, DataNodeRef<'a>> {
        Traverse::new(self.clone())
    }

    /// Returns an iterator over the keys of a list instance.
    pub fn list_keys(&self) -> impl Iterator<Item = DataNodeRef<'a>> {
        self.children().filter(|dnode| {
            dnode
                .schema()
                .map(|snode| snode.is_list_key())
                .unwrap_or(false)
        })
    }

    /// Create a copy of the data subtree as a new single-rooted tree,
    /// bound schema and cached values included.
    pub fn duplicate_subtree(&self) -> DataTree<'a> {
        let mut dup = DataTree::new(self.tree.context);
        dup.op = self.tree.op;
        dup.copy_subtree(self.tree, self.id, None);
        dup
    }

    /// Find a child by name and keyword-specific key, using the
    /// schema-directed binary search when possible.
    pub fn find_child(
        &self,
        name: &str,
        key: SearchKey<'_>,
    ) -> Option<DataNodeRef<'a>> {
        sort::search_child(self.tree, Some(self.id), name, key)
    }

    /// Generate the instance path of the given node, list keys included.
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut dnode = Some(self.clone());
        while let Some(current) = dnode {
            segments.push(current.path_segment());
            dnode = current.parent();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    fn path_segment(&self) -> String {
        use std::fmt::Write;

        let mut segment = String::new();
        // Qualify with the module name at the top and on module crossings.
        let module = self.module();
        let parent_module =
            self.parent().and_then(|parent| parent.module());
        match &module {
            Some(module)
                if parent_module
                    .as_ref()
                    .map(|parent| parent != module)
                    .unwrap_or(true) =>
            {
                let _ = write!(segment, "{}:{}", module.name(), self.name());
            }
            _ => segment.push_str(self.name()),
        }
        if let Some(snode) = self.schema() {
            match snode.kind() {
                SchemaNodeKind::List => {
                    for key in self.list_keys() {
                        let _ = write!(
                            segment,
                            "[{}='{}']",
                            key.name(),
                            key.value_canonical().unwrap_or("")
                        );
                    }
                }
                SchemaNodeKind::LeafList => {
                    let _ = write!(
                        segment,
                        "[.='{}']",
                        self.value_canonical().unwrap_or("")
                    );
                }
                _ => (),
            }
        }
        segment
    }
}

impl<'a> Data<'a> for DataNodeRef<'a> {
    fn tree(&self) -> &DataTree<'a> {
        self.tree
    }

    fn print_roots(&self, options: DataPrinterFlags) -> Vec<NodeId> {
        if options.contains(DataPrinterFlags::WITH_SIBLINGS) {
            self.inclusive_siblings().map(|dnode| dnode.id).collect()
        } else {
            vec![self.id]
        }
    }
}

impl<'a> NodeIterable<'a> for DataNodeRef<'a> {
    fn parent(&self) -> Option<DataNodeRef<'a>> {
        self.data_ref()
            .parent
            .map(|id| DataNodeRef { tree: self.tree, id })
    }

    fn next_sibling(&self) -> Option<DataNodeRef<'a>> {
        let siblings = match self.data_ref().parent {
            Some(parent) => &self.tree.node(parent).children,
            None => &self.tree.roots,
        };
        let pos = siblings.iter().position(|id| *id == self.id)?;
        siblings
            .get(pos + 1)
            .map(|id| DataNodeRef { tree: self.tree, id: *id })
    }

    fn first_child(&self) -> Option<DataNodeRef<'a>> {
        self.data_ref()
            .children
            .first()
            .map(|id| DataNodeRef { tree: self.tree, id: *id })
    }
}

impl PartialEq for DataNodeRef<'_> {
    fn eq(&self, other: &DataNodeRef<'_>) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

// ===== impl DataDiff =====

impl DataDiff {
    /// Returns an iterator over the data changes, in document order of
    /// the base tree.
    pub fn iter(&self) -> impl Iterator<Item = &DataDiffEntry> {
        self.ops.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}
