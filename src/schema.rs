//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG schema model.
//!
//! The schema forest is built programmatically through [`SchemaSpecBuilder`]
//! (YANG statement parsing is out of scope) and is immutable afterwards, so
//! a single [`SchemaSpec`] can be shared by any number of data trees.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::iter::{Ancestors, NodeIterable, Siblings};

/// Identifier of a module inside a [`SchemaSpec`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ModuleId(pub(crate) usize);

/// Identifier of a schema statement inside a [`SchemaSpec`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SchemaNodeId(pub(crate) usize);

/// YANG schema forest: modules plus their statement trees.
///
/// Read-only after [`SchemaSpecBuilder::build`]; lookups by module name,
/// namespace URI and prefix are the schema-provider surface consumed by the
/// data layer.
#[derive(Debug)]
pub struct SchemaSpec {
    modules: Vec<ModuleData>,
    stmts: Vec<StmtData>,
}

#[derive(Debug)]
struct ModuleData {
    name: String,
    namespace: String,
    prefix: String,
    top: Vec<SchemaNodeId>,
}

#[derive(Debug)]
struct StmtData {
    kind: SchemaNodeKind,
    name: String,
    module: ModuleId,
    parent: Option<SchemaNodeId>,
    children: Vec<SchemaNodeId>,
    // Positional rank among the parent's data-node children, with
    // choice/case wrappers expanded in place. Canonical sibling order.
    order: usize,
    config: bool,
    user_ordered: bool,
    mandatory: bool,
    default: Option<String>,
    leaf_type: Option<SchemaLeafType>,
    // Cached `key` argument of a list, in declared order.
    list_keys: Vec<String>,
}

/// Reference to a YANG module.
#[derive(Clone, Copy, Debug)]
pub struct SchemaModule<'a> {
    spec: &'a SchemaSpec,
    id: ModuleId,
}

/// Generic YANG schema node.
#[derive(Clone, Copy, Debug)]
pub struct SchemaNode<'a> {
    spec: &'a SchemaSpec,
    id: SchemaNodeId,
}

/// YANG schema node kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SchemaNodeKind {
    Container,
    Case,
    Choice,
    Leaf,
    LeafList,
    List,
    Rpc,
    Input,
    Output,
    Notification,
}

/// Resolved YANG leaf(-list) type: the base kind plus, for `decimal64`, the
/// mandatory fraction-digits restriction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SchemaLeafType {
    base: DataValueType,
    fraction_digits: u8,
}

/// YANG data value type (base kind after typedef/leafref resolution).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataValueType {
    Unknown,
    Binary,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    String,
    Bits,
    Bool,
    Dec64,
    Empty,
    Enum,
    IdentityRef,
    InstanceId,
    LeafRef,
    Union,
    Int8,
    Int16,
    Int32,
    Int64,
}

/// A `decimal64` value: a scaled 64-bit integer plus its fractional scale.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Decimal64 {
    num: i64,
    fraction_digits: u8,
}

/// YANG data value.
#[derive(Clone, Debug, PartialEq)]
pub enum DataValue {
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    Empty,
    Dec64(Decimal64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Other(String),
}

// ===== impl SchemaSpec =====

impl SchemaSpec {
    /// Start building a schema forest.
    pub fn builder() -> SchemaSpecBuilder {
        SchemaSpecBuilder {
            spec: SchemaSpec {
                modules: Vec::new(),
                stmts: Vec::new(),
            },
        }
    }

    pub(crate) fn stmt(&self, id: SchemaNodeId) -> &StmtData {
        &self.stmts[id.0]
    }

    pub(crate) fn node(&self, id: SchemaNodeId) -> SchemaNode<'_> {
        SchemaNode { spec: self, id }
    }

    pub(crate) fn module(&self, id: ModuleId) -> SchemaModule<'_> {
        SchemaModule { spec: self, id }
    }

    /// Returns an iterator over all modules.
    pub fn modules(&self) -> impl Iterator<Item = SchemaModule<'_>> {
        (0..self.modules.len())
            .map(move |index| self.module(ModuleId(index)))
    }

    /// Find a module by name.
    pub fn get_module(&self, name: &str) -> Option<SchemaModule<'_>> {
        self.find_module(|module| module.name == name)
    }

    /// Find a module by namespace URI.
    pub fn get_module_by_namespace(
        &self,
        namespace: &str,
    ) -> Option<SchemaModule<'_>> {
        self.find_module(|module| module.namespace == namespace)
    }

    /// Find a module by its canonical prefix.
    pub fn get_module_by_prefix(
        &self,
        prefix: &str,
    ) -> Option<SchemaModule<'_>> {
        self.find_module(|module| module.prefix == prefix)
    }

    fn find_module(
        &self,
        predicate: impl Fn(&ModuleData) -> bool,
    ) -> Option<SchemaModule<'_>> {
        self.modules
            .iter()
            .position(|module| predicate(module))
            .map(|index| self.module(ModuleId(index)))
    }

    /// Find a top-level schema node by bare name across all modules. Used by
    /// the non-strict namespace mode; when the name is ambiguous across
    /// modules no node is returned and both candidates are logged.
    pub(crate) fn find_top_by_name(
        &self,
        name: &str,
    ) -> Option<SchemaNode<'_>> {
        let mut found: Option<SchemaNode<'_>> = None;
        for module in self.modules() {
            if let Some(snode) = module.find_top(name) {
                if let Some(first) = found {
                    log::warn!(
                        "top-level node '{}' is ambiguous between modules \
                         '{}' and '{}'; refusing to bind",
                        name,
                        first.module().name(),
                        module.name()
                    );
                    return None;
                }
                found = Some(snode);
            }
        }
        found
    }
}

// ===== impl SchemaModule =====

impl<'a> SchemaModule<'a> {
    fn data_ref(&self) -> &'a ModuleData {
        &self.spec.modules[self.id.0]
    }

    /// Name of the module.
    pub fn name(&self) -> &'a str {
        &self.data_ref().name
    }

    /// Namespace URI of the module.
    pub fn namespace(&self) -> &'a str {
        &self.data_ref().namespace
    }

    /// Canonical prefix of the module.
    pub fn prefix(&self) -> &'a str {
        &self.data_ref().prefix
    }

    pub(crate) fn id(&self) -> ModuleId {
        self.id
    }

    /// Returns an iterator over the top-level schema nodes of the module,
    /// RPCs and notifications included.
    pub fn top(&self) -> impl Iterator<Item = SchemaNode<'a>> {
        let spec = self.spec;
        self.data_ref().top.iter().map(move |id| spec.node(*id))
    }

    /// Returns an iterator over the top-level data nodes of the module.
    pub fn data(&self) -> impl Iterator<Item = SchemaNode<'a>> {
        self.top().filter(|snode| {
            !matches!(
                snode.kind(),
                SchemaNodeKind::Rpc | SchemaNodeKind::Notification
            )
        })
    }

    /// Returns an iterator over the RPCs of the module.
    pub fn rpcs(&self) -> impl Iterator<Item = SchemaNode<'a>> {
        self.top()
            .filter(|snode| snode.kind() == SchemaNodeKind::Rpc)
    }

    /// Find a top-level schema node (data node, RPC or notification) by
    /// name, descending transparently into top-level choices.
    pub fn find_top(&self, name: &str) -> Option<SchemaNode<'a>> {
        for snode in self.top() {
            match snode.kind() {
                SchemaNodeKind::Choice => {
                    if let Some(inner) = snode.find_data_child(name) {
                        return Some(inner);
                    }
                }
                _ if snode.name() == name => return Some(snode),
                _ => (),
            }
        }
        None
    }
}

impl PartialEq for SchemaModule<'_> {
    fn eq(&self, other: &SchemaModule<'_>) -> bool {
        std::ptr::eq(self.spec, other.spec) && self.id == other.id
    }
}

// ===== impl SchemaNode =====

impl<'a> SchemaNode<'a> {
    fn data_ref(&self) -> &'a StmtData {
        self.spec.stmt(self.id)
    }

    pub(crate) fn id(&self) -> SchemaNodeId {
        self.id
    }

    /// Schema node kind.
    pub fn kind(&self) -> SchemaNodeKind {
        self.data_ref().kind
    }

    /// Statement argument: the node name.
    pub fn name(&self) -> &'a str {
        &self.data_ref().name
    }

    /// Owning module of the schema node.
    pub fn module(&self) -> SchemaModule<'a> {
        self.spec.module(self.data_ref().module)
    }

    /// Positional rank among the parent's data-node children. Canonical
    /// sibling order for the child comparator.
    pub fn order(&self) -> usize {
        self.data_ref().order
    }

    /// Whether the node represents configuration data.
    pub fn is_config(&self) -> bool {
        self.data_ref().config
    }

    /// Whether the node represents state data (`config false`).
    pub fn is_state(&self) -> bool {
        !self.data_ref().config
    }

    /// Whether the node is an `ordered-by user` list or leaf-list.
    pub fn is_user_ordered(&self) -> bool {
        self.data_ref().user_ordered
    }

    /// Whether the node is a mandatory leaf or choice.
    pub fn is_mandatory(&self) -> bool {
        self.data_ref().mandatory
    }

    /// Whether the node is a key leaf of a list.
    pub fn is_list_key(&self) -> bool {
        self.kind() == SchemaNodeKind::Leaf
            && match self.parent() {
                Some(parent) => parent
                    .data_ref()
                    .list_keys
                    .iter()
                    .any(|key| key == self.name()),
                None => false,
            }
    }

    /// Whether the node has a default value.
    pub fn has_default(&self) -> bool {
        self.data_ref().default.is_some()
    }

    /// Default value of the node (canonical string representation).
    pub fn default_value_canonical(&self) -> Option<&'a str> {
        self.data_ref().default.as_deref()
    }

    /// Default value of the node (typed representation).
    pub fn default_value(&self) -> Option<DataValue> {
        let default = self.data_ref().default.as_deref()?;
        let ltype = self.leaf_type()?;
        DataValue::parse(default, &ltype).ok()
    }

    /// Resolved type of a leaf or leaf-list.
    pub fn leaf_type(&self) -> Option<SchemaLeafType> {
        self.data_ref().leaf_type
    }

    /// Returns an iterator over the cached key names of a list, in declared
    /// order.
    pub fn list_keys(&self) -> impl Iterator<Item = &'a str> {
        self.data_ref().list_keys.iter().map(|key| key.as_str())
    }

    pub(crate) fn list_key_count(&self) -> usize {
        self.data_ref().list_keys.len()
    }

    /// Returns an iterator over the direct child statements.
    pub fn children(&self) -> Siblings<'a, SchemaNode<'a>> {
        Siblings::new(self.first_child())
    }

    /// Data-node children with `choice`/`case` wrappers expanded in place,
    /// in canonical order.
    pub fn data_children(&self) -> Vec<SchemaNode<'a>> {
        let mut out = Vec::new();
        self.collect_data_children(&mut out);
        out
    }

    fn collect_data_children(&self, out: &mut Vec<SchemaNode<'a>>) {
        for child in self.children() {
            match child.kind() {
                SchemaNodeKind::Choice | SchemaNodeKind::Case => {
                    child.collect_data_children(out)
                }
                SchemaNodeKind::Input | SchemaNodeKind::Output => (),
                _ => out.push(child),
            }
        }
    }

    /// Find a data-node child by name, descending transparently into
    /// `choice`/`case` wrappers.
    pub fn find_data_child(&self, name: &str) -> Option<SchemaNode<'a>> {
        for child in self.children() {
            match child.kind() {
                SchemaNodeKind::Choice | SchemaNodeKind::Case => {
                    if let Some(inner) = child.find_data_child(name) {
                        return Some(inner);
                    }
                }
                SchemaNodeKind::Input | SchemaNodeKind::Output => (),
                _ if child.name() == name => return Some(child),
                _ => (),
            }
        }
        None
    }

    /// The `input` sub-statement of an RPC.
    pub fn input(&self) -> Option<SchemaNode<'a>> {
        self.children()
            .find(|child| child.kind() == SchemaNodeKind::Input)
    }

    /// The `output` sub-statement of an RPC.
    pub fn output(&self) -> Option<SchemaNode<'a>> {
        self.children()
            .find(|child| child.kind() == SchemaNodeKind::Output)
    }

    /// Nearest `choice` statement this node hangs off (through its `case`),
    /// if any.
    pub fn choice_parent(&self) -> Option<SchemaNode<'a>> {
        let mut parent = self.parent()?;
        if parent.kind() == SchemaNodeKind::Case {
            parent = parent.parent()?;
        }
        if parent.kind() == SchemaNodeKind::Choice {
            Some(parent)
        } else {
            None
        }
    }

    /// Returns an iterator over the ancestor schema nodes.
    pub fn ancestors(&self) -> Ancestors<'a, SchemaNode<'a>> {
        Ancestors::new(self.parent())
    }

    /// Schema path of the node, for diagnostics.
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut snode = Some(*self);
        while let Some(current) = snode {
            segments
                .push(format!("{}:{}", current.module().name(), current.name()));
            snode = current.parent();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }
}

impl<'a> NodeIterable<'a> for SchemaNode<'a> {
    fn parent(&self) -> Option<SchemaNode<'a>> {
        self.data_ref().parent.map(|id| self.spec.node(id))
    }

    fn next_sibling(&self) -> Option<SchemaNode<'a>> {
        let siblings = match self.data_ref().parent {
            Some(parent) => &self.spec.stmt(parent).children,
            None => &self.spec.modules[self.data_ref().module.0].top,
        };
        let pos = siblings.iter().position(|id| *id == self.id)?;
        siblings.get(pos + 1).map(|id| self.spec.node(*id))
    }

    fn first_child(&self) -> Option<SchemaNode<'a>> {
        self.data_ref()
            .children
            .first()
            .map(|id| self.spec.node(*id))
    }
}

impl PartialEq for SchemaNode<'_> {
    fn eq(&self, other: &SchemaNode<'_>) -> bool {
        std::ptr::eq(self.spec, other.spec) && self.id == other.id
    }
}

// ===== impl SchemaLeafType =====

impl SchemaLeafType {
    pub(crate) fn new(base: DataValueType, fraction_digits: u8) -> Self {
        SchemaLeafType {
            base,
            fraction_digits,
        }
    }

    /// Base kind of the resolved type.
    pub fn base_type(&self) -> DataValueType {
        self.base
    }

    /// Fraction digits of a `decimal64` type (1..=18).
    pub fn fraction_digits(&self) -> u8 {
        self.fraction_digits
    }
}

// ===== impl Decimal64 =====

impl Decimal64 {
    /// Build from the scaled integer representation: `num` is the value
    /// multiplied by `10^fraction_digits`.
    pub fn from_scaled(num: i64, fraction_digits: u8) -> Decimal64 {
        Decimal64 {
            num,
            fraction_digits,
        }
    }

    pub fn scaled(&self) -> i64 {
        self.num
    }

    pub fn fraction_digits(&self) -> u8 {
        self.fraction_digits
    }

    fn parse(
        body: &str,
        fraction_digits: u8,
    ) -> std::result::Result<Decimal64, String> {
        if !(1..=18).contains(&fraction_digits) {
            return Err(format!(
                "invalid fraction-digits {} (must be 1..18)",
                fraction_digits
            ));
        }
        let (sign, digits) = match body.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, body.strip_prefix('+').unwrap_or(body)),
        };
        let mut parts = digits.splitn(2, '.');
        let int_part = parts.next().unwrap_or("");
        let frac_part = parts.next().unwrap_or("");
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(format!("'{}' is not a valid decimal64", body));
        }
        if frac_part.len() > fraction_digits as usize {
            return Err(format!(
                "'{}' has more than {} fraction digits",
                body, fraction_digits
            ));
        }
        let overflow =
            || format!("'{}' is out of the decimal64 range", body);
        let mut num: i64 = int_part.parse().map_err(|_| overflow())?;
        for index in 0..fraction_digits as usize {
            let digit =
                frac_part.as_bytes().get(index).map_or(0, |b| (b - b'0'));
            num = num
                .checked_mul(10)
                .and_then(|num| num.checked_add(digit as i64))
                .ok_or_else(overflow)?;
        }
        num = num.checked_mul(sign).ok_or_else(overflow)?;
        Ok(Decimal64 {
            num,
            fraction_digits,
        })
    }
}

impl Ord for Decimal64 {
    fn cmp(&self, other: &Decimal64) -> Ordering {
        // Cross-multiply to a common scale; i128 cannot overflow with
        // fraction-digits capped at 18.
        let lhs = self.num as i128 * 10i128.pow(other.fraction_digits as u32);
        let rhs = other.num as i128 * 10i128.pow(self.fraction_digits as u32);
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for Decimal64 {
    fn partial_cmp(&self, other: &Decimal64) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Decimal64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scale = 10i128.pow(self.fraction_digits as u32);
        let num = self.num as i128;
        let sign = if num < 0 { "-" } else { "" };
        let abs = num.abs();
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            abs / scale,
            abs % scale,
            width = self.fraction_digits as usize
        )
    }
}

// ===== impl DataValue =====

fn parse_int<T>(body: &str) -> std::result::Result<T, String>
where
    T: num_traits::PrimInt + std::str::FromStr + std::fmt::Display,
{
    body.parse::<T>().map_err(|_| {
        format!(
            "'{}' is not an integer in the range [{}, {}]",
            body,
            T::min_value(),
            T::max_value()
        )
    })
}

impl DataValue {
    /// Parse a leaf body under its resolved type. Returns a human-readable
    /// rejection reason when the body does not match the base kind.
    pub fn parse(
        body: &str,
        ltype: &SchemaLeafType,
    ) -> std::result::Result<DataValue, String> {
        match ltype.base_type() {
            DataValueType::Uint8 => parse_int(body).map(DataValue::Uint8),
            DataValueType::Uint16 => parse_int(body).map(DataValue::Uint16),
            DataValueType::Uint32 => parse_int(body).map(DataValue::Uint32),
            DataValueType::Uint64 => parse_int(body).map(DataValue::Uint64),
            DataValueType::Int8 => parse_int(body).map(DataValue::Int8),
            DataValueType::Int16 => parse_int(body).map(DataValue::Int16),
            DataValueType::Int32 => parse_int(body).map(DataValue::Int32),
            DataValueType::Int64 => parse_int(body).map(DataValue::Int64),
            DataValueType::Bool => match body {
                "true" => Ok(DataValue::Bool(true)),
                "false" => Ok(DataValue::Bool(false)),
                _ => Err(format!("'{}' is not a boolean", body)),
            },
            DataValueType::Empty => {
                if body.is_empty() {
                    Ok(DataValue::Empty)
                } else {
                    Err(format!("type empty forbids the body '{}'", body))
                }
            }
            DataValueType::Dec64 => {
                Decimal64::parse(body, ltype.fraction_digits())
                    .map(DataValue::Dec64)
            }
            // String-shaped kinds, plus kinds whose full resolution (union
            // branches, leafref targets, identity derivation) is the schema
            // provider's concern: compare and print by code point.
            DataValueType::Unknown
            | DataValueType::Binary
            | DataValueType::String
            | DataValueType::Bits
            | DataValueType::Enum
            | DataValueType::IdentityRef
            | DataValueType::InstanceId
            | DataValueType::LeafRef
            | DataValueType::Union => Ok(DataValue::Other(body.to_string())),
        }
    }

    pub(crate) fn parse_or_error(
        body: &str,
        ltype: &SchemaLeafType,
        path: &str,
    ) -> Result<DataValue> {
        DataValue::parse(body, ltype)
            .map_err(|reason| Error::invalid_value(path, &reason))
    }
}

impl PartialOrd for DataValue {
    // Ordering is only defined between two values of the same resolved
    // type; mixed comparisons fall back to the raw bodies at the call site.
    fn partial_cmp(&self, other: &DataValue) -> Option<Ordering> {
        match (self, other) {
            (DataValue::Uint8(a), DataValue::Uint8(b)) => Some(a.cmp(b)),
            (DataValue::Uint16(a), DataValue::Uint16(b)) => Some(a.cmp(b)),
            (DataValue::Uint32(a), DataValue::Uint32(b)) => Some(a.cmp(b)),
            (DataValue::Uint64(a), DataValue::Uint64(b)) => Some(a.cmp(b)),
            (DataValue::Int8(a), DataValue::Int8(b)) => Some(a.cmp(b)),
            (DataValue::Int16(a), DataValue::Int16(b)) => Some(a.cmp(b)),
            (DataValue::Int32(a), DataValue::Int32(b)) => Some(a.cmp(b)),
            (DataValue::Int64(a), DataValue::Int64(b)) => Some(a.cmp(b)),
            (DataValue::Dec64(a), DataValue::Dec64(b)) => Some(a.cmp(b)),
            (DataValue::Bool(a), DataValue::Bool(b)) => Some(a.cmp(b)),
            (DataValue::Empty, DataValue::Empty) => Some(Ordering::Equal),
            (DataValue::Other(a), DataValue::Other(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataValue::Uint8(v) => write!(f, "{}", v),
            DataValue::Uint16(v) => write!(f, "{}", v),
            DataValue::Uint32(v) => write!(f, "{}", v),
            DataValue::Uint64(v) => write!(f, "{}", v),
            DataValue::Int8(v) => write!(f, "{}", v),
            DataValue::Int16(v) => write!(f, "{}", v),
            DataValue::Int32(v) => write!(f, "{}", v),
            DataValue::Int64(v) => write!(f, "{}", v),
            DataValue::Dec64(v) => write!(f, "{}", v),
            DataValue::Bool(v) => write!(f, "{}", v),
            DataValue::Empty => Ok(()),
            DataValue::Other(v) => write!(f, "{}", v),
        }
    }
}

// ===== impl SchemaSpecBuilder =====

/// Parent argument of the builder node constructors: either a module (for
/// top-level statements) or another statement.
#[derive(Clone, Copy, Debug)]
pub enum SchemaParent {
    Module(ModuleId),
    Node(SchemaNodeId),
}

impl From<ModuleId> for SchemaParent {
    fn from(id: ModuleId) -> SchemaParent {
        SchemaParent::Module(id)
    }
}

impl From<SchemaNodeId> for SchemaParent {
    fn from(id: SchemaNodeId) -> SchemaParent {
        SchemaParent::Node(id)
    }
}

/// Programmatic schema constructor.
///
/// Statements are declared in document order; [`SchemaSpecBuilder::build`]
/// assigns the canonical order indices (expanding `choice`/`case` wrappers
/// in place) and checks list-key consistency.
#[derive(Debug)]
pub struct SchemaSpecBuilder {
    spec: SchemaSpec,
}

impl SchemaSpecBuilder {
    /// Declare a module.
    pub fn module(
        &mut self,
        name: &str,
        namespace: &str,
        prefix: &str,
    ) -> Result<ModuleId> {
        if self.spec.modules.iter().any(|module| {
            module.name == name
                || module.namespace == namespace
                || module.prefix == prefix
        }) {
            return Err(Error::other(&format!(
                "duplicate module declaration: {}",
                name
            )));
        }
        self.spec.modules.push(ModuleData {
            name: name.to_string(),
            namespace: namespace.to_string(),
            prefix: prefix.to_string(),
            top: Vec::new(),
        });
        Ok(ModuleId(self.spec.modules.len() - 1))
    }

    fn add_stmt(
        &mut self,
        parent: SchemaParent,
        kind: SchemaNodeKind,
        name: &str,
    ) -> Result<SchemaNodeId> {
        let (module, parent_id) = match parent {
            SchemaParent::Module(module) => (module, None),
            SchemaParent::Node(id) => {
                let (pkind, pmodule) = {
                    let pstmt = self.spec.stmt(id);
                    (pstmt.kind, pstmt.module)
                };
                match pkind {
                    SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                        return Err(Error::other(&format!(
                            "'{}' cannot be nested under a leaf statement",
                            name
                        )));
                    }
                    SchemaNodeKind::Choice
                        if !matches!(kind, SchemaNodeKind::Case) =>
                    {
                        // Shorthand case: YANG wraps a bare data node
                        // under a choice into an implicit case.
                        let case = self.add_stmt(
                            SchemaParent::Node(id),
                            SchemaNodeKind::Case,
                            name,
                        )?;
                        return self.add_stmt(
                            SchemaParent::Node(case),
                            kind,
                            name,
                        );
                    }
                    _ => (),
                }
                (pmodule, Some(id))
            }
        };
        let siblings = match parent_id {
            Some(id) => &self.spec.stmt(id).children,
            None => &self.spec.modules[module.0].top,
        };
        if siblings
            .iter()
            .any(|id| self.spec.stmt(*id).name == name)
        {
            return Err(Error::other(&format!(
                "duplicate statement name: {}",
                name
            )));
        }
        let config = match parent_id {
            Some(id) => self.spec.stmt(id).config,
            None => true,
        };
        self.spec.stmts.push(StmtData {
            kind,
            name: name.to_string(),
            module,
            parent: parent_id,
            children: Vec::new(),
            order: 0,
            config,
            user_ordered: false,
            mandatory: false,
            default: None,
            leaf_type: None,
            list_keys: Vec::new(),
        });
        let id = SchemaNodeId(self.spec.stmts.len() - 1);
        match parent_id {
            Some(parent) => self.spec.stmts[parent.0].children.push(id),
            None => self.spec.modules[module.0].top.push(id),
        }
        Ok(id)
    }

    /// Declare a `container`.
    pub fn container(
        &mut self,
        parent: impl Into<SchemaParent>,
        name: &str,
    ) -> Result<SchemaNodeId> {
        self.add_stmt(parent.into(), SchemaNodeKind::Container, name)
    }

    /// Declare a `list` with its `key` argument. The key leaves themselves
    /// are declared separately with [`SchemaSpecBuilder::leaf`];
    /// [`SchemaSpecBuilder::build`] verifies they exist.
    pub fn list(
        &mut self,
        parent: impl Into<SchemaParent>,
        name: &str,
        keys: &[&str],
    ) -> Result<SchemaNodeId> {
        let id = self.add_stmt(parent.into(), SchemaNodeKind::List, name)?;
        self.spec.stmts[id.0].list_keys =
            keys.iter().map(|key| key.to_string()).collect();
        Ok(id)
    }

    /// Declare a `leaf` with its resolved base type.
    pub fn leaf(
        &mut self,
        parent: impl Into<SchemaParent>,
        name: &str,
        base: DataValueType,
    ) -> Result<SchemaNodeId> {
        let id = self.add_stmt(parent.into(), SchemaNodeKind::Leaf, name)?;
        self.spec.stmts[id.0].leaf_type = Some(SchemaLeafType::new(base, 0));
        Ok(id)
    }

    /// Declare a `leaf-list` with its resolved base type.
    pub fn leaf_list(
        &mut self,
        parent: impl Into<SchemaParent>,
        name: &str,
        base: DataValueType,
    ) -> Result<SchemaNodeId> {
        let id =
            self.add_stmt(parent.into(), SchemaNodeKind::LeafList, name)?;
        self.spec.stmts[id.0].leaf_type = Some(SchemaLeafType::new(base, 0));
        Ok(id)
    }

    /// Declare a `choice`.
    pub fn choice(
        &mut self,
        parent: impl Into<SchemaParent>,
        name: &str,
    ) -> Result<SchemaNodeId> {
        self.add_stmt(parent.into(), SchemaNodeKind::Choice, name)
    }

    /// Declare a `case` under a choice.
    pub fn case(
        &mut self,
        choice: SchemaNodeId,
        name: &str,
    ) -> Result<SchemaNodeId> {
        if self.spec.stmt(choice).kind != SchemaNodeKind::Choice {
            return Err(Error::other("case parent must be a choice"));
        }
        self.add_stmt(SchemaParent::Node(choice), SchemaNodeKind::Case, name)
    }

    /// Declare an `rpc`; its `input` and `output` sub-statements are
    /// created implicitly and retrieved with [`SchemaSpecBuilder::input`]
    /// and [`SchemaSpecBuilder::output`].
    pub fn rpc(
        &mut self,
        module: ModuleId,
        name: &str,
    ) -> Result<SchemaNodeId> {
        let id = self.add_stmt(
            SchemaParent::Module(module),
            SchemaNodeKind::Rpc,
            name,
        )?;
        self.add_stmt(SchemaParent::Node(id), SchemaNodeKind::Input, "input")?;
        self.add_stmt(
            SchemaParent::Node(id),
            SchemaNodeKind::Output,
            "output",
        )?;
        Ok(id)
    }

    /// The implicit `input` sub-statement of an RPC.
    pub fn input(&self, rpc: SchemaNodeId) -> SchemaNodeId {
        self.direction_of(rpc, SchemaNodeKind::Input)
    }

    /// The implicit `output` sub-statement of an RPC.
    pub fn output(&self, rpc: SchemaNodeId) -> SchemaNodeId {
        self.direction_of(rpc, SchemaNodeKind::Output)
    }

    fn direction_of(
        &self,
        rpc: SchemaNodeId,
        kind: SchemaNodeKind,
    ) -> SchemaNodeId {
        *self
            .spec
            .stmt(rpc)
            .children
            .iter()
            .find(|id| self.spec.stmt(**id).kind == kind)
            .unwrap()
    }

    /// Declare a `notification`.
    pub fn notification(
        &mut self,
        module: ModuleId,
        name: &str,
    ) -> Result<SchemaNodeId> {
        self.add_stmt(
            SchemaParent::Module(module),
            SchemaNodeKind::Notification,
            name,
        )
    }

    /// Set the fraction-digits restriction of a `decimal64` leaf.
    pub fn fraction_digits(
        &mut self,
        leaf: SchemaNodeId,
        digits: u8,
    ) -> Result<()> {
        match self.spec.stmts[leaf.0].leaf_type {
            Some(ltype) if ltype.base_type() == DataValueType::Dec64 => {
                if !(1..=18).contains(&digits) {
                    return Err(Error::other(
                        "fraction-digits must be in 1..18",
                    ));
                }
                self.spec.stmts[leaf.0].leaf_type =
                    Some(SchemaLeafType::new(DataValueType::Dec64, digits));
                Ok(())
            }
            _ => Err(Error::other(
                "fraction-digits applies to decimal64 leaves only",
            )),
        }
    }

    /// Mark a leaf or choice as `mandatory true`.
    pub fn mandatory(&mut self, id: SchemaNodeId) {
        self.spec.stmts[id.0].mandatory = true;
    }

    /// Mark a subtree root as `config false` (state data).
    pub fn config_false(&mut self, id: SchemaNodeId) {
        self.spec.stmts[id.0].config = false;
    }

    /// Mark a list or leaf-list as `ordered-by user`.
    pub fn ordered_by_user(&mut self, id: SchemaNodeId) {
        self.spec.stmts[id.0].user_ordered = true;
    }

    /// Set the `default` value of a leaf.
    pub fn default_value(&mut self, id: SchemaNodeId, value: &str) {
        self.spec.stmts[id.0].default = Some(value.to_string());
    }

    /// Finalize the schema: propagate `config false` down, assign the
    /// canonical order indices and verify that every declared list key has
    /// a matching leaf.
    pub fn build(mut self) -> Result<SchemaSpec> {
        // Propagate config false. Statements are stored parents-first, so a
        // single forward pass suffices.
        for index in 0..self.spec.stmts.len() {
            if let Some(parent) = self.spec.stmts[index].parent {
                if !self.spec.stmts[parent.0].config {
                    self.spec.stmts[index].config = false;
                }
            }
        }

        // Top-level statements share one global counter so that the
        // comparator stays total across modules.
        let mut order = 0;
        let top: Vec<SchemaNodeId> = self
            .spec
            .modules
            .iter()
            .flat_map(|module| module.top.iter().copied())
            .collect();
        self.assign_order(&top, &mut order);

        // List-key consistency.
        for index in 0..self.spec.stmts.len() {
            let stmt = &self.spec.stmts[index];
            if stmt.kind != SchemaNodeKind::List {
                continue;
            }
            for key in stmt.list_keys.clone() {
                let snode = self.spec.node(SchemaNodeId(index));
                match snode.find_data_child(&key) {
                    Some(child) if child.kind() == SchemaNodeKind::Leaf => (),
                    _ => {
                        return Err(Error::other(&format!(
                            "list '{}' declares key '{}' without a \
                             matching leaf",
                            stmt.name, key
                        )));
                    }
                }
            }
        }

        Ok(self.spec)
    }

    fn assign_order(&mut self, siblings: &[SchemaNodeId], order: &mut usize) {
        for id in siblings.to_vec() {
            let kind = self.spec.stmts[id.0].kind;
            match kind {
                // Wrappers are transparent for ordering purposes.
                SchemaNodeKind::Choice | SchemaNodeKind::Case => {
                    let children = self.spec.stmts[id.0].children.clone();
                    self.assign_order(&children, order);
                }
                _ => {
                    self.spec.stmts[id.0].order = *order;
                    *order += 1;
                    let children = self.spec.stmts[id.0].children.clone();
                    let mut inner = 0;
                    self.assign_order(&children, &mut inner);
                }
            }
        }
    }
}
