//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Schema-aware YANG data trees in pure Rust.
//!
//! This crate implements the data-tree core of a NETCONF/RESTCONF
//! configuration stack: XML-shaped instance trees bound to a YANG (RFC 7950)
//! schema model, with schema-directed sibling ordering, binary-search lookup
//! keyed on YANG order and list keys, merge/diff matching, and a
//! bidirectional RFC 7951 JSON codec.
//!
//! ## Design Goals
//! * Model YANG keyword dispatch as exhaustive `match` over tagged variants
//! * Leverage Rust's ownership system: a tree exclusively owns its nodes,
//!   node references borrow the tree
//! * Total, never-failing sort/search/match primitives
//! * No XPath engine and no YANG statement parser: schemas are built
//!   programmatically and shared read-only across trees
//!
//! Debug and deprecation messages go through the [`log`] facade.
//!
//! ## Examples
//!
//! Building a schema, parsing JSON, and printing NETCONF XML:
//!
//! ```
//! use yangtree::context::{Context, ContextFlags};
//! use yangtree::data::{Data, DataFormat, DataParserFlags, DataPrinterFlags,
//!     DataTree, DataValidationFlags};
//! use yangtree::schema::{DataValueType, SchemaSpec};
//!
//! let mut builder = SchemaSpec::builder();
//! let module = builder.module("example", "urn:example:yang", "ex").unwrap();
//! let ifs = builder.container(module, "interfaces").unwrap();
//! let iface = builder.list(ifs, "interface", &["name"]).unwrap();
//! builder.leaf(iface, "name", DataValueType::String).unwrap();
//!
//! let ctx = Context::new(builder.build().unwrap(), ContextFlags::empty());
//! let dtree = DataTree::parse_string(
//!     &ctx,
//!     r#"{"example:interfaces":{"interface":[{"name":"eth0"}]}}"#,
//!     DataFormat::JSON,
//!     DataParserFlags::empty(),
//!     DataValidationFlags::empty(),
//! )
//! .unwrap();
//! let xml = dtree
//!     .print_string(DataFormat::XML, DataPrinterFlags::WITH_SIBLINGS)
//!     .unwrap();
//! assert!(xml.contains("urn:example:yang"));
//! ```

mod error;

pub mod context;
pub mod data;
pub mod iter;
pub mod json;
pub mod schema;
pub mod sort;
pub mod xml;

pub use crate::error::{Error, ErrorInfo, ErrorTag, ErrorType, Result};
