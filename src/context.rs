//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Engine context.

use bitflags::bitflags;

use crate::schema::{SchemaModule, SchemaSpec};

/// Context of the YANG schemas.
///
/// The context holds the schema forest all data trees are processed
/// against, plus the engine behavior flags. It is read-only once created
/// and may be shared across trees (and threads) freely.
#[derive(Debug)]
pub struct Context {
    spec: SchemaSpec,
    options: ContextFlags,
    indent_width: usize,
}

bitflags! {
    /// Options to change engine behavior.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct ContextFlags: u16 {
        /// Relax namespace checking during schema resolution: an element
        /// whose namespace resolves to no module may still bind by bare
        /// name, provided the name is unambiguous across modules.
        const NS_NONSTRICT = 0x01;

        /// Accept identityref values whose prefix is not backed by an
        /// `xmlns` declaration, interpreting the prefix as a module name.
        /// Kept for historical peers; deprecated.
        const IDENTITYREF_KLUDGE = 0x02;
    }
}

// ===== impl Context =====

impl Context {
    /// Create an engine context from a built schema spec.
    pub fn new(spec: SchemaSpec, options: ContextFlags) -> Context {
        Context {
            spec,
            options,
            indent_width: 2,
        }
    }

    /// The schema forest.
    pub fn spec(&self) -> &SchemaSpec {
        &self.spec
    }

    /// The engine behavior flags.
    pub fn options(&self) -> ContextFlags {
        self.options
    }

    /// Indentation width used by the pretty printers.
    pub fn indent_width(&self) -> usize {
        self.indent_width
    }

    /// Change the indentation width used by the pretty printers.
    pub fn set_indent_width(&mut self, width: usize) {
        self.indent_width = width;
    }

    /// Find a module by name.
    pub fn get_module(&self, name: &str) -> Option<SchemaModule<'_>> {
        self.spec.get_module(name)
    }

    /// Find a module by namespace URI.
    pub fn get_module_by_namespace(
        &self,
        namespace: &str,
    ) -> Option<SchemaModule<'_>> {
        self.spec.get_module_by_namespace(namespace)
    }

    /// Find a module by its canonical prefix.
    pub fn get_module_by_prefix(
        &self,
        prefix: &str,
    ) -> Option<SchemaModule<'_>> {
        self.spec.get_module_by_prefix(prefix)
    }

    /// Returns an iterator over all modules.
    pub fn modules(&self) -> impl Iterator<Item = SchemaModule<'_>> {
        self.spec.modules()
    }
}
