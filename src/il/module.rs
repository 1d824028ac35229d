//! IL module: the output of lowering one Blend65 source module.

use super::function::IlFunction;
use crate::ast::StorageClass;
use crate::typesys::Type;
use std::collections::HashMap;

/// A global declared in this module, carrying enough information for the
/// code generator to place it without re-walking the AST.
#[derive(Debug, Clone)]
pub struct IlGlobal {
    pub name: String,
    pub storage: StorageClass,
    pub ty: Type,
    pub is_const: bool,
    pub is_exported: bool,
    /// Constant initializer, if any (only meaningful for `@data`).
    pub init: Option<i64>,
}

/// The IL for one module: its functions and globals, post-lowering.
#[derive(Debug, Clone, Default)]
pub struct IlModule {
    pub name: String,
    pub functions: HashMap<String, IlFunction>,
    pub globals: HashMap<String, IlGlobal>,
    pub entry_point: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl IlModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_function(&mut self, function: IlFunction) {
        if function.name == "main" {
            self.entry_point = Some(function.name.clone());
        }
        self.functions.insert(function.name.clone(), function);
    }

    pub fn add_global(&mut self, global: IlGlobal) {
        self.globals.insert(global.name.clone(), global);
    }

    /// Folds `other`'s functions and globals into `self`, keeping `self`'s
    /// entry point if it already has one. Used by the pipeline to collapse
    /// every source module's lowered IL into the single flat program the
    /// code generator consumes.
    pub fn merge(&mut self, other: IlModule) {
        if self.entry_point.is_none() {
            self.entry_point = other.entry_point;
        }
        self.functions.extend(other.functions);
        self.globals.extend(other.globals);
    }
}
