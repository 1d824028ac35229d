//! Cross-module global symbol table.
//!
//! Filled by registering each module's module-scope symbols after its local
//! analysis finishes. Name-keyed registration with duplicate rejection,
//! like [`crate::modgraph::ModuleRegistry`], but keyed on individual
//! symbols rather than whole modules, since cross-module lookup operates
//! at symbol granularity.

use crate::symbols::Symbol;
use std::collections::HashMap;

/// One module's contribution to the table: its exported symbols plus a
/// registration-order index used to break lookup ties.
struct ModuleEntry {
    order: usize,
    symbols: HashMap<String, Symbol>,
}

/// Aggregates every module's symbols after local analysis, exposing the
/// cross-module lookup rule: `lookup` searches every *other* module's
/// exports and returns the first match by registration order; same-module
/// lookups must go through `lookup_in_module`.
#[derive(Default)]
pub struct GlobalSymbolTable {
    modules: HashMap<String, ModuleEntry>,
    registration_order: Vec<String>,
    total_exports: usize,
}

impl GlobalSymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module`'s module-scope symbols. Re-registering the same
    /// module name replaces its prior entry in place, preserving its
    /// original registration order.
    pub fn register_module(&mut self, module: &str, symbols: impl IntoIterator<Item = Symbol>) {
        let exports: HashMap<String, Symbol> = symbols.into_iter().map(|s| (s.name.clone(), s)).collect();
        self.total_exports += exports.values().filter(|s| s.is_exported).count();
        let order = self
            .modules
            .get(module)
            .map(|e| e.order)
            .unwrap_or_else(|| {
                self.registration_order.push(module.to_string());
                self.registration_order.len() - 1
            });
        self.modules.insert(module.to_string(), ModuleEntry { order, symbols: exports });
    }

    /// Looks up `name` within `module` only, ignoring export visibility.
    pub fn lookup_in_module(&self, module: &str, name: &str) -> Option<&Symbol> {
        self.modules.get(module)?.symbols.get(name)
    }

    /// Searches every module other than `requester` for an exported symbol
    /// named `name`, returning the first match by registration order.
    pub fn lookup(&self, name: &str, requester: &str) -> Option<&Symbol> {
        self.registration_order
            .iter()
            .filter(|m| m.as_str() != requester)
            .filter_map(|m| self.modules.get(m))
            .find_map(|entry| entry.symbols.get(name).filter(|s| s.is_exported))
    }

    pub fn total_symbols(&self) -> usize {
        self.modules.values().map(|e| e.symbols.len()).sum()
    }

    pub fn total_exports(&self) -> usize {
        self.total_exports
    }

    pub fn reset(&mut self) {
        self.modules.clear();
        self.registration_order.clear();
        self.total_exports = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Span;
    use crate::symbols::SymbolKind;
    use crate::typesys::Type;

    fn symbol(name: &str, exported: bool) -> Symbol {
        let mut s = Symbol::new(name, SymbolKind::Function, Span::synthetic());
        s.is_exported = exported;
        s.backfill_type(Type::Void);
        s
    }

    #[test]
    fn lookup_skips_the_requesting_module() {
        let mut table = GlobalSymbolTable::new();
        table.register_module("a", vec![symbol("helper", true)]);
        table.register_module("b", vec![symbol("helper", true)]);
        assert!(table.lookup("helper", "a").is_some());
        assert_eq!(table.lookup("helper", "a").unwrap().name, "helper");
    }

    #[test]
    fn lookup_ignores_non_exported_symbols() {
        let mut table = GlobalSymbolTable::new();
        table.register_module("a", vec![symbol("private_fn", false)]);
        assert!(table.lookup("private_fn", "b").is_none());
    }

    #[test]
    fn lookup_in_module_ignores_export_visibility() {
        let mut table = GlobalSymbolTable::new();
        table.register_module("a", vec![symbol("private_fn", false)]);
        assert!(table.lookup_in_module("a", "private_fn").is_some());
    }

    #[test]
    fn reset_clears_all_counters() {
        let mut table = GlobalSymbolTable::new();
        table.register_module("a", vec![symbol("f", true)]);
        assert_eq!(table.total_symbols(), 1);
        table.reset();
        assert_eq!(table.total_symbols(), 0);
        assert_eq!(table.total_exports(), 0);
    }
}
