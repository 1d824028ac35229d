//! Symbol table: names, their kinds/types, and the lexical scope tree that
//! owns them.

pub mod scope;
pub mod symbol;

pub use scope::{Scope, ScopeArena, ScopeId, ScopeKind};
pub use symbol::{Symbol, SymbolKind};
