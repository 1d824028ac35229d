//! The semantic analyzer: scope/symbol building, type resolution, reference
//! resolution, and type checking.

pub mod analyzer;
pub mod scope_builder;
pub mod type_resolve;

pub use analyzer::{analyze, AnalyzedModule};
pub use scope_builder::{MapFields, ScopeBuildResult};
pub use type_resolve::{resolve_type_expr, NamedTypes};
