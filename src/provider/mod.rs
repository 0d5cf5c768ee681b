/// Provider tree: the relational algebra consumed by the compilation pipeline.
///
/// ```text
/// Provider tree           (types.rs, expr.rs)
///       ↓
/// Pre-compilation passes  (crate::precompile)
///       ↓
/// Compiler → SQL DOM      (crate::compiler, crate::dom)
///       ↓
/// Translator → SQL text   (crate::translator)
/// ```
///
/// Trees are built once by an upstream translator (or deserialized from
/// JSON) and are never mutated afterwards; `rewrite.rs` provides the
/// bottom-up, structure-sharing rewrite used by every pass.
pub mod build;
pub mod expr;
pub mod range;
pub mod rewrite;
pub mod types;

pub use build::{table, ProviderExt, TableBuilder, TableExt};
pub use expr::{BinaryOp, Expr, Function, UnaryOp};
pub use range::{Cut, KeyRange, RangeSet};
pub use rewrite::{transform_up, NodePath};
pub use types::*;
