//! Canonize Syntax
//!
//! Owned Python syntax tree, lowering from tree-sitter, canonical printing
//! and scope analysis shared by every other crate of the engine.
//!
//! # Core Concepts
//!
//! - [`Module`], [`Stmt`], [`Expr`]: Closed syntax tree; unmodelled code stays `Opaque`
//! - [`parse_module`]: tree-sitter lowering, rejecting any source with syntax errors
//! - [`print_module`]: Canonical printing; parse then print is a fixed point
//! - [`alpha_normalize`]: Positional renaming of function-local bindings
//! - [`unbound_names`]: Definition-reaching check used by the validation gate
//! - [`ContentHash`]: 32-byte Blake3 hash for content addressing
//!
//! # Example
//!
//! ```rust,ignore
//! use canonize_syntax::{parse_module, print_module, StructureHashes};
//!
//! let module = parse_module("def f(n):\n    return n * 2\n")?;
//! assert_eq!(print_module(&module), "def f(n):\n    return n * 2\n");
//! let hashes = StructureHashes::of(&module);
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod ast;
pub mod visit;

mod hash;
mod normalize;
mod parser;
mod printer;
mod scope;

pub use ast::{
    Alias, Arg, BinOp, BoolOp, CmpOp, Comprehension, ComprehensionClause, ComprehensionKind,
    ExceptHandler, Expr, FunctionDef, Module, Param, ParamKind, Stmt, StrLit, UnaryOp,
};
pub use hash::{ContentHash, HashError};
pub use normalize::{alpha_normalize, StructureHashes};
pub use parser::{is_parseable, parse_module, ParseError};
pub use printer::{print_body, print_expr, print_module};
pub use scope::{
    bound_names, declared_outer, is_builtin, module_globals, target_names, unbound_names,
    BUILTINS,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
