//! Ehlit - a small systems programming language that transpiles to C
//!
//! The compiler parses `.eh` sources into an arena-backed syntax tree,
//! resolves every identifier to a declaration, computes a type for every
//! value expression, and emits equivalent C plus a public-interface file.

pub mod cheader;
pub mod codegen;
pub mod diagnostics;
pub mod driver;
pub mod lexer;
pub mod parser;
pub mod semantic;

// Re-export commonly used types
pub use diagnostics::{BuildError, Failure, Severity};
pub use driver::{Driver, Options};
