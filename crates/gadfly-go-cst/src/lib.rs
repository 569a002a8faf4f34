//! Go tokenizer, syntax tree, and parser for gadfly.
//!
//! This crate is the parser front-end consumed by the analysis engine:
//!
//! - [`tokenizer`]: byte-level scanner with Go's automatic semicolon
//!   insertion and a side table of comments
//! - [`ast`]: owned go/ast-shaped nodes, types-as-expressions, with
//!   file-local byte spans on every node
//! - [`parser`]: recursive-descent parser for the supported Go subset
//! - [`pos`]: workspace-global positions ([`Pos`], [`FileSet`]) so symbol
//!   and reference data from different files is directly comparable
//! - [`inspect`]: depth-first cursor walk with parent-chain access
//!
//! The parsed tree and the original source bytes are the only contract with
//! downstream code: edits are byte ranges against the original bytes, never
//! a re-printed tree.

pub mod ast;
pub mod inspect;
pub mod parser;
pub mod pos;
pub mod token;
pub mod tokenizer;

pub use ast::*;
pub use inspect::{inspect, Node};
pub use parser::{parse_file, ParseError};
pub use pos::{FileSet, Pos, PosSpan, Position};
