//! Go language analysis for gadfly.
//!
//! This crate builds an indexed model of a multi-package Go workspace and
//! runs analyzers and fixers over it:
//!
//! - [`workspace`]: packages, files, module info, shared positional index
//! - [`symbols`]: per-package symbol tables (extractor)
//! - [`scope`]: lexical scope trees and identifier resolution
//! - [`typeinfo`]: canonical objects and Defs/Uses maps (name binder)
//! - [`index`]: the workspace-wide reference index
//! - [`resolver`]: symbol resolution, reference queries, method sets
//! - [`cache`]: thread-safe memoization with package/file invalidation
//! - [`deps`]: import graph, transitive closure, cycle detection
//! - [`diagnostics`]: suggestion-bearing resolution failures
//! - [`analyzers`]: code-quality passes emitting violation records
//! - [`ops`]: fixers translating violations into refactoring plans
//!
//! The typical pipeline: [`workspace::Workspace::load`] (or
//! `from_sources`), optionally [`typeinfo::bind_workspace`] for the typed
//! reference path, [`index::build_index`] once, then analyzers and fixers
//! as needed.

pub mod analyzers;
pub mod cache;
pub mod deps;
pub mod diagnostics;
pub mod index;
pub mod ops;
pub mod resolver;
pub mod scope;
pub mod symbols;
pub mod typeinfo;
pub mod workspace;

pub use cache::{CacheStats, SymbolCache};
pub use index::{build_index, ReferenceIndex};
pub use resolver::{Reference, SymbolResolver};
pub use scope::{ScopeAnalyzer, ScopeKind};
pub use symbols::{Symbol, SymbolKind, SymbolTable};
pub use typeinfo::{bind_workspace, TypeInfo, TypeObject};
pub use workspace::{File, Package, Workspace};
