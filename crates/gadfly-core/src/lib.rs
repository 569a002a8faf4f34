//! Core infrastructure for gadfly.
//!
//! This crate provides language-agnostic infrastructure:
//! - Edit-plan IR for representing refactoring transformations
//! - Error types and the observable error taxonomy
//! - Text utilities for byte offset / line:column conversions

pub mod error;
pub mod patch;
pub mod text;
