//! Edit-plan IR: Span, Change, RefactorPlan.
//!
//! This module implements the edit planner shared by all fixers:
//! - Byte-range changes carrying the original text for verification
//! - Overlap detection within a plan (changes to one file never overlap)
//! - Per-file content hashes so external appliers can detect drift
//! - Plan application against in-memory file contents (all-or-nothing)
//!
//! All offsets are 0-based byte offsets into the file's original content;
//! spans are half-open intervals `[start, end)`. Replacement text is opaque
//! bytes: newlines and indentation are explicit, never templated.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

// ============================================================================
// Content Hash
// ============================================================================

/// Hash type for content verification (SHA-256, stored as hex for JSON output).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute the SHA-256 hash of the given bytes, hex-encoded.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Span
// ============================================================================

/// Byte offsets into file content.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: u32,
    /// End byte offset (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: u32, end: u32) -> Self {
        assert!(start <= end, "Span start ({}) must be <= end ({})", start, end);
        Span { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Check if the span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if this span contains a byte offset.
    pub fn contains_offset(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Change
// ============================================================================

/// A single byte-range edit in one file.
///
/// `old_text` is the exact slice of the file's original bytes at `span`;
/// appliers verify it before writing so a drifted file is never corrupted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// File the change applies to.
    pub file: PathBuf,
    /// Byte range replaced, in the file's original content.
    pub span: Span,
    /// Original text at `span` (verification).
    pub old_text: String,
    /// Replacement text (opaque bytes; explicit newlines and indentation).
    pub new_text: String,
    /// Human-readable description of the change.
    pub description: String,
}

impl Change {
    /// Create a new change.
    pub fn new(
        file: impl Into<PathBuf>,
        span: Span,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Change {
            file: file.into(),
            span,
            old_text: old_text.into(),
            new_text: new_text.into(),
            description: description.into(),
        }
    }
}

// ============================================================================
// Plan Errors
// ============================================================================

/// Errors raised while assembling or applying a refactoring plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A change overlaps a change already in the plan.
    #[error("overlapping change in {file}: {next} overlaps {existing}", file = file.display())]
    OverlappingChange {
        file: PathBuf,
        existing: Span,
        next: Span,
    },

    /// A change's span extends past the end of the file content.
    #[error("change span {span} out of bounds for {file} ({len} bytes)", file = file.display())]
    SpanOutOfBounds { file: PathBuf, span: Span, len: usize },

    /// The content at a change's span no longer matches its `old_text`.
    #[error("stale change in {file} at {span}: content does not match old_text", file = file.display())]
    StaleChange { file: PathBuf, span: Span },

    /// The plan touches a file the applier was not given content for.
    #[error("no content provided for {file}", file = file.display())]
    MissingFile { file: PathBuf },
}

// ============================================================================
// RefactorPlan
// ============================================================================

/// An auditable plan of byte-level edits, keyed by file path.
///
/// Changes targeting the same file are guaranteed to have disjoint byte
/// ranges; [`RefactorPlan::add_change`] rejects overlaps. Plans are
/// single-use values: a fixer produces one, an applier consumes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefactorPlan {
    /// Changes in the order the fixer produced them.
    pub changes: Vec<Change>,
    /// File paths touched by at least one change, in first-touch order.
    pub affected_files: Vec<PathBuf>,
    /// SHA-256 of each affected file's original content, when recorded.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub file_hashes: HashMap<PathBuf, ContentHash>,
}

impl RefactorPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        RefactorPlan::default()
    }

    /// Number of changes in the plan.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if the plan contains no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Add a change, rejecting overlaps with changes already in the plan.
    pub fn add_change(&mut self, change: Change) -> Result<(), PlanError> {
        for existing in self.changes.iter().filter(|c| c.file == change.file) {
            if existing.span.overlaps(&change.span) {
                return Err(PlanError::OverlappingChange {
                    file: change.file,
                    existing: existing.span,
                    next: change.span,
                });
            }
        }
        if !self.affected_files.contains(&change.file) {
            self.affected_files.push(change.file.clone());
        }
        self.changes.push(change);
        Ok(())
    }

    /// Record the hash of a file's original content for drift detection.
    pub fn record_file_hash(&mut self, file: impl Into<PathBuf>, content: &[u8]) {
        self.file_hashes.insert(file.into(), ContentHash::compute(content));
    }

    /// Changes targeting one file, in plan order.
    pub fn changes_for<'a>(&'a self, file: &'a Path) -> impl Iterator<Item = &'a Change> + 'a {
        self.changes.iter().filter(move |c| c.file == file)
    }

    /// Merge another plan into this one, re-checking overlap per change.
    pub fn merge(&mut self, other: RefactorPlan) -> Result<(), PlanError> {
        for change in other.changes {
            self.add_change(change)?;
        }
        for (file, hash) in other.file_hashes {
            self.file_hashes.entry(file).or_insert(hash);
        }
        Ok(())
    }

    /// Apply the plan to in-memory file contents.
    ///
    /// Verifies every change's `old_text` against the provided content
    /// before splicing; the first mismatch aborts with no content modified
    /// for that file. Edits within a file are applied back-to-front so
    /// earlier spans stay valid.
    pub fn apply(&self, contents: &mut HashMap<PathBuf, String>) -> Result<(), PlanError> {
        tracing::debug!(
            changes = self.changes.len(),
            files = self.affected_files.len(),
            "applying refactoring plan"
        );
        for file in &self.affected_files {
            let content = contents
                .get(file)
                .ok_or_else(|| PlanError::MissingFile { file: file.clone() })?;

            let mut edits: Vec<&Change> = self.changes_for(file).collect();
            edits.sort_by_key(|c| c.span.start);

            // Verify all edits first.
            for change in &edits {
                let (start, end) = (change.span.start as usize, change.span.end as usize);
                if end > content.len() {
                    return Err(PlanError::SpanOutOfBounds {
                        file: file.clone(),
                        span: change.span,
                        len: content.len(),
                    });
                }
                if &content[start..end] != change.old_text {
                    return Err(PlanError::StaleChange {
                        file: file.clone(),
                        span: change.span,
                    });
                }
            }

            // Splice back-to-front.
            let mut updated = content.clone();
            for change in edits.iter().rev() {
                let (start, end) = (change.span.start as usize, change.span.end as usize);
                updated.replace_range(start..end, &change.new_text);
            }
            contents.insert(file.clone(), updated);
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod span_tests {
        use super::*;

        #[test]
        fn overlap_detection() {
            let a = Span::new(0, 5);
            let b = Span::new(3, 8);
            let c = Span::new(5, 9);
            assert!(a.overlaps(&b));
            assert!(!a.overlaps(&c)); // adjacent, not overlapping
            assert!(!c.overlaps(&a));
        }

        #[test]
        fn containment() {
            let outer = Span::new(0, 10);
            let inner = Span::new(2, 8);
            assert!(outer.contains(&inner));
            assert!(!inner.contains(&outer));
            assert!(outer.contains_offset(9));
            assert!(!outer.contains_offset(10));
        }

        #[test]
        #[should_panic]
        fn inverted_span_panics() {
            let _ = Span::new(5, 2);
        }
    }

    mod plan_tests {
        use super::*;

        fn change(file: &str, start: u32, end: u32, old: &str, new: &str) -> Change {
            Change::new(file, Span::new(start, end), old, new, "test change")
        }

        #[test]
        fn rejects_overlapping_changes_same_file() {
            let mut plan = RefactorPlan::new();
            plan.add_change(change("a.go", 0, 5, "hello", "HELLO")).unwrap();
            let err = plan.add_change(change("a.go", 4, 9, "o wor", "x")).unwrap_err();
            assert!(matches!(err, PlanError::OverlappingChange { .. }));
        }

        #[test]
        fn allows_same_span_in_different_files() {
            let mut plan = RefactorPlan::new();
            plan.add_change(change("a.go", 0, 5, "hello", "x")).unwrap();
            plan.add_change(change("b.go", 0, 5, "hello", "y")).unwrap();
            assert_eq!(plan.len(), 2);
            assert_eq!(plan.affected_files.len(), 2);
        }

        #[test]
        fn affected_files_in_first_touch_order() {
            let mut plan = RefactorPlan::new();
            plan.add_change(change("b.go", 0, 1, "h", "x")).unwrap();
            plan.add_change(change("a.go", 0, 1, "h", "y")).unwrap();
            plan.add_change(change("b.go", 5, 6, "w", "z")).unwrap();
            let files: Vec<_> = plan.affected_files.iter().map(|p| p.to_str().unwrap()).collect();
            assert_eq!(files, vec!["b.go", "a.go"]);
        }

        #[test]
        fn apply_splices_back_to_front() {
            let mut plan = RefactorPlan::new();
            plan.add_change(change("a.go", 0, 5, "hello", "goodbye")).unwrap();
            plan.add_change(change("a.go", 6, 11, "world", "moon")).unwrap();

            let mut contents = HashMap::new();
            contents.insert(PathBuf::from("a.go"), "hello world".to_string());
            plan.apply(&mut contents).unwrap();
            assert_eq!(contents[&PathBuf::from("a.go")], "goodbye moon");
        }

        #[test]
        fn apply_rejects_stale_content() {
            let mut plan = RefactorPlan::new();
            plan.add_change(change("a.go", 0, 5, "hello", "x")).unwrap();

            let mut contents = HashMap::new();
            contents.insert(PathBuf::from("a.go"), "HELLO world".to_string());
            let err = plan.apply(&mut contents).unwrap_err();
            assert!(matches!(err, PlanError::StaleChange { .. }));
            // Content untouched on failure.
            assert_eq!(contents[&PathBuf::from("a.go")], "HELLO world");
        }

        #[test]
        fn apply_rejects_missing_file() {
            let mut plan = RefactorPlan::new();
            plan.add_change(change("a.go", 0, 1, "h", "x")).unwrap();
            let mut contents = HashMap::new();
            assert!(matches!(
                plan.apply(&mut contents).unwrap_err(),
                PlanError::MissingFile { .. }
            ));
        }

        #[test]
        fn content_hash_is_stable() {
            let h1 = ContentHash::compute(b"package main");
            let h2 = ContentHash::compute(b"package main");
            let h3 = ContentHash::compute(b"package other");
            assert_eq!(h1, h2);
            assert_ne!(h1, h3);
        }

        #[test]
        fn merge_rechecks_overlap() {
            let mut a = RefactorPlan::new();
            a.add_change(change("a.go", 0, 5, "hello", "x")).unwrap();
            let mut b = RefactorPlan::new();
            b.add_change(change("a.go", 2, 7, "llo w", "y")).unwrap();
            assert!(a.merge(b).is_err());
        }

        #[test]
        fn plans_round_trip_through_json() {
            let mut plan = RefactorPlan::new();
            plan.record_file_hash("a.go", b"hello world");
            plan.add_change(change("a.go", 0, 5, "hello", "goodbye")).unwrap();

            let json = serde_json::to_string(&plan).unwrap();
            let back: RefactorPlan = serde_json::from_str(&json).unwrap();
            assert_eq!(back.changes, plan.changes);
            assert_eq!(back.affected_files, plan.affected_files);
            assert_eq!(back.file_hashes, plan.file_hashes);
        }
    }
}
