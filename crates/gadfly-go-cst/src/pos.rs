//! Workspace-global positions.
//!
//! Syntax trees carry file-local byte spans. A [`FileSet`] assigns every file
//! a base offset so that a single integer ([`Pos`]) identifies a byte in any
//! file of the workspace, and positions from different files are comparable
//! and hashable. This mirrors the file-set convention of Go's own tooling.
//!
//! Bases start at 1 so that `Pos(0)` can mean "no position".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use gadfly_core::patch::Span;

// ============================================================================
// Pos / PosSpan
// ============================================================================

/// A workspace-global byte position. `Pos(0)` is "no position".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Pos(pub u32);

impl Pos {
    /// The absent position.
    pub const NONE: Pos = Pos(0);

    /// Check whether this position refers to a real location.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// A half-open range of workspace-global positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PosSpan {
    pub start: Pos,
    pub end: Pos,
}

impl PosSpan {
    pub fn new(start: Pos, end: Pos) -> Self {
        PosSpan { start, end }
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.start <= pos && pos < self.end
    }

    /// True when `other` lies entirely within this span.
    pub fn contains_span(&self, other: &PosSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &PosSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A resolved position: file path plus 0-based offset and 1-based line/column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub file: PathBuf,
    pub offset: u32,
    pub line: u32,
    pub col: u32,
}

// ============================================================================
// FileSet
// ============================================================================

#[derive(Debug, Clone)]
struct FileRecord {
    path: PathBuf,
    base: u32,
    size: u32,
    /// Byte offset of the start of each line (line_starts[0] == 0).
    line_starts: Vec<u32>,
}

/// The shared positional index of a workspace.
///
/// Files are added once during load; the set is frozen afterwards and read
/// concurrently. Every position value produced anywhere in the workspace is
/// interpreted through the same `FileSet`.
#[derive(Debug, Default, Clone)]
pub struct FileSet {
    files: Vec<FileRecord>,
}

impl FileSet {
    pub fn new() -> Self {
        FileSet::default()
    }

    /// Register a file and return its base offset.
    ///
    /// Local offset `o` in this file maps to global position `base + o`.
    pub fn add(&mut self, path: impl Into<PathBuf>, content: &str) -> u32 {
        let base = self
            .files
            .last()
            .map(|f| f.base + f.size + 1)
            .unwrap_or(1);

        let mut line_starts = vec![0u32];
        let bytes = content.as_bytes();
        let mut at = 0usize;
        while let Some(i) = memchr::memchr(b'\n', &bytes[at..]) {
            at += i + 1;
            line_starts.push(at as u32);
        }

        self.files.push(FileRecord {
            path: path.into(),
            base,
            size: content.len() as u32,
            line_starts,
        });
        base
    }

    /// Number of files in the set.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The global position for a file-local span, given the file's base.
    pub fn span(&self, base: u32, local: Span) -> PosSpan {
        PosSpan::new(Pos(base + local.start), Pos(base + local.end))
    }

    /// The global position for a file-local offset, given the file's base.
    pub fn pos(&self, base: u32, offset: u32) -> Pos {
        Pos(base + offset)
    }

    fn record_containing(&self, pos: Pos) -> Option<&FileRecord> {
        if !pos.is_valid() {
            return None;
        }
        let idx = self
            .files
            .partition_point(|f| f.base <= pos.0)
            .checked_sub(1)?;
        let rec = &self.files[idx];
        (pos.0 <= rec.base + rec.size).then_some(rec)
    }

    /// The file containing a position, with the file-local offset.
    pub fn file_of(&self, pos: Pos) -> Option<(&Path, u32)> {
        let rec = self.record_containing(pos)?;
        Some((rec.path.as_path(), pos.0 - rec.base))
    }

    /// Resolve a global position to file/offset/line/column.
    pub fn position(&self, pos: Pos) -> Option<Position> {
        let rec = self.record_containing(pos)?;
        let offset = pos.0 - rec.base;
        let line_idx = rec
            .line_starts
            .partition_point(|&s| s <= offset)
            .saturating_sub(1);
        let col = offset - rec.line_starts[line_idx] + 1;
        Some(Position {
            file: rec.path.clone(),
            offset,
            line: line_idx as u32 + 1,
            col,
        })
    }

    /// The global span covering a whole file, by path.
    pub fn file_span(&self, path: &Path) -> Option<PosSpan> {
        let rec = self.files.iter().find(|f| f.path == path)?;
        Some(PosSpan::new(Pos(rec.base), Pos(rec.base + rec.size)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_comparable_across_files() {
        let mut fset = FileSet::new();
        let a = fset.add("a.go", "package a\n");
        let b = fset.add("b.go", "package b\n");
        assert!(a < b);
        assert!(fset.pos(a, 0) < fset.pos(b, 0));
    }

    #[test]
    fn position_resolution() {
        let mut fset = FileSet::new();
        let base = fset.add("a.go", "package a\n\nfunc F() {}\n");
        let p = fset.position(fset.pos(base, 11)).unwrap();
        assert_eq!(p.file, PathBuf::from("a.go"));
        assert_eq!(p.offset, 11);
        assert_eq!(p.line, 3);
        assert_eq!(p.col, 1);
    }

    #[test]
    fn file_of_second_file() {
        let mut fset = FileSet::new();
        fset.add("a.go", "package a\n");
        let b = fset.add("b.go", "package b\n");
        let (path, off) = fset.file_of(fset.pos(b, 8)).unwrap();
        assert_eq!(path, Path::new("b.go"));
        assert_eq!(off, 8);
    }

    #[test]
    fn invalid_pos_resolves_to_none() {
        let fset = FileSet::new();
        assert!(fset.position(Pos::NONE).is_none());
        assert!(!Pos::NONE.is_valid());
    }

    #[test]
    fn span_containment() {
        let outer = PosSpan::new(Pos(10), Pos(50));
        let inner = PosSpan::new(Pos(12), Pos(20));
        assert!(outer.contains_span(&inner));
        assert!(outer.contains(Pos(49)));
        assert!(!outer.contains(Pos(50)));
    }

    #[test]
    fn positions_serialize_for_output() {
        let mut fset = FileSet::new();
        let base = fset.add("a.go", "package a\n");
        let position = fset.position(fset.pos(base, 8)).unwrap();
        let json = serde_json::to_string(&position).unwrap();
        assert!(json.contains("\"line\":1"));
        assert!(json.contains("\"col\":9"));
    }
}
