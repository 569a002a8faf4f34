//! Workspace model: packages, files, module info, shared file set.
//!
//! A [`Workspace`] is built once from a root directory (or from in-memory
//! sources in tests) and is immutable afterwards: packages, files, symbol
//! tables, and the positional index are read concurrently by any number of
//! threads. The only post-load mutation anywhere in the engine is cache
//! invalidation, which lives in [`crate::cache`].
//!
//! File paths are stored relative to the workspace root, with the original
//! byte content kept verbatim on every [`File`]; fixers describe edits
//! against those bytes and never mutate them.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};

use tracing::debug;
use walkdir::WalkDir;

use gadfly_core::error::{GadflyError, GadflyResult};
use gadfly_core::patch::Span;
use gadfly_go_cst::pos::{FileSet, Pos, PosSpan, Position};
use gadfly_go_cst::{parse_file, SourceFile};

use crate::symbols::{extract_package, SymbolTable};
use crate::typeinfo::TypeInfo;

/// Directories never loaded into a workspace.
const SKIP_DIRS: &[&str] = &["vendor", "testdata", "node_modules"];

// ============================================================================
// Module Info
// ============================================================================

/// The module record from `go.mod`, when the workspace has one.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// The declared module path.
    pub path: String,
    /// Raw manifest content.
    pub raw: String,
}

impl ModuleInfo {
    /// Parse the `module` directive out of raw `go.mod` content.
    pub fn parse(raw: &str) -> Option<ModuleInfo> {
        let path = raw
            .lines()
            .map(str::trim)
            .find_map(|l| l.strip_prefix("module "))?
            .trim()
            .trim_matches('"')
            .to_string();
        Some(ModuleInfo {
            path,
            raw: raw.to_string(),
        })
    }
}

// ============================================================================
// File
// ============================================================================

/// A single parsed source file.
pub struct File {
    /// Path relative to the workspace root.
    pub path: PathBuf,
    /// Parsed syntax tree.
    pub ast: SourceFile,
    /// Original content; never mutated. All edits are byte offsets into it.
    pub content: String,
    /// Base offset in the workspace [`FileSet`].
    pub base: u32,
    /// Whether this is a `_test.go` file.
    pub is_test: bool,
    package: OnceLock<Weak<Package>>,
}

impl File {
    /// The containing package. Always present after workspace construction.
    pub fn package(&self) -> Option<Arc<Package>> {
        self.package.get().and_then(Weak::upgrade)
    }

    /// Workspace-global position of a file-local byte offset.
    pub fn pos(&self, offset: u32) -> Pos {
        Pos(self.base + offset)
    }

    /// Workspace-global span of a file-local byte span.
    pub fn pos_span(&self, span: Span) -> PosSpan {
        PosSpan::new(self.pos(span.start), self.pos(span.end))
    }

    /// File-local byte offset of a workspace-global position.
    pub fn local(&self, pos: Pos) -> u32 {
        pos.0 - self.base
    }

    /// Whether a global position falls inside this file.
    pub fn contains(&self, pos: Pos) -> bool {
        pos.0 >= self.base && pos.0 <= self.base + self.content.len() as u32
    }

    /// The global span covering the whole file.
    pub fn span(&self) -> PosSpan {
        PosSpan::new(Pos(self.base), Pos(self.base + self.content.len() as u32))
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("path", &self.path)
            .field("base", &self.base)
            .field("is_test", &self.is_test)
            .finish()
    }
}

// ============================================================================
// Package
// ============================================================================

/// A Go package: every `.go` file in one directory.
pub struct Package {
    /// Declared package name (from the package clauses).
    pub name: String,
    /// Directory relative to the workspace root.
    pub dir: PathBuf,
    /// Import path (module path + directory).
    pub import_path: String,
    /// Non-test files by file name.
    pub files: BTreeMap<String, Arc<File>>,
    /// Test files by file name.
    pub test_files: BTreeMap<String, Arc<File>>,
    /// Direct imports, first-seen order, deduplicated.
    pub imports: Vec<String>,
    symbols: OnceLock<Arc<SymbolTable>>,
    type_info: OnceLock<Arc<TypeInfo>>,
}

impl Package {
    /// The package symbol table, filled by the extractor during load.
    pub fn symbols(&self) -> Option<&Arc<SymbolTable>> {
        self.symbols.get()
    }

    /// Type info, present once the binder has run for this workspace.
    pub fn type_info(&self) -> Option<&Arc<TypeInfo>> {
        self.type_info.get()
    }

    /// Publish type info. A second call is a no-op (the first checker wins).
    pub fn set_type_info(&self, info: Arc<TypeInfo>) {
        let _ = self.type_info.set(info);
    }

    /// All files, non-test first, each group in name order.
    pub fn all_files(&self) -> impl Iterator<Item = &Arc<File>> {
        self.files.values().chain(self.test_files.values())
    }

    /// Look up a file of this package by workspace-relative path.
    pub fn file(&self, path: &Path) -> Option<&Arc<File>> {
        self.all_files().find(|f| f.path == path)
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("name", &self.name)
            .field("import_path", &self.import_path)
            .field("files", &self.files.len())
            .field("test_files", &self.test_files.len())
            .finish()
    }
}

// ============================================================================
// Workspace
// ============================================================================

/// An immutable-after-load view of a multi-package Go workspace.
#[derive(Debug)]
pub struct Workspace {
    /// Root filesystem path (absolute for loaded workspaces, empty for
    /// in-memory ones).
    pub root: PathBuf,
    /// Module record, when a `go.mod` was found.
    pub module: Option<ModuleInfo>,
    /// Packages by import path.
    pub packages: BTreeMap<String, Arc<Package>>,
    /// Import path to filesystem directory (workspace-relative).
    pub import_map: BTreeMap<String, PathBuf>,
    /// Shared positional index; every `Pos` in the workspace resolves here.
    pub fset: Arc<FileSet>,
    file_packages: HashMap<PathBuf, String>,
}

impl Workspace {
    /// Load a workspace from a directory tree.
    ///
    /// Walks the root with `vendor/`, `testdata/`, and hidden directories
    /// skipped, reads `go.mod` when present, parses every `.go` file, and
    /// extracts each package's symbol table.
    pub fn load(root: impl Into<PathBuf>) -> GadflyResult<Arc<Workspace>> {
        let root = root.into();
        let module = match fs::read_to_string(root.join("go.mod")) {
            Ok(raw) => ModuleInfo::parse(&raw),
            Err(_) => None,
        };

        let mut sources = Vec::new();
        for entry in WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !skip_dir(e))
        {
            let entry = entry.map_err(|e| GadflyError::FileSystemError {
                message: format!("workspace walk failed: {}", e),
                path: root.display().to_string(),
                cause: None,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("go") {
                continue;
            }
            let content = fs::read_to_string(path)
                .map_err(|e| GadflyError::fs("read failed", path.display().to_string(), e))?;
            let rel = path
                .strip_prefix(&root)
                .unwrap_or(path)
                .to_path_buf();
            sources.push((rel, content));
        }

        debug!(files = sources.len(), root = %root.display(), "loading workspace");
        Self::assemble(root, module, sources)
    }

    /// Build an in-memory workspace from `(relative path, content)` pairs.
    ///
    /// The module path is used to derive package import paths exactly as a
    /// `go.mod` would.
    pub fn from_sources(
        module_path: &str,
        sources: &[(&str, &str)],
    ) -> GadflyResult<Arc<Workspace>> {
        let module = ModuleInfo {
            path: module_path.to_string(),
            raw: format!("module {}\n", module_path),
        };
        let sources = sources
            .iter()
            .map(|(p, c)| (PathBuf::from(p), c.to_string()))
            .collect();
        Self::assemble(PathBuf::new(), Some(module), sources)
    }

    fn assemble(
        root: PathBuf,
        module: Option<ModuleInfo>,
        mut sources: Vec<(PathBuf, String)>,
    ) -> GadflyResult<Arc<Workspace>> {
        sources.sort_by(|a, b| a.0.cmp(&b.0));

        let mut fset = FileSet::new();
        let mut parsed: Vec<Arc<File>> = Vec::with_capacity(sources.len());
        for (path, content) in sources {
            let base = fset.add(path.clone(), &content);
            let ast = parse_file(&content).map_err(|e| GadflyError::ParseError {
                message: e.message.clone(),
                file: path.display().to_string(),
                line: e.line,
                col: e.col,
                cause: Some(Box::new(e)),
            })?;
            let is_test = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with("_test.go"))
                .unwrap_or(false);
            parsed.push(Arc::new(File {
                path,
                ast,
                content,
                base,
                is_test,
                package: OnceLock::new(),
            }));
        }
        let fset = Arc::new(fset);

        // Group files by directory.
        let mut by_dir: BTreeMap<PathBuf, Vec<Arc<File>>> = BTreeMap::new();
        for file in parsed {
            let dir = file.path.parent().unwrap_or(Path::new("")).to_path_buf();
            by_dir.entry(dir).or_default().push(file);
        }

        let mut packages = BTreeMap::new();
        let mut import_map = BTreeMap::new();
        let mut file_packages = HashMap::new();
        for (dir, files) in by_dir {
            let import_path = import_path_for(&dir, module.as_ref(), &files);
            let name = files
                .iter()
                .find(|f| !f.is_test)
                .or(files.first())
                .map(|f| f.ast.package.name.clone())
                .unwrap_or_default();

            let mut non_test = BTreeMap::new();
            let mut test = BTreeMap::new();
            let mut imports: Vec<String> = Vec::new();
            for file in &files {
                let file_name = file
                    .path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                for import in &file.ast.imports {
                    if !imports.contains(&import.path) {
                        imports.push(import.path.clone());
                    }
                }
                file_packages.insert(file.path.clone(), import_path.clone());
                if file.is_test {
                    test.insert(file_name, file.clone());
                } else {
                    non_test.insert(file_name, file.clone());
                }
            }

            let pkg = Arc::new_cyclic(|weak: &Weak<Package>| {
                for file in &files {
                    let _ = file.package.set(weak.clone());
                }
                Package {
                    name,
                    dir: dir.clone(),
                    import_path: import_path.clone(),
                    files: non_test,
                    test_files: test,
                    imports,
                    symbols: OnceLock::new(),
                    type_info: OnceLock::new(),
                }
            });

            // Symbol extraction happens before the package is visible to
            // any resolver, including the second-pass Parent fixup.
            let table = extract_package(&pkg, &fset);
            let _ = pkg.symbols.set(Arc::new(table));

            import_map.insert(import_path.clone(), dir);
            packages.insert(import_path, pkg);
        }

        Ok(Arc::new(Workspace {
            root,
            module,
            packages,
            import_map,
            fset,
            file_packages,
        }))
    }

    /// The package with the given import path.
    pub fn package(&self, import_path: &str) -> Option<&Arc<Package>> {
        self.packages.get(import_path)
    }

    /// The import path of the package containing a file.
    pub fn import_path_of(&self, file: &Path) -> Option<&str> {
        self.file_packages.get(file).map(String::as_str)
    }

    /// The package containing a file.
    pub fn package_of(&self, file: &Path) -> Option<&Arc<Package>> {
        self.packages.get(self.import_path_of(file)?)
    }

    /// Look up a file by workspace-relative path.
    pub fn file(&self, path: &Path) -> Option<Arc<File>> {
        self.package_of(path)?.file(path).cloned()
    }

    /// All files across all packages, package order then name order.
    pub fn files(&self) -> Vec<Arc<File>> {
        self.packages
            .values()
            .flat_map(|p| p.all_files().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Resolve a global position through the shared file set.
    pub fn position(&self, pos: Pos) -> Option<Position> {
        self.fset.position(pos)
    }
}

fn skip_dir(entry: &walkdir::DirEntry) -> bool {
    // The walk root itself is never filtered, whatever it is named.
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    (name.starts_with('.') && name.len() > 1) || SKIP_DIRS.contains(&name.as_ref())
}

fn import_path_for(dir: &Path, module: Option<&ModuleInfo>, files: &[Arc<File>]) -> String {
    let dir_str = dir.to_string_lossy().replace('\\', "/");
    match module {
        Some(m) if dir_str.is_empty() => m.path.clone(),
        Some(m) => format!("{}/{}", m.path, dir_str),
        None if dir_str.is_empty() => files
            .first()
            .map(|f| f.ast.package.name.clone())
            .unwrap_or_default(),
        None => dir_str,
    }
}

// ============================================================================
// Tests
// ============================================================================
