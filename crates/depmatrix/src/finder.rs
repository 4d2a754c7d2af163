//! Package lookup: turn a package name or path argument into a concrete
//! filesystem location, with optional dotted-name sub-limitations.

use std::env;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// One resolved root-package argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub path: PathBuf,
    /// Dotted-name suffixes limiting the recursive tree build.
    /// Empty means no restriction.
    pub limit_to: Vec<String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            limit_to: Vec::new(),
        }
    }

    pub fn with_limit(name: impl Into<String>, path: impl Into<PathBuf>, limit_to: Vec<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            limit_to,
        }
    }

    /// Whether this spec points at a single `.py` file rather than a
    /// package directory.
    pub fn is_module(&self) -> bool {
        self.path.extension().is_some_and(|ext| ext == "py")
    }

    /// Merge another spec's limitations into this one.
    pub fn add(&mut self, other: &PackageSpec) {
        for limit in &other.limit_to {
            if !self.limit_to.contains(limit) {
                self.limit_to.push(limit.clone());
            }
        }
    }

    /// Deduplicate specs referring to the same `(name, path)` pair,
    /// unioning their limitations. A spec with an empty `limit_to`
    /// absorbs the others unchanged (no restriction wins nothing extra,
    /// but the merged list still carries every requested sub-scope).
    pub fn combine(specs: Vec<PackageSpec>) -> Vec<PackageSpec> {
        let mut merged: Vec<PackageSpec> = Vec::new();
        for spec in specs {
            match merged
                .iter_mut()
                .find(|existing| existing.name == spec.name && existing.path == spec.path)
            {
                Some(existing) => existing.add(&spec),
                None => merged.push(spec),
            }
        }
        merged
    }
}

/// A single lookup strategy.
pub trait PackageFinder {
    fn find(&self, package: &str, enforce_init: bool) -> Option<PackageSpec>;
}

/// Finds local packages: a directory carrying `__init__.py` (any
/// directory when `enforce_init` is false), or a plain `.py` file.
pub struct LocalPackageFinder;

impl PackageFinder for LocalPackageFinder {
    fn find(&self, package: &str, enforce_init: bool) -> Option<PackageSpec> {
        let path = Path::new(package);
        if path.is_dir() {
            if path.join("__init__.py").is_file() || !enforce_init {
                let name = path.file_name()?.to_str()?.to_string();
                return Some(PackageSpec::new(name, path));
            }
        } else if path.is_file() && path.extension().is_some_and(|ext| ext == "py") {
            let name = path.file_stem()?.to_str()?.to_string();
            return Some(PackageSpec::new(name, path));
        }
        None
    }
}

/// Finds importable packages by scanning a list of search paths, the way
/// the interpreter would. Dotted names are split at the first dot: the
/// head is located, the remainder becomes a `limit_to` restriction.
pub struct PythonPathFinder {
    search_paths: Vec<PathBuf>,
}

impl PythonPathFinder {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Build search paths from the `PYTHONPATH` environment variable plus
    /// the current project's source root (pyproject.toml declaration or
    /// the conventional `src` / `lib/python` directories).
    pub fn from_environment() -> Self {
        let mut search_paths = Vec::new();
        if let Some(raw) = env::var_os("PYTHONPATH") {
            search_paths.extend(env::split_paths(&raw));
        }
        if let Ok(cwd) = env::current_dir() {
            if let Some(root) = detect_source_root(&cwd) {
                if !search_paths.contains(&root) {
                    search_paths.push(root);
                }
            }
        }
        Self { search_paths }
    }
}

impl PackageFinder for PythonPathFinder {
    fn find(&self, package: &str, enforce_init: bool) -> Option<PackageSpec> {
        let (root, rest) = match package.split_once('.') {
            Some((root, rest)) => (root, Some(rest)),
            None => (package, None),
        };
        let limit_to: Vec<String> = rest.map(str::to_string).into_iter().collect();

        for search_path in &self.search_paths {
            let dir = search_path.join(root);
            if dir.is_dir() && (dir.join("__init__.py").is_file() || !enforce_init) {
                return Some(PackageSpec::with_limit(root, dir, limit_to));
            }
            let file = search_path.join(format!("{root}.py"));
            if rest.is_none() && file.is_file() {
                return Some(PackageSpec::new(root, file));
            }
        }
        None
    }
}

/// Ordered list of finder strategies; the first hit wins.
pub struct Finder {
    finders: Vec<Box<dyn PackageFinder>>,
}

impl Finder {
    pub fn new(finders: Vec<Box<dyn PackageFinder>>) -> Self {
        Self { finders }
    }

    pub fn find(&self, package: &str, enforce_init: bool) -> Option<PackageSpec> {
        self.finders
            .iter()
            .find_map(|finder| finder.find(package, enforce_init))
    }
}

impl Default for Finder {
    fn default() -> Self {
        Self::new(vec![
            Box::new(LocalPackageFinder),
            Box::new(PythonPathFinder::from_environment()),
        ])
    }
}

fn parse_pyproject_source_root(project_root: &Path) -> Option<PathBuf> {
    let toml_path = project_root.join("pyproject.toml");
    let content = std::fs::read_to_string(toml_path).ok()?;
    let config: toml::Value = content.parse().ok()?;
    config
        .get("tool")
        .and_then(|tool| tool.get("setuptools"))
        .and_then(|setuptools| setuptools.get("packages"))
        .and_then(|packages| packages.get("find"))
        .and_then(|find| find.get("where"))
        .and_then(|along| along.as_array())
        .and_then(|entries| entries.first())
        .and_then(|entry| entry.as_str())
        .map(|rel| project_root.join(rel))
}

fn has_python_packages(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    WalkDir::new(path)
        .max_depth(2)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .any(|entry| {
            let path = entry.path();
            path.extension().is_some_and(|ext| ext == "py") || path.join("__init__.py").exists()
        })
}

/// Locate the directory holding a project's importable packages.
pub fn detect_source_root(project_root: &Path) -> Option<PathBuf> {
    if let Some(root) = parse_pyproject_source_root(project_root) {
        if root.is_dir() && has_python_packages(&root) {
            return Some(root);
        }
    }
    for candidate in ["src", "lib/python"] {
        let path = project_root.join(candidate);
        if path.is_dir() && has_python_packages(&path) {
            return Some(path);
        }
    }
    None
}
