//! The DSM root: package tree construction, import resolution and the
//! matrix/graph/treemap projections.
//!
//! A [`Dsm`] is built once from a list of package arguments and is
//! immutable afterwards. Lookup results (target resolution, item lookup,
//! containment, per-depth matrices) are memoized in caches that are never
//! invalidated; the immutable-after-build tree makes that safe.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::error::Error;
use crate::finder::{Finder, PackageSpec};
use crate::graph::Graph;
use crate::matrix::Matrix;
use crate::node::{
    Dependency, DependencyTarget, ModuleData, NodeData, NodeId, NodeKind, PackageData,
};
use crate::parser::{self, ImportKind};
use crate::render::{Render, RenderOptions, json_string};
use crate::treemap::TreeMap;

const EMPTY_CHILDREN: &[NodeId] = &[];

/// Root of the package tree, with DSM-building capabilities.
pub struct Dsm {
    base_packages: Vec<String>,
    nodes: Vec<NodeData>,
    /// Root-level modules (a `.py` file passed directly as an argument).
    modules: Vec<NodeId>,
    /// Root packages, in argument order after spec combination.
    packages: Vec<NodeId>,
    not_found: Vec<String>,
    enforce_init: bool,
    target_cache: RefCell<HashMap<String, Option<NodeId>>>,
    item_cache: RefCell<HashMap<String, Option<NodeId>>>,
    contains_cache: RefCell<HashMap<(NodeId, NodeId), bool>>,
    matrix_cache: RefCell<HashMap<usize, Matrix>>,
}

impl Dsm {
    /// Build a DSM for the given packages, requiring `__init__.py`
    /// markers on package directories.
    pub fn new(packages: &[&str]) -> Dsm {
        Self::with_finder(packages, true, &Finder::default())
    }

    /// Build a DSM with an explicit `enforce_init` choice. Passing
    /// `false` treats any subdirectory as a package (greedy mode).
    pub fn with_options(packages: &[&str], enforce_init: bool) -> Dsm {
        Self::with_finder(packages, enforce_init, &Finder::default())
    }

    /// Build a DSM using a custom finder strategy list.
    pub fn with_finder(packages: &[&str], enforce_init: bool, finder: &Finder) -> Dsm {
        let mut specs = Vec::new();
        let mut not_found = Vec::new();
        for package in packages {
            match finder.find(package, enforce_init) {
                Some(spec) => specs.push(spec),
                None => not_found.push((*package).to_string()),
            }
        }
        if specs.is_empty() {
            eprintln!("depmatrix: empty DSM.");
        }
        for package in &not_found {
            eprintln!("depmatrix: not found: {package}.");
        }
        let specs = PackageSpec::combine(specs);

        let mut dsm = Dsm {
            base_packages: packages.iter().map(|package| (*package).to_string()).collect(),
            nodes: Vec::new(),
            modules: Vec::new(),
            packages: Vec::new(),
            not_found,
            enforce_init,
            target_cache: RefCell::new(HashMap::new()),
            item_cache: RefCell::new(HashMap::new()),
            contains_cache: RefCell::new(HashMap::new()),
            matrix_cache: RefCell::new(HashMap::new()),
        };
        dsm.build_tree(specs);
        dsm.build_dependencies();
        dsm
    }

    /// The package arguments this DSM was built from.
    pub fn base_packages(&self) -> &[String] {
        &self.base_packages
    }

    /// Package names that could not be located.
    pub fn not_found(&self) -> &[String] {
        &self.not_found
    }

    /// Whether nothing at all was found.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.packages.is_empty()
    }

    // ------------------------------------------------------------------
    // Tree construction
    // ------------------------------------------------------------------

    fn build_tree(&mut self, specs: Vec<PackageSpec>) {
        for spec in specs {
            if spec.is_module() {
                let id = self.push_module(spec.name, spec.path, None);
                self.modules.push(id);
            } else {
                let id = self.build_package(spec.name, spec.path, None, spec.limit_to);
                self.packages.push(id);
            }
        }
    }

    fn push_module(&mut self, name: String, path: PathBuf, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            name,
            parent,
            kind: NodeKind::Module(ModuleData {
                path,
                dependencies: Vec::new(),
            }),
        });
        id
    }

    fn build_package(
        &mut self,
        name: String,
        path: PathBuf,
        parent: Option<NodeId>,
        limit_to: Vec<String>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            name,
            parent,
            kind: NodeKind::Package(PackageData {
                path: path.clone(),
                modules: Vec::new(),
                packages: Vec::new(),
            }),
        });

        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(err) => {
                eprintln!("depmatrix: cannot read {}: {err}.", path.display());
                return id;
            }
        };
        let (heads, child_limits) = split_limit_heads(&limit_to);

        for entry in entries.flatten() {
            let child_path = entry.path();
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if child_path.is_file() && file_name.ends_with(".py") {
                let stem = file_name.trim_end_matches(".py").to_string();
                if limit_to.is_empty() || heads.iter().any(|head| *head == stem) {
                    let module = self.push_module(stem, child_path, Some(id));
                    self.package_data_mut(id).modules.push(module);
                }
            } else if child_path.is_dir()
                && (child_path.join("__init__.py").is_file() || !self.enforce_init)
                && (heads.is_empty() || heads.iter().any(|head| *head == file_name))
            {
                let child = self.build_package(file_name, child_path, Some(id), child_limits.clone());
                self.package_data_mut(id).packages.push(child);
            }
        }
        id
    }

    fn package_data_mut(&mut self, id: NodeId) -> &mut PackageData {
        match &mut self.nodes[id.index()].kind {
            NodeKind::Package(data) => data,
            NodeKind::Module(_) => unreachable!("package children are only attached to packages"),
        }
    }

    // ------------------------------------------------------------------
    // Node accessors
    // ------------------------------------------------------------------

    /// Local (undotted) name of a node.
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].name
    }

    /// Parent package of a node, if any.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn is_module(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.index()].kind, NodeKind::Module(_))
    }

    pub fn is_package(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.index()].kind, NodeKind::Package(_))
    }

    /// Filesystem path behind a node.
    pub fn path(&self, id: NodeId) -> &Path {
        match &self.nodes[id.index()].kind {
            NodeKind::Module(data) => &data.path,
            NodeKind::Package(data) => &data.path,
        }
    }

    /// Dependencies of a module; empty for packages.
    pub fn dependencies(&self, id: NodeId) -> &[Dependency] {
        match &self.nodes[id.index()].kind {
            NodeKind::Module(data) => &data.dependencies,
            NodeKind::Package(_) => &[],
        }
    }

    /// Nesting depth: 1 for a root node, +1 per level.
    pub fn node_depth(&self, id: NodeId) -> usize {
        let mut depth = 1;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Dot-joined name from the root, truncated at `depth` components.
    /// A `depth` below 1 means the full name.
    pub fn absolute_name(&self, id: NodeId, depth: usize) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            parts.push(self.nodes[node.index()].name.as_str());
            current = self.parent(node);
        }
        parts.reverse();
        if depth >= 1 && depth < parts.len() {
            parts.truncate(depth);
        }
        parts.join(".")
    }

    /// Root-level modules.
    pub fn root_modules(&self) -> &[NodeId] {
        &self.modules
    }

    /// Root packages.
    pub fn root_packages(&self) -> &[NodeId] {
        &self.packages
    }

    /// All modules of the tree, in tree order: the root's own modules
    /// first, then each package subtree in discovery order.
    pub fn submodules(&self) -> Vec<NodeId> {
        let mut submodules = self.modules.clone();
        for &package in &self.packages {
            submodules.extend(self.subtree_modules(package));
        }
        submodules
    }

    /// Modules under a node, in tree order. A module yields itself.
    pub fn subtree_modules(&self, id: NodeId) -> Vec<NodeId> {
        match &self.nodes[id.index()].kind {
            NodeKind::Module(_) => vec![id],
            NodeKind::Package(data) => {
                let mut submodules = data.modules.clone();
                for &package in &data.packages {
                    submodules.extend(self.subtree_modules(package));
                }
                submodules
            }
        }
    }

    fn scope_children(&self, scope: Option<NodeId>) -> (&[NodeId], &[NodeId]) {
        match scope {
            None => (&self.modules, &self.packages),
            Some(id) => match &self.nodes[id.index()].kind {
                NodeKind::Package(data) => (&data.modules, &data.packages),
                NodeKind::Module(_) => (EMPTY_CHILDREN, EMPTY_CHILDREN),
            },
        }
    }

    /// The `__init__` module of a package, if present.
    pub fn init_module_of(&self, package: NodeId) -> Option<NodeId> {
        let (modules, _) = self.scope_children(Some(package));
        modules.iter().copied().find(|&module| self.name(module) == "__init__")
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Fetch a node by its dotted name relative to the root.
    pub fn get(&self, dotted: &str) -> Option<NodeId> {
        if let Some(&cached) = self.item_cache.borrow().get(dotted) {
            return cached;
        }
        let found = self.lookup_item(None, dotted);
        self.item_cache.borrow_mut().insert(dotted.to_string(), found);
        found
    }

    fn lookup_item(&self, scope: Option<NodeId>, dotted: &str) -> Option<NodeId> {
        let (head, rest) = match dotted.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (dotted, None),
        };
        let (modules, packages) = self.scope_children(scope);
        for &module in modules {
            if self.name(module) == head && rest.is_none() {
                return Some(module);
            }
        }
        for &package in packages {
            if self.name(package) == head {
                match rest {
                    None => return Some(package),
                    Some(rest) => {
                        if let Some(found) = self.lookup_item(Some(package), rest) {
                            return Some(found);
                        }
                    }
                }
            }
        }
        None
    }

    /// Resolve an import target string to an internal node, or `None`
    /// when the target lives outside the scanned packages. Memoized.
    pub fn get_target(&self, target: &str) -> Option<NodeId> {
        if let Some(&cached) = self.target_cache.borrow().get(target) {
            return cached;
        }
        let found = self.lookup_target(None, target);
        self.target_cache.borrow_mut().insert(target.to_string(), found);
        found
    }

    fn lookup_target(&self, scope: Option<NodeId>, target: &str) -> Option<NodeId> {
        let depth = target.matches('.').count() + 1;
        let (head, rest) = match target.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (target, None),
        };
        let (modules, packages) = self.scope_children(scope);
        for &module in modules {
            // The depth bound avoids false positives against deeply
            // dotted attribute chains sharing a module's name.
            if self.name(module) == head && depth < 3 {
                return Some(module);
            }
        }
        for &package in packages {
            if self.name(package) == head {
                match rest {
                    None => return Some(package),
                    Some(rest) => {
                        if let Some(found) = self.lookup_target(Some(package), rest) {
                            return Some(found);
                        }
                        // The import names something inside the package
                        // we could not pin down; attribute it coarsely
                        // to the package itself.
                        if depth < 3 {
                            return Some(package);
                        }
                    }
                }
            }
        }
        None
    }

    /// Whether `item` lives inside `container`. An `__init__` module and
    /// its package contain each other (they are the same import target).
    pub fn node_contains(&self, container: NodeId, item: NodeId) -> bool {
        if container == item {
            return true;
        }
        if let Some(&cached) = self.contains_cache.borrow().get(&(container, item)) {
            return cached;
        }
        let result = match &self.nodes[container.index()].kind {
            NodeKind::Module(_) => {
                self.nodes[container.index()].name == "__init__"
                    && self.nodes[container.index()].parent == Some(item)
            }
            NodeKind::Package(data) => data
                .modules
                .iter()
                .chain(data.packages.iter())
                .any(|&child| self.node_contains(child, item)),
        };
        self.contains_cache.borrow_mut().insert((container, item), result);
        result
    }

    /// Number of resolved, non-external dependencies from `from`'s
    /// subtree into `to`'s subtree.
    pub fn cardinal(&self, from: NodeId, to: NodeId) -> usize {
        match &self.nodes[from.index()].kind {
            NodeKind::Module(data) => data
                .dependencies
                .iter()
                .filter(|dep| {
                    dep.target
                        .node()
                        .is_some_and(|target| self.node_contains(to, target))
                })
                .count(),
            NodeKind::Package(_) => self
                .subtree_modules(from)
                .iter()
                .map(|&module| self.cardinal(module, to))
                .sum(),
        }
    }

    // ------------------------------------------------------------------
    // Dependency building
    // ------------------------------------------------------------------

    fn build_dependencies(&mut self) {
        let module_ids = self.submodules();
        let mut resolved = Vec::with_capacity(module_ids.len());
        for id in module_ids {
            resolved.push((id, self.resolve_module(id)));
        }
        for (id, dependencies) in resolved {
            if let NodeKind::Module(data) = &mut self.nodes[id.index()].kind {
                data.dependencies = dependencies;
            }
        }
    }

    fn resolve_module(&self, module: NodeId) -> Vec<Dependency> {
        let path = match &self.nodes[module.index()].kind {
            NodeKind::Module(data) => data.path.clone(),
            NodeKind::Package(_) => return Vec::new(),
        };
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                eprintln!("depmatrix: skipping unreadable {}: {err}.", path.display());
                return Vec::new();
            }
        };
        // Sources in a non-UTF-8 encoding are decoded lossily; only the
        // import statements matter, and those are ASCII-named in practice.
        let source = String::from_utf8_lossy(&bytes);
        let statements = match parser::extract_imports(&source) {
            Ok(statements) => statements,
            Err(message) => {
                eprintln!("depmatrix: skipping unparseable {}: {message}.", path.display());
                return Vec::new();
            }
        };

        let mut dependencies = Vec::with_capacity(statements.len());
        for statement in statements {
            let target_name = match statement.kind {
                ImportKind::Import { name } => name,
                ImportKind::FromImport {
                    module: from_module,
                    name,
                    level,
                } => {
                    let mut target = String::new();
                    if level > 0 {
                        // A relative import walks `level` steps up the
                        // importing module's own dotted name.
                        let own_depth = self.node_depth(module);
                        target.push_str(
                            &self.absolute_name(module, own_depth.saturating_sub(level as usize)),
                        );
                        target.push('.');
                    }
                    if let Some(from_module) = from_module {
                        target.push_str(&from_module);
                        target.push('.');
                    }
                    target.push_str(&name);
                    target
                }
            };

            let dependency = match self.get_target(&target_name) {
                Some(found) => {
                    let last = target_name.rsplit('.').next().unwrap_or(target_name.as_str());
                    let what = (last != self.name(found)).then(|| last.to_string());
                    let target = if self.is_package(found) {
                        DependencyTarget::Package(found)
                    } else {
                        DependencyTarget::Module(found)
                    };
                    Dependency {
                        source: module,
                        lineno: statement.lineno,
                        target,
                        what,
                    }
                }
                None => Dependency {
                    source: module,
                    lineno: statement.lineno,
                    target: DependencyTarget::External(target_name),
                    what: None,
                },
            };
            dependencies.push(dependency);
        }
        dependencies
    }

    // ------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------

    /// The dependency matrix at the given depth (0 = no aggregation).
    /// Cached per depth; the tree never changes, so neither does the
    /// cached matrix.
    pub fn as_matrix(&self, depth: usize) -> Matrix {
        if let Some(cached) = self.matrix_cache.borrow().get(&depth) {
            return cached.clone();
        }
        let mut inputs: Vec<NodeId> = self.packages.clone();
        inputs.extend(&self.modules);
        let matrix = Matrix::build(self, &inputs, depth);
        self.matrix_cache.borrow_mut().insert(depth, matrix.clone());
        matrix
    }

    /// A matrix restricted to explicit starting nodes.
    pub fn matrix_for(&self, nodes: &[NodeId], depth: usize) -> Matrix {
        Matrix::build(self, nodes, depth)
    }

    /// The graph projection of the matrix at the given depth.
    pub fn as_graph(&self, depth: usize) -> Graph {
        Graph::from_matrix(&self.as_matrix(depth))
    }

    /// The treemap projection. Sizing model undecided; renders empty.
    pub fn as_treemap(&self) -> TreeMap {
        TreeMap::new()
    }

    // ------------------------------------------------------------------
    // Dependency-list rendering
    // ------------------------------------------------------------------

    /// Human-readable description of one dependency edge.
    pub fn describe(&self, dep: &Dependency) -> String {
        let target = match &dep.target {
            DependencyTarget::External(name) => name.clone(),
            DependencyTarget::Module(id) | DependencyTarget::Package(id) => {
                self.absolute_name(*id, 0)
            }
        };
        let source = self.name(dep.source);
        match &dep.what {
            Some(what) => format!("{source} imports {what} from {target} (line {})", dep.lineno),
            None => format!("{source} imports {target} (line {})", dep.lineno),
        }
    }

    fn module_deps_text(&self, module: NodeId, current: usize, step: usize, out: &mut String) {
        out.push_str(&format!("{:current$}{}\n", "", self.name(module)));
        for dep in self.dependencies(module) {
            let marker = if dep.external() { "! " } else { "" };
            let width = current + step;
            out.push_str(&format!("{:width$}{marker}{}\n", "", self.describe(dep)));
        }
    }

    fn package_deps_text(&self, package: NodeId, current: usize, step: usize, out: &mut String) {
        out.push_str(&format!("{:current$}{}\n", "", self.absolute_name(package, 0)));
        let (modules, packages) = self.scope_children(Some(package));
        for &module in modules {
            self.module_deps_text(module, current + step, step, out);
        }
        for &child in packages {
            self.package_deps_text(child, current + step, step, out);
        }
    }

    fn dependency_target_string(&self, dep: &Dependency) -> String {
        match &dep.target {
            DependencyTarget::External(name) => name.clone(),
            DependencyTarget::Module(id) | DependencyTarget::Package(id) => {
                self.absolute_name(*id, 0)
            }
        }
    }

    fn module_json(&self, module: NodeId) -> serde_json::Value {
        json!({
            "name": self.name(module),
            "path": self.path(module).to_string_lossy(),
            "dependencies": self
                .dependencies(module)
                .iter()
                .map(|dep| {
                    json!({
                        "target": self.dependency_target_string(dep),
                        "lineno": dep.lineno,
                        "what": dep.what,
                        "external": dep.external(),
                    })
                })
                .collect::<Vec<_>>(),
        })
    }

    fn package_json(&self, package: NodeId) -> serde_json::Value {
        let (modules, packages) = self.scope_children(Some(package));
        json!({
            "name": self.absolute_name(package, 0),
            "path": self.path(package).to_string_lossy(),
            "modules": modules.iter().map(|&module| self.module_json(module)).collect::<Vec<_>>(),
            "packages": packages.iter().map(|&child| self.package_json(child)).collect::<Vec<_>>(),
        })
    }
}

impl fmt::Display for Dsm {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .packages
            .iter()
            .chain(self.modules.iter())
            .map(|&id| self.name(id))
            .collect();
        write!(formatter, "Dependency DSM for packages: [{}]", names.join(", "))
    }
}

impl Render for Dsm {
    fn to_text(&self, options: &RenderOptions) -> String {
        let step = options.text_indent();
        let mut out = format!("{self}\n");
        for &module in &self.modules {
            self.module_deps_text(module, step, step, &mut out);
        }
        for &package in &self.packages {
            self.package_deps_text(package, step, step, &mut out);
        }
        out
    }

    fn to_csv(&self) -> Result<String, Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["module", "path", "target", "lineno", "what", "external"])?;
        for module in self.submodules() {
            let module_name = self.absolute_name(module, 0);
            let path = self.path(module).to_string_lossy().into_owned();
            for dep in self.dependencies(module) {
                writer.write_record([
                    module_name.as_str(),
                    path.as_str(),
                    self.dependency_target_string(dep).as_str(),
                    dep.lineno.to_string().as_str(),
                    dep.what.as_deref().unwrap_or(""),
                    if dep.external() { "true" } else { "false" },
                ])?;
            }
        }
        let buffer = writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn to_json(&self, indent: Option<usize>) -> Result<String, Error> {
        let value = json!({
            "name": self.to_string(),
            "modules": self.modules.iter().map(|&module| self.module_json(module)).collect::<Vec<_>>(),
            "packages": self.packages.iter().map(|&package| self.package_json(package)).collect::<Vec<_>>(),
        });
        json_string(&value, indent)
    }
}

fn split_limit_heads(limit_to: &[String]) -> (Vec<String>, Vec<String>) {
    let mut heads = Vec::new();
    let mut rest = Vec::new();
    for limit in limit_to {
        match limit.split_once('.') {
            Some((head, tail)) => {
                heads.push(head.to_string());
                rest.push(tail.to_string());
            }
            None => heads.push(limit.clone()),
        }
    }
    (heads, rest)
}
