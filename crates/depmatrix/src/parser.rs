//! Static import extraction from Python sources.
//!
//! Parses a module with ruff's parser and collects every `import` /
//! `from … import` statement, including statements nested inside
//! function and class bodies, conditionals, `with` blocks and all parts
//! of `try` statements. Imports inside loops and `match` arms are out of
//! scope: those are treated as dynamic enough to be meaningless for a
//! static dependency matrix.

use ruff_python_ast::{ExceptHandler, Stmt, StmtImport, StmtImportFrom};
use ruff_python_parser::parse_module;

/// One name extracted from an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    pub lineno: u32,
    pub kind: ImportKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    /// `import a.b` — one entry per comma-separated name.
    Import { name: String },
    /// `from M import x` — one entry per imported name. `level` is the
    /// number of leading dots; `module` is absent for `from . import x`.
    FromImport {
        module: Option<String>,
        name: String,
        level: u32,
    },
}

/// Extract all import statements from a module source.
///
/// Returns `Err` with the parser's message when the source does not
/// parse; callers treat that as "no imports" and keep scanning.
pub fn extract_imports(source: &str) -> Result<Vec<ImportStatement>, String> {
    let parsed = parse_module(source).map_err(|err| err.to_string())?;
    let lines = LineIndex::new(source);

    let mut imports = Vec::new();
    visit_stmts(parsed.suite(), &lines, &mut imports);
    Ok(imports)
}

fn visit_stmts(stmts: &[Stmt], lines: &LineIndex, imports: &mut Vec<ImportStatement>) {
    for stmt in stmts {
        match stmt {
            Stmt::Import(StmtImport { names, range, .. }) => {
                let lineno = lines.line_of(range.start().to_usize());
                for alias in names {
                    imports.push(ImportStatement {
                        lineno,
                        kind: ImportKind::Import {
                            name: alias.name.to_string(),
                        },
                    });
                }
            }
            Stmt::ImportFrom(StmtImportFrom {
                module,
                names,
                level,
                range,
                ..
            }) => {
                let lineno = lines.line_of(range.start().to_usize());
                for alias in names {
                    imports.push(ImportStatement {
                        lineno,
                        kind: ImportKind::FromImport {
                            module: module.as_ref().map(|name| name.as_str().to_string()),
                            name: alias.name.to_string(),
                            level: *level,
                        },
                    });
                }
            }
            _ => {}
        }

        // Containers that can legally hide imports. Loops and `match`
        // statements are intentionally absent.
        match stmt {
            Stmt::FunctionDef(func) => visit_stmts(&func.body, lines, imports),
            Stmt::ClassDef(class) => visit_stmts(&class.body, lines, imports),
            Stmt::If(if_stmt) => {
                visit_stmts(&if_stmt.body, lines, imports);
                for clause in &if_stmt.elif_else_clauses {
                    visit_stmts(&clause.body, lines, imports);
                }
            }
            Stmt::With(with_stmt) => visit_stmts(&with_stmt.body, lines, imports),
            Stmt::Try(try_stmt) => {
                visit_stmts(&try_stmt.body, lines, imports);
                for handler in &try_stmt.handlers {
                    let ExceptHandler::ExceptHandler(except) = handler;
                    visit_stmts(&except.body, lines, imports);
                }
                visit_stmts(&try_stmt.orelse, lines, imports);
                visit_stmts(&try_stmt.finalbody, lines, imports);
            }
            _ => {}
        }
    }
}

/// Byte offsets of line starts, for offset → line-number conversion.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, byte)| *byte == b'\n')
                .map(|(offset, _)| offset + 1),
        );
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> u32 {
        self.starts.partition_point(|start| *start <= offset) as u32
    }
}
