//! The square dependency matrix.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dsm::Dsm;
use crate::error::Error;
use crate::node::{DependencyTarget, NodeId};
use crate::render::{Render, RenderOptions, json_string};

/// A square dependency matrix: one row and one column per key, cells
/// counting import edges from the row key into the column key. Keys are
/// dotted absolute names, sorted lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    pub keys: Vec<String>,
    pub data: Vec<Vec<u64>>,
}

impl Matrix {
    /// Build a matrix over the modules reachable from `inputs`.
    ///
    /// With `depth == 0` every module is its own key. With `depth >= 1`
    /// modules deeper than `depth` are collapsed onto their closest
    /// ancestor package at that depth (an input node is never walked
    /// past), and cells aggregate whole subtrees.
    pub(crate) fn build(dsm: &Dsm, inputs: &[NodeId], depth: usize) -> Matrix {
        let mut modules = Vec::new();
        for &node in inputs {
            modules.extend(dsm.subtree_modules(node));
        }

        let mut keys: Vec<NodeId> = Vec::new();
        if depth < 1 {
            keys = modules.clone();
        } else {
            for &module in &modules {
                if dsm.node_depth(module) <= depth {
                    if !keys.contains(&module) {
                        keys.push(module);
                    }
                    continue;
                }
                let Some(mut package) = dsm.parent(module) else {
                    if !keys.contains(&module) {
                        keys.push(module);
                    }
                    continue;
                };
                while dsm.node_depth(package) > depth && !inputs.contains(&package) {
                    match dsm.parent(package) {
                        Some(parent) => package = parent,
                        None => break,
                    }
                }
                if !keys.contains(&package) {
                    keys.push(package);
                }
            }
        }
        keys.sort_by_cached_key(|&key| dsm.absolute_name(key, 0));

        let size = keys.len();
        let mut data = vec![vec![0u64; size]; size];
        if depth < 1 {
            // Full resolution: walk each module's edges directly. A
            // package target counts toward its __init__ key.
            let columns: HashMap<NodeId, usize> =
                keys.iter().enumerate().map(|(col, &key)| (key, col)).collect();
            for (row, &key) in keys.iter().enumerate() {
                for dep in dsm.dependencies(key) {
                    let target = match dep.target {
                        DependencyTarget::Module(target) => Some(target),
                        DependencyTarget::Package(target) => dsm.init_module_of(target),
                        DependencyTarget::External(_) => None,
                    };
                    if let Some(col) = target.and_then(|target| columns.get(&target)) {
                        data[row][*col] += 1;
                    }
                }
            }
        } else {
            for (row, &row_key) in keys.iter().enumerate() {
                for (col, &col_key) in keys.iter().enumerate() {
                    data[row][col] = dsm.cardinal(row_key, col_key) as u64;
                }
            }
        }

        Matrix {
            keys: keys.iter().map(|&key| dsm.absolute_name(key, 0)).collect(),
            data,
        }
    }

    /// Number of keys (rows and columns).
    pub fn size(&self) -> usize {
        self.keys.len()
    }

    /// Sum of all cells.
    pub fn total(&self) -> u64 {
        self.data.iter().flatten().sum()
    }
}

impl Render for Matrix {
    /// Box-drawing table with a column-index legend, the way a DSM is
    /// usually read: row numbers double as column headers.
    fn to_text(&self, options: &RenderOptions) -> String {
        if self.keys.is_empty() {
            return String::new();
        }
        let max_key = self.keys.iter().map(|key| key.len()).max().unwrap_or(0);
        let max_cell = self
            .data
            .iter()
            .flatten()
            .map(|cell| cell.to_string().len())
            .max()
            .unwrap_or(1);
        let index_width = self.keys.len().to_string().len();
        let cell_width = max_cell.max(index_width);

        let mut out = String::new();
        let rule = |left: char, mid: char, right: char, out: &mut String| {
            out.push(' ');
            out.push(left);
            out.push_str(&"─".repeat(max_key + index_width + 3));
            for _ in &self.keys {
                out.push(mid);
                out.push_str(&"─".repeat(cell_width + 2));
            }
            out.push(right);
            out.push('\n');
        };

        rule('┌', '┬', '┐', &mut out);
        out.push_str(&format!(
            " │ {:>width$} │",
            "Module",
            width = max_key + index_width + 1
        ));
        for index in 0..self.keys.len() {
            out.push_str(&format!(" {index:>cell_width$} │"));
        }
        out.push('\n');
        rule('├', '┼', '┤', &mut out);
        for (row, key) in self.keys.iter().enumerate() {
            out.push_str(&format!(" │ {key:>max_key$} {row:>index_width$} │"));
            for cell in &self.data[row] {
                if *cell == 0 {
                    out.push_str(&format!(" {:>cell_width$} │", options.zero));
                } else {
                    out.push_str(&format!(" {cell:>cell_width$} │"));
                }
            }
            out.push('\n');
        }
        rule('└', '┴', '┘', &mut out);
        out
    }

    fn to_csv(&self) -> Result<String, Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut header = vec!["module".to_string()];
        header.extend(self.keys.iter().cloned());
        writer.write_record(&header)?;
        for (row, key) in self.keys.iter().enumerate() {
            let mut record = vec![key.clone()];
            record.extend(self.data[row].iter().map(|cell| cell.to_string()));
            writer.write_record(&record)?;
        }
        let buffer = writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn to_json(&self, indent: Option<usize>) -> Result<String, Error> {
        json_string(self, indent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Render;

    fn sample() -> Matrix {
        Matrix {
            keys: vec!["pkg.a".into(), "pkg.b".into()],
            data: vec![vec![0, 2], vec![1, 0]],
        }
    }

    #[test]
    fn total_sums_every_cell() {
        assert_eq!(sample().total(), 3);
    }

    #[test]
    fn csv_carries_one_row_per_key() {
        let csv = sample().to_csv().unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("module,pkg.a,pkg.b"));
        assert_eq!(lines.next(), Some("pkg.a,0,2"));
        assert_eq!(lines.next(), Some("pkg.b,1,0"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn text_uses_the_zero_glyph() {
        let options = RenderOptions {
            zero: "∅".to_string(),
            ..RenderOptions::default()
        };
        let text = sample().to_text(&options);
        assert!(text.contains('∅'));
        assert!(text.contains("pkg.a"));
        assert!(text.contains("Module"));
    }

    #[test]
    fn json_round_trips() {
        let matrix = sample();
        let json = matrix.to_json(None).unwrap();
        let back: Matrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, matrix);
    }

    #[test]
    fn empty_matrix_renders_empty_text() {
        let matrix = Matrix { keys: vec![], data: vec![] };
        assert!(matrix.to_text(&RenderOptions::default()).is_empty());
        assert_eq!(matrix.total(), 0);
    }
}
