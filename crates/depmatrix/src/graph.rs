//! Directed-graph projection of a dependency matrix.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::matrix::Matrix;
use crate::render::{Render, RenderOptions, json_string};

/// Dependency graph: one vertex per matrix key, one weighted edge per
/// positive cell.
pub struct Graph {
    graph: DiGraph<String, u64>,
}

impl Graph {
    pub fn from_matrix(matrix: &Matrix) -> Graph {
        let mut graph = DiGraph::new();
        let indices: Vec<NodeIndex> = matrix
            .keys
            .iter()
            .map(|key| graph.add_node(key.clone()))
            .collect();
        for (row, cells) in matrix.data.iter().enumerate() {
            for (col, &weight) in cells.iter().enumerate() {
                if weight > 0 {
                    graph.add_edge(indices[row], indices[col], weight);
                }
            }
        }
        Graph { graph }
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Vertex names, in matrix-key order.
    pub fn vertices(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .map(|index| self.graph[index].as_str())
            .collect()
    }

    /// Edge weight from one vertex to another, if the edge exists.
    pub fn weight(&self, from: &str, to: &str) -> Option<u64> {
        let from = self.graph.node_indices().find(|&i| self.graph[i] == from)?;
        let to = self.graph.node_indices().find(|&i| self.graph[i] == to)?;
        self.graph
            .find_edge(from, to)
            .map(|edge| self.graph[edge])
    }

    fn is_isolated(&self, index: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(index, Direction::Outgoing)
            .next()
            .is_none()
            && self
                .graph
                .neighbors_directed(index, Direction::Incoming)
                .next()
                .is_none()
    }

    fn payload(&self) -> GraphPayload {
        GraphPayload {
            vertices: self.vertices().iter().map(|name| name.to_string()).collect(),
            edges: self
                .graph
                .edge_indices()
                .filter_map(|edge| {
                    let (from, to) = self.graph.edge_endpoints(edge)?;
                    Some(GraphEdge {
                        source: self.graph[from].clone(),
                        weight: self.graph[edge],
                        target: self.graph[to].clone(),
                    })
                })
                .collect(),
        }
    }
}

/// Serialized shape of a [`Graph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphPayload {
    pub vertices: Vec<String>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    #[serde(rename = "out")]
    pub source: String,
    pub weight: u64,
    #[serde(rename = "in")]
    pub target: String,
}

impl Render for Graph {
    /// No text form is defined for graphs.
    fn to_text(&self, _options: &RenderOptions) -> String {
        String::new()
    }

    /// Edge list as `vertex_out,edge_weight,vertex_in`. Isolated
    /// vertices still appear, as a row with empty weight and target.
    fn to_csv(&self) -> Result<String, Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["vertex_out", "edge_weight", "vertex_in"])?;
        for edge in self.graph.edge_indices() {
            if let Some((from, to)) = self.graph.edge_endpoints(edge) {
                writer.write_record([
                    self.graph[from].as_str(),
                    self.graph[edge].to_string().as_str(),
                    self.graph[to].as_str(),
                ])?;
            }
        }
        for index in self.graph.node_indices() {
            if self.is_isolated(index) {
                writer.write_record([self.graph[index].as_str(), "", ""])?;
            }
        }
        let buffer = writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn to_json(&self, indent: Option<usize>) -> Result<String, Error> {
        json_string(&self.payload(), indent)
    }
}
