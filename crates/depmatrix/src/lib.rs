//! Build dependency structure matrices for Python codebases.
//!
//! A [`Dsm`] scans one or more Python packages, parses every module with
//! ruff's parser, statically extracts import statements and resolves
//! them against the scanned tree. The result can be projected as a
//! square [`Matrix`] at any aggregation depth, as a directed [`Graph`],
//! or listed as raw dependencies, each in text, CSV or JSON.
//!
//! ```no_run
//! use depmatrix::{Dsm, Render, RenderOptions};
//!
//! let dsm = Dsm::new(&["./my_package"]);
//! let matrix = dsm.as_matrix(2);
//! println!("{}", matrix.to_text(&RenderOptions::default()));
//! ```

pub mod dsm;
pub mod error;
pub mod finder;
pub mod graph;
pub mod matrix;
pub mod node;
pub mod parser;
pub mod render;
pub mod treemap;

pub use dsm::Dsm;
pub use error::Error;
pub use finder::{Finder, LocalPackageFinder, PackageFinder, PackageSpec, PythonPathFinder};
pub use graph::{Graph, GraphEdge, GraphPayload};
pub use matrix::Matrix;
pub use node::{Dependency, DependencyTarget, NodeId};
pub use render::{Format, Render, RenderOptions, guess_depth};
pub use treemap::TreeMap;
