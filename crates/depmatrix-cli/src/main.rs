//! Command-line interface for building Python dependency matrices.

use std::fs::File;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use depmatrix::{Dsm, Format, Render, RenderOptions, guess_depth};

#[derive(Parser)]
#[command(
    name = "depmatrix",
    version,
    about = "Analyze the internal dependencies of Python packages"
)]
#[command(group(ArgGroup::new("view").args(["matrix", "list", "graph", "treemap"])))]
struct Cli {
    /// Packages to scan: directory paths, single .py modules or
    /// importable dotted names. Comma-separated lists are accepted.
    #[arg(required = true)]
    packages: Vec<String>,

    /// Matrix aggregation depth (0 shows every module). Guessed from
    /// the package names when omitted.
    #[arg(short = 'd', long)]
    depth: Option<usize>,

    /// Output format.
    #[arg(
        short = 'f',
        long,
        default_value = "text",
        value_parser = ["text", "csv", "json"]
    )]
    format: String,

    /// Output the dependency graph instead of the matrix.
    #[arg(short = 'g', long)]
    graph: bool,

    /// Treat every directory as a package, even without __init__.py.
    #[arg(short = 'G', long)]
    greedy: bool,

    /// Indentation width. Negative values mean compact JSON.
    #[arg(short = 'i', long, allow_negative_numbers = true)]
    indent: Option<i32>,

    /// Output the list of dependencies instead of the matrix.
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// Output the dependency matrix (the default view).
    #[arg(short = 'm', long)]
    matrix: bool,

    /// Write to this file instead of standard output.
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Output the treemap instead of the matrix.
    #[arg(short = 't', long)]
    treemap: bool,

    /// String printed for zero cells in the text matrix.
    #[arg(short = 'z', long, default_value = "0")]
    zero: String,
}

/// Split comma-separated package arguments and drop duplicates while
/// keeping first-seen order.
fn collect_packages(args: &[String]) -> Vec<String> {
    let mut packages = Vec::new();
    for arg in args {
        for package in arg.split(',') {
            if package.is_empty() {
                continue;
            }
            if !packages.iter().any(|existing| existing == package) {
                packages.push(package.to_string());
            }
        }
    }
    packages
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let packages = collect_packages(&cli.packages);
    let package_refs: Vec<&str> = packages.iter().map(String::as_str).collect();
    let dsm = Dsm::with_options(&package_refs, !cli.greedy);
    if dsm.is_empty() {
        return ExitCode::from(1);
    }

    let depth = cli.depth.unwrap_or_else(|| guess_depth(&packages));
    let format = match cli.format.as_str() {
        "text" => Format::Text,
        "csv" => Format::Csv,
        "json" => Format::Json,
        _ => unreachable!("clap validates the format"),
    };
    let options = RenderOptions {
        indent: cli.indent,
        zero: cli.zero.clone(),
    };

    let mut writer: Box<dyn Write> = match &cli.output {
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(file),
            Err(err) => {
                eprintln!("depmatrix: cannot write to {path}: {err}.");
                return ExitCode::from(2);
            }
        },
        None => Box::new(io::stdout()),
    };

    let result = if cli.list {
        dsm.write_to(&mut writer, format, &options)
    } else if cli.graph {
        dsm.as_graph(depth).write_to(&mut writer, format, &options)
    } else if cli.treemap {
        dsm.as_treemap().write_to(&mut writer, format, &options)
    } else {
        dsm.as_matrix(depth).write_to(&mut writer, format, &options)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("depmatrix: {err}.");
            ExitCode::from(2)
        }
    }
}
