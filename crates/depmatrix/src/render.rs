//! Output formats and the rendering contract shared by every projection.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::Serialize;

use crate::error::Error;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Csv,
    Json,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Format::Text),
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown format: {other}")),
        }
    }
}

/// Rendering knobs shared across formats.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Indentation width. `None` picks the per-format default; a
    /// negative value means compact JSON.
    pub indent: Option<i32>,
    /// Replacement string for zero cells in matrix text output.
    pub zero: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            indent: None,
            zero: "0".to_string(),
        }
    }
}

impl RenderOptions {
    /// Indent step for text output; defaults to 2.
    pub fn text_indent(&self) -> usize {
        match self.indent {
            Some(indent) if indent >= 0 => indent as usize,
            _ => 2,
        }
    }

    /// Indent for JSON output: default pretty with 2 spaces, negative
    /// values switch to compact single-line JSON.
    pub fn json_indent(&self) -> Option<usize> {
        match self.indent {
            None => Some(2),
            Some(indent) if indent < 0 => None,
            Some(indent) => Some(indent as usize),
        }
    }
}

/// Anything that can be rendered as text, CSV or JSON.
pub trait Render {
    fn to_text(&self, options: &RenderOptions) -> String;
    fn to_csv(&self) -> Result<String, Error>;
    fn to_json(&self, indent: Option<usize>) -> Result<String, Error>;

    /// Render in the requested format and write it, with a trailing
    /// newline, to the given writer.
    fn write_to<W: Write>(
        &self,
        writer: &mut W,
        format: Format,
        options: &RenderOptions,
    ) -> Result<(), Error> {
        let rendered = match format {
            Format::Text => self.to_text(options),
            Format::Csv => self.to_csv()?,
            Format::Json => self.to_json(options.json_indent())?,
        };
        writeln!(writer, "{}", rendered.trim_end_matches('\n'))?;
        Ok(())
    }
}

/// Serialize a value to JSON, pretty-printed with the given indent
/// width, or compact when `indent` is `None`.
pub(crate) fn json_string<T: Serialize>(value: &T, indent: Option<usize>) -> Result<String, Error> {
    match indent {
        None => Ok(serde_json::to_string(value)?),
        Some(indent) => {
            let pad = " ".repeat(indent);
            let mut buffer = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(pad.as_bytes());
            let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
            value.serialize(&mut serializer)?;
            Ok(String::from_utf8_lossy(&buffer).into_owned())
        }
    }
}

/// Default matrix depth for a set of package arguments: deep enough to
/// show one level inside a single package, or the level just below the
/// shallowest of several.
pub fn guess_depth(packages: &[String]) -> usize {
    if packages.len() == 1 {
        return packages[0].matches('.').count() + 2;
    }
    packages
        .iter()
        .map(|package| package.matches('.').count())
        .min()
        .unwrap_or(0)
        + 1
}
