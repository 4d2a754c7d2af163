//! Treemap projection. A placeholder: the sizing model (cells vs. line
//! counts) is still undecided, so every rendering is empty for now.

use crate::error::Error;
use crate::render::{Render, RenderOptions};

#[derive(Debug, Default, Clone, Copy)]
pub struct TreeMap;

impl TreeMap {
    pub fn new() -> TreeMap {
        TreeMap
    }
}

impl Render for TreeMap {
    fn to_text(&self, _options: &RenderOptions) -> String {
        String::new()
    }

    fn to_csv(&self) -> Result<String, Error> {
        Ok(String::new())
    }

    fn to_json(&self, _indent: Option<usize>) -> Result<String, Error> {
        Ok(String::new())
    }
}
