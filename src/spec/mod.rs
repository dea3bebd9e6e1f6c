pub mod lines;
mod builder;

pub use lines::{Position, Span, Token, tokenize};
use builder::SpecBuilder;

use crate::error::SpecError;
use crate::model::Specification;

/// Loader trait - converts specification text to a [`Specification`]
pub trait Loader {
    fn load(&self, source: &str) -> Result<Specification, SpecError>;
}

/// Loader for the line-oriented `key: value` specification format
pub struct DslLoader {
    // Configuration only, no state
}

impl DslLoader {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for DslLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader for DslLoader {
    fn load(&self, source: &str) -> Result<Specification, SpecError> {
        let tokens = tokenize(source)?;
        let line_count = source.lines().count();
        SpecBuilder::new(tokens, line_count).build()
    }
}

/// Load a specification with the default loader
pub fn load(source: &str) -> Result<Specification, SpecError> {
    DslLoader::new().load(source)
}
