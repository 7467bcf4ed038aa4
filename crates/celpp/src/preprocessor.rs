use crate::ast::ParsedExpr;
use crate::error::Error;
use crate::macros::{Macro, MacroRegistry};
use crate::syntax::{parse, unparse, ParserOptions};

/// Parses CEL text with a fixed macro set and renders the expansion.
///
/// A `Preprocessor` holds no mutable state, so one instance can serve any
/// number of threads by shared reference.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    registry: MacroRegistry,
    options: ParserOptions,
}

impl Preprocessor {
    /// Builds a preprocessor with default parser limits.
    pub fn new(macros: impl IntoIterator<Item = Macro>) -> Result<Self, Error> {
        Self::with_options(macros, ParserOptions::default())
    }

    pub fn with_options(
        macros: impl IntoIterator<Item = Macro>,
        options: ParserOptions,
    ) -> Result<Self, Error> {
        let registry = MacroRegistry::new(macros)?;
        log::trace!("preprocessor ready with {} macro(s)", registry.len());
        Ok(Self { registry, options })
    }

    /// Parses `text` and expands every macro call in it.
    pub fn process_to_ast(&self, text: &str) -> Result<ParsedExpr, Error> {
        let parsed = parse(text, &self.registry, &self.options)?;
        log::debug!(
            "parsed {} code point(s), root {:?}",
            text.chars().count(),
            parsed.expr.id
        );
        Ok(parsed)
    }

    /// Parses `text`, expands macros and returns the canonical source of the result.
    pub fn process(&self, text: &str) -> Result<String, Error> {
        let parsed = self.process_to_ast(text)?;
        let output = unparse(&parsed.expr)?;
        log::debug!("preprocessed {:?} into {:?}", text, output);
        Ok(output)
    }

    pub fn registry(&self) -> &MacroRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_preprocessor_is_send_and_sync() {
        assert_send_sync::<Preprocessor>();
        assert_send_sync::<MacroRegistry>();
    }
}
