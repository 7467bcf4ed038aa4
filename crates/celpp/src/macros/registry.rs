use std::collections::HashMap;

use super::{Macro, MacroKey};
use crate::error::RegistryError;

/// Ordered, immutable set of macros keyed by shape and name.
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    macros: Vec<Macro>,
    by_name: HashMap<&'static str, Vec<usize>>,
}

impl MacroRegistry {
    /// Builds a registry, rejecting two macros with the same key.
    pub fn new(macros: impl IntoIterator<Item = Macro>) -> Result<Self, RegistryError> {
        let mut registry = Self::default();

        for mac in macros {
            let key = mac.key();
            if registry.contains(&key) {
                return Err(RegistryError::Duplicate { key: key.to_string() });
            }
            log::trace!("registering macro {}", key);
            registry.by_name.entry(mac.name()).or_default().push(registry.macros.len());
            registry.macros.push(mac);
        }

        Ok(registry)
    }

    /// A registry that expands nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Macro for the global call `name(...)` with `arg_count` arguments.
    ///
    /// A fixed-arity macro with the exact arity wins over a var-arg one.
    pub fn find_global(&self, name: &str, arg_count: usize) -> Option<&Macro> {
        let candidates = || self.named(name);
        candidates()
            .find(|m| matches!(m, Macro::GlobalFixed { arity, .. } if *arity == arg_count))
            .or_else(|| candidates().find(|m| matches!(m, Macro::GlobalVarArg { .. })))
    }

    /// Macro for the member call `target.name(...)`.
    pub fn find_receiver(&self, name: &str) -> Option<&Macro> {
        self.named(name).find(|m| matches!(m, Macro::ReceiverVarArg { .. }))
    }

    pub fn contains(&self, key: &MacroKey) -> bool {
        self.iter().any(|m| m.key() == *key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Macro> {
        self.macros.iter()
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    fn named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Macro> + 'a {
        self.by_name.get(name).into_iter().flatten().map(|&i| &self.macros[i])
    }
}
