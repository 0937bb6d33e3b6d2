//! Sources of externally supplied variable values.

use std::collections::{BTreeMap, HashMap};

/// A name → value lookup consulted for every `${NAME}` reference.
///
/// `None` means the variable is not defined, which is different from a
/// variable defined as the empty string.
pub trait VariableSource {
    /// Returns the value of `name`, if defined.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads variables from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl VariableSource for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var_os(name).and_then(|value| value.into_string().ok())
    }
}

impl<S: std::hash::BuildHasher> VariableSource for HashMap<String, String, S> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl VariableSource for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<T: VariableSource + ?Sized> VariableSource for &T {
    fn lookup(&self, name: &str) -> Option<String> {
        (**self).lookup(name)
    }
}
