//! Variable interpolation over raw manifest text.
//!
//! Runs before the text is parsed as YAML. Every `${NAME}` reference outside
//! a comment is replaced by its value; `\${NAME}` is kept literally as
//! `${NAME}`. A comment starts at a `#` that begins a line or follows
//! whitespace, and is copied through untouched.
//!
//! Predefined variables (the application and environment names) take
//! precedence over the external source, which may repeat them only with the
//! same value.

mod source;

pub use source::{ProcessEnv, VariableSource};

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::InterpolateError;

/// Predefined variable holding the application name.
pub const APPLICATION_NAME_VAR: &str = "COPILOT_APPLICATION_NAME";

/// Predefined variable holding the environment name.
pub const ENVIRONMENT_NAME_VAR: &str = "COPILOT_ENVIRONMENT_NAME";

/// An optionally escaped reference: `${NAME}` or `\${NAME}`.
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\\)?\$\{([_a-zA-Z][_a-zA-Z0-9]*)\}").expect("reference pattern is valid")
});

/// Substitutes variable references in manifest text.
#[derive(Debug, Clone)]
pub struct Interpolator<S = ProcessEnv> {
    predefined: BTreeMap<String, String>,
    source: S,
}

impl Interpolator<ProcessEnv> {
    /// Creates an interpolator reading external values from the process
    /// environment.
    #[must_use]
    pub fn from_env(app: &str, env: &str) -> Self {
        Self::new(app, env, ProcessEnv)
    }
}

impl<S: VariableSource> Interpolator<S> {
    /// Creates an interpolator for an application and environment.
    pub fn new(app: &str, env: &str, source: S) -> Self {
        let predefined = BTreeMap::from([
            (APPLICATION_NAME_VAR.to_string(), app.to_string()),
            (ENVIRONMENT_NAME_VAR.to_string(), env.to_string()),
        ]);
        Self { predefined, source }
    }

    /// Returns the predefined variables.
    #[must_use]
    pub const fn predefined(&self) -> &BTreeMap<String, String> {
        &self.predefined
    }

    /// Substitutes every reference in `text`.
    ///
    /// The result always ends with exactly one newline.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolateError::UndefinedVariable`] for a reference with no
    /// value, and [`InterpolateError::PredefinedVariableConflict`] if the
    /// external source redefines a predefined variable with another value.
    pub fn interpolate(&self, text: &str) -> Result<String, InterpolateError> {
        let mut out = String::with_capacity(text.len());
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let (code, comment) = line.split_at(comment_start(line));
            self.substitute(code, &mut out)?;
            out.push_str(comment);
        }

        let trimmed = out.trim_end_matches('\n').len();
        out.truncate(trimmed);
        out.push('\n');
        Ok(out)
    }

    fn substitute(&self, code: &str, out: &mut String) -> Result<(), InterpolateError> {
        let mut last = 0;
        for caps in REFERENCE_PATTERN.captures_iter(code) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            out.push_str(&code[last..whole.start()]);
            if caps.get(1).is_some() {
                out.push_str(&whole.as_str()[1..]);
            } else {
                out.push_str(&self.resolve(name.as_str())?);
            }
            last = whole.end();
        }
        out.push_str(&code[last..]);
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<String, InterpolateError> {
        let external = self.source.lookup(name);

        if let Some(predefined) = self.predefined.get(name) {
            return match external {
                Some(attempted) if attempted != *predefined => {
                    Err(InterpolateError::PredefinedVariableConflict {
                        name: name.to_string(),
                        predefined: predefined.clone(),
                        attempted,
                    })
                }
                _ => Ok(predefined.clone()),
            };
        }

        external.ok_or_else(|| InterpolateError::UndefinedVariable {
            name: name.to_string(),
        })
    }
}

/// Returns the byte offset where the line's comment begins, or the line
/// length if it has none.
fn comment_start(line: &str) -> usize {
    let mut prev: Option<char> = None;
    for (i, c) in line.char_indices() {
        if c == '#' && prev.is_none_or(char::is_whitespace) {
            return i;
        }
        prev = Some(c);
    }
    line.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn interpolator(pairs: &[(&str, &str)]) -> Interpolator<HashMap<String, String>> {
        Interpolator::new("myapp", "test", vars(pairs))
    }

    #[test]
    fn test_substitutes_external_variable() {
        let out = interpolator(&[("TAG", "v1.2")])
            .interpolate("image:\n  location: repo/api:${TAG}")
            .unwrap();
        assert_eq!(out, "image:\n  location: repo/api:v1.2\n");
    }

    #[test]
    fn test_escaped_reference_is_literal() {
        let out = interpolator(&[("name", "world")])
            .interpolate(r"echo \${name}")
            .unwrap();
        assert_eq!(out, "echo ${name}\n");
    }

    #[test]
    fn test_adjacent_references() {
        let out = interpolator(&[("a", "A"), ("b", "B"), ("c", "C"), ("d", "D")])
            .interpolate(r"${a}${b}\${c}${d}")
            .unwrap();
        assert_eq!(out, "AB${c}D\n");
    }

    #[test]
    fn test_comments_are_not_scanned() {
        let text = "# uses ${UNDEFINED}\ncpu: 256 # ${ALSO_UNDEFINED}\n";
        let out = interpolator(&[]).interpolate(text).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn test_hash_inside_word_is_not_a_comment() {
        let err = interpolator(&[])
            .interpolate("path: /a#${MISSING}")
            .unwrap_err();
        assert_eq!(
            err,
            InterpolateError::UndefinedVariable {
                name: String::from("MISSING"),
            }
        );
    }

    #[test]
    fn test_undefined_variable() {
        let err = interpolator(&[]).interpolate("tag: ${TAG}").unwrap_err();
        assert_eq!(
            err,
            InterpolateError::UndefinedVariable {
                name: String::from("TAG"),
            }
        );
    }

    #[test]
    fn test_empty_external_value_is_defined() {
        let out = interpolator(&[("SUFFIX", "")])
            .interpolate("name: api${SUFFIX}")
            .unwrap();
        assert_eq!(out, "name: api\n");
    }

    #[test]
    fn test_predefined_variables() {
        let out = interpolator(&[])
            .interpolate("alias: ${COPILOT_ENVIRONMENT_NAME}.${COPILOT_APPLICATION_NAME}.com")
            .unwrap();
        assert_eq!(out, "alias: test.myapp.com\n");
    }

    #[test]
    fn test_predefined_conflict() {
        let err = interpolator(&[("COPILOT_ENVIRONMENT_NAME", "prod")])
            .interpolate("env: ${COPILOT_ENVIRONMENT_NAME}")
            .unwrap_err();
        assert_eq!(
            err,
            InterpolateError::PredefinedVariableConflict {
                name: String::from("COPILOT_ENVIRONMENT_NAME"),
                predefined: String::from("test"),
                attempted: String::from("prod"),
            }
        );
    }

    #[test]
    fn test_predefined_same_value_is_accepted() {
        let out = interpolator(&[("COPILOT_ENVIRONMENT_NAME", "test")])
            .interpolate("env: ${COPILOT_ENVIRONMENT_NAME}")
            .unwrap();
        assert_eq!(out, "env: test\n");
    }

    #[test]
    fn test_substitutions_are_not_rescanned() {
        let out = interpolator(&[("OUTER", "${INNER}")])
            .interpolate("value: ${OUTER}")
            .unwrap();
        assert_eq!(out, "value: ${INNER}\n");
    }

    #[test]
    fn test_invalid_names_are_left_alone() {
        let out = interpolator(&[])
            .interpolate("a: ${1abc} ${} $HOME")
            .unwrap();
        assert_eq!(out, "a: ${1abc} ${} $HOME\n");
    }

    #[test]
    fn test_trailing_newlines_normalized() {
        let it = interpolator(&[]);
        assert_eq!(it.interpolate("cpu: 256").unwrap(), "cpu: 256\n");
        assert_eq!(it.interpolate("cpu: 256\n\n\n").unwrap(), "cpu: 256\n");
        assert_eq!(it.interpolate("").unwrap(), "\n");
    }

    #[test]
    fn test_comment_start() {
        assert_eq!(comment_start("# all comment"), 0);
        assert_eq!(comment_start("key: v # note"), 7);
        assert_eq!(comment_start("key: v#not"), 10);
        assert_eq!(comment_start("\t#tab"), 1);
    }
}
