//! Template Source Patcher
//!
//! The header under test ships its grading harness commented out:
//!
//! ```text
//! template<class T>
//! struct Tests {
//!     //static void plus(T *p, const T *q)       { *p = *p + *q; }
//!     //static void shl(T *p, int q)             { *p = *p << q; }
//! };
//! //template struct Tests<Uint512>;
//! ```
//!
//! A [`SourcePatcher`] holds a set of activation rules and produces a fresh
//! variant of a shared [`Template`] with exactly the matching lines
//! uncommented. Lines are either activated whole or passed through untouched.
//!
//! A type is instantiated by, in order: an instantiation already active in
//! the template, uncommenting the commented one for that type, or
//! retargeting the commented placeholder. When none applies the source is
//! compiled as it stands.

use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Commented instantiation rewritten to the requested type when the template
/// has no instantiation for that type.
pub const DEFAULT_PLACEHOLDER: &str = "Uint128";

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid activation pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("no commented-out declaration of `{0}` in template")]
    FunctionNotFound(String),
}

/// Immutable template source shared between patch operations.
///
/// Cloning is cheap; every clone refers to the same lines.
#[derive(Debug, Clone)]
pub struct Template {
    lines: Arc<[String]>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        Self {
            lines: source.lines().map(str::to_string).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, PatchError> {
        let source = std::fs::read_to_string(path).map_err(|source| PatchError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&source))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// A declarative activation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationRule {
    /// Uncomment the `static` harness function with this name.
    Function(String),
    /// Uncomment the explicit instantiation of `Tests<...>` for this type.
    Instantiation(String),
}

/// Patched copy of a template.
#[derive(Debug, Clone)]
pub struct PatchedSource {
    lines: Vec<String>,
    activated: usize,
}

impl PatchedSource {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines changed relative to the template.
    pub fn activated(&self) -> usize {
        self.activated
    }

    /// Joined source text, newline-terminated.
    pub fn to_source(&self) -> String {
        let mut s = self.lines.join("\n");
        s.push('\n');
        s
    }
}

#[derive(Debug)]
enum CompiledRule {
    Function { name: String, re: Regex },
    Instantiation { type_name: String },
}

/// Applies activation rules to templates.
#[derive(Debug)]
pub struct SourcePatcher {
    rules: Vec<CompiledRule>,
    instantiation: Regex,
    placeholder: String,
}

impl SourcePatcher {
    pub fn new(rules: &[ActivationRule]) -> Result<Self, PatchError> {
        let compiled = rules
            .iter()
            .map(|rule| -> Result<CompiledRule, PatchError> {
                Ok(match rule {
                    ActivationRule::Function(name) => {
                        let pattern =
                            format!(r"^(\s*)//(\s*static\s.*\s{}\()", regex::escape(name));
                        CompiledRule::Function {
                            name: name.clone(),
                            re: Regex::new(&pattern)?,
                        }
                    }
                    ActivationRule::Instantiation(type_name) => CompiledRule::Instantiation {
                        type_name: type_name.trim().to_string(),
                    },
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules: compiled,
            instantiation: Regex::new(
                r"^(\s*)(//\s*)?(template\s+struct\s+\w+\s*<)(.+)(>\s*;)\s*$",
            )?,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        })
    }

    /// Shorthand for the usual pair: one function in one type.
    pub fn for_function(function: &str, type_name: &str) -> Result<Self, PatchError> {
        Self::new(&[
            ActivationRule::Function(function.to_string()),
            ActivationRule::Instantiation(type_name.to_string()),
        ])
    }

    /// Override the placeholder instantiation type.
    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = placeholder.trim().to_string();
        self
    }

    /// Produce a new variant of `template`. The template is not modified.
    pub fn apply(&self, template: &Template) -> Result<PatchedSource, PatchError> {
        let mut lines: Vec<String> = template.lines().to_vec();
        let mut activated = 0;

        for rule in &self.rules {
            let hits = match rule {
                CompiledRule::Function { name, re } => {
                    let hits = activate_functions(&mut lines, re);
                    if hits == 0 {
                        return Err(PatchError::FunctionNotFound(name.clone()));
                    }
                    hits
                }
                CompiledRule::Instantiation { type_name } => {
                    self.activate_instantiation(&mut lines, type_name)
                }
            };
            activated += hits;
        }

        Ok(PatchedSource { lines, activated })
    }

    fn activate_instantiation(&self, lines: &mut [String], type_name: &str) -> usize {
        let already_active = lines.iter().any(|line| {
            self.instantiation.captures(line).map_or(false, |caps| {
                caps.get(2).is_none() && caps[4].trim() == type_name
            })
        });
        if already_active {
            return 0;
        }

        let mut hits = self.rewrite_commented(lines, |target, parts| {
            (target == type_name).then(|| parts.join(target))
        });
        if hits == 0 {
            hits = self.rewrite_commented(lines, |target, parts| {
                (target == self.placeholder).then(|| parts.join(type_name))
            });
        }
        if hits == 0 {
            tracing::warn!(type_name, "no instantiation to activate; compiling template as is");
        }
        hits
    }

    /// Replace each commented instantiation for which `rewrite` returns a
    /// line. `rewrite` gets the instantiated type and the surrounding text,
    /// i.e. `[indent + "template struct Tests<", ">;"]`.
    fn rewrite_commented<F>(&self, lines: &mut [String], rewrite: F) -> usize
    where
        F: Fn(&str, [&str; 2]) -> Option<String>,
    {
        let mut hits = 0;
        for line in lines.iter_mut() {
            let replacement = self.instantiation.captures(line).and_then(|caps| {
                caps.get(2)?;
                let head = format!("{}{}", &caps[1], &caps[3]);
                rewrite(caps[4].trim(), [head.as_str(), &caps[5]])
            });
            if let Some(replacement) = replacement {
                *line = replacement;
                hits += 1;
            }
        }
        hits
    }
}

fn activate_functions(lines: &mut [String], re: &Regex) -> usize {
    let mut hits = 0;
    for line in lines.iter_mut() {
        if re.is_match(line) {
            *line = re.replace(line, "${1}${2}").into_owned();
            hits += 1;
        }
    }
    hits
}
