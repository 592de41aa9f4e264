//! Codegen Quality Grading
//!
//! Compares a measured [`Cost`] against the known-optimal instruction count
//! for its `(bits, function)` pair and renders a table label.
//!
//! A cost below a known optimum means either the classifier or the baseline
//! is wrong. That is reported as [`GradeError::BelowBaseline`] and must stop
//! the run.

use crate::classify::{CallKind, Cost, UDIV_HELPER, UMOD_HELPER};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Baseline table shipped with the crate.
pub const BUNDLED_BASELINES: &str = include_str!("../data/perfect_baselines.toml");

/// Marker for an entry with no established optimum.
const UNKNOWN: &str = "unknown";

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("failed to read baseline file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse baselines: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("baseline section `bits.{0}` is not a bit width")]
    InvalidWidth(String),

    #[error("baseline {bits}/{function} must be an integer or \"unknown\", got \"{value}\"")]
    InvalidEntry {
        bits: u32,
        function: String,
        value: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GradeError {
    #[error("cost {cost} is less than the perfect {floor} for {bits}/{function}")]
    BelowBaseline {
        bits: u32,
        function: String,
        cost: u32,
        floor: u32,
    },
}

#[derive(Debug, Deserialize)]
struct BaselineFile {
    #[serde(default)]
    bits: BTreeMap<String, BTreeMap<String, BaselineEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BaselineEntry {
    Count(u32),
    Marker(String),
}

/// Known-minimal instruction counts keyed by `(bits, function)`.
#[derive(Debug, Clone, Default)]
pub struct PerfectBaseline {
    table: HashMap<(u32, String), Option<u32>>,
}

impl PerfectBaseline {
    /// The table bundled with the crate.
    pub fn bundled() -> Result<Self, BaselineError> {
        Self::from_toml_str(BUNDLED_BASELINES)
    }

    pub fn load(path: &Path) -> Result<Self, BaselineError> {
        let content = std::fs::read_to_string(path).map_err(|source| BaselineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, BaselineError> {
        let file: BaselineFile = toml::from_str(content)?;
        let mut baseline = Self::default();

        for (width, entries) in file.bits {
            let bits: u32 = width
                .parse()
                .map_err(|_| BaselineError::InvalidWidth(width.clone()))?;
            for (function, entry) in entries {
                let value = match entry {
                    BaselineEntry::Count(n) => Some(n),
                    BaselineEntry::Marker(m) if m == UNKNOWN => None,
                    BaselineEntry::Marker(value) => {
                        return Err(BaselineError::InvalidEntry {
                            bits,
                            function,
                            value,
                        })
                    }
                };
                baseline.table.insert((bits, function), value);
            }
        }

        Ok(baseline)
    }

    pub fn insert(&mut self, bits: u32, function: &str, perfect: Option<u32>) {
        self.table.insert((bits, function.to_string()), perfect);
    }

    /// Known optimum, or `None` when absent or explicitly unknown.
    pub fn get(&self, bits: u32, function: &str) -> Option<u32> {
        self.table
            .get(&(bits, function.to_string()))
            .copied()
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Table label for one measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    /// Matches the known optimum.
    Perfect(u32),
    /// Plain instruction count.
    Instructions(u32),
    /// Instruction count including an unidentified call.
    UnknownCall(u32),
    DivCall,
    ModCall,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Perfect(n) => write!(f, "{} P", n),
            Grade::Instructions(n) => write!(f, "{}", n),
            Grade::UnknownCall(n) => write!(f, "{} call", n),
            Grade::DivCall => f.write_str(UDIV_HELPER),
            Grade::ModCall => f.write_str(UMOD_HELPER),
        }
    }
}

/// Grades costs against a [`PerfectBaseline`].
#[derive(Debug, Clone)]
pub struct Grader {
    baseline: PerfectBaseline,
}

impl Grader {
    pub fn new(baseline: PerfectBaseline) -> Self {
        Self { baseline }
    }

    pub fn baseline(&self) -> &PerfectBaseline {
        &self.baseline
    }

    pub fn grade(&self, bits: u32, function: &str, cost: Cost) -> Result<Grade, GradeError> {
        let perfect = self.baseline.get(bits, function);
        let floor = perfect.unwrap_or(1);

        if cost.raw() < floor {
            tracing::error!(
                bits,
                function,
                cost = cost.raw(),
                floor,
                "cost below perfect baseline"
            );
            return Err(GradeError::BelowBaseline {
                bits,
                function: function.to_string(),
                cost: cost.raw(),
                floor,
            });
        }

        if perfect == Some(cost.raw()) {
            return Ok(Grade::Perfect(cost.raw()));
        }

        Ok(match cost.call() {
            CallKind::None => Grade::Instructions(cost.raw()),
            CallKind::Unknown => Grade::UnknownCall(cost.instructions()),
            CallKind::Div => Grade::DivCall,
            CallKind::Mod => Grade::ModCall,
        })
    }
}
