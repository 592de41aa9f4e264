//! Assembly Classifier
//!
//! Reduces an assembly listing to an instruction count plus the worst kind of
//! runtime call it contains.
//!
//! # Cost encoding
//!
//! Published baselines and tables use a single integer per measurement:
//!
//! | Range         | Meaning                                    |
//! |---------------|--------------------------------------------|
//! | 0 - 9999      | instruction count, no calls                |
//! | 10000 - 19999 | instruction count + unidentified call      |
//! | 20000 - 29999 | call to the wide-division helper           |
//! | 30000 - 39999 | call to the wide-modulo helper             |
//!
//! [`Classification`] is the working form; it is only packed into a [`Cost`]
//! at the reporting boundary.

use crate::explorer::AsmLine;
use std::fmt;
use thiserror::Error;

/// libgcc/compiler-rt 128-bit unsigned division.
pub const UDIV_HELPER: &str = "__udivti3";
/// libgcc/compiler-rt 128-bit unsigned remainder.
pub const UMOD_HELPER: &str = "__umodti3";

/// Width of one category band in the packed encoding.
pub const CATEGORY_SPAN: u32 = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("{0} instructions do not fit below the category span")]
    TooManyInstructions(u32),

    #[error("cost {0} is outside every category")]
    UnknownCategory(u32),
}

/// Worst runtime call seen, in increasing severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum CallKind {
    #[default]
    None,
    Unknown,
    Div,
    Mod,
}

impl CallKind {
    fn offset(self) -> u32 {
        match self {
            CallKind::None => 0,
            CallKind::Unknown => CATEGORY_SPAN,
            CallKind::Div => 2 * CATEGORY_SPAN,
            CallKind::Mod => 3 * CATEGORY_SPAN,
        }
    }
}

/// Instruction count and call kind of one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub instructions: u32,
    pub call: CallKind,
}

/// Packed legacy cost value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost(u32);

impl Cost {
    pub fn encode(c: Classification) -> Result<Self, ClassifyError> {
        if c.instructions >= CATEGORY_SPAN {
            return Err(ClassifyError::TooManyInstructions(c.instructions));
        }
        Ok(Cost(c.call.offset() + c.instructions))
    }

    /// Interpret a raw integer, e.g. one read back from an old table.
    pub fn from_raw(raw: u32) -> Result<Self, ClassifyError> {
        if raw >= 4 * CATEGORY_SPAN {
            return Err(ClassifyError::UnknownCategory(raw));
        }
        Ok(Cost(raw))
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Category, decided by range alone.
    pub fn call(self) -> CallKind {
        match self.0 / CATEGORY_SPAN {
            0 => CallKind::None,
            1 => CallKind::Unknown,
            2 => CallKind::Div,
            _ => CallKind::Mod,
        }
    }

    pub fn instructions(self) -> u32 {
        self.0 % CATEGORY_SPAN
    }

    pub fn decode(self) -> Classification {
        Classification {
            instructions: self.instructions(),
            call: self.call(),
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classifies listings against a pair of helper names.
#[derive(Debug, Clone)]
pub struct Classifier {
    div_helper: String,
    mod_helper: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::with_helpers(UDIV_HELPER, UMOD_HELPER)
    }

    pub fn with_helpers(div_helper: &str, mod_helper: &str) -> Self {
        Self {
            div_helper: div_helper.to_string(),
            mod_helper: mod_helper.to_string(),
        }
    }

    /// Count instructions and find the worst call.
    ///
    /// Empty lines, labels and directives are skipped. Every other line is
    /// one instruction; call lines count as one instruction too.
    pub fn classify(&self, lines: &[AsmLine]) -> Classification {
        let mut result = Classification::default();

        for line in lines {
            if line.is_directive_or_label {
                continue;
            }
            result.instructions += 1;

            if line.is_call {
                let kind = self.call_kind(line);
                tracing::debug!(text = %line.text, ?kind, "call");
                result.call = result.call.max(kind);
            } else {
                tracing::trace!(text = %line.text, "instruction");
            }
        }

        result
    }

    fn call_kind(&self, line: &AsmLine) -> CallKind {
        let target = line.callee.as_deref().unwrap_or(&line.text);
        if target.contains(&self.mod_helper) {
            CallKind::Mod
        } else if target.contains(&self.div_helper) {
            CallKind::Div
        } else {
            CallKind::Unknown
        }
    }
}
