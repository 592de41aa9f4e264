//! Widecheck - validation harness for fixed-width wide integer libraries
//!
//! Two independent pipelines check a wide-integer library such as
//! `Wider<uint64_t>`:
//!
//! - **Differential fuzzing**: [`fuzz`] draws random operands, computes the
//!   expected results with the unbounded-integer [`oracle`], and writes a
//!   self-checking C++ program that prints an `OOPS!` line for every result
//!   the library gets wrong.
//! - **Codegen grading**: [`patch`] activates one commented-out harness
//!   function for one type, [`explorer`] compiles it on Compiler Explorer,
//!   [`classify`] counts the instructions and runtime calls, [`grade`]
//!   compares the count with the known optimum, and [`report`] renders the
//!   results as markdown tables.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐
//! │  TestVector  │───►│    Oracle    │──► fuzzy.cc
//! └──────────────┘    └──────────────┘
//!
//! ┌──────────┐   ┌───────────┐   ┌────────────┐   ┌────────┐   ┌────────┐
//! │ Template │──►│  Patcher  │──►│  Explorer  │──►│Classify│──►│ Grader │──► tables
//! └──────────┘   └───────────┘   └────────────┘   └────────┘   └────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use widecheck::oracle::{Op, Oracle};
//! use num_bigint::BigUint;
//!
//! let oracle = Oracle::new(128).unwrap();
//! let r = oracle
//!     .eval(Op::Sub, &BigUint::from(0u32), &BigUint::from(1u32), 0)
//!     .unwrap();
//! assert_eq!(r.literal, format!("0x{}", "f".repeat(32)));
//! ```

#![warn(clippy::all)]

pub mod classify;
pub mod config;
pub mod explorer;
pub mod fuzz;
pub mod grade;
pub mod oracle;
pub mod patch;
pub mod report;
pub mod runner;

// Re-export commonly used types
pub use classify::{CallKind, Classification, Classifier, ClassifyError, Cost};
pub use config::{ConfigError, WidecheckConfig};
pub use explorer::{AsmLine, CompileService, ExplorerError, GodboltClient};
pub use fuzz::{FuzzError, ProgramGenerator, TestVector};
pub use grade::{BaselineError, Grade, GradeError, Grader, PerfectBaseline};
pub use oracle::{hexit, Op, Oracle, OracleError, OracleResult};
pub use patch::{ActivationRule, PatchError, PatchedSource, SourcePatcher, Template};
pub use report::{default_tables, Column, Measurement, Measurements, Table, DEFAULT_ROWS};
pub use runner::{jobs, render_tables, GradingRun, Job, RunError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
