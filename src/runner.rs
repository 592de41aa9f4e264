//! Grading Run
//!
//! Drives the grading pipeline over every `(function, column)` pair of a set
//! of tables:
//!
//! ```text
//! Template ──► SourcePatcher ──► CompileService ──► Classifier ──► Measurement
//!                                                                      │
//!                                     Grader ◄── Table::render ◄───────┘
//! ```
//!
//! With more than one worker the compile requests fan out over a crossbeam
//! pool. Results are slotted back by job index, so the collected
//! [`Measurements`] are in declaration order however the requests complete.
//! The first failure (by job order) aborts the run and nothing is kept.

use crate::classify::{ClassifyError, Classifier, Cost};
use crate::config::ConfigError;
use crate::explorer::{CompileService, ExplorerError};
use crate::grade::{BaselineError, GradeError, Grader};
use crate::patch::{PatchError, SourcePatcher, Template};
use crate::report::{Measurement, Measurements, Table};
use crossbeam_channel::unbounded;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Baseline(#[from] BaselineError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Explorer(#[from] ExplorerError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Grade(#[from] GradeError),

    #[error("grading worker panicked")]
    WorkerPanicked,
}

/// One configuration to measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub function: String,
    pub type_name: String,
    pub compiler: String,
}

/// Every job of `tables` × `rows`, table by table, row-major.
pub fn jobs<S: AsRef<str>>(tables: &[Table], rows: &[S]) -> Vec<Job> {
    let mut jobs = Vec::new();
    for table in tables {
        for row in rows {
            for column in &table.columns {
                jobs.push(Job {
                    function: row.as_ref().to_string(),
                    type_name: column.type_name.clone(),
                    compiler: column.compiler.clone(),
                });
            }
        }
    }
    jobs
}

/// Measures jobs against one template and compile service.
pub struct GradingRun<'a, S: CompileService + ?Sized> {
    service: &'a S,
    template: &'a Template,
    classifier: Classifier,
    workers: usize,
}

impl<'a, S: CompileService + ?Sized> GradingRun<'a, S> {
    pub fn new(service: &'a S, template: &'a Template) -> Self {
        Self {
            service,
            template,
            classifier: Classifier::new(),
            workers: 1,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Patch, compile and classify a single configuration.
    pub fn measure(&self, job: &Job) -> Result<Measurement, RunError> {
        let patched =
            SourcePatcher::for_function(&job.function, &job.type_name)?.apply(self.template)?;
        let asm = self.service.compile(&job.compiler, &patched.to_source())?;
        let cost = Cost::encode(self.classifier.classify(&asm))?;

        tracing::info!(
            "{}/{}/{}: {}",
            job.type_name,
            job.function,
            job.compiler,
            cost
        );

        Ok(Measurement {
            type_name: job.type_name.clone(),
            function: job.function.clone(),
            compiler: job.compiler.clone(),
            cost,
        })
    }

    /// Measure every job, stopping at the first failure.
    pub fn precompute(&self, jobs: &[Job]) -> Result<Measurements, RunError> {
        if self.workers <= 1 || jobs.len() <= 1 {
            let mut measurements = Measurements::new();
            for job in jobs {
                measurements.push(self.measure(job)?);
            }
            return Ok(measurements);
        }
        self.precompute_parallel(jobs)
    }

    fn precompute_parallel(&self, jobs: &[Job]) -> Result<Measurements, RunError> {
        let (job_tx, job_rx) = unbounded::<(usize, &Job)>();
        let (result_tx, result_rx) = unbounded::<(usize, Result<Measurement, RunError>)>();
        for (index, job) in jobs.iter().enumerate() {
            // The receiver lives until the scope ends.
            let _ = job_tx.send((index, job));
        }
        drop(job_tx);

        let failed = AtomicBool::new(false);
        let workers = self.workers.min(jobs.len());
        tracing::debug!(workers, jobs = jobs.len(), "fanning out compile requests");

        crossbeam::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let failed = &failed;
                scope.spawn(move |_| {
                    for (index, job) in job_rx.iter() {
                        if failed.load(Ordering::Acquire) {
                            break;
                        }
                        let result = self.measure(job);
                        if result.is_err() {
                            failed.store(true, Ordering::Release);
                        }
                        if result_tx.send((index, result)).is_err() {
                            break;
                        }
                    }
                });
            }
        })
        .map_err(|_| RunError::WorkerPanicked)?;
        drop(result_tx);

        let mut slots: Vec<Option<Measurement>> = vec![None; jobs.len()];
        let mut first_error: Option<(usize, RunError)> = None;
        for (index, result) in result_rx.iter() {
            match result {
                Ok(m) => slots[index] = Some(m),
                Err(e) => {
                    if first_error.as_ref().map_or(true, |(i, _)| index < *i) {
                        first_error = Some((index, e));
                    }
                }
            }
        }
        if let Some((index, e)) = first_error {
            tracing::error!(job = index, error = %e, "grading run aborted");
            return Err(e);
        }

        let mut measurements = Measurements::new();
        measurements.extend(slots.into_iter().flatten());
        Ok(measurements)
    }
}

/// Render every table, separated by blank lines.
pub fn render_tables<S: AsRef<str>>(
    tables: &[Table],
    rows: &[S],
    measurements: &Measurements,
    grader: &Grader,
) -> Result<String, RunError> {
    let mut out = String::new();
    for table in tables {
        out.push_str(&table.render(rows, measurements, grader)?);
        out.push('\n');
    }
    Ok(out)
}
