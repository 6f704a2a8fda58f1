//! Grid search over solver options.
//!
//! Candidates run one after another, each on a fresh engine and a freshly
//! built model. Only the engine run is timed. A candidate whose run fails is
//! left out of the comparison; the fastest of the rest wins, the earlier
//! candidate on ties.

use std::path::Path;
use std::time::{Duration, Instant};

use mealplan_solver::{Engine, Model, OptionValue, SolverOptions, apply_options};
use thiserror::Error;

use crate::config::{ConfigError, save_config};
use crate::dataset::Dataset;

/// Source of elapsed time for candidate runs
pub trait Clock {
    type Mark;

    fn start(&mut self) -> Self::Mark;

    fn stop(&mut self, mark: Self::Mark) -> Duration;
}

/// Wall clock, via [`Instant`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Mark = Instant;

    fn start(&mut self) -> Instant {
        Instant::now()
    }

    fn stop(&mut self, mark: Instant) -> Duration {
        mark.elapsed()
    }
}

/// `{threads: 1}`, `{threads: 2}`, `{threads: 4}`
pub fn default_candidates() -> Vec<SolverOptions> {
    thread_candidates(&[1, 2, 4])
}

pub fn thread_candidates(threads: &[i64]) -> Vec<SolverOptions> {
    threads
        .iter()
        .map(|&n| SolverOptions::from([("threads".to_string(), OptionValue::Int(n))]))
        .collect()
}

/// One candidate's run
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Trial {
    pub params: SolverOptions,
    /// `None` when the engine run failed
    pub elapsed: Option<Duration>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TuneReport {
    pub trials: Vec<Trial>,
    pub best: SolverOptions,
    pub best_elapsed: Duration,
}

#[derive(Error, Debug)]
pub enum TuneError {
    #[error("No tuning candidates were given")]
    NoCandidates,
    #[error("Every tuning candidate failed ({tried} tried)")]
    NoSuccessfulCandidate { tried: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub struct Tuner<F, C = SystemClock> {
    candidates: Vec<SolverOptions>,
    engine_factory: F,
    clock: C,
}

impl<F> Tuner<F> {
    pub fn new(engine_factory: F) -> Self {
        Self {
            candidates: default_candidates(),
            engine_factory,
            clock: SystemClock,
        }
    }
}

impl<F, C> Tuner<F, C> {
    pub fn with_candidates(mut self, candidates: Vec<SolverOptions>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_clock<C2>(self, clock: C2) -> Tuner<F, C2> {
        Tuner {
            candidates: self.candidates,
            engine_factory: self.engine_factory,
            clock,
        }
    }

    pub fn candidates(&self) -> &[SolverOptions] {
        &self.candidates
    }
}

impl<F, E, C> Tuner<F, C>
where
    F: FnMut() -> E,
    E: Engine,
    C: Clock,
{
    /// Time every candidate and pick the fastest, without persisting anything.
    pub fn run<B>(&mut self, dataset: &Dataset, mut build_model: B) -> Result<TuneReport, TuneError>
    where
        B: FnMut(&Dataset) -> Model,
    {
        if self.candidates.is_empty() {
            return Err(TuneError::NoCandidates);
        }

        let mut trials = Vec::with_capacity(self.candidates.len());
        let mut best: Option<(usize, Duration)> = None;

        for (i, params) in self.candidates.iter().enumerate() {
            let mut engine = (self.engine_factory)();
            apply_options(&mut engine, params);
            let model = build_model(dataset);

            let mark = self.clock.start();
            let result = engine.run(&model);
            let elapsed = self.clock.stop(mark);

            match result {
                Ok(output) => {
                    tracing::debug!(candidate = i, ?elapsed, status = output.status_code(), "tuning run");
                    if best.is_none_or(|(_, fastest)| elapsed < fastest) {
                        best = Some((i, elapsed));
                    }
                    trials.push(Trial {
                        params: params.clone(),
                        elapsed: Some(elapsed),
                        status: Some(output.status_code()),
                    });
                }
                Err(err) => {
                    tracing::warn!(candidate = i, "skipping tuning candidate: {}", err);
                    trials.push(Trial {
                        params: params.clone(),
                        elapsed: None,
                        status: None,
                    });
                }
            }
        }

        let (index, best_elapsed) = best.ok_or(TuneError::NoSuccessfulCandidate {
            tried: self.candidates.len(),
        })?;
        Ok(TuneReport {
            trials,
            best: self.candidates[index].clone(),
            best_elapsed,
        })
    }

    /// [`Tuner::run`], then overwrite `config_path` with the winner.
    pub fn tune<B>(
        &mut self,
        dataset: &Dataset,
        build_model: B,
        config_path: impl AsRef<Path>,
    ) -> Result<TuneReport, TuneError>
    where
        B: FnMut(&Dataset) -> Model,
    {
        let report = self.run(dataset, build_model)?;
        save_config(config_path, &report.best)?;
        tracing::info!(best = ?report.best, elapsed = ?report.best_elapsed, "tuning finished");
        Ok(report)
    }
}

/// Tune the default engine over the default grid and persist the winner.
pub fn auto_tune<B>(
    dataset: &Dataset,
    build_model: B,
    config_path: impl AsRef<Path>,
) -> Result<SolverOptions, TuneError>
where
    B: FnMut(&Dataset) -> Model,
{
    let report = Tuner::new(crate::driver::default_engine).tune(dataset, build_model, config_path)?;
    Ok(report.best)
}
