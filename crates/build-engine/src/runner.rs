//! Build Runner
//!
//! Executes a BuildPlan. Independent steps run concurrently up to the job
//! limit; a failed step skips everything downstream of it while unrelated
//! steps keep going.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, error, info, warn};

use crossndk_core::{CommandRunner, Event, EventBus};
use crossndk_toolchain::{ensure_toolchain, ProvisionOutcome};

use crate::artifacts::collect_artifacts;
use crate::linker_wrapper;
use crate::plan::{BuildPlan, BuildStep, PlannedStep};
use crate::BuildError;

/// What happened to a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed(String),
    /// Not run because `failed_dependency` failed
    Skipped { failed_dependency: String },
}

/// Per-step results, in plan order
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<(String, StepOutcome)>,
}

impl ExecutionReport {
    pub fn success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, outcome)| *outcome == StepOutcome::Succeeded)
    }

    /// `(step, error)` for every failed step
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                StepOutcome::Failed(e) => Some((name.as_str(), e.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|(n, _)| n == name).map(|(_, o)| o)
    }

    pub fn into_result(self) -> Result<Self, BuildError> {
        if self.success() {
            return Ok(self);
        }
        let failed = self.failures().into_iter().map(|(name, _)| name.to_string()).collect();
        Err(BuildError::StepsFailed(failed))
    }
}

/// Runs the steps of a plan through a command runner
pub struct BuildRunner<'a, R: CommandRunner> {
    plan: &'a BuildPlan,
    runner: &'a R,
    jobs: usize,
    dry_run: bool,
    events: Option<Arc<EventBus>>,
}

impl<'a, R: CommandRunner> BuildRunner<'a, R> {
    pub fn new(plan: &'a BuildPlan, runner: &'a R) -> Self {
        Self {
            plan,
            runner,
            jobs: num_cpus::get().max(1),
            dry_run: false,
            events: None,
        }
    }

    /// Maximum number of steps in flight
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Log filesystem steps instead of performing them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: Event) {
        if let Some(ref bus) = self.events {
            bus.emit(event);
        }
    }

    /// Run every step once its dependencies have succeeded
    pub async fn execute(&self) -> ExecutionReport {
        let steps = &self.plan.steps;
        let mut outcomes: Vec<Option<StepOutcome>> = vec![None; steps.len()];
        let mut waiting: Vec<usize> = steps.iter().map(|s| s.dependencies.len()).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];
        for step in steps {
            for &dep in &step.dependencies {
                dependents[dep].push(step.id);
            }
        }

        let mut ready: VecDeque<usize> = steps
            .iter()
            .filter(|s| s.dependencies.is_empty())
            .map(|s| s.id)
            .collect();
        let mut in_flight = FuturesUnordered::new();

        info!("Executing {} step(s) with up to {} job(s)", steps.len(), self.jobs);
        self.emit(Event::PlanStarted { steps: steps.len() });

        loop {
            while in_flight.len() < self.jobs {
                let Some(id) = ready.pop_front() else { break };
                let step = &steps[id];
                self.emit(Event::StepStarted { name: step.name.clone() });
                in_flight.push(async move { (id, self.run_step(step).await) });
            }

            let Some((id, result)) = in_flight.next().await else { break };
            let name = &steps[id].name;

            match result {
                Ok(()) => {
                    debug!("{} succeeded", name);
                    outcomes[id] = Some(StepOutcome::Succeeded);
                    self.emit(Event::StepSucceeded { name: name.clone() });

                    for &next in &dependents[id] {
                        waiting[next] -= 1;
                        if waiting[next] == 0 && outcomes[next].is_none() {
                            ready.push_back(next);
                        }
                    }
                }
                Err(e) => {
                    error!("{} failed: {}", name, e);
                    outcomes[id] = Some(StepOutcome::Failed(e.to_string()));
                    self.emit(Event::StepFailed {
                        name: name.clone(),
                        error: e.to_string(),
                    });

                    let mut stack = dependents[id].clone();
                    while let Some(next) = stack.pop() {
                        if outcomes[next].is_some() {
                            continue;
                        }
                        warn!("Skipping {}: {} failed", steps[next].name, name);
                        outcomes[next] = Some(StepOutcome::Skipped {
                            failed_dependency: name.clone(),
                        });
                        self.emit(Event::StepSkipped {
                            name: steps[next].name.clone(),
                            failed_dependency: name.clone(),
                        });
                        stack.extend(dependents[next].iter().copied());
                    }
                }
            }
        }

        let report = ExecutionReport {
            outcomes: steps
                .iter()
                .zip(outcomes)
                .map(|(step, outcome)| {
                    let outcome = outcome.unwrap_or_else(|| StepOutcome::Skipped {
                        failed_dependency: String::new(),
                    });
                    (step.name.clone(), outcome)
                })
                .collect(),
        };

        let success = report.success();
        if success {
            info!("All {} step(s) succeeded", steps.len());
        } else {
            error!("{} step(s) failed", report.failures().len());
        }
        self.emit(Event::PlanFinished { success });
        report
    }

    async fn run_step(&self, step: &PlannedStep) -> Result<(), BuildError> {
        match &step.step {
            BuildStep::ProvisionToolchain(request) => {
                if ensure_toolchain(request, self.runner).await? == ProvisionOutcome::Generated {
                    info!("Generated toolchain {:?}", request.install_dir);
                }
            }
            BuildStep::PrepareLinkerWrapper { dir } => {
                if self.dry_run {
                    info!("[dry-run] install linker wrapper into {:?}", dir);
                } else {
                    linker_wrapper::install(dir).await?;
                }
            }
            BuildStep::NativeBuild { platform, command, .. } => {
                info!("Building {} ({})", platform, step.name);
                let status = self
                    .runner
                    .run(command)
                    .await
                    .map_err(|source| BuildError::CommandLaunch {
                        command: command.to_string(),
                        source,
                    })?;
                if !status.success() {
                    return Err(BuildError::NativeBuildFailed {
                        target: platform.clone(),
                        command: command.to_string(),
                        status,
                    });
                }
            }
            BuildStep::CollectArtifacts { request, .. } => {
                if self.dry_run {
                    info!("[dry-run] copy {:?} {:?} -> {:?}", request.includes, request.from, request.into);
                } else {
                    collect_artifacts(request).await?;
                }
            }
            BuildStep::VariantBuild { variant } => {
                info!("Native libraries ready for {}", variant.as_deref().unwrap_or("default build"));
            }
            BuildStep::GenerateAssets { variant } => {
                info!("{} can package native libraries", variant);
            }
        }
        Ok(())
    }
}
