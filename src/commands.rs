//! CLI commands for crossndk
//!
//! Each command loads the project from disk, resolves its configuration and
//! reports back on stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Result;
use tracing::info;

use crossndk_build::{BuildPlan, BuildRunner, BuildStep, ExecutionReport, PlanBuilder};
use crossndk_core::{CommandRunner, Event, EventBus, EventSubscription, RecordingRunner, TokioCommandRunner};
use crossndk_toolchain::ToolchainCatalog;

use crate::project::Project;

/// List the platforms that can be targeted
pub struct TargetsCommand;

impl TargetsCommand {
    pub fn execute(&self) -> Result<()> {
        let catalog = ToolchainCatalog::builtin();
        for toolchain in catalog.iter() {
            println!(
                "{:<20} {:<18} {:<28} min API {:<3} -> {}",
                toolchain.platform,
                toolchain.kind,
                toolchain.target_triple.as_deref().unwrap_or("(host)"),
                toolchain.min_api_level,
                toolchain.output_folder
            );
        }
        Ok(())
    }
}

/// Print the build plan without running anything
pub struct PlanCommand {
    pub project_path: PathBuf,
    pub json: bool,
}

impl PlanCommand {
    pub async fn execute(&self) -> Result<()> {
        let plan = load_plan(&self.project_path).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }

        println!("Toolchain strategy: {:?}", plan.strategy);
        for step in &plan.steps {
            let after: Vec<&str> = step
                .dependencies
                .iter()
                .map(|&d| plan.steps[d].name.as_str())
                .collect();
            if after.is_empty() {
                println!("{:>3}. {}", step.id, step.name);
            } else {
                println!("{:>3}. {} (after {})", step.id, step.name, after.join(", "));
            }
            if let BuildStep::NativeBuild { command, .. } = &step.step {
                println!("       {}", command);
            }
        }
        for variant in &plan.disabled_variants {
            println!("  -  {} (disabled)", variant);
        }
        Ok(())
    }
}

/// Build every configured target
pub struct BuildCommand {
    pub project_path: PathBuf,
    pub jobs: Option<usize>,
    pub dry_run: bool,
}

impl BuildCommand {
    pub async fn execute(&self) -> Result<ExecutionReport> {
        let plan = load_plan(&self.project_path).await?;

        let report = if self.dry_run {
            let runner = RecordingRunner::new();
            let report = self.run(&plan, &runner).await?;
            info!("Dry run recorded {} command(s)", runner.calls().len());
            report
        } else {
            self.run(&plan, &TokioCommandRunner).await?
        };

        Ok(report.into_result()?)
    }

    async fn run<R: CommandRunner>(&self, plan: &BuildPlan, runner: &R) -> Result<ExecutionReport> {
        let bus = Arc::new(EventBus::new());
        let subscription = bus.subscribe();
        let printer = tokio::task::spawn_blocking(move || print_progress(subscription));

        let mut build = BuildRunner::new(plan, runner)
            .with_dry_run(self.dry_run)
            .with_events(Arc::clone(&bus));
        if let Some(jobs) = self.jobs {
            build = build.with_jobs(jobs);
        }
        let report = build.execute().await;

        // the printer stops once every sender is gone
        drop(build);
        drop(bus);
        printer.await?;
        Ok(report)
    }
}

/// Numbers finished steps against the plan size
#[derive(Debug, Default)]
struct Progress {
    total: usize,
    finished: usize,
}

impl Progress {
    /// Line to print for `event`, if any
    fn line(&mut self, event: &Event) -> Option<String> {
        if event.finishes_step() {
            self.finished += 1;
            return Some(format!("[{}/{}] {}", self.finished, self.total, event));
        }
        match event {
            Event::PlanStarted { steps } => {
                self.total = *steps;
                Some(event.to_string())
            }
            Event::StepStarted { .. } => None,
            _ => Some(event.to_string()),
        }
    }
}

fn print_progress(subscription: EventSubscription) {
    let mut progress = Progress::default();
    for event in subscription.iter() {
        if let Some(line) = progress.line(&event) {
            println!("{}", line);
        }
    }
}

async fn load_plan(project_path: &Path) -> Result<BuildPlan> {
    let project = Project::load(project_path).await?;
    let request = project.request()?;
    let env = project.environment().await?;
    let catalog = ToolchainCatalog::builtin();

    let plan = PlanBuilder::new(&catalog, &request, &env).build()?;
    info!("Planned {} step(s) for {}", plan.len(), project.name);
    Ok(plan)
}
