//! Build plan generation.
//!
//! A BuildPlan lists every step needed to cross-compile the requested
//! targets for every enabled variant, in dependency order:
//!
//! provision toolchain (generated only) → linker wrapper → cargo build →
//! collect artifacts → per-variant aggregate → host asset generation.
//!
//! Shared steps (toolchain provisioning per platform and API level, the
//! linker wrapper) appear once no matter how many builds depend on them.
//! Every native build waits for the linker wrapper, desktop ones included.

use std::collections::HashMap;
use std::path::PathBuf;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use tracing::{debug, info};

use crossndk_core::{group_variants, CommandSpec, FeatureSelection};
use crossndk_toolchain::{
    ProvisionRequest, ResolvedToolchain, Toolchain, ToolchainCatalog, ToolchainError,
    ToolchainKind, ToolchainProvisioner, ToolchainResolver, ToolchainStrategy,
};

use crate::artifacts::{destination_dir, source_dir, CollectRequest};
use crate::cargo_build::native_build_command;
use crate::config::{BuildEnvironment, BuildRequest};
use crate::linker_wrapper;
use crate::BuildError;

/// One (target, variant) pair after resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    /// `None` for the shared default build
    pub variant: Option<String>,
    pub toolchain: Toolchain,
    pub api_level: u32,
    pub features: Option<FeatureSelection>,
    pub output_dir: PathBuf,
}

/// A single unit of work in the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildStep {
    /// Generate a standalone toolchain unless it already exists
    ProvisionToolchain(ProvisionRequest),
    /// Place the linker wrapper scripts
    PrepareLinkerWrapper { dir: PathBuf },
    /// Run cargo for one target
    NativeBuild {
        variant: Option<String>,
        platform: String,
        command: CommandSpec,
    },
    /// Copy build outputs into the host's directories
    CollectArtifacts {
        variant: Option<String>,
        platform: String,
        request: CollectRequest,
    },
    /// Every target of a variant is built
    VariantBuild { variant: Option<String> },
    /// The host's asset generation for a variant
    GenerateAssets { variant: String },
}

/// A step with its position and the positions it waits for
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub id: usize,
    pub name: String,
    pub step: BuildStep,
    pub dependencies: Vec<usize>,
}

/// A complete build plan.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub strategy: ToolchainStrategy,
    /// Steps in topological order
    pub steps: Vec<PlannedStep>,
    /// Every resolved (target, variant) pair
    pub targets: Vec<ResolvedTarget>,
    /// Host variants built by no step
    pub disabled_variants: Vec<String>,
}

impl BuildPlan {
    pub fn step(&self, name: &str) -> Option<&PlannedStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Ids of steps that depend on `id`
    pub fn dependents(&self, id: usize) -> Vec<usize> {
        self.steps
            .iter()
            .filter(|s| s.dependencies.contains(&id))
            .map(|s| s.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Graph under construction; steps are created at most once per name
#[derive(Default)]
struct PlanGraph {
    graph: DiGraph<(String, BuildStep), ()>,
    by_name: HashMap<String, NodeIndex>,
}

impl PlanGraph {
    fn step(&mut self, name: String, make: impl FnOnce() -> BuildStep) -> NodeIndex {
        if let Some(&idx) = self.by_name.get(&name) {
            return idx;
        }
        let idx = self.graph.add_node((name.clone(), make()));
        self.by_name.insert(name, idx);
        idx
    }

    fn depends_on(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        if self.graph.find_edge(dependency, dependent).is_none() {
            self.graph.add_edge(dependency, dependent, ());
        }
    }

    fn into_steps(self) -> Result<Vec<PlannedStep>, BuildError> {
        let order = toposort(&self.graph, None).map_err(|cycle| {
            BuildError::PlanCycle(self.graph[cycle.node_id()].0.clone())
        })?;

        let position: HashMap<NodeIndex, usize> =
            order.iter().enumerate().map(|(pos, idx)| (*idx, pos)).collect();

        let steps = order
            .iter()
            .enumerate()
            .map(|(id, idx)| {
                let mut dependencies: Vec<usize> = self
                    .graph
                    .neighbors_directed(*idx, petgraph::Direction::Incoming)
                    .map(|dep| position[&dep])
                    .collect();
                dependencies.sort_unstable();
                let (name, step) = self.graph[*idx].clone();
                PlannedStep {
                    id,
                    name,
                    step,
                    dependencies,
                }
            })
            .collect();

        Ok(steps)
    }
}

/// One native build: a dedicated variant or the shared default build
struct VariantBuild {
    variant: Option<String>,
    features: Option<FeatureSelection>,
    /// Host variants whose asset generation waits for this build
    asset_variants: Vec<String>,
}

/// Builds a plan from a request, an injected catalog and the environment
pub struct PlanBuilder<'a> {
    catalog: &'a ToolchainCatalog,
    request: &'a BuildRequest,
    env: &'a BuildEnvironment,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(catalog: &'a ToolchainCatalog, request: &'a BuildRequest, env: &'a BuildEnvironment) -> Self {
        Self { catalog, request, env }
    }

    /// Resolve every target and lay out the step graph.
    ///
    /// All configuration and resolution errors are reported here, before
    /// any external process runs.
    pub fn build(&self) -> Result<BuildPlan, BuildError> {
        let request = self.request;
        let strategy = ToolchainStrategy::select(request.strategy, self.env.ndk_major())?;
        let resolver = ToolchainResolver::new(self.catalog, strategy, request.force_targets);
        let resolved = resolver.resolve_all(&request.targets, request.desired_api_level())?;

        if self.env.ndk.is_none() {
            if let Some(android) = resolved.iter().find(|r| r.toolchain.kind.is_android()) {
                return Err(ToolchainError::NdkRequired(android.toolchain.platform.clone()).into());
            }
        }

        let grouping = group_variants(&request.host_variants, request.features.as_ref(), &request.variant_overrides);
        let mut builds: Vec<VariantBuild> = grouping
            .dedicated
            .iter()
            .map(|(name, resolution)| VariantBuild {
                variant: Some(name.clone()),
                features: resolution.features.clone(),
                asset_variants: vec![name.clone()],
            })
            .collect();
        if grouping.needs_default_build() {
            builds.push(VariantBuild {
                variant: None,
                features: request.features.clone(),
                asset_variants: grouping.default_group.clone(),
            });
        }

        let wrapper_dir = linker_wrapper::wrapper_dir(&request.root_build_dir);
        let wrapper_path = linker_wrapper::wrapper_path(&wrapper_dir, self.env.host);
        let provisioner = self
            .env
            .ndk
            .as_ref()
            .map(|ndk| ToolchainProvisioner::new(ndk, self.env.toolchain_root.clone(), self.env.python_command.clone()));

        let mut graph = PlanGraph::default();
        let mut targets = Vec::new();

        for build in &builds {
            let variant_cap = build.variant.as_deref().map(capitalize).unwrap_or_default();
            let aggregate = graph.step(format!("cargoBuild{}", variant_cap), || BuildStep::VariantBuild {
                variant: build.variant.clone(),
            });

            for r in &resolved {
                let target = self.resolve_target(build, r);
                let platform = r.toolchain.platform.clone();
                let target_cap = capitalize(&platform);

                let command = native_build_command(
                    request,
                    self.env,
                    r,
                    build.variant.as_deref(),
                    build.features.as_ref(),
                    &wrapper_path,
                )?;
                let native = graph.step(format!("cargoBuild{}For{}", variant_cap, target_cap), || {
                    BuildStep::NativeBuild {
                        variant: build.variant.clone(),
                        platform: platform.clone(),
                        command,
                    }
                });

                if r.toolchain.kind == ToolchainKind::AndroidGenerated {
                    let provisioner = provisioner
                        .as_ref()
                        .ok_or_else(|| ToolchainError::NdkRequired(platform.clone()))?;
                    let provision = graph.step(
                        format!("generateToolchain{}Api{}", target_cap, r.api_level),
                        || BuildStep::ProvisionToolchain(provisioner.request(&platform, r.api_level)),
                    );
                    graph.depends_on(native, provision);
                }

                let wrapper = graph.step("generateLinkerWrapper".to_string(), || {
                    BuildStep::PrepareLinkerWrapper { dir: wrapper_dir.clone() }
                });
                graph.depends_on(native, wrapper);

                let collect = graph.step(format!("collectArtifacts{}For{}", variant_cap, target_cap), || {
                    BuildStep::CollectArtifacts {
                        variant: build.variant.clone(),
                        platform: platform.clone(),
                        request: CollectRequest {
                            from: source_dir(
                                &request.cargo_target_dir(build.variant.as_deref()),
                                &r.toolchain,
                                request.profile,
                            ),
                            into: target.output_dir.clone(),
                            includes: request.target_includes.clone(),
                        },
                    }
                });
                graph.depends_on(collect, native);
                graph.depends_on(aggregate, collect);

                targets.push(target);
            }

            for asset_variant in &build.asset_variants {
                let assets = graph.step(format!("generate{}Assets", capitalize(asset_variant)), || {
                    BuildStep::GenerateAssets { variant: asset_variant.clone() }
                });
                graph.depends_on(assets, aggregate);
            }
        }

        let steps = graph.into_steps()?;
        info!(
            "Planned {} step(s) for {} target(s) across {} build(s)",
            steps.len(),
            resolved.len(),
            builds.len()
        );

        Ok(BuildPlan {
            strategy,
            steps,
            targets,
            disabled_variants: grouping.disabled,
        })
    }

    fn resolve_target(&self, build: &VariantBuild, resolved: &ResolvedToolchain) -> ResolvedTarget {
        let output_dir = destination_dir(
            &self.request.build_dir,
            build.variant.as_deref(),
            &resolved.toolchain,
            self.request.desktop_resource_dir.as_deref(),
        );
        debug!(
            "{} for {}: API {} -> {:?}",
            resolved.toolchain.platform,
            build.variant.as_deref().unwrap_or("default build"),
            resolved.api_level,
            output_dir
        );

        ResolvedTarget {
            variant: build.variant.clone(),
            toolchain: resolved.toolchain.clone(),
            api_level: resolved.api_level,
            features: build.features.clone(),
            output_dir,
        }
    }
}

/// Upper-case the first character, as host task names do
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
