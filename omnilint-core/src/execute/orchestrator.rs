//! The orchestrator: discovery, planning, preparation, execution, and
//! aggregation, with phase-sequential scheduling and bounded
//! parallelism inside each phase.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use omnilint_config::Config;
use regex::Regex;
use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::cache::{fingerprint, stamp_files, ResultCache};
use super::process::{CommandOptions, CommandRunner, SystemProcessRunner};
use crate::catalog::{ToolAction, ToolContext, ToolDefinition, ToolRegistry};
use crate::diagnostics::normalize::{compile_filters, filter_lines};
use crate::diagnostics::{Diagnostic, DiagnosticNormalizer, Severity};
use crate::discovery::{DiscoveryStrategy, SupportedDiscovery};
use crate::error::EngineError;
use crate::logging::{Logger, TracingLogger};
use crate::outcome::{ExitCategory, RunResult, ToolOutcome};
use crate::runtime::{CommandPreparer, PreparationRequest, PreparedCommand, ToolPreparer};
use crate::selection::{SelectionResult, ToolSelector};

/// Optional lifecycle callbacks emitted around pipeline stages.
#[derive(Default, Clone)]
pub struct OrchestratorHooks {
    pub before_tool: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub after_tool: Option<Arc<dyn Fn(&ToolOutcome) + Send + Sync>>,
    pub after_discovery: Option<Arc<dyn Fn(usize) + Send + Sync>>,
    pub after_plan: Option<Arc<dyn Fn(usize) + Send + Sync>>,
    pub after_execution: Option<Arc<dyn Fn(&RunResult) + Send + Sync>>,
}

impl std::fmt::Debug for OrchestratorHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorHooks")
            .field("before_tool", &self.before_tool.is_some())
            .field("after_tool", &self.after_tool.is_some())
            .finish()
    }
}

impl OrchestratorHooks {
    pub fn on_before_tool(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.before_tool = Some(Arc::new(hook));
        self
    }

    pub fn on_after_tool(mut self, hook: impl Fn(&ToolOutcome) + Send + Sync + 'static) -> Self {
        self.after_tool = Some(Arc::new(hook));
        self
    }

    pub fn on_after_discovery(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.after_discovery = Some(Arc::new(hook));
        self
    }

    pub fn on_after_plan(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.after_plan = Some(Arc::new(hook));
        self
    }

    pub fn on_after_execution(
        mut self,
        hook: impl Fn(&RunResult) + Send + Sync + 'static,
    ) -> Self {
        self.after_execution = Some(Arc::new(hook));
        self
    }
}

/// One row of `fetch_all_tools` output.
#[derive(Debug, Clone)]
pub struct FetchedTool {
    pub tool: String,
    pub action: String,
    pub command: Option<PreparedCommand>,
    pub error: Option<String>,
}

/// Drives the end-to-end lint pipeline.
pub struct Orchestrator {
    registry: Arc<ToolRegistry>,
    discovery: Arc<dyn DiscoveryStrategy>,
    preparer: Arc<dyn ToolPreparer>,
    runner: Arc<dyn CommandRunner>,
    hooks: OrchestratorHooks,
    logger: Arc<dyn Logger>,
    /// (tool, root) pairs whose installers already ran on this instance.
    installed: Arc<Mutex<HashSet<(String, PathBuf)>>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tools", &self.registry.len())
            .finish()
    }
}

impl Orchestrator {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            discovery: Arc::new(SupportedDiscovery::new()),
            preparer: Arc::new(CommandPreparer::new()),
            runner: Arc::new(SystemProcessRunner),
            hooks: OrchestratorHooks::default(),
            logger: Arc::new(TracingLogger),
            installed: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_discovery(mut self, discovery: Arc<dyn DiscoveryStrategy>) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_preparer(mut self, preparer: Arc<dyn ToolPreparer>) -> Self {
        self.preparer = preparer;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_hooks(mut self, hooks: OrchestratorHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Selection without execution, for explain-tools surfaces.
    pub fn plan_tools(&self, config: &Config, root: &Path) -> Result<SelectionResult, EngineError> {
        let root = absolutize(root);
        let files = self.discovery.discover(&config.file_discovery, &root);
        ToolSelector::new(self.registry.clone()).plan_selection(config, &files, &root)
    }

    /// Prepare every selected tool action without executing anything.
    /// Installers still run once per (tool, root).
    pub async fn fetch_all_tools(
        &self,
        config: &Config,
        root: &Path,
    ) -> Result<Vec<FetchedTool>, EngineError> {
        let root = absolutize(root);
        let config = Arc::new(config.clone());
        let files = self.discovery.discover(&config.file_discovery, &root);
        let plan =
            ToolSelector::new(self.registry.clone()).plan_selection(&config, &files, &root)?;

        let mut rows = Vec::new();
        for name in &plan.ordered {
            let Some(tool) = self.registry.try_get(name) else {
                continue;
            };
            let context = ToolContext {
                root: root.clone(),
                files: Vec::new(),
                settings: tool_settings(&config, &tool.name),
                config: config.clone(),
            };
            if let Err(err) = ensure_installers(&self.installed, &tool, &context).await {
                rows.push(FetchedTool {
                    tool: tool.name.clone(),
                    action: "install".to_string(),
                    command: None,
                    error: Some(err.to_string()),
                });
                continue;
            }
            for action in &tool.actions {
                let row = match action.command.build(&context) {
                    Ok(argv) => {
                        let request = PreparationRequest {
                            tool: tool.clone(),
                            command: argv,
                            root: root.clone(),
                            cache_dir: resolve_cache_dir(&config, &root),
                            system_preferred: !config.execution.use_local_linters,
                            use_local_override: config.execution.use_local_linters,
                        };
                        match self.preparer.prepare(request).await {
                            Ok(prepared) => FetchedTool {
                                tool: tool.name.clone(),
                                action: action.name.clone(),
                                command: Some(prepared),
                                error: None,
                            },
                            Err(err) => FetchedTool {
                                tool: tool.name.clone(),
                                action: action.name.clone(),
                                command: None,
                                error: Some(err.to_string()),
                            },
                        }
                    }
                    Err(err) => FetchedTool {
                        tool: tool.name.clone(),
                        action: action.name.clone(),
                        command: None,
                        error: Some(err.to_string()),
                    },
                };
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Execute the full pipeline and aggregate per-action outcomes.
    pub async fn run(&self, config: &Config, root: &Path) -> Result<RunResult, EngineError> {
        let root = absolutize(root);
        let config = Arc::new(config.clone());

        let files = self.discovery.discover(&config.file_discovery, &root);
        if let Some(hook) = &self.hooks.after_discovery {
            hook(files.len());
        }

        let plan =
            ToolSelector::new(self.registry.clone()).plan_selection(&config, &files, &root)?;
        if let Some(hook) = &self.hooks.after_plan {
            hook(plan.ordered.len());
        }

        let jobs = config.execution.effective_jobs(num_cpus::get());
        let env = Arc::new(ExecutionEnv {
            cache: config
                .execution
                .cache_enabled
                .then(|| Arc::new(ResultCache::new(&resolve_cache_dir(&config, &root)))),
            cache_dir: resolve_cache_dir(&config, &root),
            normalizer: Arc::new(DiagnosticNormalizer::with_custom_rules(&config.severity.rules)),
            timeout: config.execution.timeout_secs.map(Duration::from_secs),
            semaphore: Arc::new(Semaphore::new(jobs)),
            bailed: Arc::new(AtomicBool::new(false)),
            files: Arc::new(files.clone()),
            preparer: self.preparer.clone(),
            runner: self.runner.clone(),
            hooks: self.hooks.clone(),
            logger: self.logger.clone(),
            installed: self.installed.clone(),
            root: root.clone(),
            config: config.clone(),
        });

        let mut outcomes_by_tool: Vec<Option<Vec<ToolOutcome>>> = vec![None; plan.ordered.len()];
        for group in phase_groups(&plan.ordered, &self.registry) {
            self.run_phase(&env, group, &mut outcomes_by_tool).await;
        }

        let outcomes = outcomes_by_tool.into_iter().flatten().flatten().collect();
        let result = RunResult {
            root,
            files,
            outcomes,
        };
        if let Some(hook) = &self.hooks.after_execution {
            hook(&result);
        }
        Ok(result)
    }

    /// Run one phase in dependency waves: tools whose intra-phase
    /// dependencies are satisfied execute concurrently, the rest wait
    /// for the next wave. Phases never interleave.
    async fn run_phase(
        &self,
        env: &Arc<ExecutionEnv>,
        group: Vec<(usize, Arc<ToolDefinition>)>,
        outcomes_by_tool: &mut [Option<Vec<ToolOutcome>>],
    ) {
        let members: HashSet<String> = group.iter().map(|(_, tool)| tool.name.clone()).collect();
        let dependencies: HashMap<String, HashSet<String>> = intra_phase_dependencies(&group, &members);

        let mut done: HashSet<String> = HashSet::new();
        let mut remaining = group;
        while !remaining.is_empty() {
            let (ready, rest): (Vec<_>, Vec<_>) = remaining.into_iter().partition(|(_, tool)| {
                dependencies
                    .get(&tool.name)
                    .is_none_or(|deps| deps.iter().all(|dep| done.contains(dep)))
            });
            let mut wave = ready;
            let mut rest = rest;
            if wave.is_empty() {
                // Planner already degraded cycles to insertion order;
                // force progress serially if one slips through.
                wave.push(rest.remove(0));
            }

            let mut tasks: JoinSet<(usize, String, Vec<ToolOutcome>)> = JoinSet::new();
            for (index, tool) in wave {
                let env = env.clone();
                let _ = tasks.spawn(async move {
                    let outcomes = env.run_tool(&tool).await;
                    (index, tool.name.clone(), outcomes)
                });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, name, outcomes)) => {
                        if let Some(slot) = outcomes_by_tool.get_mut(index) {
                            *slot = Some(outcomes);
                        }
                        let _ = done.insert(name);
                    }
                    Err(err) => warn!("tool task aborted: {err}"),
                }
            }
            remaining = rest;
        }
    }

}

/// Run a tool's installers once per (tool, root) for this orchestrator
/// instance; the mutex also serializes installers per root.
async fn ensure_installers(
    installed: &Mutex<HashSet<(String, PathBuf)>>,
    tool: &Arc<ToolDefinition>,
    context: &ToolContext,
) -> anyhow::Result<()> {
    if tool.installers.is_empty() {
        return Ok(());
    }
    let key = (tool.name.clone(), context.root.clone());
    let mut installed = installed.lock().await;
    if installed.contains(&key) {
        return Ok(());
    }
    for installer in &tool.installers {
        installer.install(context).await?;
    }
    let _ = installed.insert(key);
    Ok(())
}

/// Everything a spawned tool task needs, shared per run.
struct ExecutionEnv {
    config: Arc<Config>,
    root: PathBuf,
    files: Arc<Vec<PathBuf>>,
    preparer: Arc<dyn ToolPreparer>,
    runner: Arc<dyn CommandRunner>,
    hooks: OrchestratorHooks,
    logger: Arc<dyn Logger>,
    installed: Arc<Mutex<HashSet<(String, PathBuf)>>>,
    semaphore: Arc<Semaphore>,
    bailed: Arc<AtomicBool>,
    cache: Option<Arc<ResultCache>>,
    cache_dir: PathBuf,
    normalizer: Arc<DiagnosticNormalizer>,
    timeout: Option<Duration>,
}

impl ExecutionEnv {
    fn bailed(&self) -> bool {
        self.bailed.load(Ordering::SeqCst)
    }

    fn note_outcome(&self, outcome: &ToolOutcome) {
        if let Some(hook) = &self.hooks.after_tool {
            hook(outcome);
        }
        if self.config.execution.bail && !outcome.is_success() {
            self.bailed.store(true, Ordering::SeqCst);
            self.logger
                .fail(&format!("bailing after {} {}", outcome.tool, outcome.action));
        }
    }

    async fn run_tool(&self, tool: &Arc<ToolDefinition>) -> Vec<ToolOutcome> {
        if self.bailed() {
            return tool
                .actions
                .iter()
                .map(|action| ToolOutcome::skipped(&tool.name, &action.name))
                .collect();
        }
        if let Some(hook) = &self.hooks.before_tool {
            hook(&tool.name);
        }

        let action_files: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|file| tool.accepts_file(file))
            .cloned()
            .collect();
        let context = ToolContext {
            root: self.root.clone(),
            files: action_files.clone(),
            settings: tool_settings(&self.config, &tool.name),
            config: self.config.clone(),
        };

        if let Err(err) = ensure_installers(&self.installed, tool, &context).await {
            let outcome = ToolOutcome::failure(
                &tool.name,
                "install",
                &format!("installer failed: {err:#}"),
            );
            self.note_outcome(&outcome);
            return vec![outcome];
        }

        let mut outcomes = Vec::with_capacity(tool.actions.len());
        for action in &tool.actions {
            let outcome = if self.bailed() {
                ToolOutcome::skipped(&tool.name, &action.name)
            } else {
                self.run_action(tool, action, &context, &action_files).await
            };
            self.note_outcome(&outcome);
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn run_action(
        &self,
        tool: &Arc<ToolDefinition>,
        action: &ToolAction,
        context: &ToolContext,
        action_files: &[PathBuf],
    ) -> ToolOutcome {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => return ToolOutcome::skipped(&tool.name, &action.name),
        };
        // A bail may have landed while this action waited for a slot.
        if self.bailed() {
            return ToolOutcome::skipped(&tool.name, &action.name);
        }

        let filters = self.action_filters(tool, action);

        if let Some(internal) = &action.internal_runner {
            return match internal.run(context).await {
                Ok(result) => {
                    let diagnostics = self.normalizer.normalize(
                        result.diagnostics,
                        &tool.name,
                        &self.root,
                        &filters,
                    );
                    let category = ExitCategory::from_execution(
                        result.returncode,
                        !diagnostics.is_empty(),
                        false,
                    );
                    ToolOutcome {
                        tool: tool.name.clone(),
                        action: action.name.clone(),
                        returncode: result.returncode,
                        stdout: filter_lines(split_lines(&result.stdout), &filters),
                        stderr: split_lines(&result.stderr),
                        diagnostics,
                        cached: false,
                        exit_category: category,
                    }
                }
                Err(err) => ToolOutcome::failure(
                    &tool.name,
                    &action.name,
                    &format!("internal runner failed: {err:#}"),
                ),
            };
        }

        let mut argv = match action.command.build(context) {
            Ok(argv) => argv,
            Err(err) => {
                return ToolOutcome::failure(
                    &tool.name,
                    &action.name,
                    &format!("command build failed: {err:#}"),
                )
            }
        };
        if action.append_files {
            argv.extend(
                action_files
                    .iter()
                    .map(|path| path.to_string_lossy().into_owned()),
            );
        }

        let request = PreparationRequest {
            tool: tool.clone(),
            command: argv,
            root: self.root.clone(),
            cache_dir: self.cache_dir.clone(),
            system_preferred: !self.config.execution.use_local_linters,
            use_local_override: self.config.execution.use_local_linters,
        };
        let prepared = match self.preparer.prepare(request).await {
            Ok(prepared) => prepared,
            Err(err) => {
                debug!("preparation failed for {}: {err:#}", tool.name);
                return ToolOutcome::failure(
                    &tool.name,
                    &action.name,
                    &format!("preparation failed: {err:#}"),
                );
            }
        };

        let mut env = prepared.env.clone();
        if let Some(overrides) = context.setting("env").and_then(Value::as_object) {
            for (key, value) in overrides {
                let rendered = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                let _ = env.insert(key.clone(), rendered);
            }
        }

        let execution = self.execute_and_parse(
            tool.clone(),
            action.clone(),
            context.clone(),
            prepared.cmd.clone(),
            env.clone(),
            filters,
        );
        match &self.cache {
            Some(cache) => {
                let stamps = stamp_files(action_files, self.config.execution.strict_cache);
                let key = fingerprint(
                    &tool.name,
                    &action.name,
                    &prepared.cmd,
                    &env,
                    &stamps,
                    &self.config.tool_fingerprint_inputs(&tool.name),
                );
                cache.get_or_build(&key, move || execution).await
            }
            None => execution.await,
        }
    }

    async fn execute_and_parse(
        &self,
        tool: Arc<ToolDefinition>,
        action: ToolAction,
        context: ToolContext,
        argv: Vec<String>,
        env: BTreeMap<String, String>,
        filters: Vec<Regex>,
    ) -> ToolOutcome {
        let options = CommandOptions {
            cwd: Some(self.root.clone()),
            env,
            timeout: self.timeout,
            discard_stdin: true,
        };
        let output = match self.runner.run(&argv, &options).await {
            Ok(output) => output,
            Err(err) => {
                return ToolOutcome::failure(
                    &tool.name,
                    &action.name,
                    &format!("execution failed: {err:#}"),
                )
            }
        };

        let (diagnostics, parser_failed) = match &action.parser {
            Some(parser) => match parser.parse(&output.stdout, &output.stderr, &context) {
                Ok(raw) => (
                    self.normalizer
                        .normalize(raw, &tool.name, &self.root, &filters),
                    false,
                ),
                Err(err) => (
                    vec![Diagnostic {
                        file: None,
                        line: None,
                        column: None,
                        severity: Severity::Error,
                        message: format!("output parser failed: {err:#}"),
                        tool: tool.name.clone(),
                        code: None,
                        group: None,
                        hints: Vec::new(),
                        tags: Vec::new(),
                        meta: None,
                    }],
                    true,
                ),
            },
            None => (Vec::new(), false),
        };

        let category = if parser_failed {
            ExitCategory::ToolFailure
        } else {
            let effective_code = if action.ignore_exit && !output.timed_out {
                0
            } else {
                output.returncode
            };
            ExitCategory::from_execution(effective_code, !diagnostics.is_empty(), output.timed_out)
        };

        ToolOutcome {
            tool: tool.name.clone(),
            action: action.name.clone(),
            returncode: output.returncode,
            stdout: filter_lines(output.stdout_lines(), &filters),
            stderr: output.stderr_lines(),
            diagnostics,
            cached: false,
            exit_category: category,
        }
    }

    fn action_filters(&self, tool: &Arc<ToolDefinition>, action: &ToolAction) -> Vec<Regex> {
        let mut patterns = action.filter_patterns.clone();
        if let Some(configured) = self.config.output.tool_filters.get(&tool.name) {
            patterns.extend(configured.iter().cloned());
        }
        compile_filters(&patterns)
    }
}

fn tool_settings(config: &Config, tool: &str) -> Value {
    config.tool_settings.get(tool).cloned().unwrap_or(Value::Null)
}

fn resolve_cache_dir(config: &Config, root: &Path) -> PathBuf {
    let dir = &config.execution.cache_dir;
    if dir.is_absolute() {
        dir.clone()
    } else {
        root.join(dir)
    }
}

fn absolutize(root: &Path) -> PathBuf {
    let absolute = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    std::fs::canonicalize(&absolute).unwrap_or(absolute)
}

fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.lines().map(str::to_string).collect()
    }
}

/// Chunk the phase-major plan into per-phase groups, preserving plan
/// order and the original plan index of every tool.
fn phase_groups(
    ordered: &[String],
    registry: &Arc<ToolRegistry>,
) -> Vec<Vec<(usize, Arc<ToolDefinition>)>> {
    let mut groups: Vec<Vec<(usize, Arc<ToolDefinition>)>> = Vec::new();
    let mut last_key: Option<(usize, String)> = None;
    for (index, name) in ordered.iter().enumerate() {
        let Some(tool) = registry.try_get(name) else {
            continue;
        };
        let key = tool.phase.sort_key();
        if last_key.as_ref() != Some(&key) {
            groups.push(Vec::new());
            last_key = Some(key);
        }
        if let Some(group) = groups.last_mut() {
            group.push((index, tool));
        }
    }
    groups
}

/// Intra-phase dependency sets: `after` edges point into a tool,
/// `before` edges point out of it, both restricted to phase members.
fn intra_phase_dependencies(
    group: &[(usize, Arc<ToolDefinition>)],
    members: &HashSet<String>,
) -> HashMap<String, HashSet<String>> {
    let mut dependencies: HashMap<String, HashSet<String>> = group
        .iter()
        .map(|(_, tool)| (tool.name.clone(), HashSet::new()))
        .collect();
    for (_, tool) in group {
        for dep in &tool.after {
            if members.contains(dep) {
                if let Some(set) = dependencies.get_mut(&tool.name) {
                    let _ = set.insert(dep.clone());
                }
            }
        }
        for successor in &tool.before {
            if members.contains(successor) {
                if let Some(set) = dependencies.get_mut(successor) {
                    let _ = set.insert(tool.name.clone());
                }
            }
        }
    }
    dependencies
}
