//! Eligibility evaluation and phase-ordered planning.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use omnilint_config::Config;

use super::{
    build_selection_context, detect_languages, DecisionAction, SelectionContext, SelectionResult,
    ToolDecision, ToolEligibility, ToolFamily, INTERNAL_TAG, WORKSPACE_INTERNAL_TAG,
};
use crate::catalog::{Phase, ToolDefinition, ToolRegistry};
use crate::error::EngineError;

/// Plans tool execution order from configuration and catalog metadata.
#[derive(Debug, Clone)]
pub struct ToolSelector {
    registry: Arc<ToolRegistry>,
}

impl ToolSelector {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Names to run, in execution order.
    pub fn select_tools(
        &self,
        config: &Config,
        files: &[std::path::PathBuf],
        root: &Path,
    ) -> Result<Vec<String>, EngineError> {
        Ok(self.plan_selection(config, files, root)?.ordered)
    }

    /// Full plan: ordered run list plus per-tool decisions. Pure in its
    /// inputs; repeated calls produce identical results.
    pub fn plan_selection(
        &self,
        config: &Config,
        files: &[std::path::PathBuf],
        root: &Path,
    ) -> Result<SelectionResult, EngineError> {
        let context =
            build_selection_context(config, files, detect_languages(root, files), root);
        let decisions = if context.requested_only.is_empty() {
            self.evaluate_standard(&context)
        } else {
            self.evaluate_with_only(&context)
        };

        if !context.requested_only.is_empty() {
            let unknown: Vec<String> = decisions
                .iter()
                .filter(|decision| {
                    decision.eligibility.requested_via_only && !decision.eligibility.available
                })
                .map(|decision| decision.name.clone())
                .collect();
            if !unknown.is_empty() {
                return Err(EngineError::UnknownToolsRequested {
                    names: dedupe(&unknown),
                });
            }
        }

        let run_candidates: Vec<String> = decisions
            .iter()
            .filter(|decision| {
                decision.action == DecisionAction::Run && decision.eligibility.available
            })
            .map(|decision| decision.name.clone())
            .collect();
        let ordered = self.order_tools(&run_candidates);
        Ok(SelectionResult {
            ordered,
            decisions,
            context,
        })
    }

    /// Order tools by phase, then by declared `before`/`after` edges
    /// within each phase. Unknown names are dropped.
    pub fn order_tools(&self, names: &[String]) -> Vec<String> {
        let ordered_input = dedupe(names);
        let mut tools: HashMap<String, Arc<ToolDefinition>> = HashMap::new();
        for name in &ordered_input {
            if let Some(tool) = self.registry.try_get(name) {
                let _ = tools.insert(name.clone(), tool);
            }
        }
        let filtered: Vec<String> = ordered_input
            .into_iter()
            .filter(|name| tools.contains_key(name))
            .collect();
        if filtered.is_empty() {
            return Vec::new();
        }

        // Keyed by the phase total-order key; declared phases first,
        // unknown phases after, sorted by name.
        let mut phase_groups: BTreeMap<(usize, String), Vec<String>> = BTreeMap::new();
        for name in &filtered {
            let phase = tools
                .get(name)
                .map(|tool| tool.phase.clone())
                .unwrap_or_default();
            phase_groups
                .entry(phase.sort_key())
                .or_default()
                .push(name.clone());
        }

        let mut result = Vec::with_capacity(filtered.len());
        for names in phase_groups.values() {
            result.extend(order_phase(names, &tools));
        }
        result
    }

    fn evaluate_standard(&self, context: &SelectionContext) -> Vec<ToolDecision> {
        let internal_enabled = context.sensitivity.enables_internal();
        let scope_active = context.omnilint_workspace || context.omnilint_rules;
        let enabled: HashSet<String> = context
            .requested_enable
            .iter()
            .map(|name| name.to_lowercase())
            .collect();
        self.registry
            .tools()
            .map(|tool| {
                let mut decision = match family_for_tool(tool) {
                    ToolFamily::External => self.external_decision(tool, context),
                    ToolFamily::Internal => internal_decision(tool, internal_enabled),
                    _ => workspace_internal_decision(
                        tool,
                        internal_enabled,
                        scope_active,
                        context.omnilint_rules,
                    ),
                };
                // An explicit enable overrides a heuristic skip.
                if decision.action == DecisionAction::Skip
                    && enabled.contains(&tool.name.to_lowercase())
                {
                    decision.action = DecisionAction::Run;
                    decision.reasons = vec!["enabled-by-config".to_string()];
                }
                decision
            })
            .collect()
    }

    fn evaluate_with_only(&self, context: &SelectionContext) -> Vec<ToolDecision> {
        let mut requested_lookup: BTreeMap<String, String> = BTreeMap::new();
        for name in &context.requested_only {
            let lowered = name.to_lowercase();
            let _ = requested_lookup.entry(lowered).or_insert_with(|| name.clone());
        }

        let available_lower: HashSet<String> = self
            .registry
            .names()
            .map(|name| name.to_lowercase())
            .collect();

        let mut decisions: Vec<ToolDecision> = self
            .registry
            .tools()
            .map(|tool| {
                let requested = requested_lookup.contains_key(&tool.name.to_lowercase());
                let mut eligibility = self.build_eligibility(tool, context);
                eligibility.requested_via_only = requested;
                let (action, reason) = if requested {
                    (DecisionAction::Run, "requested-via-only")
                } else {
                    (DecisionAction::Skip, "filtered-by-only")
                };
                ToolDecision {
                    name: tool.name.clone(),
                    family: eligibility.family,
                    phase: tool.phase.clone(),
                    action,
                    reasons: vec![reason.to_string()],
                    eligibility,
                }
            })
            .collect();

        for (lowered, original) in &requested_lookup {
            if available_lower.contains(lowered) {
                continue;
            }
            let mut eligibility =
                ToolEligibility::new(original, ToolFamily::Unknown, Phase::default());
            eligibility.available = false;
            eligibility.requested_via_only = true;
            decisions.push(ToolDecision {
                name: original.clone(),
                family: ToolFamily::Unknown,
                phase: Phase::default(),
                action: DecisionAction::Skip,
                reasons: vec!["unknown-tool".to_string()],
                eligibility,
            });
        }
        decisions
    }

    fn external_decision(
        &self,
        tool: &Arc<ToolDefinition>,
        context: &SelectionContext,
    ) -> ToolDecision {
        let (language_match, extension_match, config_match) = external_indicators(tool, context);
        let mut eligible_sources: Vec<&str> = Vec::new();
        if !tool.languages.is_empty() && language_match {
            eligible_sources.push("language-match");
        }
        if !tool.file_extensions.is_empty() && extension_match {
            eligible_sources.push("extension-match");
        }
        if !tool.config_files.is_empty() && config_match {
            eligible_sources.push("config-present");
        }

        let constrained = !tool.languages.is_empty()
            || !tool.file_extensions.is_empty()
            || !tool.config_files.is_empty();
        let should_run = if constrained {
            !eligible_sources.is_empty()
        } else {
            eligible_sources.push("no-constraints");
            true
        };

        let mut reasons: Vec<String> = Vec::new();
        if should_run {
            reasons.push("workspace-match".to_string());
            reasons.extend(eligible_sources.iter().map(|s| s.to_string()));
        } else {
            if !tool.languages.is_empty() && !language_match {
                reasons.push("no-language-match".to_string());
            }
            if !tool.file_extensions.is_empty() && !extension_match {
                reasons.push("no-extension-match".to_string());
            }
            if !tool.config_files.is_empty() && !config_match {
                reasons.push("missing-config".to_string());
            }
            if reasons.is_empty() {
                reasons.push("no-signal".to_string());
            }
        }

        let mut eligibility =
            ToolEligibility::new(&tool.name, ToolFamily::External, tool.phase.clone());
        eligibility.language_match = (!tool.languages.is_empty()).then_some(language_match);
        eligibility.extension_match =
            (!tool.file_extensions.is_empty()).then_some(extension_match);
        eligibility.config_match = (!tool.config_files.is_empty()).then_some(config_match);
        ToolDecision {
            name: tool.name.clone(),
            family: ToolFamily::External,
            phase: tool.phase.clone(),
            action: if should_run {
                DecisionAction::Run
            } else {
                DecisionAction::Skip
            },
            reasons,
            eligibility,
        }
    }

    fn build_eligibility(
        &self,
        tool: &Arc<ToolDefinition>,
        context: &SelectionContext,
    ) -> ToolEligibility {
        let family = family_for_tool(tool);
        let mut eligibility = ToolEligibility::new(&tool.name, family, tool.phase.clone());
        match family {
            ToolFamily::External => {
                let (language_match, extension_match, config_match) =
                    external_indicators(tool, context);
                eligibility.language_match =
                    (!tool.languages.is_empty()).then_some(language_match);
                eligibility.extension_match =
                    (!tool.file_extensions.is_empty()).then_some(extension_match);
                eligibility.config_match =
                    (!tool.config_files.is_empty()).then_some(config_match);
            }
            ToolFamily::Internal => {
                eligibility.sensitivity_ok = Some(context.sensitivity.enables_internal());
                eligibility.default_enabled = Some(tool.default_enabled);
            }
            _ => {
                eligibility.sensitivity_ok =
                    Some(context.sensitivity.enables_internal() || context.omnilint_rules);
                eligibility.workspace_scope =
                    Some(context.omnilint_workspace || context.omnilint_rules);
                eligibility.default_enabled = Some(tool.default_enabled);
            }
        }
        eligibility
    }
}

fn internal_decision(tool: &Arc<ToolDefinition>, internal_enabled: bool) -> ToolDecision {
    let should_run = internal_enabled || tool.default_enabled;
    let mut reasons: Vec<String> = Vec::new();
    if should_run {
        if internal_enabled {
            reasons.push("sensitivity>=high".to_string());
        }
        if tool.default_enabled && !internal_enabled {
            reasons.push("default-enabled".to_string());
        }
    } else {
        reasons.push("sensitivity-too-low".to_string());
    }

    let mut eligibility =
        ToolEligibility::new(&tool.name, ToolFamily::Internal, tool.phase.clone());
    eligibility.sensitivity_ok = Some(internal_enabled);
    eligibility.default_enabled = Some(tool.default_enabled);
    ToolDecision {
        name: tool.name.clone(),
        family: ToolFamily::Internal,
        phase: tool.phase.clone(),
        action: if should_run {
            DecisionAction::Run
        } else {
            DecisionAction::Skip
        },
        reasons,
        eligibility,
    }
}

fn workspace_internal_decision(
    tool: &Arc<ToolDefinition>,
    internal_enabled: bool,
    scope_active: bool,
    forced: bool,
) -> ToolDecision {
    let should_run = scope_active;
    let mut reasons: Vec<String> = Vec::new();
    if should_run {
        reasons.push("omnilint-scope".to_string());
        if forced && !internal_enabled {
            reasons.push("forced-by-flag".to_string());
        } else if internal_enabled {
            reasons.push("sensitivity>=high".to_string());
        }
        if tool.default_enabled && !(internal_enabled || forced) {
            reasons.push("default-enabled".to_string());
        }
    } else {
        reasons.push("omnilint-scope-disabled".to_string());
    }

    let mut eligibility = ToolEligibility::new(
        &tool.name,
        ToolFamily::InternalWorkspace,
        tool.phase.clone(),
    );
    eligibility.sensitivity_ok = Some(internal_enabled || forced);
    eligibility.workspace_scope = Some(scope_active);
    eligibility.default_enabled = Some(tool.default_enabled);
    ToolDecision {
        name: tool.name.clone(),
        family: ToolFamily::InternalWorkspace,
        phase: tool.phase.clone(),
        action: if should_run {
            DecisionAction::Run
        } else {
            DecisionAction::Skip
        },
        reasons,
        eligibility,
    }
}

fn family_for_tool(tool: &Arc<ToolDefinition>) -> ToolFamily {
    if tool.has_tag(WORKSPACE_INTERNAL_TAG) {
        ToolFamily::InternalWorkspace
    } else if tool.has_tag(INTERNAL_TAG) {
        ToolFamily::Internal
    } else {
        ToolFamily::External
    }
}

fn external_indicators(
    tool: &Arc<ToolDefinition>,
    context: &SelectionContext,
) -> (bool, bool, bool) {
    let scope = context.language_scope();
    let language_match = tool
        .languages
        .iter()
        .any(|language| scope.contains(language.as_str()));
    let extension_match = tool
        .file_extensions
        .iter()
        .any(|ext| context.file_extensions.contains(&ext.to_ascii_lowercase()));
    let config_match = tool
        .config_files
        .iter()
        .any(|file| context.root.join(file).exists());
    (language_match, extension_match, config_match)
}

/// Topologically linearize one phase. `after` edges point into a tool,
/// `before` edges point out of it; both are restricted to phase members.
/// Scanning candidates in insertion order keeps ties stable; a cycle
/// falls back to the insertion order for the whole phase.
fn order_phase(names: &[String], tools: &HashMap<String, Arc<ToolDefinition>>) -> Vec<String> {
    if names.len() <= 1 {
        return names.to_vec();
    }

    let members: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut dependencies: HashMap<&str, BTreeSet<&str>> = names
        .iter()
        .map(|name| (name.as_str(), BTreeSet::new()))
        .collect();
    for name in names {
        let Some(tool) = tools.get(name) else { continue };
        for dep in &tool.after {
            if members.contains(dep.as_str()) {
                if let Some(set) = dependencies.get_mut(name.as_str()) {
                    let _ = set.insert(dep.as_str());
                }
            }
        }
        for successor in &tool.before {
            if members.contains(successor.as_str()) {
                if let Some(set) = dependencies.get_mut(successor.as_str()) {
                    let _ = set.insert(name.as_str());
                }
            }
        }
    }

    let mut done: HashSet<&str> = HashSet::new();
    let mut ordered: Vec<String> = Vec::with_capacity(names.len());
    while ordered.len() < names.len() {
        // Pick the first not-yet-emitted member whose dependencies are
        // all satisfied; scanning in insertion order keeps ties stable.
        let next = names.iter().find(|name| {
            !done.contains(name.as_str())
                && dependencies
                    .get(name.as_str())
                    .is_none_or(|deps| deps.iter().all(|dep| done.contains(dep)))
        });
        match next {
            Some(name) => {
                let _ = done.insert(name.as_str());
                ordered.push(name.clone());
            }
            None => return names.to_vec(),
        }
    }
    ordered
}

fn dedupe(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RuntimeKind, StaticCommand, ToolAction};
    use pretty_assertions::assert_eq;

    fn action(name: &str) -> ToolAction {
        ToolAction::new("check", StaticCommand::new([name]))
    }

    fn registry(tools: Vec<ToolDefinition>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool).expect("register");
        }
        Arc::new(registry)
    }

    fn plan(
        selector: &ToolSelector,
        config: &Config,
        files: &[std::path::PathBuf],
        root: &Path,
    ) -> SelectionResult {
        selector.plan_selection(config, files, root).expect("plan")
    }

    #[test]
    fn unconstrained_external_tools_always_run() {
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("generic", RuntimeKind::Binary).with_action(action("generic")),
        ]));
        let dir = tempfile::tempdir().expect("tempdir");
        let result = plan(&selector, &Config::default(), &[], dir.path());
        assert_eq!(result.ordered, vec!["generic"]);
        let decision = result.decision_for("generic").expect("decision");
        assert!(decision.reasons.contains(&"no-constraints".to_string()));
    }

    #[test]
    fn extension_signals_gate_external_tools() {
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("ruff", RuntimeKind::Python)
                .with_file_extensions([".py"])
                .with_action(action("ruff")),
            ToolDefinition::new("eslint", RuntimeKind::Npm)
                .with_file_extensions([".js"])
                .with_action(action("eslint")),
        ]));
        let dir = tempfile::tempdir().expect("tempdir");
        let files = vec![dir.path().join("app.py")];
        let result = plan(&selector, &Config::default(), &files, dir.path());
        assert_eq!(result.ordered, vec!["ruff"]);
        let skipped = result.decision_for("eslint").expect("decision");
        assert_eq!(skipped.action, DecisionAction::Skip);
        assert!(skipped.reasons.contains(&"no-extension-match".to_string()));
    }

    #[test]
    fn config_file_presence_enables_a_tool() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(".stylelintrc"), "{}").expect("write");
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("stylelint", RuntimeKind::Npm)
                .with_config_files([".stylelintrc"])
                .with_action(action("stylelint")),
        ]));
        let result = plan(&selector, &Config::default(), &[], dir.path());
        assert_eq!(result.ordered, vec!["stylelint"]);
        let decision = result.decision_for("stylelint").expect("decision");
        assert!(decision.reasons.contains(&"config-present".to_string()));
    }

    #[test]
    fn internal_tools_need_high_sensitivity_or_default_enabled() {
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("doc-check", RuntimeKind::Binary)
                .with_tag(INTERNAL_TAG)
                .with_action(action("doc-check")),
            ToolDefinition::new("hygiene", RuntimeKind::Binary)
                .with_tag(INTERNAL_TAG)
                .default_enabled()
                .with_action(action("hygiene")),
        ]));
        let dir = tempfile::tempdir().expect("tempdir");

        let low = Config::default();
        let result = plan(&selector, &low, &[], dir.path());
        assert_eq!(result.ordered, vec!["hygiene"]);
        let skipped = result.decision_for("doc-check").expect("decision");
        assert!(skipped.reasons.contains(&"sensitivity-too-low".to_string()));

        let mut high = Config::default();
        high.severity.sensitivity = omnilint_config::SensitivityLevel::High;
        let result = plan(&selector, &high, &[], dir.path());
        assert_eq!(result.ordered, vec!["doc-check", "hygiene"]);
    }

    #[test]
    fn workspace_scoped_tools_stay_off_outside_the_workspace() {
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("self-check", RuntimeKind::Binary)
                .with_tag(WORKSPACE_INTERNAL_TAG)
                .default_enabled()
                .with_action(action("self-check")),
        ]));
        let dir = tempfile::tempdir().expect("tempdir");

        let result = plan(&selector, &Config::default(), &[], dir.path());
        assert!(result.ordered.is_empty());
        let decision = result.decision_for("self-check").expect("decision");
        assert!(decision
            .reasons
            .contains(&"omnilint-scope-disabled".to_string()));

        let mut forced = Config::default();
        forced.execution.omnilint_rules = true;
        let result = plan(&selector, &forced, &[], dir.path());
        assert_eq!(result.ordered, vec!["self-check"]);
        let decision = result.decision_for("self-check").expect("decision");
        assert!(decision.reasons.contains(&"omnilint-scope".to_string()));
        assert!(decision.reasons.contains(&"forced-by-flag".to_string()));
    }

    #[test]
    fn explicit_enable_overrides_a_heuristic_skip() {
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("doc-check", RuntimeKind::Binary)
                .with_tag(INTERNAL_TAG)
                .with_action(action("doc-check")),
        ]));
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.execution.enable = vec!["doc-check".to_string()];
        let result = plan(&selector, &config, &[], dir.path());
        assert_eq!(result.ordered, vec!["doc-check"]);
        let decision = result.decision_for("doc-check").expect("decision");
        assert!(decision.reasons.contains(&"enabled-by-config".to_string()));
    }

    #[test]
    fn only_filter_selects_exactly_the_requested_tools() {
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("ruff", RuntimeKind::Python).with_action(action("ruff")),
            ToolDefinition::new("pylint", RuntimeKind::Python).with_action(action("pylint")),
        ]));
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.execution.only = vec!["RUFF".to_string()];
        let result = plan(&selector, &config, &[], dir.path());
        assert_eq!(result.ordered, vec!["ruff"]);
        let skipped = result.decision_for("pylint").expect("decision");
        assert!(skipped.reasons.contains(&"filtered-by-only".to_string()));
    }

    #[test]
    fn unknown_only_names_raise_with_the_full_list() {
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("ruff", RuntimeKind::Python).with_action(action("ruff")),
        ]));
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.execution.only = vec![
            "ruff".to_string(),
            "ghost".to_string(),
            "phantom".to_string(),
            "ghost".to_string(),
        ];
        let error = selector
            .plan_selection(&config, &[], dir.path())
            .expect_err("unknown tools");
        match error {
            EngineError::UnknownToolsRequested { names } => {
                assert_eq!(names, vec!["ghost".to_string(), "phantom".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn phases_order_before_dependencies() {
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("analysis-tool", RuntimeKind::Binary)
                .with_phase(Phase::Analysis)
                .with_after(["format-tool"])
                .with_action(action("analyze")),
            ToolDefinition::new("format-tool", RuntimeKind::Binary)
                .with_phase(Phase::Format)
                .with_action(action("fmt")),
            ToolDefinition::new("lint-tool", RuntimeKind::Binary)
                .with_phase(Phase::Lint)
                .with_action(action("lint")),
        ]));
        let ordered = selector.order_tools(&[
            "analysis-tool".to_string(),
            "lint-tool".to_string(),
            "format-tool".to_string(),
        ]);
        assert_eq!(ordered, vec!["format-tool", "lint-tool", "analysis-tool"]);
    }

    #[test]
    fn before_edges_reorder_within_a_phase() {
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("format-tool", RuntimeKind::Binary)
                .with_phase(Phase::Format)
                .with_action(action("fmt")),
            ToolDefinition::new("format-b", RuntimeKind::Binary)
                .with_phase(Phase::Format)
                .with_before(["format-tool"])
                .with_action(action("fmt-b")),
        ]));
        let ordered =
            selector.order_tools(&["format-tool".to_string(), "format-b".to_string()]);
        assert_eq!(ordered, vec!["format-b", "format-tool"]);
    }

    #[test]
    fn dependency_cycles_degrade_to_insertion_order() {
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("a", RuntimeKind::Binary)
                .with_before(["b"])
                .with_action(action("a")),
            ToolDefinition::new("b", RuntimeKind::Binary)
                .with_before(["a"])
                .with_action(action("b")),
        ]));
        let ordered = selector.order_tools(&["a".to_string(), "b".to_string()]);
        assert_eq!(ordered, vec!["a", "b"]);
    }

    #[test]
    fn unknown_phases_run_after_declared_ones_sorted_by_name() {
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("zeta", RuntimeKind::Binary)
                .with_phase(Phase::Other("zeta-phase".to_string()))
                .with_action(action("zeta")),
            ToolDefinition::new("docs", RuntimeKind::Binary)
                .with_phase(Phase::Other("docs-phase".to_string()))
                .with_action(action("docs")),
            ToolDefinition::new("lint-tool", RuntimeKind::Binary)
                .with_phase(Phase::Lint)
                .with_action(action("lint")),
        ]));
        let ordered = selector.order_tools(&[
            "zeta".to_string(),
            "docs".to_string(),
            "lint-tool".to_string(),
        ]);
        assert_eq!(ordered, vec!["lint-tool", "docs", "zeta"]);
    }

    #[test]
    fn planning_is_deterministic() {
        let selector = ToolSelector::new(registry(vec![
            ToolDefinition::new("ruff", RuntimeKind::Python)
                .with_file_extensions([".py"])
                .with_action(action("ruff")),
            ToolDefinition::new("generic", RuntimeKind::Binary).with_action(action("generic")),
        ]));
        let dir = tempfile::tempdir().expect("tempdir");
        let files = vec![dir.path().join("app.py")];
        let first = plan(&selector, &Config::default(), &files, dir.path());
        let second = plan(&selector, &Config::default(), &files, dir.path());
        assert_eq!(first.ordered, second.ordered);
    }
}
