//! Turn-end follow-ups.
//!
//! An ordered rule table over the conversation's session state. The first
//! rule whose predicate holds produces the directive; the fields it consumed
//! are cleared by the caller through [`Directive::clear`].

use std::sync::LazyLock;

use backstop_core::GuardConfig;
use backstop_store::{field, BackstopPaths, SessionState};
use regex::Regex;

/// Inputs a rule may look at.
pub struct TurnContext<'a> {
    pub state: &'a SessionState,
    pub paths: &'a BackstopPaths,
    pub config: &'a GuardConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub rule: &'static str,
    pub message: String,
    /// Partial update that clears the consumed fields.
    pub clear: SessionState,
}

pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&TurnContext) -> bool,
    pub act: fn(&TurnContext) -> Directive,
}

/// Priority order, first match wins.
pub static RULES: &[Rule] = &[
    Rule {
        name: "edit_degradation",
        applies: degraded_file_applies,
        act: degraded_file_act,
    },
    Rule {
        name: "missing_file_suggest_restore",
        applies: suggest_restore_applies,
        act: suggest_restore_act,
    },
    Rule {
        name: "missing_file_restored",
        applies: restored_applies,
        act: restored_act,
    },
    Rule {
        name: "build_failed",
        applies: build_failed_applies,
        act: build_failed_act,
    },
    Rule {
        name: "core_edited",
        applies: core_edited_applies,
        act: core_edited_act,
    },
];

/// Evaluate the rule table for one completed turn. Turns that did not
/// complete, or that are already deep in a retry loop, get no directive.
pub fn evaluate(status: &str, loop_count: u64, ctx: &TurnContext) -> Option<Directive> {
    if status != "completed" || loop_count >= ctx.config.max_loops {
        return None;
    }
    RULES
        .iter()
        .find(|rule| (rule.applies)(ctx))
        .map(|rule| {
            tracing::debug!(rule = rule.name, "turn-end rule fired");
            (rule.act)(ctx)
        })
}

static PLACEHOLDER_ISSUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)placeholder|demo|simulated|mock|stub|unimplemented").unwrap()
});

fn degraded_file_applies(ctx: &TurnContext) -> bool {
    ctx.state.flag(field::EDIT_DEGRADATION) && ctx.state.text(field::DEGRADATION_FILE).is_some()
}

fn degraded_file_act(ctx: &TurnContext) -> Directive {
    let file = ctx.state.text(field::DEGRADATION_FILE).unwrap_or_default();
    let issues = ctx.state.list(field::DEGRADATION_ISSUES);
    let summary = issues
        .iter()
        .map(|i| i.strip_suffix('.').unwrap_or(i.as_str()))
        .collect::<Vec<_>>()
        .join("; ");
    let scan = if issues.iter().any(|i| PLACEHOLDER_ISSUE.is_match(i)) {
        format!(" Scan: backstop scan {file}.")
    } else {
        String::new()
    };
    Directive {
        rule: "edit_degradation",
        message: format!(
            "AUTO-REVIEW: Edit to {file} may have lost functionality, introduced placeholder/demo/simulated code, or broken syntax. Issues: {summary}. Rollback and reassessment recommended. Restore: backstop rollback restore {file}.{scan}"
        ),
        clear: SessionState::new()
            .with(field::EDIT_DEGRADATION, false)
            .cleared(field::DEGRADATION_FILE)
            .cleared(field::DEGRADATION_ISSUES),
    }
}

fn suggest_restore_applies(ctx: &TurnContext) -> bool {
    ctx.state.text(field::MISSING_FILE_SUGGEST_RESTORE).is_some()
}

fn suggest_restore_act(ctx: &TurnContext) -> Directive {
    let file = ctx
        .state
        .text(field::MISSING_FILE_SUGGEST_RESTORE)
        .unwrap_or_default();
    Directive {
        rule: "missing_file_suggest_restore",
        message: format!(
            "File {file} was missing. Restore from rollback: backstop rollback restore {file}"
        ),
        clear: SessionState::new().cleared(field::MISSING_FILE_SUGGEST_RESTORE),
    }
}

fn restored_applies(ctx: &TurnContext) -> bool {
    ctx.state.text(field::MISSING_FILE_RESTORED).is_some()
}

fn restored_act(ctx: &TurnContext) -> Directive {
    let file = ctx.state.text(field::MISSING_FILE_RESTORED).unwrap_or_default();
    Directive {
        rule: "missing_file_restored",
        message: format!("File {file} was restored from rollback. Verify and continue."),
        clear: SessionState::new().cleared(field::MISSING_FILE_RESTORED),
    }
}

fn build_failed_applies(ctx: &TurnContext) -> bool {
    ctx.state.flag(field::BUILD_FAILED)
        && ctx.state.flag(field::CORE_EDITED)
        && ctx.paths.has_vcs_root()
}

fn build_failed_act(ctx: &TurnContext) -> Directive {
    let dirs = ctx
        .config
        .core_markers
        .iter()
        .map(|m| format!("{m}/"))
        .collect::<Vec<_>>()
        .join(" ");
    let rebuild = ctx
        .config
        .build_entry_points
        .first()
        .map(|b| format!(" Then fix and run {b}."))
        .unwrap_or_default();
    Directive {
        rule: "build_failed",
        message: format!(
            "Damage detected (build/test failed). Rollback: git checkout -- {dirs}. Or restore a specific file: backstop rollback restore <path>.{rebuild}"
        ),
        clear: SessionState::new()
            .with(field::CORE_EDITED, false)
            .with(field::BUILD_FAILED, false),
    }
}

fn core_edited_applies(ctx: &TurnContext) -> bool {
    ctx.state.flag(field::CORE_EDITED) && build_entry_point(ctx).is_some()
}

fn core_edited_act(ctx: &TurnContext) -> Directive {
    let build = build_entry_point(ctx).unwrap_or_default();
    Directive {
        rule: "core_edited",
        message: format!(
            "Execute {build}. Then {}. Report results.",
            ctx.config.self_test_command
        ),
        clear: SessionState::new().with(field::CORE_EDITED, false),
    }
}

/// First configured build script present under the project root.
fn build_entry_point(ctx: &TurnContext) -> Option<String> {
    ctx.config
        .build_entry_points
        .iter()
        .find(|b| ctx.paths.root.join(b.as_str()).exists())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, BackstopPaths, GuardConfig) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = BackstopPaths::discover(tmp.path());
        (tmp, paths, GuardConfig::default())
    }

    fn run(state: &SessionState, paths: &BackstopPaths, config: &GuardConfig) -> Option<Directive> {
        let ctx = TurnContext {
            state,
            paths,
            config,
        };
        evaluate("completed", 0, &ctx)
    }

    fn degraded_state() -> SessionState {
        SessionState::new()
            .with(field::EDIT_DEGRADATION, true)
            .with(field::DEGRADATION_FILE, "foo.c")
            .with(
                field::DEGRADATION_ISSUES,
                vec!["Line count dropped 80 (40%)."],
            )
    }

    #[test]
    fn degraded_file_names_file_and_issues() {
        let (_tmp, paths, config) = fixture();
        let d = run(&degraded_state(), &paths, &config).unwrap();
        assert_eq!(d.rule, "edit_degradation");
        assert!(d.message.contains("foo.c"));
        assert!(d.message.contains("Line count dropped 80 (40%)."));
        assert!(d.message.contains("backstop rollback restore foo.c"));
        assert!(!d.message.contains("backstop scan"));

        let mut after = degraded_state();
        after.merge(d.clear);
        assert!(!after.flag(field::EDIT_DEGRADATION));
        assert!(after.text(field::DEGRADATION_FILE).is_none());
        assert!(after.list(field::DEGRADATION_ISSUES).is_empty());
    }

    #[test]
    fn multiple_issues_are_semicolon_separated() {
        let (_tmp, paths, config) = fixture();
        let state = degraded_state().with(
            field::DEGRADATION_ISSUES,
            vec![
                "Line count dropped 80 (40%). Possible functionality loss.",
                "Bracket/brace imbalance. Syntax likely broken.",
            ],
        );
        let d = run(&state, &paths, &config).unwrap();
        assert!(d.message.contains(
            "Issues: Line count dropped 80 (40%). Possible functionality loss; \
             Bracket/brace imbalance. Syntax likely broken. Rollback"
        ));
        assert!(!d.message.contains(".."));
    }

    #[test]
    fn placeholder_issue_adds_scan_command() {
        let (_tmp, paths, config) = fixture();
        let state = degraded_state().with(
            field::DEGRADATION_ISSUES,
            vec!["Placeholder/demo/simulated/mock detected: stub:1. Line(s): 3."],
        );
        let d = run(&state, &paths, &config).unwrap();
        assert!(d.message.contains("Scan: backstop scan foo.c."));
    }

    #[test]
    fn incomplete_or_looping_turns_do_nothing() {
        let (_tmp, paths, config) = fixture();
        let state = degraded_state();
        let ctx = TurnContext {
            state: &state,
            paths: &paths,
            config: &config,
        };
        assert!(evaluate("aborted", 0, &ctx).is_none());
        assert!(evaluate("completed", 3, &ctx).is_none());
        assert!(evaluate("completed", 2, &ctx).is_some());
    }

    #[test]
    fn priority_order() {
        let (tmp, paths, config) = fixture();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        std::fs::write(tmp.path().join("build_raijin_mingw.bat"), "@echo off").unwrap();

        let mut state = degraded_state()
            .with(field::MISSING_FILE_SUGGEST_RESTORE, "a.c")
            .with(field::MISSING_FILE_RESTORED, "b.c")
            .with(field::BUILD_FAILED, true)
            .with(field::CORE_EDITED, true);

        let mut fired = Vec::new();
        while let Some(d) = run(&state, &paths, &config) {
            fired.push(d.rule);
            state.merge(d.clear);
        }
        assert_eq!(
            fired,
            vec![
                "edit_degradation",
                "missing_file_suggest_restore",
                "missing_file_restored",
                "build_failed",
            ]
        );
    }

    #[test]
    fn build_failed_needs_vcs_root() {
        let (_tmp, paths, config) = fixture();
        let state = SessionState::new()
            .with(field::BUILD_FAILED, true)
            .with(field::CORE_EDITED, true);
        assert!(run(&state, &paths, &config).is_none());
    }

    #[test]
    fn build_failed_message_and_clear() {
        let (tmp, paths, config) = fixture();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        let state = SessionState::new()
            .with(field::BUILD_FAILED, true)
            .with(field::CORE_EDITED, true);
        let d = run(&state, &paths, &config).unwrap();
        assert!(d.message.contains("git checkout -- Core/ Include/"));
        assert!(d.message.contains("run build_raijin_mingw.bat"));
        assert_eq!(
            d.clear.get(field::CORE_EDITED),
            Some(&serde_json::Value::Bool(false))
        );
    }

    #[test]
    fn core_edit_asks_for_build_when_script_exists() {
        let (tmp, paths, config) = fixture();
        let state = SessionState::new().with(field::CORE_EDITED, true);
        assert!(run(&state, &paths, &config).is_none());

        std::fs::write(tmp.path().join("build_raijin_mingw.bat"), "@echo off").unwrap();
        let d = run(&state, &paths, &config).unwrap();
        assert_eq!(d.rule, "core_edited");
        assert!(d.message.starts_with("Execute build_raijin_mingw.bat."));
        assert!(d.message.contains("--self-test"));
    }

    #[test]
    fn empty_state_yields_nothing() {
        let (_tmp, paths, config) = fixture();
        assert!(run(&SessionState::new(), &paths, &config).is_none());
    }
}
