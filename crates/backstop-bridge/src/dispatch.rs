use backstop_core::{source, GuardConfig};
use backstop_review::{review, LiteralReverse, Reconstructor};
use backstop_store::{
    field, now_rfc3339, project_root, BackstopPaths, EventLog, SessionState, SessionStore,
    SnapshotStore,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::decision::{self, TurnContext};
use crate::parse::{parse_hook_stdin, HookRequest};
use crate::redact::{preview, preview_value, tail};
use crate::shell::{self, CommandKind};

// ── Hook Response ──

/// The single JSON object written back to the host. Absent fields are
/// omitted, so the default value serializes as `{}`.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct HookResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_session: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followup_message: Option<String>,
}

impl HookResponse {
    /// `{permission: "allow"}` for gating checks.
    pub fn permit() -> Self {
        Self {
            permission: Some("allow".to_string()),
            ..Self::default()
        }
    }

    /// `{decision: "allow"}` for approval checks.
    pub fn approve() -> Self {
        Self {
            decision: Some("allow".to_string()),
            ..Self::default()
        }
    }

    pub fn proceed(context: Option<String>) -> Self {
        Self {
            continue_session: Some(true),
            additional_context: context,
            ..Self::default()
        }
    }

    pub fn followup(message: String) -> Self {
        Self {
            followup_message: Some(message),
            ..Self::default()
        }
    }
}

// ── Hook Result ──

/// Result from a hook dispatch.
///
/// - `response`: JSON object to print to stdout (consumed by the host)
/// - `blocked`: the action was denied; the caller exits with code 2
#[derive(Debug, Default, Clone)]
pub struct HookResult {
    pub response: HookResponse,
    pub blocked: bool,
}

impl HookResult {
    pub fn output(response: HookResponse) -> Self {
        Self {
            response,
            blocked: false,
        }
    }

    pub fn deny(user_message: &str, agent_message: &str) -> Self {
        Self {
            response: HookResponse {
                permission: Some("deny".to_string()),
                user_message: Some(user_message.to_string()),
                agent_message: Some(agent_message.to_string()),
                ..HookResponse::default()
            },
            blocked: true,
        }
    }

    /// Construct an empty result (`{}`, exit 0).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.response).unwrap_or_else(|_| "{}".to_string())
    }
}

/// The response an event gets when its handler fails or its input is
/// unreadable.
pub fn fallback_response(event: &str) -> HookResponse {
    match event {
        "beforeReadFile" | "beforeShellExecution" | "beforeMCPExecution" => HookResponse::permit(),
        "preToolUse" | "subagentStart" => HookResponse::approve(),
        "sessionStart" => HookResponse::proceed(None),
        _ => HookResponse::default(),
    }
}

// ── Hook dispatch ──

/// Main hook entrypoint: parse stdin, dispatch by event name.
/// Never fails; a bad payload gets the event's minimal response.
pub fn hook_entrypoint_from_stdin(stdin: &str, event_hint: Option<&str>) -> HookResult {
    let paths = BackstopPaths::discover(project_root());
    let config = GuardConfig::load(&paths.config_json);
    let bridge = Bridge::new(paths, config);
    match parse_hook_stdin(stdin) {
        Ok(raw) => bridge.handle(event_hint, raw),
        Err(e) => {
            let event = event_hint.unwrap_or_default();
            tracing::warn!(event, error = %e, "unparsable hook payload");
            bridge.log.append("parse_error", json!({ "hook": event }));
            HookResult::output(fallback_response(event))
        }
    }
}

/// Per-invocation handle on the project's stores.
pub struct Bridge {
    pub paths: BackstopPaths,
    pub config: GuardConfig,
    pub snapshots: SnapshotStore,
    pub sessions: SessionStore,
    pub log: EventLog,
}

impl Bridge {
    pub fn new(paths: BackstopPaths, config: GuardConfig) -> Self {
        let log = EventLog::new(paths.hooks_log.clone(), config.log_max_bytes, config.log_keep);
        Self {
            snapshots: SnapshotStore::new(paths.clone()),
            sessions: SessionStore::new(&paths),
            log,
            paths,
            config,
        }
    }

    /// Handle one request. Handler errors are logged and replaced by the
    /// event's fallback response.
    pub fn handle(&self, event_hint: Option<&str>, raw: Value) -> HookResult {
        let req = HookRequest::from_value(event_hint, raw);
        if let Err(e) = self.paths.ensure_layout() {
            tracing::debug!(error = %e, "could not create data layout");
        }
        match self.route(&req) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(event = %req.event, error = %e, "hook handler failed");
                self.log.append(
                    "handler_error",
                    json!({ "hook": req.event, "error": preview(&e.to_string(), 300) }),
                );
                HookResult::output(fallback_response(&req.event))
            }
        }
    }

    fn route(&self, req: &HookRequest) -> anyhow::Result<HookResult> {
        match req.event.as_str() {
            "sessionStart" => self.session_start(req),
            "afterFileEdit" => self.after_edit(req, false),
            "afterTabFileEdit" => self.after_edit(req, true),
            "beforeReadFile" => self.before_read_file(req),
            "beforeShellExecution" => self.before_shell(req),
            "afterShellExecution" => self.after_shell(req),
            "postToolUseFailure" => self.post_tool_failure(req),
            "stop" => self.stop(req),
            "preToolUse" => {
                self.log.append("preToolUse", json!({ "tool": req.tool_name }));
                Ok(HookResult::output(HookResponse::approve()))
            }
            "subagentStart" => {
                self.log.append(
                    "subagentStart",
                    json!({
                        "subagent_type": req.raw_field("subagent_type"),
                        "prompt_preview": preview_value(&req.raw_field("prompt"), 200),
                    }),
                );
                Ok(HookResult::output(HookResponse::approve()))
            }
            "beforeMCPExecution" => {
                self.log.append(
                    "beforeMCPExecution",
                    json!({
                        "tool_name": req.tool_name,
                        "input_preview": preview_value(&req.tool_input, 500),
                    }),
                );
                Ok(HookResult::output(HookResponse::permit()))
            }
            "afterMCPExecution" => {
                self.log.append(
                    "afterMCPExecution",
                    json!({ "tool": req.tool_name, "duration": req.raw_field("duration") }),
                );
                Ok(HookResult::empty())
            }
            "afterAgentResponse" => {
                let text = req.raw_field("text");
                let len = text.as_str().map_or(0, |t| t.chars().count());
                self.log.append(
                    "afterAgentResponse",
                    json!({ "len": len, "preview": preview_value(&text, 100) }),
                );
                Ok(HookResult::empty())
            }
            "subagentStop" => {
                self.log.append(
                    "subagentStop",
                    json!({
                        "subagent_type": req.raw_field("subagent_type"),
                        "status": req.status,
                        "duration": req.raw_field("duration"),
                        "result_preview": preview_value(&req.raw_field("result"), 500),
                    }),
                );
                Ok(HookResult::empty())
            }
            "preCompact" => {
                self.log.append(
                    "preCompact",
                    self.telemetry(
                        req,
                        &[
                            "trigger",
                            "context_usage_percent",
                            "context_tokens",
                            "context_window_size",
                            "message_count",
                            "messages_to_compact",
                            "is_first_compaction",
                        ],
                    ),
                );
                Ok(HookResult::empty())
            }
            "sessionEnd" => {
                let mut fields = self.telemetry(
                    req,
                    &[
                        "session_id",
                        "reason",
                        "duration_ms",
                        "is_background_agent",
                        "final_status",
                    ],
                );
                fields["error"] = json!(preview_value(&req.raw_field("error_message"), 200));
                self.log.append("sessionEnd", fields);
                Ok(HookResult::empty())
            }
            other => {
                tracing::debug!(event = other, "unhandled hook event");
                self.log.append("unhandled", json!({ "hook": other }));
                Ok(HookResult::empty())
            }
        }
    }

    /// Copy the named raw fields into a log object.
    fn telemetry(&self, req: &HookRequest, keys: &[&str]) -> Value {
        let mut out = serde_json::Map::new();
        for key in keys {
            out.insert(key.to_string(), req.raw_field(key));
        }
        Value::Object(out)
    }

    // ── Session ──

    fn session_start(&self, req: &HookRequest) -> anyhow::Result<HookResult> {
        let cid = &req.conversation_id;
        self.sessions.reset(
            cid,
            SessionState::new()
                .with(field::CORE_EDITED, false)
                .with(field::BUILD_FAILED, false)
                .with(field::STARTED_AT, now_rfc3339()),
        );
        self.log.append("sessionStart", json!({ "cid": cid }));
        Ok(HookResult::output(HookResponse::proceed(Some(
            self.session_context(),
        ))))
    }

    fn session_context(&self) -> String {
        let mut lines = vec![
            "Backstop active: every edit is snapshotted and reviewed for lost code, broken syntax, and placeholder text.".to_string(),
            format!(
                "Build: {}. Test: {}. Verify every change.",
                self.config.build_entry_points.join(", "),
                self.config.self_test_command
            ),
            "Edits introducing placeholder/demo/stub/simulated/mock code trigger AUTO-REVIEW. Scan: backstop scan <path>. Restore: backstop rollback restore <path>.".to_string(),
        ];
        lines.extend(self.config.session_context.iter().cloned());
        lines.join(" ")
    }

    // ── Edits ──

    fn after_edit(&self, req: &HookRequest, tab: bool) -> anyhow::Result<HookResult> {
        if req.edits.is_empty() || req.file_path.is_empty() {
            return Ok(HookResult::empty());
        }
        let event = if tab { "afterTabFileEdit" } else { "afterFileEdit" };
        let rel = self.paths.relative(&req.file_path);
        self.snapshots.register_expected(&rel);

        let core = !tab && self.config.is_core_path(&rel);
        if core {
            self.sessions.set(
                &req.conversation_id,
                SessionState::new().with(field::CORE_EDITED, true),
            );
        }

        let abs = self.paths.absolute(&req.file_path);
        let post = match backstop_store::read_lossy(&abs) {
            Ok(c) => c,
            Err(e) => {
                // Nothing to capture. An empty snapshot would shadow the last good one.
                tracing::warn!(file = %abs.display(), error = %e, "edited file unreadable");
                self.log.append(
                    &format!("{event}_unreadable"),
                    json!({ "file": rel, "error": e.to_string() }),
                );
                return Ok(HookResult::empty());
            }
        };
        let pre = LiteralReverse.reconstruct_previous(&post, &req.edits);
        let sources = if tab {
            (source::TAB_EDIT_PRE, source::TAB_EDIT_POST)
        } else {
            (source::EDIT_PRE, source::EDIT_POST)
        };
        self.snapshots.record_edit(&rel, &pre, &post, sources);

        let result = review(&pre, &post, &req.file_path, &self.config);
        if result.degraded && !tab {
            self.sessions.set(
                &req.conversation_id,
                SessionState::new()
                    .with(field::EDIT_DEGRADATION, true)
                    .with(field::DEGRADATION_FILE, rel.as_str())
                    .with(field::DEGRADATION_ISSUES, result.issues.clone()),
            );
            self.log.append(
                "afterFileEdit_degradation",
                json!({
                    "file": rel,
                    "issues": result.issues,
                    "placeholder_count": result.placeholder_matches.len(),
                    "metrics": serde_json::to_value(&result.metrics)?,
                }),
            );
        }
        self.log.append(
            event,
            json!({
                "file": rel,
                "edit_count": req.edits.len(),
                "core": core,
                "degraded": result.degraded,
            }),
        );
        Ok(HookResult::empty())
    }

    // ── Reads ──

    fn before_read_file(&self, req: &HookRequest) -> anyhow::Result<HookResult> {
        if req.file_path.is_empty() {
            return Ok(HookResult::output(HookResponse::permit()));
        }
        let rel = self.paths.relative(&req.file_path);
        let abs = self.paths.absolute(&req.file_path);
        if abs.exists() {
            if !req.content.is_empty() && !self.snapshots.latest_matches(&rel, &req.content) {
                self.snapshots.register_expected(&rel);
                let stage = self.snapshots.next_stage(&rel);
                if self
                    .snapshots
                    .save(&rel, &req.content, stage, Some(source::READ))
                    .is_some()
                {
                    self.log
                        .append("beforeReadFile_capture", json!({ "file": rel, "stage": stage }));
                }
            }
        } else if self.snapshots.restore(&rel) {
            self.log.append("beforeReadFile_restored", json!({ "file": rel }));
        }
        Ok(HookResult::output(HookResponse::permit()))
    }

    fn post_tool_failure(&self, req: &HookRequest) -> anyhow::Result<HookResult> {
        self.log.append(
            "postToolUseFailure",
            json!({
                "tool": req.tool_name,
                "failure_type": req.raw_field("failure_type"),
                "error": preview_value(&req.raw_field("error_message"), 300),
            }),
        );
        if req.tool_name != "Read" {
            return Ok(HookResult::empty());
        }
        let Some(path) = req.tool_input_path() else {
            return Ok(HookResult::empty());
        };
        let rel = self.paths.relative(&path);
        if self.paths.absolute(&path).exists() || self.snapshots.find_latest(&rel).is_none() {
            return Ok(HookResult::empty());
        }
        if self.snapshots.restore(&rel) {
            self.sessions.set(
                &req.conversation_id,
                SessionState::new().with(field::MISSING_FILE_RESTORED, rel.as_str()),
            );
            self.log.append("postToolUseFailure_restored", json!({ "file": rel }));
        } else {
            self.sessions.set(
                &req.conversation_id,
                SessionState::new().with(field::MISSING_FILE_SUGGEST_RESTORE, rel.as_str()),
            );
        }
        Ok(HookResult::empty())
    }

    // ── Shell ──

    fn before_shell(&self, req: &HookRequest) -> anyhow::Result<HookResult> {
        let cmd = &req.command;
        self.log
            .append("beforeShellExecution", json!({ "cmd_preview": preview(cmd, 500) }));
        if shell::is_destructive(cmd) {
            self.log.append(
                "beforeShellExecution_protect",
                json!({ "cmd_preview": preview(cmd, 200) }),
            );
            return Ok(HookResult::deny(
                "Blocked: command would destroy project or system.",
                "Command blocked to protect the workspace. Use safe alternatives.",
            ));
        }
        Ok(HookResult::output(HookResponse::permit()))
    }

    fn after_shell(&self, req: &HookRequest) -> anyhow::Result<HookResult> {
        let kind = CommandKind::classify(&req.command);
        let damaged = shell::shows_damage(kind, &req.output);
        if damaged {
            self.sessions.set(
                &req.conversation_id,
                SessionState::new().with(field::BUILD_FAILED, true),
            );
        }
        let mut fields = json!({
            "kind": kind.as_str(),
            "duration": req.raw_field("duration"),
            "damaged": damaged,
            "cmd_preview": preview(&req.command, 300),
        });
        if damaged {
            fields["output_tail"] = json!(tail(&req.output, 500));
        }
        self.log.append("afterShellExecution", fields);
        Ok(HookResult::empty())
    }

    // ── Turn end ──

    fn stop(&self, req: &HookRequest) -> anyhow::Result<HookResult> {
        let cid = &req.conversation_id;
        let state = self.sessions.get(cid);
        self.log.append(
            "stop",
            json!({
                "status": req.status,
                "loop_count": req.loop_count,
                "core_edited": state.flag(field::CORE_EDITED),
                "build_failed": state.flag(field::BUILD_FAILED),
                "edit_degradation": state.flag(field::EDIT_DEGRADATION),
            }),
        );
        let ctx = TurnContext {
            state: &state,
            paths: &self.paths,
            config: &self.config,
        };
        match decision::evaluate(&req.status, req.loop_count, &ctx) {
            Some(directive) => {
                self.sessions.set(cid, directive.clear);
                self.log.append("stop_followup", json!({ "rule": directive.rule }));
                Ok(HookResult::output(HookResponse::followup(directive.message)))
            }
            None => Ok(HookResult::empty()),
        }
    }
}
