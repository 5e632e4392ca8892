use backstop_core::EditPair;
use serde_json::Value;

// ── Hook stdin parsing ──

pub(crate) fn parse_hook_stdin(stdin: &str) -> anyhow::Result<Value> {
    Ok(serde_json::from_str(stdin)?)
}

/// Get a string field, trying snake_case first then camelCase.
/// Cursor sends snake_case; some hosts send camelCase (`conversationId`).
pub(crate) fn get_str(v: &Value, snake_key: &str) -> String {
    field(v, snake_key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

/// Raw field lookup with the same snake/camel fallback as [`get_str`].
pub(crate) fn field<'a>(v: &'a Value, snake_key: &str) -> Option<&'a Value> {
    v.get(snake_key)
        .filter(|x| !x.is_null())
        .or_else(|| v.get(snake_to_camel(snake_key)).filter(|x| !x.is_null()))
}

pub(crate) fn snake_to_camel(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;
    for ch in s.chars() {
        if ch == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(ch.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}

// ── HookRequest ──

/// The fields the handlers use, extracted leniently from one inbound object.
/// Missing or mistyped fields become empty values; the original object is
/// kept in `raw` for log-only fields.
#[derive(Debug, Clone, Default)]
pub struct HookRequest {
    pub event: String,
    pub file_path: String,
    pub edits: Vec<EditPair>,
    pub content: String,
    pub command: String,
    pub output: String,
    pub tool_name: String,
    pub tool_input: Value,
    pub conversation_id: String,
    pub status: String,
    pub loop_count: u64,
    pub raw: Value,
}

impl HookRequest {
    /// `event_hint` (from the command line) wins over `hook_event_name`.
    pub fn from_value(event_hint: Option<&str>, raw: Value) -> Self {
        let event = match event_hint {
            Some(e) if !e.is_empty() => e.to_string(),
            _ => get_str(&raw, "hook_event_name"),
        };
        let mut conversation_id = get_str(&raw, "conversation_id");
        if conversation_id.is_empty() {
            conversation_id = get_str(&raw, "session_id");
        }
        let edits = field(&raw, "edits")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<EditPair>(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        let loop_count = match field(&raw, "loop_count") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };
        Self {
            event,
            file_path: get_str(&raw, "file_path"),
            edits,
            content: get_str(&raw, "content"),
            command: get_str(&raw, "command").trim().to_string(),
            output: get_str(&raw, "output"),
            tool_name: get_str(&raw, "tool_name"),
            tool_input: field(&raw, "tool_input").cloned().unwrap_or(Value::Null),
            conversation_id,
            status: get_str(&raw, "status"),
            loop_count,
            raw,
        }
    }

    /// The file a tool was pointed at. `tool_input` may be an object, a JSON
    /// string encoding one, or a bare path string.
    pub fn tool_input_path(&self) -> Option<String> {
        const KEYS: &[&str] = &["path", "file_path", "filePath", "target_file"];
        let from_object = |obj: &Value| {
            KEYS.iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match &self.tool_input {
            Value::Object(_) => from_object(&self.tool_input),
            Value::String(s) if !s.trim().is_empty() => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Object(_)) => from_object(&parsed),
                _ => Some(s.trim().to_string()),
            },
            _ => None,
        }
    }

    /// A raw field for logging, `null` when absent.
    pub fn raw_field(&self, key: &str) -> Value {
        field(&self.raw, key).cloned().unwrap_or(Value::Null)
    }
}
