//! Builders of request contents sent by a client.
use crate::validate::{validate_string_dict, ValueError};
use serde_json::{json, Map, Value};

/// Options of an `execute_request`.
#[derive(Clone, Debug)]
pub struct ExecuteOptions {
    /// Silent execution doesn't broadcast output and doesn't store history.
    pub silent: bool,
    pub store_history: bool,
    /// Expressions evaluated after the code, name to expression.
    pub user_expressions: Value,
    /// Kernel may send `input_request` on the stdin channel.
    pub allow_stdin: bool,
    /// Abort the execution queue on error.
    pub stop_on_error: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            silent: false,
            store_history: true,
            user_expressions: Value::Object(Map::new()),
            allow_stdin: true,
            stop_on_error: true,
        }
    }
}

impl ExecuteOptions {
    pub fn silent(mut self, value: bool) -> Self {
        self.silent = value;
        self
    }

    pub fn store_history(mut self, value: bool) -> Self {
        self.store_history = value;
        self
    }

    pub fn user_expressions(mut self, value: Value) -> Self {
        self.user_expressions = value;
        self
    }

    pub fn allow_stdin(mut self, value: bool) -> Self {
        self.allow_stdin = value;
        self
    }

    pub fn stop_on_error(mut self, value: bool) -> Self {
        self.stop_on_error = value;
        self
    }
}

/// Which part of the history is asked.
#[derive(Clone, Debug, PartialEq)]
pub enum HistoryAccess {
    /// Last `n` entries.
    Tail { n: u32 },
    /// Entries of a session between two line numbers.
    Range { session: i32, start: u32, stop: u32 },
    /// Entries matching a glob pattern.
    Search { pattern: String, unique: bool, n: Option<u32> },
}

pub fn execute_request(code: &str, options: &ExecuteOptions) -> Result<Value, ValueError> {
    validate_string_dict(&options.user_expressions)?;

    Ok(json!({
        "code": code,
        "silent": options.silent,
        "store_history": options.store_history,
        "user_expressions": options.user_expressions,
        "allow_stdin": options.allow_stdin,
        "stop_on_error": options.stop_on_error,
    }))
}

/// Without cursor position the cursor is at the end of the code.
pub fn complete_request(code: &str, cursor_pos: Option<usize>) -> Value {
    json!({
        "code": code,
        "cursor_pos": cursor_pos.unwrap_or_else(|| code.chars().count()),
    })
}

pub fn inspect_request(code: &str, cursor_pos: Option<usize>, detail_level: u8) -> Value {
    json!({
        "code": code,
        "cursor_pos": cursor_pos.unwrap_or_else(|| code.chars().count()),
        "detail_level": detail_level,
    })
}

pub fn history_request(raw: bool, output: bool, access: &HistoryAccess) -> Value {
    let mut content = json!({
        "raw": raw,
        "output": output,
    });

    match access {
        HistoryAccess::Tail { n } => {
            content["hist_access_type"] = json!("tail");
            content["n"] = json!(n);
        }
        HistoryAccess::Range { session, start, stop } => {
            content["hist_access_type"] = json!("range");
            content["session"] = json!(session);
            content["start"] = json!(start);
            content["stop"] = json!(stop);
        }
        HistoryAccess::Search { pattern, unique, n } => {
            content["hist_access_type"] = json!("search");
            content["pattern"] = json!(pattern);
            content["unique"] = json!(unique);

            if let Some(n) = n {
                content["n"] = json!(n);
            }
        }
    }

    content
}

pub fn kernel_info_request() -> Value {
    Value::Object(Map::new())
}

pub fn shutdown_request(restart: bool) -> Value {
    json!({ "restart": restart })
}

pub fn input_reply(value: &str) -> Value {
    json!({ "value": value })
}
