//! Renders outgoing messages in the format of an older protocol version.
//!
//! Only the adaptation to major version 4 differs from the current format:
//! the header loses its version, `inspect_request` becomes `object_info_request`
//! and `complete_request` carries the line of the cursor instead of the code.
use crate::message::{Message, COMPLETE_REQUEST, EXECUTE_REQUEST, INSPECT_REQUEST};
use serde_json::{json, Value};

/// Adapts a message to the `version` major protocol version.
pub fn adapt(mut msg: Message, version: u32) -> Message {
    if version != 4 {
        return msg;
    }

    msg.header.version = None;
    if let Some(parent) = msg.parent_header.as_mut() {
        parent.version = None;
    }

    match msg.header.msg_type.as_str() {
        COMPLETE_REQUEST => {
            let (code, cursor_pos) = code_and_cursor(&msg.content);
            let (line, cursor_pos) = code_to_line(&code, cursor_pos);

            msg.content = json!({
                "text": "",
                "line": line,
                "block": null,
                "cursor_pos": cursor_pos,
            });
        }
        INSPECT_REQUEST => {
            let (code, cursor_pos) = code_and_cursor(&msg.content);
            let detail_level = msg.content.get("detail_level").cloned().unwrap_or(json!(0));

            msg.header.msg_type = "object_info_request".to_owned();
            msg.content = json!({
                "oname": token_at_cursor(&code, cursor_pos),
                "detail_level": detail_level,
            });
        }
        EXECUTE_REQUEST => {
            if let Some(content) = msg.content.as_object_mut() {
                content.entry("user_variables").or_insert_with(|| json!([]));
            }
        }
        _ => (),
    }

    msg
}

fn code_and_cursor(content: &Value) -> (String, usize) {
    let code = content.get("code").and_then(Value::as_str).unwrap_or_default().to_owned();
    let cursor_pos = content
        .get("cursor_pos")
        .and_then(Value::as_u64)
        .map(|p| p as usize)
        .unwrap_or_else(|| code.chars().count());

    (code, cursor_pos)
}

/// Returns the line containing the cursor and the cursor position within that line.
fn code_to_line(code: &str, mut cursor_pos: usize) -> (String, usize) {
    let mut current = "";

    for line in code.split_inclusive('\n') {
        current = line;

        let n = line.chars().count();
        if cursor_pos > n {
            cursor_pos -= n;
        } else {
            break;
        }
    }

    (current.to_owned(), cursor_pos)
}

/// Returns the dotted name under (or right before) the cursor.
fn token_at_cursor(code: &str, cursor_pos: usize) -> String {
    let (line, cursor) = code_to_line(code, cursor_pos);
    let chars: Vec<char> = line.chars().collect();
    let is_name = |c: &char| c.is_alphanumeric() || *c == '_' || *c == '.';

    let cursor = cursor.min(chars.len());
    let start = chars[..cursor].iter().rposition(|c| !is_name(c)).map_or(0, |p| p + 1);
    let end = chars[cursor..]
        .iter()
        .position(|c| !is_name(c))
        .map_or(chars.len(), |p| cursor + p);

    chars[start..end].iter().collect::<String>().trim_matches('.').to_owned()
}
