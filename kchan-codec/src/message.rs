use bytes::Bytes;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version put in the header of the outgoing messages.
pub const PROTOCOL_VERSION: &str = "5.0";
/// Major part of `PROTOCOL_VERSION`.
pub const MAJOR_PROTOCOL_VERSION: u32 = 5;

pub const KERNEL_INFO_REQUEST: &str = "kernel_info_request";
pub const KERNEL_INFO_REPLY: &str = "kernel_info_reply";
pub const EXECUTE_REQUEST: &str = "execute_request";
pub const EXECUTE_REPLY: &str = "execute_reply";
pub const COMPLETE_REQUEST: &str = "complete_request";
pub const INSPECT_REQUEST: &str = "inspect_request";
pub const HISTORY_REQUEST: &str = "history_request";
pub const SHUTDOWN_REQUEST: &str = "shutdown_request";
pub const INPUT_REQUEST: &str = "input_request";
pub const INPUT_REPLY: &str = "input_reply";
pub const STATUS: &str = "status";

/// Message header, the identity and the type of a message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub msg_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub date: String,
    pub msg_type: String,
    /// Older kernels don't send the version of the protocol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A deserialized protocol message.
///
/// Every receive produces a fresh `Message`, the channels don't keep them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    pub header: Header,
    /// Header of the request this message answers, `None` if it is not an answer.
    pub parent_header: Option<Header>,
    pub metadata: Map<String, Value>,
    pub content: Value,
    pub buffers: Vec<Bytes>,
}

impl Message {
    pub fn msg_id(&self) -> &str {
        &self.header.msg_id
    }

    pub fn msg_type(&self) -> &str {
        &self.header.msg_type
    }

    /// Id of the request this message answers.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_header.as_ref().map(|h| h.msg_id.as_str())
    }

    /// Is this message an answer (reply, status, output) to the request `msg_id`?
    pub fn is_child_of(&self, msg_id: &str) -> bool {
        self.parent_id() == Some(msg_id)
    }

    /// Gets a string field of the content.
    pub fn content_str(&self, field: &str) -> Option<&str> {
        self.content.get(field).and_then(Value::as_str)
    }
}

/// Returns the major part of a dotted protocol version like `"5.3"`.
pub fn major_version(version: &str) -> Option<u32> {
    version.split('.').next()?.trim().parse().ok()
}
