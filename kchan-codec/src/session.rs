use crate::adapter;
use crate::codec::Multipart;
use crate::message::{Header, Message, PROTOCOL_VERSION};
use crate::{wire_error, Result};
use bytes::Bytes;
use log::{debug, trace};
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};

/// Separates the routing identities from the message parts.
pub const DELIM: &[u8] = b"<IDS|MSG>";

/// Creates, serializes and deserializes the messages of one client.
///
/// A session is shared by all the channels of a client. The only mutable part is
/// the adapt version: once a kernel reports an older protocol, every outgoing
/// message is rendered for that version.
///
/// Messages are not signed, the signature part is always empty.
#[derive(Debug)]
pub struct Session {
    session_id: String,
    username: String,
    adapt_version: Mutex<Option<u32>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let username = std::env::var("USER").unwrap_or_else(|_| "username".to_owned());

        Self::with_username(&username)
    }

    pub fn with_username(username: &str) -> Self {
        Session {
            session_id: uuid::Uuid::new_v4().as_hyphenated().to_string(),
            username: username.to_owned(),
            adapt_version: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The session id as bytes, used as the socket identity of the channels.
    pub fn bsession(&self) -> &[u8] {
        self.session_id.as_bytes()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The older major protocol version outgoing messages are rendered in, if any.
    pub fn adapt_version(&self) -> Option<u32> {
        *self.adapt_version.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_adapt_version(&self, version: u32) {
        debug!("Adapting session {} to protocol version {}", self.session_id, version);

        *self.adapt_version.lock().unwrap_or_else(PoisonError::into_inner) = Some(version);
    }

    /// Creates a new message with a fresh header.
    pub fn msg(&self, msg_type: &str, content: Value, parent: Option<&Header>) -> Message {
        Message {
            header: self.header(msg_type),
            parent_header: parent.cloned(),
            metadata: Map::new(),
            content,
            buffers: vec![],
        }
    }

    fn header(&self, msg_type: &str) -> Header {
        Header {
            msg_id: uuid::Uuid::new_v4().as_hyphenated().to_string(),
            username: self.username.clone(),
            session: self.session_id.clone(),
            date: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            msg_type: msg_type.to_owned(),
            version: Some(PROTOCOL_VERSION.to_owned()),
        }
    }

    /// Renders the message in multipart form, prefixed by the routing identities.
    pub fn serialize(&self, msg: &Message, identities: &[Bytes]) -> Result<Multipart> {
        let adapted;
        let msg = match self.adapt_version() {
            Some(version) => {
                adapted = adapter::adapt(msg.clone(), version);
                &adapted
            }
            None => msg,
        };

        let parent = match &msg.parent_header {
            Some(header) => serde_json::to_vec(header)?,
            None => b"{}".to_vec(),
        };

        let mut frames = Vec::with_capacity(identities.len() + 6 + msg.buffers.len());
        frames.extend_from_slice(identities);
        frames.push(Bytes::from_static(DELIM));
        frames.push(Bytes::new());
        frames.push(Bytes::from(serde_json::to_vec(&msg.header)?));
        frames.push(Bytes::from(parent));
        frames.push(Bytes::from(serde_json::to_vec(&msg.metadata)?));
        frames.push(Bytes::from(serde_json::to_vec(&msg.content)?));
        frames.extend(msg.buffers.iter().cloned());

        trace!("Serialized {} into {} frames", msg.msg_type(), frames.len());

        Ok(frames)
    }

    /// Splits the routing identities from the message parts at the delimiter.
    pub fn feed_identities(&self, mut frames: Multipart) -> Result<(Vec<Bytes>, Multipart)> {
        match frames.iter().position(|f| f.as_ref() == DELIM) {
            Some(pos) => {
                let rest = frames.split_off(pos + 1);
                frames.truncate(pos);

                Ok((frames, rest))
            }
            None => wire_error!("no delimiter in a message of {} frames", frames.len()),
        }
    }

    /// Builds a message from the parts following the delimiter.
    pub fn deserialize(&self, frames: Multipart) -> Result<Message> {
        if frames.len() < 5 {
            return wire_error!("message has {} parts, at least 5 expected", frames.len());
        }

        let mut parts = frames.into_iter();
        let _signature = parts.next();

        let header: Header = serde_json::from_slice(&next_part(&mut parts))?;
        let parent: Value = serde_json::from_slice(&next_part(&mut parts))?;
        let metadata: Map<String, Value> = serde_json::from_slice(&next_part(&mut parts))?;
        let content: Value = serde_json::from_slice(&next_part(&mut parts))?;

        let parent_header = match parent {
            Value::Object(ref map) if map.is_empty() => None,
            Value::Null => None,
            value => Some(serde_json::from_value(value)?),
        };

        Ok(Message {
            header,
            parent_header,
            metadata,
            content,
            buffers: parts.collect(),
        })
    }
}

fn next_part(parts: &mut impl Iterator<Item = Bytes>) -> Bytes {
    parts.next().unwrap_or_default()
}
