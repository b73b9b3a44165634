//! Checks of the user supplied parts of request contents.
use serde_json::Value;
use std::fmt;

/// A value which cannot be put into a message content as it is.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueError(pub String);

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValueError {}

/// Validate that the input is a list of strings.
pub fn validate_string_list(value: &Value) -> Result<(), ValueError> {
    let list = match value {
        Value::Array(list) => list,
        other => return Err(ValueError(format!("input {} must be a list", other))),
    };

    for x in list {
        if !x.is_string() {
            return Err(ValueError(format!("element {} in list must be a string", x)));
        }
    }

    Ok(())
}

/// Validate that the input is a dict with string keys and values.
///
/// Keys of a JSON object are strings already, so only the values are checked.
pub fn validate_string_dict(value: &Value) -> Result<(), ValueError> {
    let dict = match value {
        Value::Object(dict) => dict,
        other => return Err(ValueError(format!("input {} must be a dict", other))),
    };

    for (k, v) in dict {
        if !v.is_string() {
            return Err(ValueError(format!("value {} of key {:?} in dict must be a string", v, k)));
        }
    }

    Ok(())
}
