//! Data model: elements found in a comment block and the block they build.

use serde::Serialize;
use serde_json::{Map, Value};

/// One `@tag content` occurrence inside a comment block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Full matched text, tag included.
    pub source: String,
    /// Lowercased tag name, used for parser lookup.
    pub name: String,
    /// Tag name as written, for diagnostics.
    pub source_name: String,
    /// Text following the tag up to the next tag or the end of the block.
    pub content: String,
}

impl Element {
    pub fn new(source_name: &str, content: &str, source: &str) -> Self {
        Self {
            source: source.to_string(),
            name: source_name.to_lowercase(),
            source_name: source_name.to_string(),
            content: content.to_string(),
        }
    }
}

/// How a tag parser attaches its value at its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Append to an array.
    Push,
    /// Shallow-merge keys into an object.
    Insert,
}

/// The parsed result of one documentation comment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Block {
    /// Data shared with other blocks through `@apiDefine`.
    pub global: Map<String, Value>,
    /// Data of the documented endpoint itself.
    pub local: Map<String, Value>,
    /// 1-based position of the block in its file, 0 until an element wrote data.
    pub index: usize,
    /// Values copied to the block root by `extend_root` parsers (`version`, `lang`).
    #[serde(flatten)]
    pub root: Map<String, Value>,
}

/// All blocks of one source file.
pub type ParsedFile = Vec<Block>;

impl Block {
    pub fn version(&self) -> Option<&str> {
        self.root.get("version").and_then(Value::as_str)
    }

    /// Attach `value` at the dotted `path` (`local.parameter.fields.Parameter`),
    /// creating missing containers on the way. The terminal node becomes an
    /// array for `Push` and an object for `Insert`.
    ///
    /// Returns `None` when an existing node has the wrong shape.
    pub fn attach(&mut self, path: &str, method: Method, value: Value) -> Option<()> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let map = match head {
            "global" => &mut self.global,
            "local" => &mut self.local,
            _ => return attach_in(&mut self.root, path, method, value),
        };
        match rest {
            Some(rest) => attach_in(map, rest, method, value),
            None if method == Method::Insert => extend(map, value),
            None => None,
        }
    }

    /// Shallow-merge `value` onto the block root.
    pub fn extend_root(&mut self, value: &Value) {
        if let Value::Object(obj) = value {
            for (k, v) in obj {
                if matches!(k.as_str(), "global" | "local" | "index") {
                    continue;
                }
                self.root.insert(k.clone(), v.clone());
            }
        }
    }
}

fn attach_in(map: &mut Map<String, Value>, path: &str, method: Method, value: Value) -> Option<()> {
    let parts: Vec<&str> = path.split('.').collect();
    let (last, parents) = parts.split_last()?;

    let mut current = map;
    for part in parents {
        let slot = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if is_falsy(slot) {
            *slot = Value::Object(Map::new());
        }
        current = slot.as_object_mut()?;
    }

    let slot = current.entry(last.to_string()).or_insert(Value::Null);
    if is_falsy(slot) {
        *slot = match method {
            Method::Push => Value::Array(Vec::new()),
            Method::Insert => Value::Object(Map::new()),
        };
    }
    match method {
        Method::Push => {
            slot.as_array_mut()?.push(value);
            Some(())
        }
        Method::Insert => extend(slot.as_object_mut()?, value),
    }
}

fn extend(dest: &mut Map<String, Value>, value: Value) -> Option<()> {
    match value {
        Value::Object(obj) => {
            for (k, v) in obj {
                dest.insert(k, v);
            }
            Some(())
        }
        _ => None,
    }
}

/// JavaScript truthiness, used wherever an empty value counts as absent.
pub fn is_falsy(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Read a dotted path (`deprecated.content`) out of a JSON value.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, part| v.get(part))
}

/// Replace the value at an existing dotted path.
pub fn set_path(value: &mut Value, path: &str, new: Value) {
    let mut current = value;
    for part in path.split('.') {
        match current.get_mut(part) {
            Some(next) => current = next,
            None => return,
        }
    }
    *current = new;
}
