//! Run configuration and project metadata.

use crate::finder::DEFAULT_INCLUDE;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Byte encoding of the source files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

impl Encoding {
    /// Invalid UTF-8 sequences become U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }
}

/// Line ending of the serialized JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    Lf,
    Crlf,
    Cr,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }
}

impl Default for LineEnding {
    /// The platform's native line ending.
    fn default() -> Self {
        if cfg!(windows) {
            LineEnding::Crlf
        } else {
            LineEnding::Lf
        }
    }
}

/// One input root. Written as `"dir"` or `{ "path": "dir", "category": "mqtt" }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcEntry {
    pub path: PathBuf,
    pub category: Option<String>,
}

impl SrcEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// `dir` or `dir:category`. A colon followed by a path separator (as in
    /// `C:\src`) is part of the path.
    pub fn parse(spec: &str) -> Self {
        match spec.rsplit_once(':') {
            Some((path, category))
                if !path.is_empty()
                    && !category.is_empty()
                    && category.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') =>
            {
                Self::new(path).with_category(category)
            }
            _ => Self::new(spec),
        }
    }
}

impl<'de> Deserialize<'de> for SrcEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Path(PathBuf),
            Entry { path: PathBuf, category: Option<String> },
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Path(path) => SrcEntry::new(path),
            Raw::Entry { path, category } => SrcEntry { path, category },
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    pub src: Vec<SrcEntry>,
    pub include_filters: Vec<String>,
    pub exclude_filters: Vec<String>,
    pub encoding: Encoding,
    pub line_ending: LineEnding,
    /// `tag=value`, see [`crate::parser::Parser::filter_by`].
    pub filter_by: Option<String>,
    pub api_private: bool,
    pub mqtt_only: bool,
    pub fail_on_mqtt_schema_error: bool,
    /// Render markdown fields to HTML.
    pub markdown: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            src: vec![SrcEntry::new(".")],
            include_filters: vec![DEFAULT_INCLUDE.to_string()],
            exclude_filters: Vec::new(),
            encoding: Encoding::default(),
            line_ending: LineEnding::default(),
            filter_by: None,
            api_private: false,
            mqtt_only: false,
            fail_on_mqtt_schema_error: false,
            markdown: true,
        }
    }
}

/// Who produced the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub name: String,
    pub time: String,
    pub url: String,
    pub version: String,
}

impl Generator {
    pub fn now() -> Self {
        Self {
            name: "apidoc".to_string(),
            time: chrono::Local::now().format("%a %b %d %Y %H:%M:%S GMT%z").to_string(),
            url: "https://apidocts.com".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Project metadata, usually read from `apidoc.json`. Unknown keys pass
/// through to the output unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageInfos {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Serialized as `false` when unset.
    #[serde(with = "sample_url")]
    pub sample_url: Option<String>,
    pub default_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apidoc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<Generator>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for PackageInfos {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: "0.0.0".to_string(),
            description: "API Documentation".to_string(),
            sample_url: None,
            default_version: "0.0.0".to_string(),
            apidoc: None,
            generator: None,
            extra: Map::new(),
        }
    }
}

impl PackageInfos {
    /// Whether extra documentation pages are configured.
    pub fn has_documentation(&self) -> bool {
        self.extra
            .get("documentation")
            .and_then(Value::as_array)
            .is_some_and(|docs| !docs.is_empty())
    }
}

mod sample_url {
    use super::*;

    pub fn serialize<S: Serializer>(url: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        match url {
            Some(url) => serializer.serialize_str(url),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(url) if !url.is_empty() => Some(url),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn latin1_maps_bytes_to_code_points() {
        assert_eq!(Encoding::Latin1.decode(b"caf\xe9"), "café");
        assert_eq!(Encoding::Utf8.decode("café".as_bytes()), "café");
    }

    #[test]
    fn src_entry_with_category() {
        assert_eq!(SrcEntry::parse("src/mqtt:mqtt"), SrcEntry::new("src/mqtt").with_category("mqtt"));
        assert_eq!(SrcEntry::parse("src"), SrcEntry::new("src"));
        assert_eq!(SrcEntry::parse(r"C:\src"), SrcEntry::new(r"C:\src"));
    }

    #[test]
    fn options_from_json() {
        let options: Options = serde_json::from_value(json!({
            "src": ["api", {"path": "broker", "category": "mqtt"}],
            "mqttOnly": true,
            "lineEnding": "crlf",
            "encoding": "latin1",
        }))
        .unwrap();
        assert_eq!(options.src[1], SrcEntry::new("broker").with_category("mqtt"));
        assert!(options.mqtt_only);
        assert_eq!(options.line_ending, LineEnding::Crlf);
        assert_eq!(options.encoding, Encoding::Latin1);
        assert_eq!(options.include_filters, [DEFAULT_INCLUDE]);
    }

    #[test]
    fn package_defaults_and_passthrough() {
        let infos: PackageInfos = serde_json::from_value(json!({
            "name": "demo",
            "title": "Demo API",
            "sampleUrl": "https://api.example.com",
        }))
        .unwrap();
        assert_eq!(infos.default_version, "0.0.0");
        assert_eq!(infos.sample_url.as_deref(), Some("https://api.example.com"));

        let out = serde_json::to_value(&infos).unwrap();
        assert_eq!(out["title"], "Demo API");
        assert_eq!(out["description"], "API Documentation");
        assert!(out.get("generator").is_none());
    }

    #[test]
    fn unset_sample_url_serializes_as_false() {
        let out = serde_json::to_value(PackageInfos::default()).unwrap();
        assert_eq!(out["sampleUrl"], json!(false));
    }
}
