//! Cross-block resolution.
//!
//! Blocks with `@apiDefine` are collected first, keyed by name and version.
//! Each worker then rewrites the blocks that refer to a definition: `@apiUse`
//! and the structure tags merge the definition into the block, the title
//! workers re-key field groups by the definition title, and so on.

use crate::error::WorkerError;
use crate::log::Logger;
use crate::model::{is_falsy, Block, ParsedFile};
use crate::options::PackageInfos;
use crate::version;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

static RE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9_]+").unwrap());

static RE_NOT_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Reference expansions allowed per block before giving up.
const MAX_ITERATIONS: usize = 10;

/// Usage hints attached to a [`WorkerError`].
#[derive(Debug, Clone, Copy)]
struct Messages {
    element: &'static str,
    usage: &'static str,
    example: &'static str,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    /// Re-key `local.<target>.fields` from group name to definition title.
    /// Flat field lists get the title as their `group`.
    Title(&'static str),
    Permission,
    SampleRequest,
    /// Merge the definitions referenced in `local.<target>` into the block.
    Merge(&'static str),
    Name,
    Group,
}

#[derive(Debug, Clone, Copy)]
struct Worker {
    name: &'static str,
    action: Action,
    messages: Messages,
}

const fn worker(name: &'static str, action: Action, element: &'static str, usage: &'static str, example: &'static str) -> Worker {
    Worker {
        name,
        action,
        messages: Messages { element, usage, example },
    }
}

const WORKERS: [Worker; 15] = [
    worker(
        "apibodytitle",
        Action::Title("body"),
        "apiBody",
        "@apiBody (group) varname",
        "@apiDefine MyValidParamGroup Some title\n@apiBody (MyValidParamGroup) username",
    ),
    worker(
        "apierrortitle",
        Action::Title("error"),
        "apiError",
        "@apiError (group) varname",
        "@apiDefine MyValidErrorGroup Some title or 40X Error\n@apiError (MyValidErrorGroup) username",
    ),
    worker(
        "apiheadertitle",
        Action::Title("header"),
        "apiHeader",
        "@apiHeader (group) varname",
        "@apiDefine MyValidHeaderGroup Some title\n@apiHeader (MyValidHeaderGroup) Content-Type",
    ),
    worker(
        "apiparamtitle",
        Action::Title("parameter"),
        "apiParam",
        "@apiParam (group) varname",
        "@apiDefine MyValidParamGroup Some title\n@apiParam (MyValidParamGroup) username",
    ),
    worker(
        "apiquerytitle",
        Action::Title("query"),
        "apiQuery",
        "@apiQuery (group) varname",
        "@apiDefine MyValidParamGroup Some title\n@apiQuery (MyValidParamGroup) username",
    ),
    worker(
        "apisuccesstitle",
        Action::Title("success"),
        "apiSuccess",
        "@apiSuccess (group) varname",
        "@apiDefine MyValidSuccessGroup Some title or 200 OK\n@apiSuccess (MyValidSuccessGroup) username",
    ),
    worker(
        "apipermission",
        Action::Permission,
        "apiPermission",
        "@apiPermission group",
        "@apiDefine MyValidPermissionGroup Some title\n@apiPermission MyValidPermissionGroup",
    ),
    worker("apisamplerequest", Action::SampleRequest, "apiSampleRequest", "@apiSampleRequest url", ""),
    worker(
        "apistructure",
        Action::Merge("structure"),
        "apiStructure",
        "@apiStructure group",
        "@apiDefine MyValidStructureGroup Some title\n@apiStructure MyValidStructureGroup",
    ),
    worker(
        "apisuccessstructure",
        Action::Merge("successStructure"),
        "apiSuccessStructure",
        "@apiSuccessStructure group",
        "@apiDefine MyValidSuccessStructureGroup Some title\n@apiSuccessStructure MyValidSuccessStructureGroup",
    ),
    worker(
        "apierrorstructure",
        Action::Merge("errorStructure"),
        "apiErrorStructure",
        "@apiErrorStructure group",
        "@apiDefine MyValidErrorStructureGroup Some title\n@apiErrorStructure MyValidErrorStructureGroup",
    ),
    worker(
        "apiheaderstructure",
        Action::Merge("headerStructure"),
        "apiHeaderStructure",
        "@apiHeaderStructure group",
        "@apiDefine MyValidHeaderStructureGroup Some title\n@apiHeaderStructure MyValidHeaderStructureGroup",
    ),
    worker(
        "apiuse",
        Action::Merge("use"),
        "apiUse",
        "@apiUse group",
        "@apiDefine MyValidGroup Some title\n@apiUse MyValidGroup",
    ),
    worker("apiname", Action::Name, "apiName", "@apiName name", ""),
    worker(
        "apigroup",
        Action::Group,
        "apiGroup",
        "@apiGroup group",
        "@apiDefine MyValidGroup Some title\n@apiGroup MyValidGroup",
    ),
];

/// One `@apiDefine` block at one version.
#[derive(Debug, Clone)]
struct Definition {
    version: String,
    /// `global.define`: `{name, title, description}`.
    define: Value,
    /// Everything else the defining block documents.
    local: Map<String, Value>,
}

/// `@apiDefine` blocks by name, versions in first-seen order.
#[derive(Debug, Default)]
pub struct Definitions {
    by_name: HashMap<String, Vec<Definition>>,
}

/// Outcome of looking up a name at a version.
enum Lookup<'a> {
    Unknown,
    Found(&'a Definition),
    /// Known name, but every definition is newer than requested.
    NoMatch(Vec<String>),
}

impl Definitions {
    pub fn collect(files: &[ParsedFile], default_version: &str) -> Self {
        let mut defs = Self::default();
        for block in files.iter().flatten() {
            let Some(define) = block.global.get("define") else {
                continue;
            };
            let name = define.get("name").and_then(Value::as_str).unwrap_or("").to_string();
            let version = block.version().unwrap_or(default_version).to_string();
            let definition = Definition {
                version,
                define: define.clone(),
                local: block.local.clone(),
            };
            let versions = defs.by_name.entry(name).or_default();
            match versions.iter_mut().find(|d| d.version == definition.version) {
                Some(existing) => *existing = definition,
                None => versions.push(definition),
            }
        }
        defs
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// The exact version, else the highest version not above `version` and
    /// not below `floor`.
    fn lookup(&self, name: &str, version: &str, floor: &str) -> Lookup<'_> {
        let Some(versions) = self.by_name.get(name) else {
            return Lookup::Unknown;
        };
        if let Some(exact) = versions.iter().find(|d| d.version == version) {
            return Lookup::Found(exact);
        }
        let mut best: Option<&Definition> = None;
        let mut last = floor;
        for definition in versions {
            if version::gte(version, &definition.version) && version::gte(&definition.version, last) {
                last = &definition.version;
                best = Some(definition);
            }
        }
        match best {
            Some(definition) => Lookup::Found(definition),
            None => Lookup::NoMatch(versions.iter().map(|d| d.version.clone()).collect()),
        }
    }
}

/// Fill in defaults, then run every worker over `files`.
pub fn process(
    files: &mut [ParsedFile],
    filenames: &[String],
    package: &PackageInfos,
    log: &dyn Logger,
) -> Result<(), WorkerError> {
    for (file, filename) in files.iter_mut().zip(filenames) {
        for block in file.iter_mut().filter(|b| is_endpoint(b)) {
            apply_defaults(block, filename, &package.default_version);
        }
    }

    log.verbose("worker preProcess: apidefine");
    let mut defs = Definitions::collect(files, &package.default_version);
    log.debug(&format!("definitions found: {}", defs.len()));

    for worker in &WORKERS {
        log.verbose(&format!("worker postProcess: {}", worker.name));
        let run = Run {
            defs: &defs,
            package,
            messages: worker.messages,
        };
        for (file, filename) in files.iter_mut().zip(filenames) {
            for block in file.iter_mut() {
                run.apply(worker.action, block, filename)?;
            }
        }
        // Defining blocks may have been rewritten; later workers merge the
        // rewritten data.
        defs = Definitions::collect(files, &package.default_version);
    }
    Ok(())
}

/// A block documenting an endpoint rather than a definition.
pub fn is_endpoint(block: &Block) -> bool {
    block.global.is_empty() && !block.local.is_empty()
}

fn apply_defaults(block: &mut Block, filename: &str, default_version: &str) {
    let local = &mut block.local;
    for (key, default) in [("type", ""), ("url", ""), ("version", default_version), ("filename", filename)] {
        if local.get(key).map_or(true, is_falsy) {
            local.insert(key.to_string(), Value::String(default.to_string()));
        }
    }
    if let Some(Value::String(filename)) = local.get_mut("filename") {
        *filename = filename.replace('\\', "/");
    }
}

/// One worker applied to one block at a time.
struct Run<'a> {
    defs: &'a Definitions,
    package: &'a PackageInfos,
    messages: Messages,
}

impl Run<'_> {
    fn apply(&self, action: Action, block: &mut Block, filename: &str) -> Result<(), WorkerError> {
        match action {
            Action::Title(target) => self.titles(block, target, filename),
            Action::Permission => self.permissions(block, filename),
            Action::SampleRequest => {
                self.sample_requests(block);
                Ok(())
            }
            Action::Merge(target) => self.merge_references(block, target, filename),
            Action::Name => {
                default_name(block);
                Ok(())
            }
            Action::Group => self.group(block, filename),
        }
    }

    fn error(&self, message: &str, block: &Block, filename: &str, extra: Vec<(String, String)>) -> WorkerError {
        WorkerError {
            message: message.to_string(),
            file: filename.to_string(),
            block: block.index,
            element: self.messages.element.to_string(),
            definition: self.messages.usage.to_string(),
            example: self.messages.example.to_string(),
            extra,
        }
    }

    /// Definition of `name` at the block's version. `Ok(None)` for unknown
    /// names.
    fn find(&self, name: &str, block: &Block, filename: &str) -> Result<Option<&Definition>, WorkerError> {
        let version = block.version().unwrap_or(&self.package.default_version);
        match self.defs.lookup(name, version, &self.package.default_version) {
            Lookup::Unknown => Ok(None),
            Lookup::Found(definition) => Ok(Some(definition)),
            Lookup::NoMatch(versions) => Err(self.error(
                "Referenced definition has no matching or a higher version. Check version number in referenced define block.",
                block,
                filename,
                vec![
                    ("Groupname".to_string(), name.to_string()),
                    ("Version".to_string(), version.to_string()),
                    ("Defined versions".to_string(), versions.join(", ")),
                ],
            )),
        }
    }

    fn merge_references(&self, block: &mut Block, target: &str, filename: &str) -> Result<(), WorkerError> {
        let mut iterations = 0;
        while block.local.contains_key(target) {
            if iterations == MAX_ITERATIONS {
                let name = block.local.get("name").and_then(Value::as_str).unwrap_or("").to_string();
                return Err(self.error(
                    &format!("recursion depth exceeds limit with @{}", self.messages.element),
                    block,
                    filename,
                    vec![("Groupname".to_string(), name)],
                ));
            }
            iterations += 1;

            let references = block.local.remove(target).unwrap_or(Value::Null);
            for reference in references.as_array().into_iter().flatten() {
                let name = reference.get("name").and_then(Value::as_str).unwrap_or("");
                let Some(definition) = self.find(name, block, filename)? else {
                    return Err(self.error(
                        "Referenced groupname does not exist / it is not defined with @apiDefine.",
                        block,
                        filename,
                        vec![("Groupname".to_string(), name.to_string())],
                    ));
                };
                merge(&mut block.local, &definition.local);
            }
        }
        Ok(())
    }

    fn titles(&self, block: &mut Block, target: &str, filename: &str) -> Result<(), WorkerError> {
        if let Some(Value::Array(fields)) = block.local.get(target) {
            let mut titled = Vec::with_capacity(fields.len());
            for field in fields {
                let mut field = field.clone();
                let group = field.get("group").and_then(Value::as_str).unwrap_or("").to_string();
                if let (Some(definition), Value::Object(entry)) = (self.find(&group, block, filename)?, &mut field) {
                    entry.insert("group".to_string(), Value::String(definition_title(definition, &group)));
                }
                titled.push(field);
            }
            block.local.insert(target.to_string(), Value::Array(titled));
            return Ok(());
        }

        let Some(fields) = block
            .local
            .get(target)
            .and_then(|t| t.get("fields"))
            .and_then(Value::as_object)
        else {
            return Ok(());
        };

        let mut regrouped = Map::new();
        for field in fields.values().filter_map(Value::as_array).flatten() {
            let group = field.get("group").and_then(Value::as_str).unwrap_or("");
            let title = match self.find(group, block, filename)? {
                Some(definition) => definition_title(definition, group),
                None => group.to_string(),
            };
            let entries = regrouped.entry(title).or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(entries) = entries {
                entries.push(field.clone());
            }
        }

        if let Some(Value::Object(section)) = block.local.get_mut(target) {
            section.insert("fields".to_string(), Value::Object(regrouped));
        }
        Ok(())
    }

    /// Known permissions become the full definition, unknown ones stay as
    /// written.
    fn permissions(&self, block: &mut Block, filename: &str) -> Result<(), WorkerError> {
        let Some(Value::Array(permissions)) = block.local.get("permission") else {
            return Ok(());
        };
        let mut resolved = Vec::with_capacity(permissions.len());
        for permission in permissions {
            let name = permission.get("name").and_then(Value::as_str).unwrap_or("");
            match self.find(name, block, filename)? {
                Some(definition) => resolved.push(definition.define.clone()),
                None => resolved.push(permission.clone()),
            }
        }
        block.local.insert("permission".to_string(), Value::Array(resolved));
        Ok(())
    }

    fn sample_requests(&self, block: &mut Block) {
        let sample_url = self.package.sample_url.as_deref();
        let prefixed = |url: &str| match sample_url {
            Some(base) if !url.to_ascii_lowercase().starts_with("http") => format!("{base}{url}"),
            _ => url.to_string(),
        };

        if let Some(entries) = block.local.get("sampleRequest").and_then(Value::as_array) {
            let kept: Vec<Value> = entries
                .iter()
                .filter_map(|entry| {
                    let url = entry.get("url").and_then(Value::as_str).unwrap_or("");
                    if url == "off" {
                        return None;
                    }
                    let mut entry = entry.clone();
                    entry["url"] = Value::String(prefixed(url));
                    Some(entry)
                })
                .collect();
            if kept.is_empty() {
                block.local.remove("sampleRequest");
            } else {
                block.local.insert("sampleRequest".to_string(), Value::Array(kept));
            }
            return;
        }

        let url = block.local.get("url").and_then(Value::as_str).unwrap_or("");
        if sample_url.is_some() && !url.is_empty() {
            let entry = json!([{ "url": prefixed(url) }]);
            block.local.insert("sampleRequest".to_string(), entry);
        }
    }

    /// Endpoints without `@apiGroup` are grouped by file name. Group names are
    /// made URL safe; the title and description come from a matching
    /// `@apiDefine`.
    fn group(&self, block: &mut Block, filename: &str) -> Result<(), WorkerError> {
        if !is_endpoint(block) {
            return Ok(());
        }
        let group = match block.local.get("group").and_then(Value::as_str) {
            Some(group) if !group.is_empty() => group.to_string(),
            _ => file_stem(filename),
        };
        let group = RE_NOT_WORD.replace_all(&group, "_").into_owned();

        let (title, description) = match self.find(&group, block, filename)? {
            Some(definition) => (
                definition_title(definition, &group),
                definition.define.get("description").filter(|d| !is_falsy(d)).cloned(),
            ),
            None => (group.clone(), None),
        };
        block.local.insert("group".to_string(), Value::String(group));
        block.local.insert("groupTitle".to_string(), Value::String(title));
        if let Some(description) = description {
            block.local.insert("groupDescription".to_string(), description);
        }
        Ok(())
    }
}

/// `get` + `/user/:id` → `GetUserId`, for endpoints without `@apiName`.
fn default_name(block: &mut Block) {
    if !is_endpoint(block) || block.local.get("name").is_some_and(|n| !is_falsy(n)) {
        return;
    }
    let kind = block.local.get("type").and_then(Value::as_str).unwrap_or("");
    let url = block.local.get("url").and_then(Value::as_str).unwrap_or("");
    let name: String = RE_WORD
        .find_iter(&format!("{kind}{url}"))
        .map(|word| capitalize(word.as_str()))
        .collect();
    if !name.is_empty() {
        block.local.insert("name".to_string(), Value::String(name));
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn file_stem(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

fn definition_title(definition: &Definition, fallback: &str) -> String {
    match definition.define.get("title").and_then(Value::as_str) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => fallback.to_string(),
    }
}

/// Deep merge of `source` into `dest`: arrays concatenate, objects merge key
/// by key, other existing values are kept.
fn merge(dest: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match dest.get_mut(key) {
            None => {
                dest.insert(key.clone(), value.clone());
            }
            Some(Value::Array(existing)) => match value {
                Value::Array(more) => existing.extend(more.iter().cloned()),
                other => existing.push(other.clone()),
            },
            Some(Value::Object(existing)) => {
                if let Value::Object(more) = value {
                    merge(existing, more);
                }
            }
            Some(_) => {}
        }
    }
}
