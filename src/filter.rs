//! Post-filters and the final reduction to endpoint records.

use crate::log::Logger;
use crate::model::ParsedFile;
use crate::worker::is_endpoint;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Sections whose field groups are de-duplicated.
const FIELD_SECTIONS: [&str; 4] = ["parameter", "success", "error", "header"];

/// Run the post-filters, then keep the `local` part of every endpoint block.
pub fn process(files: &mut [ParsedFile], log: &dyn Logger) -> Vec<Map<String, Value>> {
    for section in FIELD_SECTIONS {
        log.verbose(&format!("filter postFilter: api{section}"));
        for block in files.iter_mut().flatten() {
            if let Some(fields) = block
                .local
                .get_mut(section)
                .and_then(|s| s.get_mut("fields"))
                .and_then(Value::as_object_mut)
            {
                dedup_fields(fields);
            }
        }
    }

    files
        .iter()
        .flatten()
        .filter(|block| is_endpoint(block))
        .map(|block| block.local.clone())
        .collect()
}

/// Within each group keep the first field of every name.
fn dedup_fields(groups: &mut Map<String, Value>) {
    for fields in groups.values_mut().filter_map(Value::as_array_mut) {
        let mut seen = HashSet::new();
        fields.retain(|field| {
            let key = field.get("field").map(Value::to_string).unwrap_or_default();
            seen.insert(key)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::RecordingLogger;
    use crate::model::{Block, Method};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn duplicate_fields_keep_first() {
        let mut block = Block::default();
        block
            .attach(
                "local",
                Method::Insert,
                json!({"parameter": {"fields": {
                    "Parameter": [
                        {"field": "id", "description": "first"},
                        {"field": "id", "description": "second"},
                        {"field": "name"},
                    ],
                    "Other": [{"field": "id"}],
                }}}),
            )
            .unwrap();
        let out = process(&mut [vec![block]], &RecordingLogger::new());
        assert_eq!(
            out[0]["parameter"]["fields"],
            json!({
                "Parameter": [{"field": "id", "description": "first"}, {"field": "name"}],
                "Other": [{"field": "id"}],
            })
        );
    }

    #[test]
    fn definitions_and_empty_blocks_are_dropped() {
        let mut define = Block::default();
        define.attach("global.define", Method::Insert, json!({"name": "A"})).unwrap();
        define.attach("local", Method::Insert, json!({"title": "x"})).unwrap();
        let mut endpoint = Block::default();
        endpoint.attach("local", Method::Insert, json!({"url": "/a"})).unwrap();

        let out = process(&mut [vec![define, Block::default(), endpoint]], &RecordingLogger::new());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["url"], "/a");
    }
}
