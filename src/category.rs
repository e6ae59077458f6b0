//! Category allow-lists: which tag parsers run for a source folder's category.

struct CategoryParsers {
    name: &'static str,
    /// Empty means every parser is enabled.
    enabled: &'static [&'static str],
    disabled: &'static [&'static str],
}

static CATEGORIES: &[CategoryParsers] = &[
    CategoryParsers {
        name: "docs",
        enabled: &[],
        disabled: &[],
    },
    CategoryParsers {
        name: "tsdoc",
        enabled: &["apiSchema", "apiDefine", "apiUse", "apiTypedef", "apiInterface", "apiEnum"],
        disabled: &[],
    },
    CategoryParsers {
        name: "api",
        enabled: &[
            "api",
            "apiParam",
            "apiQuery",
            "apiBody",
            "apiSuccess",
            "apiError",
            "apiHeader",
            "apiExample",
            "apiUse",
            "apiGroup",
            "apiName",
            "apiDescription",
            "apiVersion",
            "apiPermission",
            "apiSampleRequest",
        ],
        disabled: &[],
    },
    CategoryParsers {
        name: "models",
        enabled: &["apiSchema", "apiDefine", "apiTypedef", "apiInterface"],
        disabled: &[],
    },
    CategoryParsers {
        name: "mqtt",
        enabled: &[
            "mqtt",
            "mqttPublish",
            "mqttSubscribe",
            "mqttMessage",
            "mqttPayload",
            "mqttPayloadExample",
            "mqttQos",
            "mqttRetain",
            "mqttClientId",
            "mqttTopic",
            "mqttTopicExample",
            "mqttSchema",
            "mqttSchemaExample",
            "mqttExample",
            "mqttGroup",
            "mqttName",
            "mqttDescription",
            "mqttVersion",
        ],
        disabled: &[],
    },
    CategoryParsers {
        name: "openapi",
        enabled: &["openapi", "openapi-path", "openapi-operation", "openapi-schema", "openapiComponent"],
        disabled: &[],
    },
    CategoryParsers {
        name: "graphql",
        enabled: &["apiSchema", "apiDefine", "apiParam", "apiSuccess", "apiError", "apiExample"],
        disabled: &[],
    },
];

/// Names of the built-in categories.
pub fn categories() -> impl Iterator<Item = &'static str> {
    CATEGORIES.iter().map(|c| c.name)
}

/// Whether `tag` may be parsed in `category`. Unknown categories enable
/// everything; the disabled list wins over the enabled list.
///
/// Tag names arrive lowercased from the element finder, so the comparison
/// ignores case.
pub fn is_parser_enabled(category: &str, tag: &str) -> bool {
    let Some(config) = CATEGORIES.iter().find(|c| c.name.eq_ignore_ascii_case(category)) else {
        return true;
    };
    if config.disabled.iter().any(|p| p.eq_ignore_ascii_case(tag)) {
        return false;
    }
    if config.enabled.is_empty() {
        return true;
    }
    config.enabled.iter().any(|p| p.eq_ignore_ascii_case(tag))
}
