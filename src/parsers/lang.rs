//! `@apiLang <iso-639-1>`: documentation language of an endpoint.

use super::{Descriptor, Registry};
use crate::context::ParseContext;
use crate::error::{ParameterError, TagError};
use crate::model::Method;
use serde_json::{json, Value};

static ISO_639_1: &[&str] = &[
    "aa", "ab", "ae", "af", "ak", "am", "an", "ar", "as", "av", "ay", "az", "ba", "be", "bg", "bh", "bi", "bm", "bn",
    "bo", "br", "bs", "ca", "ce", "ch", "co", "cr", "cs", "cu", "cv", "cy", "da", "de", "dv", "dz", "ee", "el", "en",
    "eo", "es", "et", "eu", "fa", "ff", "fi", "fj", "fo", "fr", "fy", "ga", "gd", "gl", "gn", "gu", "gv", "ha", "he",
    "hi", "ho", "hr", "ht", "hu", "hy", "hz", "ia", "id", "ie", "ig", "ii", "ik", "io", "is", "it", "iu", "ja", "jv",
    "ka", "kg", "ki", "kj", "kk", "kl", "km", "kn", "ko", "kr", "ks", "ku", "kv", "kw", "ky", "la", "lb", "lg", "li",
    "ln", "lo", "lt", "lu", "lv", "mg", "mh", "mi", "mk", "ml", "mn", "mr", "ms", "mt", "my", "na", "nb", "nd", "ne",
    "ng", "nl", "nn", "no", "nr", "nv", "ny", "oc", "oj", "om", "or", "os", "pa", "pi", "pl", "ps", "pt", "qu", "rm",
    "rn", "ro", "ru", "rw", "sa", "sc", "sd", "se", "sg", "si", "sk", "sl", "sm", "sn", "so", "sq", "sr", "ss", "st",
    "su", "sv", "sw", "ta", "te", "tg", "th", "ti", "tk", "tl", "tn", "to", "tr", "ts", "tt", "tw", "ty", "ug", "uk",
    "ur", "uz", "ve", "vi", "vo", "wa", "wo", "xh", "yi", "yo", "za", "zh", "zu",
];

pub fn register(registry: &mut Registry) {
    registry.register("apiLang", Descriptor::at(parse_lang, "local", Method::Insert).extend_root());
}

fn parse_lang(content: &str, _source: &str, _ctx: &mut ParseContext) -> Result<Option<Value>, TagError> {
    let code = content.trim().to_lowercase();
    if code.is_empty() {
        return Ok(None);
    }
    if code.chars().count() != 2 {
        return Err(ParameterError::new(
            "Language code must be ISO 639-1 format (2 letters).",
            "apiLang",
            "@apiLang <iso-639-1-code>",
            "@apiLang es\n@apiLang en\n@apiLang zh\n@apiLang fr",
        )
        .into());
    }
    if ISO_639_1.binary_search(&code.as_str()).is_err() {
        return Err(ParameterError::new(
            format!("Language code \"{code}\" is not a valid ISO 639-1 code."),
            "apiLang",
            "@apiLang <iso-639-1-code>",
            "@apiLang es (Spanish)\n@apiLang en (English)\n@apiLang zh (Chinese)\n@apiLang ja (Japanese)",
        )
        .into());
    }
    Ok(Some(json!({ "lang": code })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(content: &str) -> Result<Option<Value>, TagError> {
        parse_lang(content, "", &mut ParseContext::new())
    }

    #[test]
    fn codes_are_sorted_for_lookup() {
        assert!(ISO_639_1.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn accepts_known_codes_in_any_case() {
        assert_eq!(lang(" ES ").unwrap().unwrap(), json!({"lang": "es"}));
    }

    #[test]
    fn rejects_wrong_length_and_unknown_codes() {
        assert_eq!(
            lang("eng").unwrap_err().to_string(),
            "Language code must be ISO 639-1 format (2 letters)."
        );
        assert_eq!(
            lang("xx").unwrap_err().to_string(),
            "Language code \"xx\" is not a valid ISO 639-1 code."
        );
    }
}
