//! Block finder: documentation comments of one source file.

use crate::languages::{Language, SENTINEL};

/// Comment interiors in source order, comment leaders stripped.
///
/// `src` must already use `\n` line endings.
pub fn find_blocks(src: &str, language: &Language) -> Vec<String> {
    let src = src.replace('\n', &SENTINEL.to_string());
    language
        .doc_blocks
        .captures_iter(&src)
        .filter_map(|caps| caps.get(2).or_else(|| caps.get(1)))
        .map(|m| {
            let block = m.as_str().replace(SENTINEL, "\n");
            language.inline.replace_all(&block, "").into_owned()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::Languages;

    #[test]
    fn js_blocks_lose_star_leaders() {
        let src = "/**\n * @api {get} /a A\n * @apiName A\n */\nfunction a() {}\n/** @api {post} /b B */";
        let langs = Languages::default();
        let blocks = find_blocks(src, langs.for_extension(".js"));
        assert_eq!(blocks, ["@api {get} /a A\n@apiName A", " @api {post} /b B"]);
    }

    #[test]
    fn python_docstrings() {
        let src = "def a():\n    \"\"\"\n    @api {get} /a A\n    \"\"\"\n";
        let langs = Languages::default();
        let blocks = find_blocks(src, langs.for_extension(".py"));
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains("@api {get} /a A"));
    }

    #[test]
    fn plain_comments_are_ignored() {
        let langs = Languages::default();
        assert!(find_blocks("/* not a doc block */\n// nor this", langs.for_extension(".js")).is_empty());
    }
}
