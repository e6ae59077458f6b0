//! Markdown rendering for `markdown_fields` of tag parsers.

use pulldown_cmark::{html, Options, Parser};

/// Renders markdown text to HTML.
pub trait MarkdownRenderer {
    fn render(&self, content: &str) -> String;
}

/// CommonMark renderer backed by pulldown-cmark (tables and strikethrough on).
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonMark;

impl MarkdownRenderer for CommonMark {
    fn render(&self, content: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        let parser = Parser::new_ext(content, options);
        let mut out = String::new();
        html::push_html(&mut out, parser);
        out
    }
}

/// Render, join lines outside `<pre>` blocks, trim, and optionally drop
/// `<p>` tags.
pub fn render_field(renderer: &dyn MarkdownRenderer, text: &str, remove_p_tags: bool) -> String {
    let rendered = collapse_line_breaks(&renderer.render(text));
    let rendered = rendered.trim();
    if remove_p_tags {
        rendered.replace("<p>", "").replace("</p>", "")
    } else {
        rendered.to_string()
    }
}

/// Replace line breaks with spaces everywhere except inside `<pre>...</pre>`.
pub fn collapse_line_breaks(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    loop {
        match rest.find("<pre>") {
            Some(start) => {
                out.push_str(&join_lines(&rest[..start]));
                rest = &rest[start..];
                match rest.find("</pre>") {
                    Some(end) => {
                        let end = end + "</pre>".len();
                        out.push_str(&rest[..end]);
                        rest = &rest[end..];
                    }
                    None => {
                        out.push_str(rest);
                        return out;
                    }
                }
            }
            None => {
                out.push_str(&join_lines(rest));
                return out;
            }
        }
    }
}

fn join_lines(s: &str) -> String {
    s.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_paragraph() {
        assert_eq!(CommonMark.render("Hello *world*"), "<p>Hello <em>world</em></p>\n");
    }

    #[test]
    fn pre_blocks_keep_line_breaks() {
        let html = "<p>a\nb</p>\n<pre>x\ny</pre>\n<p>c</p>";
        assert_eq!(collapse_line_breaks(html), "<p>a b</p> <pre>x\ny</pre> <p>c</p>");
    }

    #[test]
    fn render_field_strips_p_tags() {
        assert_eq!(render_field(&CommonMark, "String", true), "String");
        assert_eq!(render_field(&CommonMark, "User ID", false), "<p>User ID</p>");
    }

    #[test]
    fn multi_line_paragraph_becomes_one_line() {
        assert_eq!(render_field(&CommonMark, "first\nsecond", false), "<p>first second</p>");
    }
}
