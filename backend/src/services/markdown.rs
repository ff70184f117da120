//! Markdown rendering for bot messages
//!
//! A small Markdown-to-HTML transform covering what the model produces in
//! practice. Text that already carries HTML markup is passed through as is.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

struct MarkdownPatterns {
    existing_html: Regex,
    code_block: Regex,
    inline_code: Regex,
    h3: Regex,
    h2: Regex,
    h1: Regex,
    rule: Regex,
    bullet_item: Regex,
    bullet_group: Regex,
    numbered_item: Regex,
    numbered_group: Regex,
    bold_star: Regex,
    bold_underscore: Regex,
    italic_star: Regex,
    italic_underscore: Regex,
    link: Regex,
    blockquote: Regex,
    paragraph_break: Regex,
    line_break: Regex,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid markdown regex")
}

static PATTERNS: Lazy<MarkdownPatterns> = Lazy::new(|| MarkdownPatterns {
    existing_html: compile(r"(?i)<(/?)(ul|li|i|a|p|br|strong|em|b|div|span)[^>]*>"),
    code_block: compile(r"(?s)```(.*?)```"),
    inline_code: compile(r"`([^`]+)`"),
    h3: compile(r"(?m)^### (.+)$"),
    h2: compile(r"(?m)^## (.+)$"),
    h1: compile(r"(?m)^# (.+)$"),
    rule: compile(r"(?m)^(---|\*\*\*)$"),
    bullet_item: compile(r"(?m)^[-*] (.+)$"),
    bullet_group: compile(r#"(<li class="bullet-item">.*</li>\n?)+"#),
    numbered_item: compile(r"(?m)^\d+\. (.+)$"),
    numbered_group: compile(r#"(<li class="numbered-item">.*</li>\n?)+"#),
    bold_star: compile(r"\*\*([^*]+)\*\*"),
    bold_underscore: compile(r"__([^_]+)__"),
    italic_star: compile(r"\*([^*]+)\*"),
    italic_underscore: compile(r"_([^_]+)_"),
    link: compile(r"\[([^\]]+)\]\(([^)]+)\)"),
    blockquote: compile(r"(?m)^> (.+)$"),
    paragraph_break: compile(r"\n\n+"),
    line_break: compile(r"([^>])\n([^<])"),
});

const BLOCK_PREFIXES: [&str; 6] = ["<h", "<ul", "<ol", "<pre", "<blockquote", "<hr"];

/// Convert a bot reply to HTML
///
/// Lists are grouped before emphasis is applied so that `* item` lines are
/// never mistaken for italics.
pub fn parse_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let p = &*PATTERNS;
    if p.existing_html.is_match(text) {
        return text.to_string();
    }

    let mut html = p
        .code_block
        .replace_all(text, "<pre><code>${1}</code></pre>")
        .into_owned();
    html = p.inline_code.replace_all(&html, "<code>${1}</code>").into_owned();

    html = p.h3.replace_all(&html, "<h3>${1}</h3>").into_owned();
    html = p.h2.replace_all(&html, "<h2>${1}</h2>").into_owned();
    html = p.h1.replace_all(&html, "<h1>${1}</h1>").into_owned();
    html = p.rule.replace_all(&html, "<hr>").into_owned();

    html = p
        .bullet_item
        .replace_all(&html, r#"<li class="bullet-item">${1}</li>"#)
        .into_owned();
    html = wrap_list(&p.bullet_group, &html, "ul");
    html = p
        .numbered_item
        .replace_all(&html, r#"<li class="numbered-item">${1}</li>"#)
        .into_owned();
    html = wrap_list(&p.numbered_group, &html, "ol");

    html = p
        .bold_star
        .replace_all(&html, "<strong>${1}</strong>")
        .into_owned();
    html = p
        .bold_underscore
        .replace_all(&html, "<strong>${1}</strong>")
        .into_owned();
    html = replace_unflanked(&p.italic_star, &html, '*');
    html = replace_unflanked(&p.italic_underscore, &html, '_');

    html = p
        .link
        .replace_all(
            &html,
            r#"<a href="${2}" target="_blank" rel="noopener">${1}</a>"#,
        )
        .into_owned();
    html = p
        .blockquote
        .replace_all(&html, "<blockquote>${1}</blockquote>")
        .into_owned();

    let paragraphs: Vec<&str> = p.paragraph_break.split(&html).collect();
    if paragraphs.len() > 1 {
        html = paragraphs
            .iter()
            .map(|paragraph| {
                let paragraph = paragraph.trim();
                if paragraph.is_empty() {
                    String::new()
                } else if BLOCK_PREFIXES.iter().any(|b| paragraph.starts_with(b)) {
                    paragraph.to_string()
                } else {
                    format!("<p>{}</p>", paragraph)
                }
            })
            .collect();
    }

    p.line_break.replace_all(&html, "${1}<br>${2}").into_owned()
}

fn wrap_list(group: &Regex, html: &str, tag: &str) -> String {
    group
        .replace_all(html, |caps: &Captures| {
            format!(
                r#"<{tag} class="markdown-list">{}</{tag}>"#,
                caps[0].replace('\n', ""),
                tag = tag
            )
        })
        .into_owned()
}

/// Wrap matches in `<em>` unless the delimiter is doubled on either side
fn replace_unflanked(pattern: &Regex, text: &str, marker: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let before = text[..whole.start()].chars().next_back();
        let after = text[whole.end()..].chars().next();
        if before == Some(marker) || after == Some(marker) {
            continue;
        }
        out.push_str(&text[last..whole.start()]);
        out.push_str("<em>");
        out.push_str(&caps[1]);
        out.push_str("</em>");
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Escape text typed by the customer before it is rendered as HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

static LINE_TAG: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)<br\s*/?>|</(p|li|h[1-6]|pre|blockquote|ul|ol)>|<hr\s*/?>"));
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| compile(r"(?i)<li[^>]*>"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| compile(r"<[^>]+>"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| compile(r"\n{3,}"));

/// Flatten message HTML to plain text for non-HTML front-ends
pub fn html_to_plain(html: &str) -> String {
    let text = LINE_TAG.replace_all(html, "\n");
    let text = LIST_ITEM.replace_all(&text, "• ");
    let text = ANY_TAG.replace_all(&text, "");
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    BLANK_LINES
        .replace_all(text.trim(), "\n\n")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_plain() {
        assert_eq!(
            html_to_plain("<p>Hola <strong>Ana</strong></p><p>uno<br>dos</p>"),
            "Hola Ana\nuno\ndos"
        );
        assert_eq!(
            html_to_plain(r#"<ul class="markdown-list"><li class="bullet-item">Heno</li><li class="bullet-item">Agua</li></ul>"#),
            "• Heno\n• Agua"
        );
        assert_eq!(html_to_plain(&escape_html("<b>&")), "<b>&");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_markdown(""), "");
    }

    #[test]
    fn test_existing_html_is_untouched() {
        let html = "<ul><li>**Nueva Zelanda**</li></ul>";
        assert_eq!(parse_markdown(html), html);
    }

    #[test]
    fn test_bold_and_italic() {
        assert_eq!(
            parse_markdown("Tenemos **Chinchilla** y *Mariposa*"),
            "Tenemos <strong>Chinchilla</strong> y <em>Mariposa</em>"
        );
    }

    #[test]
    fn test_bullet_list_with_stars() {
        let html = parse_markdown("* Heno\n* Alimento");
        assert_eq!(
            html,
            r#"<ul class="markdown-list"><li class="bullet-item">Heno</li><li class="bullet-item">Alimento</li></ul>"#
        );
    }

    #[test]
    fn test_numbered_list() {
        let html = parse_markdown("1. Uno\n2. Dos");
        assert!(html.starts_with(r#"<ol class="markdown-list">"#));
        assert!(html.contains(r#"<li class="numbered-item">Dos</li>"#));
    }

    #[test]
    fn test_headings_and_code() {
        assert_eq!(parse_markdown("## Razas"), "<h2>Razas</h2>");
        assert_eq!(parse_markdown("usa `heno`"), "usa <code>heno</code>");
        assert_eq!(
            parse_markdown("```x\ny```"),
            "<pre><code>x<br>y</code></pre>"
        );
    }

    #[test]
    fn test_link_opens_new_tab() {
        assert_eq!(
            parse_markdown("[sitio](https://example.com)"),
            r#"<a href="https://example.com" target="_blank" rel="noopener">sitio</a>"#
        );
    }

    #[test]
    fn test_paragraphs_and_line_breaks() {
        assert_eq!(
            parse_markdown("Hola\n\nlínea uno\nlínea dos"),
            "<p>Hola</p><p>línea uno<br>línea dos</p>"
        );
    }

    #[test]
    fn test_block_elements_not_wrapped_in_paragraphs() {
        let html = parse_markdown("# Título\n\ntexto");
        assert_eq!(html, "<h1>Título</h1><p>texto</p>");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Pedro" & 'Ana'</b>"#),
            "&lt;b&gt;&quot;Pedro&quot; &amp; &#39;Ana&#39;&lt;/b&gt;"
        );
    }
}
