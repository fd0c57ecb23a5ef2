//! Markdown to HTML page conversion.

use std::fmt::Write;

use pulldown_cmark::{Options, Parser, html};

/// Parser options: GitHub-flavored tables, strikethrough, task lists, plus footnotes.
#[must_use]
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_GFM
        | Options::ENABLE_FOOTNOTES
}

/// Render markdown to an HTML fragment.
#[must_use]
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, parser_options());
    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, parser);
    body
}

/// Everything needed to build a standalone HTML page.
pub struct PageData<'a> {
    pub title: &'a str,
    pub body_html: &'a str,
    pub stylesheet: &'a str,
    pub body_class: Option<&'a str>,
}

/// Render a complete HTML page with an inline stylesheet.
#[must_use]
pub fn render_page(page: &PageData<'_>) -> String {
    let mut html = String::with_capacity(page.body_html.len() + page.stylesheet.len() + 512);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape(page.title));
    let _ = writeln!(html, "<style>\n{}\n</style>", page.stylesheet);
    html.push_str("</head>\n");
    match page.body_class {
        Some(class) if !class.is_empty() => {
            let _ = writeln!(html, "<body class=\"{}\">", escape(class));
        }
        _ => html.push_str("<body>\n"),
    }
    html.push_str(page.body_html);
    html.push_str("</body>\n</html>\n");

    html
}

/// Wrap a header/footer fragment into the standalone document the PDF engine expects.
#[must_use]
pub fn wrap_fragment(fragment: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n<body>\n{fragment}\n</body>\n</html>\n"
    )
}

fn escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
