//! Markdown → HTML rendering for `output_format = html`.
//!
//! Rendering enables tables and footnotes only, and turns single newlines
//! inside a paragraph into `<br />`. The rendered string then has
//! every literal `\n` removed so the HTML fits on one line in a JSON value.

use pulldown_cmark::{html, Event, Options, Parser};

/// Render `markdown` to single-line HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    strip_newlines(&out)
}

fn strip_newlines(html: &str) -> String {
    html.replace('\n', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_and_paragraph() {
        let html = markdown_to_html("# Report\n\nHello *world*");
        assert_eq!(html, "<h1>Report</h1><p>Hello <em>world</em></p>");
    }

    #[test]
    fn soft_breaks_become_br() {
        let html = markdown_to_html("line one\nline two");
        assert!(html.contains("line one<br />"), "got {html}");
        assert!(!html.contains('\n'));
    }

    #[test]
    fn tables_render() {
        let html = markdown_to_html("| A | B |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
        assert!(!html.contains('\n'));
    }

    #[test]
    fn strikethrough_is_left_literal() {
        assert_eq!(markdown_to_html("~~x~~"), "<p>~~x~~</p>");
    }

    #[test]
    fn empty_input() {
        assert_eq!(markdown_to_html(""), "");
    }
}
