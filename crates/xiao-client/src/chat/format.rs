//! Markdown-ish reply text to display markup.
//!
//! The backend answers in a loose markdown dialect: `###` separates sections,
//! `**x**` marks bold runs, numbered lines are titles, `-` lines are
//! sub-headings and `key: value` lines get a highlighted key. The output is the
//! same class-tagged markup whether the answer arrived streamed or in one
//! piece. Text is inserted verbatim.

use regex::Regex;
use std::sync::OnceLock;

pub const CLASS_BOLD: &str = "bold-text";
pub const CLASS_SECTION_TITLE: &str = "section-title";
pub const CLASS_SUBSECTION: &str = "subsection";
pub const CLASS_SUBTITLE: &str = "subtitle";

const SECTION_MARKER: &str = "###";

fn bold_re() -> &'static Regex {
    static BOLD: OnceLock<Regex> = OnceLock::new();
    BOLD.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("static regex"))
}

/// Render the whole accumulated reply. Pure; called again after every append.
pub fn format_message(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let bold_span = format!(r#"<span class="{CLASS_BOLD}">$1</span>"#);
    let emboldened = text
        .split('\n')
        .map(|line| bold_re().replace_all(line, bold_span.as_str()))
        .collect::<Vec<_>>()
        .join("\n");

    let mut out = String::new();
    for section in emboldened.split(SECTION_MARKER) {
        if section.trim().is_empty() {
            continue;
        }
        for line in section.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            format_line(line, &mut out);
        }
    }
    out
}

fn format_line(line: &str, out: &mut String) {
    if is_numbered(line) {
        out.push_str(&format!(r#"<p class="{CLASS_SECTION_TITLE}">{line}</p>"#));
    } else if let Some(rest) = line.strip_prefix('-') {
        out.push_str(&format!(
            r#"<p class="{CLASS_SUBSECTION}"><span class="{CLASS_BOLD}">{}</span></p>"#,
            rest.trim()
        ));
    } else if let Some((subtitle, content)) = line.split_once(':') {
        out.push_str(&format!(
            r#"<p><span class="{CLASS_SUBTITLE}">{}</span>: {}</p>"#,
            subtitle.trim(),
            content.trim()
        ));
    } else {
        out.push_str(&format!("<p>{line}</p>"));
    }
}

/// `1.`, `12.` ... at the start of the line.
fn is_numbered(line: &str) -> bool {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && line.as_bytes().get(digits) == Some(&b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(format_message(""), "");
    }

    #[test]
    fn test_sections_in_order() {
        let out = format_message("### 1. Title\n- sub item\nkey: value");
        assert_eq!(
            out,
            "<p class=\"section-title\">1. Title</p>\
             <p class=\"subsection\"><span class=\"bold-text\">sub item</span></p>\
             <p><span class=\"subtitle\">key</span>: value</p>"
        );
    }

    #[test]
    fn test_bold_is_non_greedy_and_per_line() {
        let out = format_message("a **b** c **d**");
        assert_eq!(
            out,
            "<p>a <span class=\"bold-text\">b</span> c <span class=\"bold-text\">d</span></p>"
        );
        // An opening marker never pairs with one on the next line.
        let out = format_message("**open\nclose**");
        assert_eq!(out, "<p>**open</p><p>close**</p>");
    }

    #[test]
    fn test_bold_markup_then_classified() {
        let out = format_message("**Note** plain");
        assert_eq!(out, "<p><span class=\"bold-text\">Note</span> plain</p>");

        // Classification runs on the substituted line.
        let out = format_message("**Tip:** go");
        assert_eq!(
            out,
            "<p><span class=\"subtitle\"><span class=\"bold-text\">Tip</span>: </span> go</p>"
        );
    }

    #[test]
    fn test_first_colon_splits() {
        let out = format_message("time: 10:30");
        assert_eq!(out, "<p><span class=\"subtitle\">time</span>: 10:30</p>");
    }

    #[test]
    fn test_blank_sections_and_lines_dropped() {
        let out = format_message("###\n\n   \n### hello\n\n  world  ");
        assert_eq!(out, "<p>hello</p><p>world</p>");
    }

    #[test]
    fn test_numbered_needs_dot() {
        assert!(is_numbered("12. x"));
        assert!(!is_numbered("12 x"));
        assert!(!is_numbered(". x"));
        assert_eq!(format_message("2024"), "<p>2024</p>");
    }

    #[test]
    fn test_only_one_dash_removed() {
        let out = format_message("-- twice");
        assert_eq!(
            out,
            "<p class=\"subsection\"><span class=\"bold-text\">- twice</span></p>"
        );
    }
}
