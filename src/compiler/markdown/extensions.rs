//! Markdown extensions pulldown-cmark has no switch for.
//!
//! - abbreviations: `*[HTML]: Hyper Text Markup Language` definition lines
//! - highlighting: `==marked==`
//!
//! Both run on text events only, so code spans and code blocks are untouched.

use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event};
use regex::Regex;

static ABBR_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}\*\[([^\]]+)\]:[ \t]*(.*)$").unwrap());

/// Opening or closing line of a fenced code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fence<'a> {
    pub marker: char,
    pub len: usize,
    pub info: &'a str,
}

impl<'a> Fence<'a> {
    /// Parse a line as a fence: up to 3 spaces, then 3+ backticks or tildes.
    pub(crate) fn parse(line: &'a str) -> Option<Self> {
        let trimmed = line.trim_start_matches(' ');
        if line.len() - trimmed.len() > 3 {
            return None;
        }
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }
        let info = trimmed[len..].trim();
        if marker == '`' && info.contains('`') {
            return None;
        }
        Some(Self { marker, len, info })
    }

    /// Whether `line` closes a block opened by `self`.
    pub(crate) fn is_closed_by(&self, line: &str) -> bool {
        Fence::parse(line)
            .is_some_and(|f| f.marker == self.marker && f.len >= self.len && f.info.is_empty())
    }
}

/// Remove abbreviation definition lines, returning the remaining source and
/// the definitions in order of appearance.
pub fn extract_abbreviations(source: &str) -> (String, Vec<(String, String)>) {
    let mut body = String::with_capacity(source.len());
    let mut defs = Vec::new();
    let mut open: Option<Fence<'_>> = None;

    for line in source.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        match open {
            Some(fence) => {
                if fence.is_closed_by(content) {
                    open = None;
                }
            }
            None => {
                if let Some(fence) = Fence::parse(content) {
                    open = Some(fence);
                } else if let Some(caps) = ABBR_DEF.captures(content) {
                    let key = caps[1].trim().to_string();
                    let title = caps[2].trim().to_string();
                    if !key.is_empty() {
                        defs.push((key, title));
                        continue;
                    }
                }
            }
        }
        body.push_str(line);
    }

    (body, defs)
}

/// Matches defined abbreviations as whole words.
#[derive(Debug)]
pub struct AbbrMatcher {
    pattern: Regex,
    titles: Vec<(String, String)>,
}

impl AbbrMatcher {
    pub fn new(defs: &[(String, String)]) -> Option<Self> {
        if defs.is_empty() {
            return None;
        }
        // Later definitions of the same key win; longer keys match first.
        let mut titles: Vec<(String, String)> = Vec::new();
        for (key, title) in defs {
            titles.retain(|(k, _)| k != key);
            titles.push((key.clone(), title.clone()));
        }
        let mut keys: Vec<&str> = titles.iter().map(|(k, _)| k.as_str()).collect();
        keys.sort_by_key(|k| std::cmp::Reverse(k.len()));
        let alternation = keys
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        match Regex::new(&format!(r"\b(?:{alternation})\b")) {
            Ok(pattern) => Some(Self { pattern, titles }),
            Err(e) => {
                crate::log!("markdown"; "abbreviations disabled: {}", e);
                None
            }
        }
    }

    fn title(&self, key: &str) -> Option<&str> {
        self.titles
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, t)| t.as_str())
    }

    fn push_events(&self, text: &str, out: &mut Vec<Event<'static>>) {
        let mut last = 0;
        for m in self.pattern.find_iter(text) {
            let Some(title) = self.title(m.as_str()) else {
                continue;
            };
            push_text(&text[last..m.start()], out);
            out.push(Event::InlineHtml(CowStr::from(format!(
                "<abbr title=\"{}\">",
                escape_attr(title)
            ))));
            push_text(m.as_str(), out);
            out.push(Event::InlineHtml(CowStr::Borrowed("</abbr>")));
            last = m.end();
        }
        push_text(&text[last..], out);
    }
}

/// Split a text event into plain text, `<mark>` and `<abbr>` events.
pub fn inline_events(
    text: &str,
    highlight: &Regex,
    abbr: Option<&AbbrMatcher>,
) -> Vec<Event<'static>> {
    let mut out = Vec::new();
    let plain = |s: &str, out: &mut Vec<Event<'static>>| match abbr {
        Some(matcher) => matcher.push_events(s, out),
        None => push_text(s, out),
    };

    let mut last = 0;
    for caps in highlight.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        plain(&text[last..whole.start()], &mut out);
        out.push(Event::InlineHtml(CowStr::Borrowed("<mark>")));
        plain(inner.as_str(), &mut out);
        out.push(Event::InlineHtml(CowStr::Borrowed("</mark>")));
        last = whole.end();
    }
    plain(&text[last..], &mut out);
    out
}

/// Pattern for `==highlighted==` text.
pub fn highlight_pattern() -> Regex {
    Regex::new(r"==([^= \t\r\n](?:[^=]*[^= \t\r\n])?)==").unwrap()
}

fn push_text(s: &str, out: &mut Vec<Event<'static>>) {
    if !s.is_empty() {
        out.push(Event::Text(CowStr::from(s.to_string())));
    }
}

pub(crate) fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(events: &[Event<'static>]) -> String {
        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, events.iter().cloned());
        html
    }

    #[test]
    fn test_fence_parse() {
        let f = Fence::parse("```tsx embed").unwrap();
        assert_eq!((f.marker, f.len, f.info), ('`', 3, "tsx embed"));
        assert!(Fence::parse("``not").is_none());
        assert!(Fence::parse("    ```").is_none());
        assert!(f.is_closed_by("```"));
        assert!(f.is_closed_by("`````"));
        assert!(!f.is_closed_by("~~~"));
    }

    #[test]
    fn test_extract_abbreviations() {
        let src = "*[HTML]: Hyper Text Markup Language\nSome HTML here.\n";
        let (body, defs) = extract_abbreviations(src);
        assert_eq!(body, "Some HTML here.\n");
        assert_eq!(defs, vec![("HTML".into(), "Hyper Text Markup Language".into())]);
    }

    #[test]
    fn test_abbreviation_inside_fence_kept() {
        let src = "```\n*[X]: not a def\n```\n";
        let (body, defs) = extract_abbreviations(src);
        assert_eq!(body, src);
        assert!(defs.is_empty());
    }

    #[test]
    fn test_highlight_events() {
        let re = highlight_pattern();
        let html = render(&inline_events("a ==b c== d", &re, None));
        assert_eq!(html, "a <mark>b c</mark> d");
        // unbalanced stays literal
        let html = render(&inline_events("a == b", &re, None));
        assert_eq!(html, "a == b");
    }

    #[test]
    fn test_abbreviation_events() {
        let defs = vec![("W3C".to_string(), "World \"Wide\" Web".to_string())];
        let matcher = AbbrMatcher::new(&defs).unwrap();
        let html = render(&inline_events("the W3C spec, not W3Cx", &highlight_pattern(), Some(&matcher)));
        assert_eq!(
            html,
            "the <abbr title=\"World &quot;Wide&quot; Web\">W3C</abbr> spec, not W3Cx"
        );
    }

    #[test]
    fn test_highlight_rejects_padded_marks() {
        let re = highlight_pattern();
        assert!(!re.is_match("==\tx=="));
        assert!(!re.is_match("==x =="));
        assert!(re.is_match("==größer=="));
    }

    #[test]
    fn test_abbreviation_non_ascii_key() {
        let defs = vec![("ÄÖ".to_string(), "Umlaute".to_string())];
        let matcher = AbbrMatcher::new(&defs).unwrap();
        let html = render(&inline_events("ein ÄÖ und ÄÖx", &highlight_pattern(), Some(&matcher)));
        assert_eq!(html, "ein <abbr title=\"Umlaute\">ÄÖ</abbr> und ÄÖx");
    }

    #[test]
    fn test_text_escaped() {
        let html = render(&inline_events("1 < 2 ==&==", &highlight_pattern(), None));
        assert_eq!(html, "1 &lt; 2 <mark>&amp;</mark>");
    }
}
