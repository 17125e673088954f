//! `article.md` -> metadata + JSX content.
//!
//! One pass over pulldown-cmark events does all the interception:
//!
//! | fence                  | result                                   |
//! |------------------------|------------------------------------------|
//! | ```` ```blog ````      | parsed as TOML metadata, removed         |
//! | ```` ```tsx embed ```` | `<tsxembed-N>` placeholder, restored raw |
//! | ```` ```mermaid ````   | `<div class="mermaid">`                  |
//! | ```` ```plantuml ````  | `<pre class="uml">`                      |
//!
//! The rendered HTML is then converted to JSX and the placeholders are
//! replaced by the embedded TSX, untouched.

mod extensions;
pub mod jsx;
mod meta;

use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, TextMergeStream,
    html,
};
use regex::Regex;
use rustc_hash::FxHashMap;

use super::CompileError;
use extensions::{AbbrMatcher, escape_attr, extract_abbreviations, highlight_pattern, inline_events};

pub(crate) use extensions::Fence;
pub use jsx::html_to_jsx;
pub use meta::BlogMeta;

/// Result of compiling one markdown document.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMarkdown {
    /// Metadata with `title` resolved
    pub meta: BlogMeta,
    /// JSX fragment wrapped in a single `<div>`
    pub content: String,
    /// Text of the first level-1 heading, if any
    pub first_heading: Option<String>,
}

/// Side-channel state of one render. Reset at the start of every compile.
#[derive(Debug, Default)]
struct RenderInfo {
    blog_meta: Option<BlogMeta>,
    tsx_embed: FxHashMap<String, String>,
    first_heading: Option<String>,
}

/// Special fences, recognized by their info string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceKind {
    Meta,
    Embed,
    Mermaid,
    Uml,
}

impl FenceKind {
    fn from_info(info: &str) -> Option<Self> {
        let mut words = info.split_whitespace();
        match (words.next()?, words.next()) {
            ("blog", _) => Some(Self::Meta),
            ("tsx", Some("embed")) => Some(Self::Embed),
            ("mermaid", _) => Some(Self::Mermaid),
            ("plantuml" | "uml", _) => Some(Self::Uml),
            _ => None,
        }
    }
}

struct Capture {
    kind: FenceKind,
    body: String,
}

/// Whether a fence info string marks the metadata block or a TSX embed.
pub(crate) fn is_authoring_fence(info: &str) -> bool {
    matches!(
        FenceKind::from_info(info),
        Some(FenceKind::Meta | FenceKind::Embed)
    )
}

/// Markdown renderer with the extension set configured once.
#[derive(Debug)]
pub struct MarkdownCompiler {
    options: Options,
    highlight: Regex,
    info: RenderInfo,
}

impl Default for MarkdownCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownCompiler {
    pub fn new() -> Self {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_MATH
            | Options::ENABLE_SUPERSCRIPT
            | Options::ENABLE_SUBSCRIPT
            | Options::ENABLE_HEADING_ATTRIBUTES;
        Self {
            options,
            highlight: highlight_pattern(),
            info: RenderInfo::default(),
        }
    }

    /// Compile markdown source into metadata and a JSX fragment.
    ///
    /// The title falls back to the first `# heading`, then to `""`.
    pub fn compile_markdown(&mut self, source: &str) -> Result<CompiledMarkdown, CompileError> {
        self.info = RenderInfo::default();

        let (body, abbreviations) = extract_abbreviations(source);
        let abbr = AbbrMatcher::new(&abbreviations);
        let events = self.collect_events(&body, abbr.as_ref())?;

        let mut rendered = String::with_capacity(body.len() * 3 / 2);
        html::push_html(&mut rendered, events.into_iter());

        let info = std::mem::take(&mut self.info);
        let mut meta = info.blog_meta.unwrap_or_default();
        if !meta.has_title() {
            meta.title = info.first_heading.clone().unwrap_or_default();
        }

        let mut content = html_to_jsx(&rendered);
        for (tag, code) in &info.tsx_embed {
            content = content.replace(&format!("<{tag} />"), code);
        }

        crate::debug!(
            "markdown";
            "rendered {} bytes, {} embed(s)",
            content.len(),
            info.tsx_embed.len()
        );

        Ok(CompiledMarkdown {
            meta,
            content,
            first_heading: info.first_heading,
        })
    }

    fn collect_events<'a>(
        &mut self,
        body: &'a str,
        abbr: Option<&AbbrMatcher>,
    ) -> Result<Vec<Event<'a>>, CompileError> {
        let parser = TextMergeStream::new(Parser::new_ext(body, self.options));
        let mut events = Vec::new();
        let mut capture: Option<Capture> = None;
        let mut in_code = false;
        let mut heading: Option<String> = None;

        for event in parser {
            if let Some(open) = capture.as_mut() {
                match event {
                    Event::Text(text) => open.body.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        if let Some(done) = capture.take() {
                            self.finish_capture(done, &mut events)?;
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref info))) => {
                    if let Some(kind) = FenceKind::from_info(info) {
                        capture = Some(Capture {
                            kind,
                            body: String::new(),
                        });
                        continue;
                    }
                    in_code = true;
                    events.push(event);
                }
                Event::Start(Tag::CodeBlock(_)) => {
                    in_code = true;
                    events.push(event);
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code = false;
                    events.push(event);
                }
                Event::Start(Tag::Heading {
                    level: HeadingLevel::H1,
                    ..
                }) if self.info.first_heading.is_none() && heading.is_none() => {
                    heading = Some(String::new());
                    events.push(event);
                }
                Event::End(TagEnd::Heading(HeadingLevel::H1)) if heading.is_some() => {
                    self.info.first_heading = heading.take().map(|h| h.trim().to_string());
                    events.push(event);
                }
                Event::Text(text) if !in_code => {
                    if let Some(h) = heading.as_mut() {
                        h.push_str(&text);
                    }
                    events.extend(inline_events(&text, &self.highlight, abbr));
                }
                Event::Code(ref code) => {
                    if let Some(h) = heading.as_mut() {
                        h.push_str(code);
                    }
                    events.push(event);
                }
                other => events.push(other),
            }
        }

        Ok(events)
    }

    fn finish_capture(
        &mut self,
        capture: Capture,
        events: &mut Vec<Event<'_>>,
    ) -> Result<(), CompileError> {
        match capture.kind {
            FenceKind::Meta => {
                // Only the first metadata block counts.
                if self.info.blog_meta.is_none() {
                    self.info.blog_meta = Some(BlogMeta::parse(&capture.body)?);
                } else {
                    crate::debug!("markdown"; "ignoring extra blog metadata block");
                }
            }
            FenceKind::Embed => {
                let tag = format!("tsxembed-{}", self.info.tsx_embed.len());
                events.push(Event::Html(CowStr::from(format!("<{tag}></{tag}>\n"))));
                self.info.tsx_embed.insert(tag, capture.body);
            }
            FenceKind::Mermaid => {
                events.push(Event::Html(CowStr::from(format!(
                    "<div class=\"mermaid\">{}</div>\n",
                    escape_attr(&capture.body)
                ))));
            }
            FenceKind::Uml => {
                events.push(Event::Html(CowStr::from(format!(
                    "<pre class=\"uml\">{}</pre>\n",
                    escape_attr(&capture.body)
                ))));
            }
        }
        Ok(())
    }
}
