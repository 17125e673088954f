//! Rendered HTML -> JSX.
//!
//! The HTML comes from pulldown-cmark plus whatever raw HTML the author
//! wrote, parsed with tl. Rewrites applied on the way out:
//!
//! - attribute names: `class` -> `className`, `for` -> `htmlFor`, ...
//! - `style="a-b: c"` -> `style={{ aB: "c" }}`
//! - childless elements self-close
//! - `{` / `}` in text become character references
//! - text under `<pre>` becomes a string literal so whitespace survives
//!
//! The result is always wrapped in a single `<div>`.

use std::borrow::Cow;

/// Containers whose whitespace-only text children are layout noise.
const BLOCK_CONTAINERS: &[&str] = &[
    "div", "ul", "ol", "dl", "table", "thead", "tbody", "tfoot", "tr", "blockquote", "section",
    "article", "aside", "nav", "header", "footer", "figure", "details", "hr",
];

const INDENT: &str = "  ";

/// Convert an HTML fragment into a JSX expression.
pub fn html_to_jsx(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + html.len() / 4);
    out.push_str("<div>\n");

    match tl::parse(html, tl::ParserOptions::default()) {
        Ok(dom) => {
            let parser = dom.parser();
            let mut writer = JsxWriter {
                parser,
                out: &mut out,
            };
            for handle in dom.children() {
                writer.node(*handle, 1, Parent::Block);
            }
        }
        Err(_) => {
            // Unparseable: keep the text, escaped, rather than dropping it.
            out.push_str(INDENT);
            out.push_str(&escape_text(html.trim()));
            out.push('\n');
        }
    }

    out.push_str("</div>");
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    Block,
    Inline,
    Pre,
}

struct JsxWriter<'p, 'o> {
    parser: &'p tl::Parser<'p>,
    out: &'o mut String,
}

impl JsxWriter<'_, '_> {
    fn node(&mut self, handle: tl::NodeHandle, depth: usize, parent: Parent) {
        let Some(node) = handle.get(self.parser) else {
            return;
        };
        match node {
            tl::Node::Tag(tag) => self.element(tag, depth, parent),
            tl::Node::Raw(bytes) => self.text(&bytes.as_utf8_str(), depth, parent),
            tl::Node::Comment(_) => {}
        }
    }

    fn element(&mut self, tag: &tl::HTMLTag<'_>, depth: usize, parent: Parent) {
        let name = tag.name().as_utf8_str().to_lowercase();
        if parent != Parent::Pre {
            self.indent(depth);
        }

        self.out.push('<');
        self.out.push_str(&name);
        let mut attributes: Vec<_> = tag.attributes().iter().collect();
        attributes.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (key, value) in &attributes {
            self.out.push(' ');
            self.attribute(key.as_ref(), value.as_deref());
        }

        let children: Vec<tl::NodeHandle> = tag.children().top().iter().copied().collect();
        if children.is_empty() {
            self.out.push_str(" />");
        } else {
            self.out.push('>');
            let inner = if parent == Parent::Pre || name == "pre" {
                Parent::Pre
            } else if BLOCK_CONTAINERS.contains(&name.as_str()) {
                Parent::Block
            } else {
                Parent::Inline
            };
            if inner != Parent::Pre {
                self.out.push('\n');
            }
            for child in children {
                self.node(child, depth + 1, inner);
            }
            if inner != Parent::Pre {
                self.indent(depth);
            }
            self.out.push_str("</");
            self.out.push_str(&name);
            self.out.push('>');
        }

        if parent != Parent::Pre {
            self.out.push('\n');
        }
    }

    fn attribute(&mut self, key: &str, value: Option<&str>) {
        let present = is_boolean_attr(key) && value.is_none_or(|v| v.is_empty() || v == key);
        let key = jsx_attr_name(key);
        match value {
            None => self.out.push_str(key),
            Some(_) if present => self.out.push_str(key),
            Some(v) if key == "style" => {
                self.out.push_str("style={");
                self.out.push_str(&style_object(&decode(v)));
                self.out.push('}');
            }
            Some(v) => {
                self.out.push_str(key);
                self.out.push_str("=\"");
                self.out.push_str(&v.replace('"', "&quot;"));
                self.out.push('"');
            }
        }
    }

    fn text(&mut self, raw: &str, depth: usize, parent: Parent) {
        if raw.is_empty() {
            return;
        }
        if parent == Parent::Pre {
            self.out.push('{');
            self.out.push_str(&json_string(&decode(raw)));
            self.out.push('}');
            return;
        }

        let body = raw.trim();
        if body.is_empty() {
            if parent == Parent::Inline {
                self.indent(depth);
                self.out.push_str("{' '}\n");
            }
            return;
        }

        self.indent(depth);
        if raw.starts_with(char::is_whitespace) && parent == Parent::Inline {
            self.out.push_str("{' '}");
        }
        let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
        self.out.push_str(&escape_text(&collapsed));
        if raw.ends_with(char::is_whitespace) && parent == Parent::Inline {
            self.out.push_str("{' '}");
        }
        self.out.push('\n');
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
    }
}

/// HTML attributes whose presence alone means `true`.
fn is_boolean_attr(name: &str) -> bool {
    matches!(
        name,
        "checked"
            | "disabled"
            | "selected"
            | "readonly"
            | "required"
            | "multiple"
            | "hidden"
            | "autofocus"
            | "autoplay"
            | "controls"
            | "loop"
            | "muted"
            | "open"
            | "reversed"
            | "allowfullscreen"
            | "novalidate"
            | "async"
            | "defer"
    )
}

fn jsx_attr_name(name: &str) -> &str {
    match name {
        "class" => "className",
        "for" => "htmlFor",
        "tabindex" => "tabIndex",
        "readonly" => "readOnly",
        "maxlength" => "maxLength",
        "colspan" => "colSpan",
        "rowspan" => "rowSpan",
        "cellpadding" => "cellPadding",
        "cellspacing" => "cellSpacing",
        "srcset" => "srcSet",
        "crossorigin" => "crossOrigin",
        "datetime" => "dateTime",
        "accesskey" => "accessKey",
        "contenteditable" => "contentEditable",
        "autoplay" => "autoPlay",
        "allowfullscreen" => "allowFullScreen",
        "frameborder" => "frameBorder",
        "referrerpolicy" => "referrerPolicy",
        "viewbox" => "viewBox",
        "stroke-width" => "strokeWidth",
        "stroke-linecap" => "strokeLinecap",
        "stroke-linejoin" => "strokeLinejoin",
        "fill-rule" => "fillRule",
        "clip-rule" => "clipRule",
        "xlink:href" => "xlinkHref",
        _ => name,
    }
}

/// `"text-align: left; --x: 1"` -> `{ textAlign: "left", "--x": "1" }`
fn style_object(style: &str) -> String {
    let entries: Vec<String> = style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim();
            let value = value.trim();
            if prop.is_empty() || value.is_empty() {
                return None;
            }
            let key = if prop.starts_with("--") {
                json_string(prop)
            } else {
                camel_case(prop)
            };
            Some(format!("{key}: {}", json_string(value)))
        })
        .collect();

    if entries.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", entries.join(", "))
    }
}

fn camel_case(prop: &str) -> String {
    let prop = prop.to_ascii_lowercase();
    // Vendor prefixes: -webkit-x -> WebkitX, except -ms-x -> msX.
    let (prop, upper_first) = match prop.strip_prefix('-') {
        Some(rest) => (rest.to_string(), !rest.starts_with("ms-")),
        None => (prop, false),
    };
    let mut out = String::with_capacity(prop.len());
    let mut upper = upper_first;
    for c in prop.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn escape_text(text: &str) -> String {
    text.replace('{', "&#123;").replace('}', "&#125;")
}

fn decode(raw: &str) -> Cow<'_, str> {
    quick_xml::escape::unescape(raw).unwrap_or(Cow::Borrowed(raw))
}

fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
