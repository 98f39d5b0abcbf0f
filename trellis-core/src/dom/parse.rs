//! Markup parsing.
//!
//! Turns a template string into a node tree with exactly one root element.
//! The grammar is the forgiving subset templates actually use: elements,
//! quoted, unquoted and boolean attributes, void and self-closing tags,
//! comments, doctype-like declarations, and character entities.

use thiserror::Error;

use super::node::Node;

/// Errors raised while parsing a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,

    #[error("template must have a single root element")]
    MultipleRoots,

    #[error("template root must be an element")]
    NoRootElement,

    #[error("unexpected closing tag </{tag}>")]
    UnexpectedClose { tag: String },

    #[error("element <{tag}> is never closed")]
    Unclosed { tag: String },

    #[error("malformed markup at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },
}

/// Builds elements from template markup.
pub trait Renderer: Send + Sync {
    fn render(&self, markup: &str) -> Result<Node, TemplateError>;
}

/// The default renderer, backed by [`parse`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Domify;

impl Renderer for Domify {
    fn render(&self, markup: &str) -> Result<Node, TemplateError> {
        parse(markup)
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Whether `tag` never has children or a closing tag.
pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse `markup` into its single root element.
pub fn parse(markup: &str) -> Result<Node, TemplateError> {
    let mut parser = Parser {
        src: markup,
        pos: 0,
        stack: Vec::new(),
        roots: Vec::new(),
    };
    parser.run()?;

    let mut roots = parser.roots;
    match roots.len() {
        0 => Err(TemplateError::Empty),
        1 => {
            let root = roots.remove(0);
            if root.is_element() {
                Ok(root)
            } else {
                Err(TemplateError::NoRootElement)
            }
        }
        _ => Err(TemplateError::MultipleRoots),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    stack: Vec<Node>,
    roots: Vec<Node>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

fn starts_markup(s: &str) -> bool {
    let mut chars = s.chars();
    if chars.next() != Some('<') {
        return false;
    }
    matches!(chars.next(), Some(c) if c == '/' || c == '!' || c.is_ascii_alphabetic())
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn malformed(&self, reason: &'static str) -> TemplateError {
        TemplateError::Malformed {
            offset: self.pos,
            reason,
        }
    }

    fn run(&mut self) -> Result<(), TemplateError> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                let end = rest.find("-->").ok_or_else(|| self.malformed("unterminated comment"))?;
                self.pos += end + 3;
            } else if rest.starts_with("<!") {
                let end = rest.find('>').ok_or_else(|| self.malformed("unterminated declaration"))?;
                self.pos += end + 1;
            } else if rest.starts_with("</") {
                self.close_tag()?;
            } else if starts_markup(rest) {
                self.open_tag()?;
            } else {
                self.text()?;
            }
        }

        match self.stack.last().and_then(|node| node.tag().map(str::to_owned)) {
            Some(tag) => Err(TemplateError::Unclosed { tag }),
            None => Ok(()),
        }
    }

    fn attach(&mut self, node: Node) -> Result<(), TemplateError> {
        match self.stack.last() {
            Some(parent) => parent
                .append_child(&node)
                .map_err(|_| self.malformed("invalid nesting")),
            None => {
                self.roots.push(node);
                Ok(())
            }
        }
    }

    fn text(&mut self) -> Result<(), TemplateError> {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .skip(1)
            .find(|&(i, _)| starts_markup(&rest[i..]))
            .map_or(rest.len(), |(i, _)| i);
        let raw = &rest[..len];
        self.pos += len;

        if self.stack.is_empty() && raw.trim().is_empty() {
            return Ok(());
        }
        self.attach(Node::text(decode_entities(raw)))
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn open_tag(&mut self) -> Result<(), TemplateError> {
        self.pos += 1;
        let tag = self.take_while(is_name_char).to_ascii_lowercase();
        let element = Node::element(&tag);

        let self_closing = loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.malformed("unterminated tag"));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }

            let name = self.take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/'));
            if name.is_empty() {
                return Err(self.malformed("invalid attribute name"));
            }
            self.skip_whitespace();

            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.attribute_value()?
            } else {
                String::new()
            };
            element.set_attribute(name, value);
        };

        self.attach(element.clone())?;
        if !self_closing && !is_void(&tag) {
            self.stack.push(element);
        }
        Ok(())
    }

    fn attribute_value(&mut self) -> Result<String, TemplateError> {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body
                    .find(quote)
                    .ok_or_else(|| self.malformed("unterminated attribute value"))?;
                self.pos += end + 2;
                Ok(decode_entities(&body[..end]))
            }
            _ => {
                let raw = self.take_while(|c| !c.is_whitespace() && c != '>');
                // `<a href=x/>` keeps the slash in the value, as browsers do.
                Ok(decode_entities(raw))
            }
        }
    }

    fn close_tag(&mut self) -> Result<(), TemplateError> {
        let rest = self.rest();
        let end = rest
            .find('>')
            .ok_or_else(|| self.malformed("unterminated closing tag"))?;
        let tag = rest[2..end].trim().to_ascii_lowercase();
        self.pos += end + 1;

        let open = self.stack.last().and_then(|node| node.tag().map(str::to_owned));
        match open {
            Some(open) if open == tag => {
                self.stack.pop();
                Ok(())
            }
            Some(open) if self.stack.iter().any(|node| node.tag() == Some(tag.as_str())) => {
                Err(TemplateError::Unclosed { tag: open })
            }
            _ => Err(TemplateError::UnexpectedClose { tag }),
        }
    }
}

/// Replace character references with the characters they name.
/// Unknown references are kept verbatim.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        let decoded = rest
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| entity(&rest[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = name.strip_prefix('#')?;
            let code = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_element() {
        let div = parse("<div></div>").unwrap();
        assert_eq!(div.tag(), Some("div"));
        assert_eq!(div.child_count(), 0);
        assert!(div.parent().is_none());
    }

    #[test]
    fn parses_attributes() {
        let input = parse(r#"<input id="hooray" class='a b' disabled value=x>"#).unwrap();
        assert_eq!(input.id().as_deref(), Some("hooray"));
        assert_eq!(input.attribute("class").as_deref(), Some("a b"));
        assert_eq!(input.attribute("disabled").as_deref(), Some(""));
        assert_eq!(input.attribute("value").as_deref(), Some("x"));
    }

    #[test]
    fn parses_nested_children_and_text() {
        let root = parse("<ul>\n  <li>One</li>\n  <li>Two &amp; three</li>\n</ul>").unwrap();
        let items: Vec<Node> = root.children().into_iter().filter(Node::is_element).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text_content(), "Two & three");
    }

    #[test]
    fn void_and_self_closing_tags_have_no_children() {
        let root = parse("<p>a<br>b<img src='x.png'/>c<span/></p>").unwrap();
        assert_eq!(root.text_content(), "abc");
        assert_eq!(root.child_count(), 6);
    }

    #[test]
    fn ignores_comments_and_surrounding_whitespace() {
        let root = parse("  <!-- heading -->\n<h1>Title</h1>\n").unwrap();
        assert_eq!(root.tag(), Some("h1"));
        assert_eq!(root.text_content(), "Title");
    }

    #[test]
    fn literal_angle_bracket_is_text() {
        let root = parse("<p>1 < 2</p>").unwrap();
        assert_eq!(root.text_content(), "1 < 2");
    }

    #[test]
    fn rejects_bad_templates() {
        assert_eq!(parse("   ").unwrap_err(), TemplateError::Empty);
        assert_eq!(parse("<a></a><b></b>").unwrap_err(), TemplateError::MultipleRoots);
        assert_eq!(parse("hello").unwrap_err(), TemplateError::NoRootElement);
        assert_eq!(
            parse("<div><span></div>").unwrap_err(),
            TemplateError::Unclosed { tag: "span".into() }
        );
        assert_eq!(
            parse("<div></p>").unwrap_err(),
            TemplateError::UnexpectedClose { tag: "p".into() }
        );
        assert_eq!(
            parse("<div>").unwrap_err(),
            TemplateError::Unclosed { tag: "div".into() }
        );
        assert!(matches!(
            parse("<div id=\"x></div>"),
            Err(TemplateError::Malformed { .. })
        ));
    }

    #[test]
    fn decodes_numeric_entities() {
        assert_eq!(decode_entities("&#65;&#x42;&bogus; & done"), "AB&bogus; & done");
    }

    #[test]
    fn domify_renderer_delegates_to_parse() {
        let node = Domify.render("<section id=\"s\"></section>").unwrap();
        assert_eq!(node.id().as_deref(), Some("s"));
    }
}
