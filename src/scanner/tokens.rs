// src/scanner/tokens.rs
// =============================================================================
// Turns raw HTML into a flat stream of tag tokens.
//
// The `scraper` crate (html5ever underneath) does the hard lexical work and
// error recovery. We walk the resulting tree in document order and emit:
// - StartTag when we enter an element
// - EndTag when we leave it
// - SelfClosingTag for void elements (<img>, <source>, <br>...) which never
//   have children or an end tag
// - Text for text nodes
// =============================================================================

use std::fmt;

use scraper::{ElementRef, Html};

/// An element's name and its attributes in the order the parser kept them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl Tag {
    /// Value of the first attribute called `name`, if any.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// One step through the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Entering an element that can have children
    StartTag(Tag),
    /// Leaving an element; carries the tag name
    EndTag(String),
    /// A void element (`<img>`, `<source>`...), never followed by an EndTag
    SelfClosingTag(Tag),
    /// The contents of a text node
    Text(String),
}

// Markup-like rendering, used when tracing the tokens a scan skips
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::StartTag(tag) => write!(f, "<{}>", tag.name),
            Token::SelfClosingTag(tag) => write!(f, "<{}/>", tag.name),
            Token::EndTag(name) => write!(f, "</{}>", name),
            Token::Text(text) => write!(f, "{:?}", text),
        }
    }
}

// Work items for the explicit stack below. Nesting depth is unbounded on real
// pages, so no recursion.
enum Step<'a> {
    Enter(ElementRef<'a>),
    Leave(&'a str),
    Text(&'a str),
}

/// Tokenizes a whole HTML document.
pub fn tokenize(html: &str) -> Vec<Token> {
    let document = Html::parse_document(html);
    let mut tokens = Vec::new();
    let mut stack = vec![Step::Enter(document.root_element())];

    while let Some(step) = stack.pop() {
        match step {
            Step::Leave(name) => tokens.push(Token::EndTag(name.to_string())),
            Step::Text(text) => tokens.push(Token::Text(text.to_string())),
            Step::Enter(element) => {
                let value = element.value();
                let tag = Tag {
                    name: value.name().to_string(),
                    attrs: value
                        .attrs()
                        .map(|(key, val)| (key.to_string(), val.to_string()))
                        .collect(),
                };

                if is_void_element(value.name()) {
                    tokens.push(Token::SelfClosingTag(tag));
                    continue;
                }

                tokens.push(Token::StartTag(tag));
                stack.push(Step::Leave(value.name()));

                // Pushed in reverse so the first child is popped first
                for child in element.children().rev() {
                    if let Some(child_element) = ElementRef::wrap(child) {
                        stack.push(Step::Enter(child_element));
                    } else if let Some(text) = child.value().as_text() {
                        stack.push(Step::Text(&**text));
                    }
                }
            }
        }
    }

    tokens
}

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}
