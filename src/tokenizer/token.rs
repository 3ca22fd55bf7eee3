//! Tokens emitted by the tokenizer.

use std::fmt;

/// The kinds of token the tokenizer can emit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenType {
    Doctype,
    StartTag,
    EndTag,
    Comment,
    Text,
    Eof,
}

/// A single name/value pair on a start tag. Attribute order is the order in
/// which the names completed in the input; a duplicate name never makes it
/// into the list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One unit of lexical output. A token is immutable once emitted; the
/// tokenizer builds the next one in its own accumulator and never touches a
/// token again after handing it to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Doctype {
        name: Option<String>,
        force_quirks: bool,
        public_id: Option<String>,
        system_id: Option<String>,
    },
    StartTag {
        name: String,
        self_closing: bool,
        attributes: Vec<Attribute>,
    },
    EndTag {
        name: String,
    },
    Comment {
        data: String,
    },
    /// A coalesced run of character data
    Text {
        text: String,
    },
    Eof,
}

impl Token {
    pub fn token_type(&self) -> TokenType {
        match self {
            Token::Doctype { .. } => TokenType::Doctype,
            Token::StartTag { .. } => TokenType::StartTag,
            Token::EndTag { .. } => TokenType::EndTag,
            Token::Comment { .. } => TokenType::Comment,
            Token::Text { .. } => TokenType::Text,
            Token::Eof => TokenType::Eof,
        }
    }

    /// Returns true when the token is the end-of-file marker
    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof)
    }

    /// Returns true for a text token that is empty or whitespace-only
    pub fn is_empty_or_white(&self) -> bool {
        if let Token::Text { text } = self {
            text.trim().is_empty()
        } else {
            false
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Doctype {
                name,
                force_quirks,
                public_id,
                system_id,
            } => {
                write!(f, "<!DOCTYPE {}", name.as_deref().unwrap_or(""))?;
                if *force_quirks {
                    write!(f, " FORCE_QUIRKS!")?;
                }
                if let Some(public_id) = public_id {
                    write!(f, " PUBLIC \"{public_id}\"")?;
                }
                if let Some(system_id) = system_id {
                    write!(f, " \"{system_id}\"")?;
                }
                write!(f, ">")
            }
            Token::StartTag {
                name,
                self_closing,
                attributes,
            } => {
                write!(f, "StartTag[<{name}")?;
                for attr in attributes {
                    write!(f, " {}=\"{}\"", attr.name, attr.value)?;
                }
                if *self_closing {
                    write!(f, " /")?;
                }
                write!(f, ">]")
            }
            Token::EndTag { name } => write!(f, "EndTag[</{name}>]"),
            Token::Comment { data } => write!(f, "Comment[<!-- {data} -->]"),
            Token::Text { text } => write!(f, "Text[{text}]"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_type() {
        let token = Token::Doctype {
            name: None,
            force_quirks: false,
            public_id: None,
            system_id: None,
        };
        assert_eq!(token.token_type(), TokenType::Doctype);
        assert_eq!(Token::Eof.token_type(), TokenType::Eof);
    }

    #[test]
    fn is_eof() {
        assert!(Token::Eof.is_eof());
        assert!(!Token::Comment { data: "".into() }.is_eof());
    }

    #[test]
    fn is_empty_or_white() {
        let token = Token::Text { text: "   ".into() };
        assert!(token.is_empty_or_white());

        let token = Token::Text { text: " x ".into() };
        assert!(!token.is_empty_or_white());
    }

    #[test]
    fn display_doctype() {
        let token = Token::Doctype {
            name: Some("html".into()),
            force_quirks: false,
            public_id: None,
            system_id: None,
        };
        assert_eq!(token.to_string(), "<!DOCTYPE html>");

        let token = Token::Doctype {
            name: None,
            force_quirks: true,
            public_id: None,
            system_id: None,
        };
        assert_eq!(token.to_string(), "<!DOCTYPE  FORCE_QUIRKS!>");
    }

    #[test]
    fn display_start_tag() {
        let token = Token::StartTag {
            name: "div".into(),
            self_closing: false,
            attributes: vec![Attribute::new("class", "a")],
        };
        assert_eq!(token.to_string(), "StartTag[<div class=\"a\">]");

        let token = Token::StartTag {
            name: "br".into(),
            self_closing: true,
            attributes: vec![],
        };
        assert_eq!(token.to_string(), "StartTag[<br />]");
    }

    #[test]
    fn display_end_tag_comment_text() {
        assert_eq!(
            Token::EndTag { name: "div".into() }.to_string(),
            "EndTag[</div>]"
        );
        assert_eq!(
            Token::Comment { data: "hi".into() }.to_string(),
            "Comment[<!-- hi -->]"
        );
        assert_eq!(Token::Text { text: "hi".into() }.to_string(), "Text[hi]");
        assert_eq!(Token::Eof.to_string(), "EOF");
    }
}
