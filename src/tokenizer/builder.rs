//! Accumulator for the token currently being built.
//!
//! The tokenizer owns exactly one of these. A `begin_*` call resets it and
//! activates one accumulator; `finish()` turns the accumulated fields into an
//! immutable [`Token`] and clears the builder again. Misuse (appending with
//! nothing active, finishing twice) indicates a bug in the dispatch logic and
//! trips a `debug_assert!`; release builds degrade to a no-op.

use crate::tokenizer::token::{Attribute, Token};

/// The in-progress token variants. Attributes are buffered outside of this
/// enum until they are committed.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Pending {
    StartTag { name: String, self_closing: bool },
    EndTag { name: String },
    Comment { data: String },
    Doctype {
        name: Option<String>,
        force_quirks: bool,
        public_id: Option<String>,
        system_id: Option<String>,
    },
}

#[derive(Debug, Default)]
pub struct TokenBuilder {
    current: Option<Pending>,
    /// Name of the attribute currently being accumulated
    attr_name: String,
    /// Value of the attribute currently being accumulated
    attr_value: String,
    /// Attributes committed so far, in completion order
    attrs: Vec<Attribute>,
}

impl TokenBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when a token is being accumulated
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_start_tag(&self) -> bool {
        matches!(self.current, Some(Pending::StartTag { .. }))
    }

    pub fn is_end_tag(&self) -> bool {
        matches!(self.current, Some(Pending::EndTag { .. }))
    }

    pub fn begin_start_tag(&mut self) {
        self.reset();
        self.current = Some(Pending::StartTag {
            name: String::new(),
            self_closing: false,
        });
    }

    pub fn begin_end_tag(&mut self) {
        self.reset();
        self.current = Some(Pending::EndTag {
            name: String::new(),
        });
    }

    pub fn begin_comment(&mut self) {
        self.reset();
        self.current = Some(Pending::Comment {
            data: String::new(),
        });
    }

    /// Begins a comment whose data is pre-seeded, used by the bogus-comment
    /// recovery for unrecognized markup declarations.
    pub fn begin_comment_with(&mut self, data: &str) {
        self.reset();
        self.current = Some(Pending::Comment { data: data.into() });
    }

    pub fn begin_doctype(&mut self) {
        self.reset();
        self.current = Some(Pending::Doctype {
            name: None,
            force_quirks: false,
            public_id: None,
            system_id: None,
        });
    }

    /// Appends a character to the tag name or DOCTYPE name
    pub fn append_name(&mut self, c: char) {
        match &mut self.current {
            Some(Pending::StartTag { name, .. }) | Some(Pending::EndTag { name }) => name.push(c),
            Some(Pending::Doctype { name, .. }) => match name {
                Some(name) => name.push(c),
                None => *name = Some(c.to_string()),
            },
            _ => debug_assert!(false, "append_name() without a named token active"),
        }
    }

    /// Replaces the tag name wholesale, used when a buffered end tag name
    /// turns out to match the last start tag.
    pub fn set_name(&mut self, new_name: &str) {
        match &mut self.current {
            Some(Pending::StartTag { name, .. }) | Some(Pending::EndTag { name }) => {
                *name = new_name.into();
            }
            _ => debug_assert!(false, "set_name() without a tag active"),
        }
    }

    /// Appends a character to the comment data
    pub fn append_data(&mut self, c: char) {
        match &mut self.current {
            Some(Pending::Comment { data }) => data.push(c),
            _ => debug_assert!(false, "append_data() without a comment active"),
        }
    }

    pub fn set_self_closing(&mut self) {
        match &mut self.current {
            Some(Pending::StartTag { self_closing, .. }) => *self_closing = true,
            _ => debug_assert!(false, "set_self_closing() without a start tag active"),
        }
    }

    pub fn set_force_quirks(&mut self) {
        match &mut self.current {
            Some(Pending::Doctype { force_quirks, .. }) => *force_quirks = true,
            _ => debug_assert!(false, "set_force_quirks() without a doctype active"),
        }
    }

    /// Sets the public identifier to the empty string, ready for appending
    pub fn set_public_id(&mut self) {
        match &mut self.current {
            Some(Pending::Doctype { public_id, .. }) => *public_id = Some(String::new()),
            _ => debug_assert!(false, "set_public_id() without a doctype active"),
        }
    }

    pub fn append_public_id(&mut self, c: char) {
        match &mut self.current {
            Some(Pending::Doctype {
                public_id: Some(public_id),
                ..
            }) => public_id.push(c),
            _ => debug_assert!(false, "append_public_id() without a public id active"),
        }
    }

    /// Sets the system identifier to the empty string, ready for appending
    pub fn set_system_id(&mut self) {
        match &mut self.current {
            Some(Pending::Doctype { system_id, .. }) => *system_id = Some(String::new()),
            _ => debug_assert!(false, "set_system_id() without a doctype active"),
        }
    }

    pub fn append_system_id(&mut self, c: char) {
        match &mut self.current {
            Some(Pending::Doctype {
                system_id: Some(system_id),
                ..
            }) => system_id.push(c),
            _ => debug_assert!(false, "append_system_id() without a system id active"),
        }
    }

    /// Commits the attribute pair being accumulated and starts a fresh one
    pub fn begin_attribute(&mut self) {
        self.commit_attribute();
    }

    pub fn append_attribute_name(&mut self, c: char) {
        self.attr_name.push(c);
    }

    pub fn append_attribute_value(&mut self, c: char) {
        self.attr_value.push(c);
    }

    pub fn append_attribute_value_str(&mut self, s: &str) {
        self.attr_value.push_str(s);
    }

    /// Returns true when the name being accumulated matches an attribute
    /// that was already committed
    pub fn attribute_name_exists(&self) -> bool {
        self.attrs.iter().any(|attr| attr.name == self.attr_name)
    }

    /// Returns true when any attribute has been committed
    pub fn has_attributes(&self) -> bool {
        !self.attrs.is_empty()
    }

    /// Moves the pending name/value pair into the attribute list. A pair
    /// whose name was already committed is dropped: the first occurrence
    /// wins. A pair with an empty name (nothing accumulated) is a no-op.
    pub fn commit_attribute(&mut self) {
        if !self.attr_name.is_empty() && !self.attribute_name_exists() {
            self.attrs.push(Attribute {
                name: std::mem::take(&mut self.attr_name),
                value: std::mem::take(&mut self.attr_value),
            });
        } else {
            self.attr_name.clear();
            self.attr_value.clear();
        }
    }

    /// Finalizes the accumulated fields into an immutable token and clears
    /// the builder. Returns `None` when nothing was begun, which under
    /// correct driving only happens in recovery paths that may not have a
    /// token in progress.
    pub fn finish(&mut self) -> Option<Token> {
        let token = match self.current.take()? {
            Pending::StartTag { name, self_closing } => Token::StartTag {
                name,
                self_closing,
                attributes: std::mem::take(&mut self.attrs),
            },
            Pending::EndTag { name } => Token::EndTag { name },
            Pending::Comment { data } => Token::Comment { data },
            Pending::Doctype {
                name,
                force_quirks,
                public_id,
                system_id,
            } => Token::Doctype {
                name,
                force_quirks,
                public_id,
                system_id,
            },
        };

        self.reset();
        Some(token)
    }

    /// Drops the in-progress token without emitting it
    pub fn abandon(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.current = None;
        self.attr_name.clear();
        self.attr_value.clear();
        self.attrs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_tag_with_attributes() {
        let mut builder = TokenBuilder::new();
        builder.begin_start_tag();
        builder.append_name('d');
        builder.append_name('i');
        builder.append_name('v');

        builder.begin_attribute();
        for c in "class".chars() {
            builder.append_attribute_name(c);
        }
        builder.append_attribute_value('a');
        builder.commit_attribute();

        assert_eq!(
            builder.finish(),
            Some(Token::StartTag {
                name: "div".into(),
                self_closing: false,
                attributes: vec![Attribute::new("class", "a")],
            })
        );
        assert!(!builder.is_active());
    }

    #[test]
    fn duplicate_attribute_first_wins() {
        let mut builder = TokenBuilder::new();
        builder.begin_start_tag();
        builder.append_name('p');

        for (value, expect_dup) in [('a', false), ('b', true)] {
            builder.begin_attribute();
            for c in "class".chars() {
                builder.append_attribute_name(c);
            }
            assert_eq!(builder.attribute_name_exists(), expect_dup);
            builder.append_attribute_value(value);
        }
        builder.commit_attribute();

        assert_eq!(
            builder.finish(),
            Some(Token::StartTag {
                name: "p".into(),
                self_closing: false,
                attributes: vec![Attribute::new("class", "a")],
            })
        );
    }

    #[test]
    fn end_tag_drops_attributes() {
        let mut builder = TokenBuilder::new();
        builder.begin_end_tag();
        builder.append_name('a');
        builder.begin_attribute();
        builder.append_attribute_name('x');
        builder.commit_attribute();
        assert!(builder.has_attributes());

        assert_eq!(builder.finish(), Some(Token::EndTag { name: "a".into() }));
    }

    #[test]
    fn doctype_accumulation() {
        let mut builder = TokenBuilder::new();
        builder.begin_doctype();
        builder.append_name('h');
        builder.append_name('t');
        builder.append_name('m');
        builder.append_name('l');
        builder.set_public_id();
        builder.append_public_id('p');
        builder.set_force_quirks();

        assert_eq!(
            builder.finish(),
            Some(Token::Doctype {
                name: Some("html".into()),
                force_quirks: true,
                public_id: Some("p".into()),
                system_id: None,
            })
        );
    }

    #[test]
    fn finish_without_begin_is_none() {
        let mut builder = TokenBuilder::new();
        assert_eq!(builder.finish(), None);
    }

    #[test]
    fn begin_resets_previous_accumulation() {
        let mut builder = TokenBuilder::new();
        builder.begin_start_tag();
        builder.append_name('a');
        builder.begin_attribute();
        builder.append_attribute_name('x');
        builder.commit_attribute();

        builder.begin_comment();
        builder.append_data('c');
        assert_eq!(builder.finish(), Some(Token::Comment { data: "c".into() }));
    }

    #[test]
    fn abandon_discards() {
        let mut builder = TokenBuilder::new();
        builder.begin_end_tag();
        builder.append_name('a');
        builder.abandon();
        assert!(!builder.is_active());
        assert_eq!(builder.finish(), None);
    }
}
