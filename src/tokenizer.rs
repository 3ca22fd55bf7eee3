//! The tokenizer state machine.
//!
//! Reads characters from a [`CharStream`] and produces [`Token`]s on demand:
//! each `next_token()` call runs the dispatch loop until at least one token
//! has been queued or the input is exhausted. "Reconsume the current input
//! character in state X" is a pushback on the stream followed by a state
//! change, so the same character is read again under the new state on the
//! next loop iteration.

pub mod builder;
pub mod state;
pub mod token;

mod character_reference;
mod entities;

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::emitter::TokenSink;
use crate::error_logger::{ErrorLogger, ParserError};
use crate::errors::Result;
use crate::stream::Character::{Ch, StreamEnd};
use crate::stream::{CharStream, Location};
use crate::tokenizer::builder::TokenBuilder;
use crate::tokenizer::character_reference::{is_control, is_noncharacter};
use crate::tokenizer::state::State;
use crate::tokenizer::token::Token;

pub const CHAR_NUL: char = '\u{0000}';
pub const CHAR_TAB: char = '\u{0009}';
pub const CHAR_LF: char = '\u{000A}';
pub const CHAR_FF: char = '\u{000C}';
pub const CHAR_SPACE: char = '\u{0020}';
pub const CHAR_REPLACEMENT: char = '\u{FFFD}';

/// The tokenizer. One instance drives one parse; it owns the in-progress
/// token accumulator and the current/return state for its stream and is
/// discarded afterwards.
pub struct Tokenizer<'stream> {
    /// Input character stream
    pub(crate) stream: &'stream mut CharStream,
    /// Current state
    pub state: State,
    /// State to resume in when the character-reference sub-machine
    /// completes; occupied exactly while it is active
    return_state: Option<State>,
    /// Accumulator for the token being built
    pub(crate) builder: TokenBuilder,
    /// Pending run of character data, flushed as one text token before any
    /// other emission
    pub(crate) consumed: String,
    /// Scratch buffer shared by the end-tag-name and character-reference
    /// handling
    pub(crate) temporary_buffer: String,
    /// Tokens emitted but not yet handed to the caller
    token_queue: Vec<Token>,
    /// Name of the last start tag emitted, for end-tag matching in the
    /// RCDATA/RAWTEXT/script-data modes
    last_start_tag: String,
    /// Set once the end-of-file token has been emitted; the machine never
    /// resumes after that
    halted: bool,
    /// Parse errors
    error_logger: Rc<RefCell<ErrorLogger>>,
}

/// Start-up overrides, mostly of interest to tests: the machine can be
/// started in one of the text modes, with a remembered last start tag.
pub struct Options {
    pub initial_state: State,
    pub last_start_tag: String,
}

/// Reads one character, reporting stray control characters and Unicode
/// noncharacters in the input as parse errors (the data itself is kept).
macro_rules! read_char {
    ($self:expr) => {{
        let c = $self.stream.read();
        match c {
            Ch(ch) if is_control(ch as u32) => {
                $self.parse_error(ParserError::ControlCharacterInInputStream);
            }
            Ch(ch) if is_noncharacter(ch as u32) => {
                $self.parse_error(ParserError::NoncharacterInInputStream);
            }
            _ => {}
        }
        c
    }};
}

impl<'stream> Tokenizer<'stream> {
    pub fn new(
        stream: &'stream mut CharStream,
        opts: Option<Options>,
        error_logger: Rc<RefCell<ErrorLogger>>,
    ) -> Self {
        Tokenizer {
            stream,
            state: opts.as_ref().map_or(State::Data, |o| o.initial_state),
            return_state: None,
            builder: TokenBuilder::new(),
            consumed: String::new(),
            temporary_buffer: String::new(),
            token_queue: vec![],
            last_start_tag: opts.map_or(String::new(), |o| o.last_start_tag),
            halted: false,
            error_logger,
        }
    }

    /// Returns the next token, or `Token::Eof` once the input is exhausted.
    /// Calls after the end-of-file token keep returning `Token::Eof` without
    /// touching the stream.
    pub fn next_token(&mut self) -> Result<Token> {
        self.dispatch()?;

        if self.token_queue.is_empty() {
            return Ok(Token::Eof);
        }

        Ok(self.token_queue.remove(0))
    }

    /// Runs the whole parse, feeding every token (including the final
    /// end-of-file token) to the given sink in emission order.
    pub fn stream_to<S: TokenSink>(&mut self, sink: &mut S) -> Result<()> {
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            sink.accept(token);
            if done {
                return Ok(());
            }
        }
    }

    pub fn get_error_logger(&self) -> Ref<'_, ErrorLogger> {
        self.error_logger.borrow()
    }

    /// Position of the most recently read character
    pub fn get_position(&self) -> Location {
        self.stream.last_location()
    }

    /// Consumes from the stream until at least one token is queued or the
    /// machine has halted.
    fn dispatch(&mut self) -> Result<()> {
        loop {
            // A token is ready; hand control back so the machine resumes at
            // the next character on the next call.
            if !self.token_queue.is_empty() || self.halted {
                return Ok(());
            }

            match self.state {
                State::Data => {
                    let c = read_char!(self);
                    match c {
                        Ch('&') => self.enter_character_reference(State::Data),
                        Ch('<') => self.state = State::TagOpen,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_NUL);
                        }
                        StreamEnd => self.enqueue_eof(),
                        Ch(c) => self.consume(c),
                    }
                }
                State::RcData => {
                    let c = read_char!(self);
                    match c {
                        Ch('&') => self.enter_character_reference(State::RcData),
                        Ch('<') => self.state = State::RcDataLessThanSign,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        StreamEnd => self.enqueue_eof(),
                        Ch(c) => self.consume(c),
                    }
                }
                State::RawText => {
                    let c = read_char!(self);
                    match c {
                        Ch('<') => self.state = State::RawTextLessThanSign,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        StreamEnd => self.enqueue_eof(),
                        Ch(c) => self.consume(c),
                    }
                }
                State::ScriptData => {
                    let c = read_char!(self);
                    match c {
                        Ch('<') => self.state = State::ScriptDataLessThanSign,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        StreamEnd => self.enqueue_eof(),
                        Ch(c) => self.consume(c),
                    }
                }
                State::Plaintext => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        StreamEnd => self.enqueue_eof(),
                        Ch(c) => self.consume(c),
                    }
                }
                State::TagOpen => {
                    let c = read_char!(self);
                    match c {
                        Ch('!') => self.state = State::MarkupDeclarationOpen,
                        Ch('/') => self.state = State::EndTagOpen,
                        Ch(c) if c.is_ascii_alphabetic() => {
                            self.builder.begin_start_tag();
                            self.stream.reconsume();
                            self.state = State::TagName;
                        }
                        Ch('?') => {
                            self.parse_error(ParserError::UnexpectedQuestionMarkInsteadOfTagName);
                            self.builder.begin_comment();
                            self.stream.reconsume();
                            self.state = State::BogusComment;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofBeforeTagName);
                            self.consume('<');
                            self.enqueue_eof();
                        }
                        _ => {
                            self.parse_error(ParserError::InvalidFirstCharacterOfTagName);
                            self.consume('<');
                            self.stream.reconsume();
                            self.state = State::Data;
                        }
                    }
                }
                State::EndTagOpen => {
                    let c = read_char!(self);
                    match c {
                        Ch(c) if c.is_ascii_alphabetic() => {
                            self.builder.begin_end_tag();
                            self.stream.reconsume();
                            self.state = State::TagName;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::MissingEndTagName);
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofBeforeTagName);
                            self.consume('<');
                            self.consume('/');
                            self.enqueue_eof();
                        }
                        _ => {
                            self.parse_error(ParserError::InvalidFirstCharacterOfTagName);
                            self.builder.begin_comment();
                            self.stream.reconsume();
                            self.state = State::BogusComment;
                        }
                    }
                }
                State::TagName => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            self.state = State::BeforeAttributeName;
                        }
                        Ch('/') => self.state = State::SelfClosingStartTag,
                        Ch('>') => {
                            self.emit_current_tag();
                            self.state = State::Data;
                        }
                        Ch(c @ 'A'..='Z') => self.builder.append_name(c.to_ascii_lowercase()),
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.append_name(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.builder.abandon();
                            self.enqueue_eof();
                        }
                        Ch(c) => self.builder.append_name(c),
                    }
                }
                State::RcDataLessThanSign => {
                    let c = read_char!(self);
                    match c {
                        Ch('/') => {
                            self.temporary_buffer.clear();
                            self.state = State::RcDataEndTagOpen;
                        }
                        _ => {
                            self.consume('<');
                            self.stream.reconsume();
                            self.state = State::RcData;
                        }
                    }
                }
                State::RcDataEndTagOpen => {
                    let c = read_char!(self);
                    match c {
                        Ch(c) if c.is_ascii_alphabetic() => {
                            self.builder.begin_end_tag();
                            self.stream.reconsume();
                            self.state = State::RcDataEndTagName;
                        }
                        _ => {
                            self.consume('<');
                            self.consume('/');
                            self.stream.reconsume();
                            self.state = State::RcData;
                        }
                    }
                }
                State::RcDataEndTagName => {
                    self.end_tag_name_step(State::RcData);
                }
                State::RawTextLessThanSign => {
                    let c = read_char!(self);
                    match c {
                        Ch('/') => {
                            self.temporary_buffer.clear();
                            self.state = State::RawTextEndTagOpen;
                        }
                        _ => {
                            self.consume('<');
                            self.stream.reconsume();
                            self.state = State::RawText;
                        }
                    }
                }
                State::RawTextEndTagOpen => {
                    let c = read_char!(self);
                    match c {
                        Ch(c) if c.is_ascii_alphabetic() => {
                            self.builder.begin_end_tag();
                            self.stream.reconsume();
                            self.state = State::RawTextEndTagName;
                        }
                        _ => {
                            self.consume('<');
                            self.consume('/');
                            self.stream.reconsume();
                            self.state = State::RawText;
                        }
                    }
                }
                State::RawTextEndTagName => {
                    self.end_tag_name_step(State::RawText);
                }
                State::ScriptDataLessThanSign => {
                    let c = read_char!(self);
                    match c {
                        Ch('/') => {
                            self.temporary_buffer.clear();
                            self.state = State::ScriptDataEndTagOpen;
                        }
                        Ch('!') => {
                            self.consume('<');
                            self.consume('!');
                            self.state = State::ScriptDataEscapeStart;
                        }
                        _ => {
                            self.consume('<');
                            self.stream.reconsume();
                            self.state = State::ScriptData;
                        }
                    }
                }
                State::ScriptDataEndTagOpen => {
                    let c = read_char!(self);
                    match c {
                        Ch(c) if c.is_ascii_alphabetic() => {
                            self.builder.begin_end_tag();
                            self.stream.reconsume();
                            self.state = State::ScriptDataEndTagName;
                        }
                        _ => {
                            self.consume('<');
                            self.consume('/');
                            self.stream.reconsume();
                            self.state = State::ScriptData;
                        }
                    }
                }
                State::ScriptDataEndTagName => {
                    self.end_tag_name_step(State::ScriptData);
                }
                State::ScriptDataEscapeStart => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataEscapeStartDash;
                        }
                        _ => {
                            self.stream.reconsume();
                            self.state = State::ScriptData;
                        }
                    }
                }
                State::ScriptDataEscapeStartDash => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataEscapedDashDash;
                        }
                        _ => {
                            self.stream.reconsume();
                            self.state = State::ScriptData;
                        }
                    }
                }
                State::ScriptDataEscaped => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataEscapedDash;
                        }
                        Ch('<') => self.state = State::ScriptDataEscapedLessThanSign,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            self.enqueue_eof();
                        }
                        Ch(c) => self.consume(c),
                    }
                }
                State::ScriptDataEscapedDash => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataEscapedDashDash;
                        }
                        Ch('<') => self.state = State::ScriptDataEscapedLessThanSign,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                            self.state = State::ScriptDataEscaped;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            self.enqueue_eof();
                        }
                        Ch(c) => {
                            self.consume(c);
                            self.state = State::ScriptDataEscaped;
                        }
                    }
                }
                State::ScriptDataEscapedDashDash => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => self.consume('-'),
                        Ch('<') => self.state = State::ScriptDataEscapedLessThanSign,
                        Ch('>') => {
                            self.consume('>');
                            self.state = State::ScriptData;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                            self.state = State::ScriptDataEscaped;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            self.enqueue_eof();
                        }
                        Ch(c) => {
                            self.consume(c);
                            self.state = State::ScriptDataEscaped;
                        }
                    }
                }
                State::ScriptDataEscapedLessThanSign => {
                    let c = read_char!(self);
                    match c {
                        Ch('/') => {
                            self.temporary_buffer.clear();
                            self.state = State::ScriptDataEscapedEndTagOpen;
                        }
                        Ch(c) if c.is_ascii_alphabetic() => {
                            self.temporary_buffer.clear();
                            self.consume('<');
                            self.stream.reconsume();
                            self.state = State::ScriptDataDoubleEscapeStart;
                        }
                        _ => {
                            self.consume('<');
                            self.stream.reconsume();
                            self.state = State::ScriptDataEscaped;
                        }
                    }
                }
                State::ScriptDataEscapedEndTagOpen => {
                    let c = read_char!(self);
                    match c {
                        Ch(c) if c.is_ascii_alphabetic() => {
                            self.builder.begin_end_tag();
                            self.stream.reconsume();
                            self.state = State::ScriptDataEscapedEndTagName;
                        }
                        _ => {
                            self.consume('<');
                            self.consume('/');
                            self.stream.reconsume();
                            self.state = State::ScriptDataEscaped;
                        }
                    }
                }
                State::ScriptDataEscapedEndTagName => {
                    self.end_tag_name_step(State::ScriptDataEscaped);
                }
                State::ScriptDataDoubleEscapeStart => {
                    let c = read_char!(self);
                    match c {
                        Ch(c @ (CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE | '/' | '>')) => {
                            if self.temporary_buffer == "script" {
                                self.state = State::ScriptDataDoubleEscaped;
                            } else {
                                self.state = State::ScriptDataEscaped;
                            }
                            self.consume(c);
                        }
                        Ch(c @ 'A'..='Z') => {
                            self.temporary_buffer.push(c.to_ascii_lowercase());
                            self.consume(c);
                        }
                        Ch(c @ 'a'..='z') => {
                            self.temporary_buffer.push(c);
                            self.consume(c);
                        }
                        _ => {
                            self.stream.reconsume();
                            self.state = State::ScriptDataEscaped;
                        }
                    }
                }
                State::ScriptDataDoubleEscaped => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataDoubleEscapedDash;
                        }
                        Ch('<') => {
                            self.consume('<');
                            self.state = State::ScriptDataDoubleEscapedLessThanSign;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            self.enqueue_eof();
                        }
                        Ch(c) => self.consume(c),
                    }
                }
                State::ScriptDataDoubleEscapedDash => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataDoubleEscapedDashDash;
                        }
                        Ch('<') => {
                            self.consume('<');
                            self.state = State::ScriptDataDoubleEscapedLessThanSign;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                            self.state = State::ScriptDataDoubleEscaped;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            self.enqueue_eof();
                        }
                        Ch(c) => {
                            self.consume(c);
                            self.state = State::ScriptDataDoubleEscaped;
                        }
                    }
                }
                State::ScriptDataDoubleEscapedDashDash => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => self.consume('-'),
                        Ch('<') => {
                            self.consume('<');
                            self.state = State::ScriptDataDoubleEscapedLessThanSign;
                        }
                        Ch('>') => {
                            self.consume('>');
                            self.state = State::ScriptData;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                            self.state = State::ScriptDataDoubleEscaped;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            self.enqueue_eof();
                        }
                        Ch(c) => {
                            self.consume(c);
                            self.state = State::ScriptDataDoubleEscaped;
                        }
                    }
                }
                State::ScriptDataDoubleEscapedLessThanSign => {
                    let c = read_char!(self);
                    match c {
                        Ch('/') => {
                            self.temporary_buffer.clear();
                            self.consume('/');
                            self.state = State::ScriptDataDoubleEscapeEnd;
                        }
                        _ => {
                            self.stream.reconsume();
                            self.state = State::ScriptDataDoubleEscaped;
                        }
                    }
                }
                State::ScriptDataDoubleEscapeEnd => {
                    let c = read_char!(self);
                    match c {
                        Ch(c @ (CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE | '/' | '>')) => {
                            if self.temporary_buffer == "script" {
                                self.state = State::ScriptDataEscaped;
                            } else {
                                self.state = State::ScriptDataDoubleEscaped;
                            }
                            self.consume(c);
                        }
                        Ch(c @ 'A'..='Z') => {
                            self.temporary_buffer.push(c.to_ascii_lowercase());
                            self.consume(c);
                        }
                        Ch(c @ 'a'..='z') => {
                            self.temporary_buffer.push(c);
                            self.consume(c);
                        }
                        _ => {
                            self.stream.reconsume();
                            self.state = State::ScriptDataDoubleEscaped;
                        }
                    }
                }
                State::BeforeAttributeName => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            // Ignore
                        }
                        Ch('/') | Ch('>') | StreamEnd => {
                            self.stream.reconsume();
                            self.state = State::AfterAttributeName;
                        }
                        Ch('=') => {
                            self.parse_error(ParserError::UnexpectedEqualsSignBeforeAttributeName);
                            self.builder.begin_attribute();
                            self.builder.append_attribute_name('=');
                            self.state = State::AttributeName;
                        }
                        _ => {
                            self.builder.begin_attribute();
                            self.stream.reconsume();
                            self.state = State::AttributeName;
                        }
                    }
                }
                State::AttributeName => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) | Ch('/')
                        | Ch('>') | StreamEnd => {
                            if self.builder.attribute_name_exists() {
                                self.parse_error(ParserError::DuplicateAttribute);
                            }
                            self.stream.reconsume();
                            self.state = State::AfterAttributeName;
                        }
                        Ch('=') => {
                            if self.builder.attribute_name_exists() {
                                self.parse_error(ParserError::DuplicateAttribute);
                            }
                            self.state = State::BeforeAttributeValue;
                        }
                        Ch(c @ 'A'..='Z') => {
                            self.builder.append_attribute_name(c.to_ascii_lowercase());
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.append_attribute_name(CHAR_REPLACEMENT);
                        }
                        Ch(c @ ('"' | '\'' | '<')) => {
                            self.parse_error(ParserError::UnexpectedCharacterInAttributeName);
                            self.builder.append_attribute_name(c);
                        }
                        Ch(c) => self.builder.append_attribute_name(c),
                    }
                }
                State::AfterAttributeName => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            // Ignore
                        }
                        Ch('/') => self.state = State::SelfClosingStartTag,
                        Ch('=') => self.state = State::BeforeAttributeValue,
                        Ch('>') => {
                            self.emit_current_tag();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.builder.abandon();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.builder.begin_attribute();
                            self.stream.reconsume();
                            self.state = State::AttributeName;
                        }
                    }
                }
                State::BeforeAttributeValue => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            // Ignore
                        }
                        Ch('"') => self.state = State::AttributeValueDoubleQuoted,
                        Ch('\'') => self.state = State::AttributeValueSingleQuoted,
                        Ch('>') => {
                            self.parse_error(ParserError::MissingAttributeValue);
                            self.emit_current_tag();
                            self.state = State::Data;
                        }
                        _ => {
                            self.stream.reconsume();
                            self.state = State::AttributeValueUnquoted;
                        }
                    }
                }
                State::AttributeValueDoubleQuoted => {
                    let c = read_char!(self);
                    match c {
                        Ch('"') => self.state = State::AfterAttributeValueQuoted,
                        Ch('&') => {
                            self.enter_character_reference(State::AttributeValueDoubleQuoted);
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.append_attribute_value(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.builder.abandon();
                            self.enqueue_eof();
                        }
                        Ch(c) => self.builder.append_attribute_value(c),
                    }
                }
                State::AttributeValueSingleQuoted => {
                    let c = read_char!(self);
                    match c {
                        Ch('\'') => self.state = State::AfterAttributeValueQuoted,
                        Ch('&') => {
                            self.enter_character_reference(State::AttributeValueSingleQuoted);
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.append_attribute_value(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.builder.abandon();
                            self.enqueue_eof();
                        }
                        Ch(c) => self.builder.append_attribute_value(c),
                    }
                }
                State::AttributeValueUnquoted => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            self.state = State::BeforeAttributeName;
                        }
                        Ch('&') => {
                            self.enter_character_reference(State::AttributeValueUnquoted);
                        }
                        Ch('>') => {
                            self.emit_current_tag();
                            self.state = State::Data;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.append_attribute_value(CHAR_REPLACEMENT);
                        }
                        Ch(c @ ('"' | '\'' | '<' | '=' | '`')) => {
                            self.parse_error(
                                ParserError::UnexpectedCharacterInUnquotedAttributeValue,
                            );
                            self.builder.append_attribute_value(c);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.builder.abandon();
                            self.enqueue_eof();
                        }
                        Ch(c) => self.builder.append_attribute_value(c),
                    }
                }
                State::AfterAttributeValueQuoted => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            self.state = State::BeforeAttributeName;
                        }
                        Ch('/') => self.state = State::SelfClosingStartTag,
                        Ch('>') => {
                            self.emit_current_tag();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.builder.abandon();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.parse_error(ParserError::MissingWhitespaceBetweenAttributes);
                            self.stream.reconsume();
                            self.state = State::BeforeAttributeName;
                        }
                    }
                }
                State::SelfClosingStartTag => {
                    let c = read_char!(self);
                    match c {
                        Ch('>') => {
                            if self.builder.is_end_tag() {
                                self.parse_error(ParserError::EndTagWithTrailingSolidus);
                            } else {
                                self.builder.set_self_closing();
                            }
                            self.emit_current_tag();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInTag);
                            self.builder.abandon();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.parse_error(ParserError::UnexpectedSolidusInTag);
                            self.stream.reconsume();
                            self.state = State::BeforeAttributeName;
                        }
                    }
                }
                State::BogusComment => {
                    let c = read_char!(self);
                    match c {
                        Ch('>') => {
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.append_data(CHAR_REPLACEMENT);
                        }
                        Ch(c) => self.builder.append_data(c),
                    }
                }
                State::MarkupDeclarationOpen => {
                    if self.stream.peek_slice(2) == "--" {
                        self.stream.advance(2);
                        self.builder.begin_comment();
                        self.state = State::CommentStart;
                        continue;
                    }

                    if self.stream.peek_slice(7).eq_ignore_ascii_case("doctype") {
                        self.stream.advance(7);
                        self.state = State::Doctype;
                        continue;
                    }

                    if self.stream.peek_slice(7) == "[CDATA[" {
                        self.stream.advance(7);

                        // With tree construction out of scope there is never
                        // an adjusted current node outside the HTML
                        // namespace, so this is always the in-content error
                        // path.
                        self.parse_error(ParserError::CdataInHtmlContent);
                        self.builder.begin_comment_with("[CDATA[");
                        self.state = State::BogusComment;
                        continue;
                    }

                    self.parse_error(ParserError::IncorrectlyOpenedComment);
                    self.builder.begin_comment();
                    self.state = State::BogusComment;
                }
                State::CommentStart => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => self.state = State::CommentStartDash,
                        Ch('>') => {
                            self.parse_error(ParserError::AbruptClosingOfEmptyComment);
                            self.emit_current();
                            self.state = State::Data;
                        }
                        _ => {
                            self.stream.reconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::CommentStartDash => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => self.state = State::CommentEnd,
                        Ch('>') => {
                            self.parse_error(ParserError::AbruptClosingOfEmptyComment);
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInComment);
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.builder.append_data('-');
                            self.stream.reconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::Comment => {
                    let c = read_char!(self);
                    match c {
                        Ch('<') => {
                            self.builder.append_data('<');
                            self.state = State::CommentLessThanSign;
                        }
                        Ch('-') => self.state = State::CommentEndDash,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.append_data(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInComment);
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        Ch(c) => self.builder.append_data(c),
                    }
                }
                State::CommentLessThanSign => {
                    let c = read_char!(self);
                    match c {
                        Ch('!') => {
                            self.builder.append_data('!');
                            self.state = State::CommentLessThanSignBang;
                        }
                        Ch('<') => self.builder.append_data('<'),
                        _ => {
                            self.stream.reconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::CommentLessThanSignBang => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => self.state = State::CommentLessThanSignBangDash,
                        _ => {
                            self.stream.reconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::CommentLessThanSignBangDash => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => self.state = State::CommentLessThanSignBangDashDash,
                        _ => {
                            self.stream.reconsume();
                            self.state = State::CommentEndDash;
                        }
                    }
                }
                State::CommentLessThanSignBangDashDash => {
                    let c = read_char!(self);
                    match c {
                        Ch('>') | StreamEnd => {
                            self.stream.reconsume();
                            self.state = State::CommentEnd;
                        }
                        _ => {
                            self.parse_error(ParserError::NestedComment);
                            self.stream.reconsume();
                            self.state = State::CommentEnd;
                        }
                    }
                }
                State::CommentEndDash => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => self.state = State::CommentEnd,
                        StreamEnd => {
                            self.parse_error(ParserError::EofInComment);
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.builder.append_data('-');
                            self.stream.reconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::CommentEnd => {
                    let c = read_char!(self);
                    match c {
                        Ch('>') => {
                            self.emit_current();
                            self.state = State::Data;
                        }
                        Ch('!') => self.state = State::CommentEndBang,
                        Ch('-') => self.builder.append_data('-'),
                        StreamEnd => {
                            self.parse_error(ParserError::EofInComment);
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.builder.append_data('-');
                            self.builder.append_data('-');
                            self.stream.reconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::CommentEndBang => {
                    let c = read_char!(self);
                    match c {
                        Ch('-') => {
                            self.builder.append_data('-');
                            self.builder.append_data('-');
                            self.builder.append_data('!');
                            self.state = State::CommentEndDash;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::IncorrectlyClosedComment);
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInComment);
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.builder.append_data('-');
                            self.builder.append_data('-');
                            self.builder.append_data('!');
                            self.stream.reconsume();
                            self.state = State::Comment;
                        }
                    }
                }
                State::Doctype => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            self.state = State::BeforeDoctypeName;
                        }
                        Ch('>') => {
                            self.stream.reconsume();
                            self.state = State::BeforeDoctypeName;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.emit(Token::Doctype {
                                name: None,
                                force_quirks: true,
                                public_id: None,
                                system_id: None,
                            });
                            self.enqueue_eof();
                        }
                        _ => {
                            self.parse_error(ParserError::MissingWhitespaceBeforeDoctypeName);
                            self.stream.reconsume();
                            self.state = State::BeforeDoctypeName;
                        }
                    }
                }
                State::BeforeDoctypeName => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            // Ignore
                        }
                        Ch(c @ 'A'..='Z') => {
                            self.builder.begin_doctype();
                            self.builder.append_name(c.to_ascii_lowercase());
                            self.state = State::DoctypeName;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.begin_doctype();
                            self.builder.append_name(CHAR_REPLACEMENT);
                            self.state = State::DoctypeName;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::MissingDoctypeName);
                            self.emit(Token::Doctype {
                                name: None,
                                force_quirks: true,
                                public_id: None,
                                system_id: None,
                            });
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.emit(Token::Doctype {
                                name: None,
                                force_quirks: true,
                                public_id: None,
                                system_id: None,
                            });
                            self.enqueue_eof();
                        }
                        Ch(c) => {
                            self.builder.begin_doctype();
                            self.builder.append_name(c);
                            self.state = State::DoctypeName;
                        }
                    }
                }
                State::DoctypeName => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            self.state = State::AfterDoctypeName;
                        }
                        Ch('>') => {
                            self.emit_current();
                            self.state = State::Data;
                        }
                        Ch(c @ 'A'..='Z') => self.builder.append_name(c.to_ascii_lowercase()),
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.append_name(CHAR_REPLACEMENT);
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        Ch(c) => self.builder.append_name(c),
                    }
                }
                State::AfterDoctypeName => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            // Ignore
                        }
                        Ch('>') => {
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.stream.reconsume();
                            if self.stream.peek_slice(6).eq_ignore_ascii_case("public") {
                                self.stream.advance(6);
                                self.state = State::AfterDoctypePublicKeyword;
                            } else if self.stream.peek_slice(6).eq_ignore_ascii_case("system") {
                                self.stream.advance(6);
                                self.state = State::AfterDoctypeSystemKeyword;
                            } else {
                                self.parse_error(
                                    ParserError::InvalidCharacterSequenceAfterDoctypeName,
                                );
                                self.builder.set_force_quirks();
                                self.state = State::BogusDoctype;
                            }
                        }
                    }
                }
                State::AfterDoctypePublicKeyword => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            self.state = State::BeforeDoctypePublicIdentifier;
                        }
                        Ch('"') => {
                            self.parse_error(
                                ParserError::MissingWhitespaceAfterDoctypePublicKeyword,
                            );
                            self.builder.set_public_id();
                            self.state = State::DoctypePublicIdentifierDoubleQuoted;
                        }
                        Ch('\'') => {
                            self.parse_error(
                                ParserError::MissingWhitespaceAfterDoctypePublicKeyword,
                            );
                            self.builder.set_public_id();
                            self.state = State::DoctypePublicIdentifierSingleQuoted;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::MissingDoctypePublicIdentifier);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.parse_error(
                                ParserError::MissingQuoteBeforeDoctypePublicIdentifier,
                            );
                            self.builder.set_force_quirks();
                            self.stream.reconsume();
                            self.state = State::BogusDoctype;
                        }
                    }
                }
                State::BeforeDoctypePublicIdentifier => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            // Ignore
                        }
                        Ch('"') => {
                            self.builder.set_public_id();
                            self.state = State::DoctypePublicIdentifierDoubleQuoted;
                        }
                        Ch('\'') => {
                            self.builder.set_public_id();
                            self.state = State::DoctypePublicIdentifierSingleQuoted;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::MissingDoctypePublicIdentifier);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.parse_error(
                                ParserError::MissingQuoteBeforeDoctypePublicIdentifier,
                            );
                            self.builder.set_force_quirks();
                            self.stream.reconsume();
                            self.state = State::BogusDoctype;
                        }
                    }
                }
                State::DoctypePublicIdentifierDoubleQuoted => {
                    let c = read_char!(self);
                    match c {
                        Ch('"') => self.state = State::AfterDoctypePublicIdentifier,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.append_public_id(CHAR_REPLACEMENT);
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::AbruptDoctypePublicIdentifier);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        Ch(c) => self.builder.append_public_id(c),
                    }
                }
                State::DoctypePublicIdentifierSingleQuoted => {
                    let c = read_char!(self);
                    match c {
                        Ch('\'') => self.state = State::AfterDoctypePublicIdentifier,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.append_public_id(CHAR_REPLACEMENT);
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::AbruptDoctypePublicIdentifier);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        Ch(c) => self.builder.append_public_id(c),
                    }
                }
                State::AfterDoctypePublicIdentifier => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            self.state = State::BetweenDoctypePublicAndSystemIdentifiers;
                        }
                        Ch('>') => {
                            self.emit_current();
                            self.state = State::Data;
                        }
                        Ch('"') => {
                            self.parse_error(
                                ParserError::MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers,
                            );
                            self.builder.set_system_id();
                            self.state = State::DoctypeSystemIdentifierDoubleQuoted;
                        }
                        Ch('\'') => {
                            self.parse_error(
                                ParserError::MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers,
                            );
                            self.builder.set_system_id();
                            self.state = State::DoctypeSystemIdentifierSingleQuoted;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.parse_error(
                                ParserError::MissingQuoteBeforeDoctypeSystemIdentifier,
                            );
                            self.builder.set_force_quirks();
                            self.stream.reconsume();
                            self.state = State::BogusDoctype;
                        }
                    }
                }
                State::BetweenDoctypePublicAndSystemIdentifiers => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            // Ignore
                        }
                        Ch('>') => {
                            self.emit_current();
                            self.state = State::Data;
                        }
                        Ch('"') => {
                            self.builder.set_system_id();
                            self.state = State::DoctypeSystemIdentifierDoubleQuoted;
                        }
                        Ch('\'') => {
                            self.builder.set_system_id();
                            self.state = State::DoctypeSystemIdentifierSingleQuoted;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.parse_error(
                                ParserError::MissingQuoteBeforeDoctypeSystemIdentifier,
                            );
                            self.builder.set_force_quirks();
                            self.stream.reconsume();
                            self.state = State::BogusDoctype;
                        }
                    }
                }
                State::AfterDoctypeSystemKeyword => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            self.state = State::BeforeDoctypeSystemIdentifier;
                        }
                        Ch('"') => {
                            self.parse_error(
                                ParserError::MissingWhitespaceAfterDoctypeSystemKeyword,
                            );
                            self.builder.set_system_id();
                            self.state = State::DoctypeSystemIdentifierDoubleQuoted;
                        }
                        Ch('\'') => {
                            self.parse_error(
                                ParserError::MissingWhitespaceAfterDoctypeSystemKeyword,
                            );
                            self.builder.set_system_id();
                            self.state = State::DoctypeSystemIdentifierSingleQuoted;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::MissingDoctypeSystemIdentifier);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.parse_error(
                                ParserError::MissingQuoteBeforeDoctypeSystemIdentifier,
                            );
                            self.builder.set_force_quirks();
                            self.stream.reconsume();
                            self.state = State::BogusDoctype;
                        }
                    }
                }
                State::BeforeDoctypeSystemIdentifier => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            // Ignore
                        }
                        Ch('"') => {
                            self.builder.set_system_id();
                            self.state = State::DoctypeSystemIdentifierDoubleQuoted;
                        }
                        Ch('\'') => {
                            self.builder.set_system_id();
                            self.state = State::DoctypeSystemIdentifierSingleQuoted;
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::MissingDoctypeSystemIdentifier);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.parse_error(
                                ParserError::MissingQuoteBeforeDoctypeSystemIdentifier,
                            );
                            self.builder.set_force_quirks();
                            self.stream.reconsume();
                            self.state = State::BogusDoctype;
                        }
                    }
                }
                State::DoctypeSystemIdentifierDoubleQuoted => {
                    let c = read_char!(self);
                    match c {
                        Ch('"') => self.state = State::AfterDoctypeSystemIdentifier,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.append_system_id(CHAR_REPLACEMENT);
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::AbruptDoctypeSystemIdentifier);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        Ch(c) => self.builder.append_system_id(c),
                    }
                }
                State::DoctypeSystemIdentifierSingleQuoted => {
                    let c = read_char!(self);
                    match c {
                        Ch('\'') => self.state = State::AfterDoctypeSystemIdentifier,
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.builder.append_system_id(CHAR_REPLACEMENT);
                        }
                        Ch('>') => {
                            self.parse_error(ParserError::AbruptDoctypeSystemIdentifier);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        Ch(c) => self.builder.append_system_id(c),
                    }
                }
                State::AfterDoctypeSystemIdentifier => {
                    let c = read_char!(self);
                    match c {
                        Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                            // Ignore
                        }
                        Ch('>') => {
                            self.emit_current();
                            self.state = State::Data;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.builder.set_force_quirks();
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            self.parse_error(
                                ParserError::UnexpectedCharacterAfterDoctypeSystemIdentifier,
                            );
                            self.stream.reconsume();
                            self.state = State::BogusDoctype;
                        }
                    }
                }
                State::BogusDoctype => {
                    let c = read_char!(self);
                    match c {
                        Ch('>') => {
                            self.emit_current();
                            self.state = State::Data;
                        }
                        Ch(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                        }
                        StreamEnd => {
                            self.emit_current();
                            self.enqueue_eof();
                        }
                        _ => {
                            // Discard
                        }
                    }
                }
                State::CdataSection => {
                    let c = read_char!(self);
                    match c {
                        Ch(']') => self.state = State::CdataSectionBracket,
                        StreamEnd => {
                            self.parse_error(ParserError::EofInCdata);
                            self.enqueue_eof();
                        }
                        Ch(c) => self.consume(c),
                    }
                }
                State::CdataSectionBracket => {
                    let c = read_char!(self);
                    match c {
                        Ch(']') => self.state = State::CdataSectionEnd,
                        _ => {
                            self.consume(']');
                            self.stream.reconsume();
                            self.state = State::CdataSection;
                        }
                    }
                }
                State::CdataSectionEnd => {
                    let c = read_char!(self);
                    match c {
                        Ch(']') => self.consume(']'),
                        Ch('>') => self.state = State::Data,
                        _ => {
                            self.consume(']');
                            self.consume(']');
                            self.stream.reconsume();
                            self.state = State::CdataSection;
                        }
                    }
                }
                State::CharacterReference => {
                    debug_assert!(
                        self.return_state.is_some(),
                        "character reference entered without a return state"
                    );
                    let return_state = self.return_state.take().unwrap_or(State::Data);
                    self.consume_character_reference(return_state.is_attribute_value());
                    self.state = return_state;
                }
            }
        }
    }

    /// One step of the shared RCDATA/RAWTEXT/script-data end tag name
    /// handling: the candidate name is buffered, and only an end tag
    /// matching the last start tag closes the text mode. Anything else
    /// replays the buffered text literally.
    fn end_tag_name_step(&mut self, text_state: State) {
        let c = read_char!(self);
        let mut anything_else = false;

        match c {
            Ch(CHAR_TAB) | Ch(CHAR_LF) | Ch(CHAR_FF) | Ch(CHAR_SPACE) => {
                if self.is_appropriate_end_tag() {
                    self.state = State::BeforeAttributeName;
                } else {
                    anything_else = true;
                }
            }
            Ch('/') => {
                if self.is_appropriate_end_tag() {
                    self.state = State::SelfClosingStartTag;
                } else {
                    anything_else = true;
                }
            }
            Ch('>') => {
                if self.is_appropriate_end_tag() {
                    let name = std::mem::take(&mut self.temporary_buffer);
                    self.builder.set_name(&name);
                    self.last_start_tag.clear();
                    self.emit_current_tag();
                    self.state = State::Data;
                } else {
                    anything_else = true;
                }
            }
            Ch(c @ 'A'..='Z') => self.temporary_buffer.push(c.to_ascii_lowercase()),
            Ch(c @ 'a'..='z') => self.temporary_buffer.push(c),
            _ => anything_else = true,
        }

        if anything_else {
            self.revert_end_tag(text_state);
        }
    }

    /// Gives up on a buffered end tag candidate: the pending token is
    /// abandoned and the consumed text replayed literally.
    fn revert_end_tag(&mut self, text_state: State) {
        self.builder.abandon();
        let buffered = std::mem::take(&mut self.temporary_buffer);
        self.consume_str("</");
        self.consume_str(&buffered);
        self.stream.reconsume();
        self.state = text_state;
    }

    fn is_appropriate_end_tag(&self) -> bool {
        !self.last_start_tag.is_empty() && self.last_start_tag == self.temporary_buffer
    }

    /// Saves the current state and hands the next characters to the
    /// character-reference sub-machine
    fn enter_character_reference(&mut self, return_state: State) {
        self.return_state = Some(return_state);
        self.state = State::CharacterReference;
    }

    /// Appends the character to the pending text run
    pub(crate) fn consume(&mut self, c: char) {
        self.consumed.push(c);
    }

    pub(crate) fn consume_str(&mut self, s: &str) {
        self.consumed.push_str(s);
    }

    /// Emits a finished token. Any pending text run goes out first, as one
    /// text token, so ordering matches the input exactly.
    fn emit(&mut self, token: Token) {
        if let Token::StartTag { name, .. } = &token {
            self.last_start_tag = name.clone();
        }

        if !self.consumed.is_empty() {
            let text = std::mem::take(&mut self.consumed);
            log::trace!("emit text ({} chars)", text.chars().count());
            self.token_queue.push(Token::Text { text });
        }

        log::trace!("emit {token}");
        self.token_queue.push(token);
    }

    /// Finalizes and emits the token being built, if any
    fn emit_current(&mut self) {
        if let Some(token) = self.builder.finish() {
            self.emit(token);
        }
    }

    /// Finalizes a tag token: commits a pending attribute pair and reports
    /// attributes that ended up on an end tag before emitting.
    fn emit_current_tag(&mut self) {
        self.builder.commit_attribute();
        if self.builder.is_end_tag() && self.builder.has_attributes() {
            self.parse_error(ParserError::EndTagWithAttributes);
        }
        self.emit_current();
    }

    /// Emits the end-of-file token and halts the machine
    fn enqueue_eof(&mut self) {
        self.emit(Token::Eof);
        self.halted = true;
    }

    pub(crate) fn parse_error(&mut self, error: ParserError) {
        self.error_logger
            .borrow_mut()
            .add_error(error, self.state, self.stream.last_location());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::token::Attribute;

    fn tokenizer_for<'a>(stream: &'a mut CharStream) -> Tokenizer<'a> {
        let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
        Tokenizer::new(stream, None, error_logger)
    }

    fn tokenize(input: &str) -> Vec<Token> {
        let mut stream = CharStream::from_str(input);
        let mut tokenizer = tokenizer_for(&mut stream);

        let mut tokens = vec![];
        loop {
            let token = tokenizer.next_token().unwrap();
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn tokenize_from(input: &str, initial_state: State, last_start_tag: &str) -> Vec<Token> {
        let mut stream = CharStream::from_str(input);
        let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(
            &mut stream,
            Some(Options {
                initial_state,
                last_start_tag: last_start_tag.into(),
            }),
            error_logger,
        );

        let mut tokens = vec![];
        loop {
            let token = tokenizer.next_token().unwrap();
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn text(s: &str) -> Token {
        Token::Text { text: s.into() }
    }

    #[test]
    fn plain_text_roundtrip() {
        assert_eq!(
            tokenize("Hello, world!"),
            vec![text("Hello, world!"), Token::Eof]
        );
    }

    #[test]
    fn eof_is_final_and_sticky() {
        let mut stream = CharStream::from_str("hi");
        let mut tokenizer = tokenizer_for(&mut stream);

        assert_eq!(tokenizer.next_token().unwrap(), text("hi"));
        assert_eq!(tokenizer.next_token().unwrap(), Token::Eof);
        assert_eq!(tokenizer.next_token().unwrap(), Token::Eof);
        assert_eq!(tokenizer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn tokenization_is_deterministic() {
        let input = "<!DOCTYPE html><p class='a'>x &amp; y</p><!--done-->";
        assert_eq!(tokenize(input), tokenize(input));
    }

    #[test]
    fn doctype_html() {
        assert_eq!(
            tokenize("<!DOCTYPE html>"),
            vec![
                Token::Doctype {
                    name: Some("html".into()),
                    force_quirks: false,
                    public_id: None,
                    system_id: None,
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn doctype_keyword_is_case_insensitive() {
        assert_eq!(
            tokenize("<!doctype HTML>"),
            vec![
                Token::Doctype {
                    name: Some("html".into()),
                    force_quirks: false,
                    public_id: None,
                    system_id: None,
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn doctype_without_name_forces_quirks() {
        assert_eq!(
            tokenize("<!DOCTYPE>"),
            vec![
                Token::Doctype {
                    name: None,
                    force_quirks: true,
                    public_id: None,
                    system_id: None,
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn doctype_with_public_and_system_id() {
        assert_eq!(
            tokenize(r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd">"#),
            vec![
                Token::Doctype {
                    name: Some("html".into()),
                    force_quirks: false,
                    public_id: Some("-//W3C//DTD HTML 4.01//EN".into()),
                    system_id: Some("http://www.w3.org/TR/html4/strict.dtd".into()),
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn doctype_bogus_recovery() {
        assert_eq!(
            tokenize("<!DOCTYPE html BOGUS junk>"),
            vec![
                Token::Doctype {
                    name: Some("html".into()),
                    force_quirks: true,
                    public_id: None,
                    system_id: None,
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn start_tag_with_attribute() {
        assert_eq!(
            tokenize(r#"<div class="a">"#),
            vec![
                Token::StartTag {
                    name: "div".into(),
                    self_closing: false,
                    attributes: vec![Attribute::new("class", "a")],
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn duplicate_attribute_first_wins() {
        assert_eq!(
            tokenize(r#"<div class="a" class="b">"#),
            vec![
                Token::StartTag {
                    name: "div".into(),
                    self_closing: false,
                    attributes: vec![Attribute::new("class", "a")],
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn attribute_variants() {
        assert_eq!(
            tokenize("<input type=text checked value='y'>"),
            vec![
                Token::StartTag {
                    name: "input".into(),
                    self_closing: false,
                    attributes: vec![
                        Attribute::new("type", "text"),
                        Attribute::new("checked", ""),
                        Attribute::new("value", "y"),
                    ],
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn tag_names_are_lowercased() {
        assert_eq!(
            tokenize("<DIV CLASS=x>"),
            vec![
                Token::StartTag {
                    name: "div".into(),
                    self_closing: false,
                    attributes: vec![Attribute::new("class", "x")],
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn self_closing_tag() {
        assert_eq!(
            tokenize("<br/>"),
            vec![
                Token::StartTag {
                    name: "br".into(),
                    self_closing: true,
                    attributes: vec![],
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn end_tag() {
        assert_eq!(
            tokenize("</div>"),
            vec![Token::EndTag { name: "div".into() }, Token::Eof]
        );
    }

    #[test]
    fn end_tag_attributes_are_dropped() {
        let mut stream = CharStream::from_str("</div class=x>");
        let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(&mut stream, None, error_logger.clone());

        assert_eq!(
            tokenizer.next_token().unwrap(),
            Token::EndTag { name: "div".into() }
        );
        assert!(error_logger
            .borrow()
            .get_errors()
            .iter()
            .any(|e| e.message == "end-tag-with-attributes"));
    }

    #[test]
    fn missing_end_tag_name() {
        // "</>" produces no tag at all
        assert_eq!(tokenize("a</>b"), vec![text("ab"), Token::Eof]);
    }

    #[test]
    fn text_interleaves_with_tags() {
        assert_eq!(
            tokenize("a<b>c</b>d"),
            vec![
                text("a"),
                Token::StartTag {
                    name: "b".into(),
                    self_closing: false,
                    attributes: vec![],
                },
                text("c"),
                Token::EndTag { name: "b".into() },
                text("d"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn comment() {
        assert_eq!(
            tokenize("<!--comment-->"),
            vec![
                Token::Comment {
                    data: "comment".into()
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn comment_with_dashes_inside() {
        assert_eq!(
            tokenize("<!--a-b--c-->"),
            vec![
                Token::Comment {
                    data: "a-b--c".into()
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn comment_unterminated_at_eof() {
        assert_eq!(
            tokenize("<!--open"),
            vec![
                Token::Comment {
                    data: "open".into()
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn bogus_comment_from_unknown_declaration() {
        assert_eq!(
            tokenize("<!ELEMENT br EMPTY>"),
            vec![
                Token::Comment {
                    data: "ELEMENT br EMPTY".into()
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn cdata_in_html_content_is_a_bogus_comment() {
        assert_eq!(
            tokenize("<![CDATA[x]]>"),
            vec![
                Token::Comment {
                    data: "[CDATA[x]]".into()
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn stray_less_than_is_literal() {
        assert_eq!(tokenize("1<2"), vec![text("1<2"), Token::Eof]);
    }

    #[test]
    fn entity_in_data() {
        assert_eq!(tokenize("x &amp; y"), vec![text("x & y"), Token::Eof]);
    }

    #[test]
    fn unknown_entity_stays_literal() {
        assert_eq!(
            tokenize("&notarealentity;"),
            vec![text("\u{AC}arealentity;"), Token::Eof]
        );
    }

    #[test]
    fn entity_in_attribute_value() {
        assert_eq!(
            tokenize(r#"<a href="?x=1&amp;y=2">"#),
            vec![
                Token::StartTag {
                    name: "a".into(),
                    self_closing: false,
                    attributes: vec![Attribute::new("href", "?x=1&y=2")],
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn legacy_entity_in_attribute_followed_by_alnum_stays_literal() {
        assert_eq!(
            tokenize(r#"<a href="?a=b&copyz">"#),
            vec![
                Token::StartTag {
                    name: "a".into(),
                    self_closing: false,
                    attributes: vec![Attribute::new("href", "?a=b&copyz")],
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn rcdata_end_tag_matching() {
        assert_eq!(
            tokenize_from("x<b>y</title>z", State::RcData, "title"),
            vec![
                text("x<b>y"),
                Token::EndTag {
                    name: "title".into()
                },
                text("z"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn rcdata_non_matching_end_tag_is_text() {
        assert_eq!(
            tokenize_from("a</div>b", State::RcData, "title"),
            vec![text("a</div>b"), Token::Eof]
        );
    }

    #[test]
    fn rawtext_ignores_markup() {
        assert_eq!(
            tokenize_from("<i>&amp;</style>", State::RawText, "style"),
            vec![
                text("<i>&amp;"),
                Token::EndTag {
                    name: "style".into()
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn script_data_escaped_comment() {
        assert_eq!(
            tokenize_from("a<!--x--></script>", State::ScriptData, "script"),
            vec![
                text("a<!--x-->"),
                Token::EndTag {
                    name: "script".into()
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn script_data_double_escape() {
        assert_eq!(
            tokenize_from(
                "<!--<script>x</script>--></script>",
                State::ScriptData,
                "script"
            ),
            vec![
                text("<!--<script>x</script>-->"),
                Token::EndTag {
                    name: "script".into()
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn plaintext_consumes_everything() {
        assert_eq!(
            tokenize_from("a</plaintext><b>", State::Plaintext, ""),
            vec![text("a</plaintext><b>"), Token::Eof]
        );
    }

    #[test]
    fn cdata_section_content() {
        assert_eq!(
            tokenize_from("foo]]>bar", State::CdataSection, ""),
            vec![text("foobar"), Token::Eof]
        );
    }

    #[test]
    fn cdata_section_brackets_in_content() {
        assert_eq!(
            tokenize_from("a]b]]c]]>", State::CdataSection, ""),
            vec![text("a]b]]c"), Token::Eof]
        );
    }

    #[test]
    fn nul_in_data_is_kept() {
        assert_eq!(tokenize("a\u{0000}b"), vec![text("a\u{0000}b"), Token::Eof]);
    }

    #[test]
    fn eof_inside_tag_drops_partial_tag() {
        assert_eq!(tokenize("<div cla"), vec![Token::Eof]);
    }

    #[test]
    fn eof_before_tag_name_keeps_less_than() {
        assert_eq!(tokenize("a<"), vec![text("a<"), Token::Eof]);
    }

    #[test]
    fn parse_errors_are_recorded_not_fatal() {
        let mut stream = CharStream::from_str("<!DOCTYPE>");
        let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(&mut stream, None, error_logger.clone());

        let token = tokenizer.next_token().unwrap();
        assert_eq!(token.token_type(), crate::tokenizer::token::TokenType::Doctype);

        let errors = error_logger.borrow().get_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "missing-doctype-name");
        assert_eq!(errors[0].location.line, 1);
    }
}
