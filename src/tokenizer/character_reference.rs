//! The character-reference sub-machine.
//!
//! Entered from the data, RCDATA and attribute-value states when an `&` is
//! seen. The outer state machine parks itself in the return-state slot and
//! hands control here; whatever the reference resolves to is flushed as if it
//! had been typed literally, either into the pending text run or into the
//! attribute value being built.

use crate::error_logger::ParserError;
use crate::stream::Character::{Ch, StreamEnd};
use crate::tokenizer::entities::{self, LONGEST_REFERENCE};
use crate::tokenizer::{Tokenizer, CHAR_REPLACEMENT};

/// Internal states of the sub-machine
enum CcrState {
    CharacterReference,
    NamedCharacterReference,
    AmbiguousAmpersand,
    NumericCharacterReference,
    HexadecimalCharacterReferenceStart,
    DecimalCharacterReferenceStart,
    HexadecimalCharacterReference,
    DecimalCharacterReference,
    NumericCharacterReferenceEnd,
}

impl Tokenizer<'_> {
    /// Consumes a character reference from the stream. With `as_attribute`
    /// set, resolved text goes into the current attribute value instead of
    /// the pending text run.
    pub(crate) fn consume_character_reference(&mut self, as_attribute: bool) {
        let mut ccr_state = CcrState::CharacterReference;
        // None marks arithmetic overflow while accumulating digits
        let mut char_ref_code: Option<u32> = Some(0);

        loop {
            match ccr_state {
                CcrState::CharacterReference => {
                    self.temporary_buffer.clear();
                    self.temporary_buffer.push('&');

                    match self.stream.read() {
                        Ch(c) if c.is_ascii_alphanumeric() => {
                            self.stream.reconsume();
                            ccr_state = CcrState::NamedCharacterReference;
                        }
                        Ch(c @ '#') => {
                            self.temporary_buffer.push(c);
                            ccr_state = CcrState::NumericCharacterReference;
                        }
                        StreamEnd => {
                            self.flush_temporary_buffer(as_attribute);
                            return;
                        }
                        _ => {
                            self.flush_temporary_buffer(as_attribute);
                            self.stream.reconsume();
                            return;
                        }
                    }
                }
                CcrState::NamedCharacterReference => {
                    if let Some(entity) = self.find_entity() {
                        self.stream.advance(entity.chars().count());
                        let next = self.stream.look_ahead(0);

                        // Historical exception: a legacy reference without
                        // its semicolon, inside an attribute value and
                        // followed by '=' or an alphanumeric, stays literal.
                        if as_attribute
                            && !entity.ends_with(';')
                            && (next == Ch('=')
                                || matches!(next, Ch(c) if c.is_ascii_alphanumeric()))
                        {
                            self.temporary_buffer.push_str(&entity);
                            self.flush_temporary_buffer(as_attribute);
                            return;
                        }

                        let replacement = entities::named_reference(&entity).unwrap_or("");
                        if as_attribute {
                            self.builder.append_attribute_value_str(replacement);
                        } else {
                            self.consume_str(replacement);
                        }
                        self.temporary_buffer.clear();

                        if !entity.ends_with(';') {
                            self.parse_error(ParserError::MissingSemicolonAfterCharacterReference);
                        }

                        return;
                    }

                    self.flush_temporary_buffer(as_attribute);
                    ccr_state = CcrState::AmbiguousAmpersand;
                }
                CcrState::AmbiguousAmpersand => {
                    match self.stream.read() {
                        Ch(c) if c.is_ascii_alphanumeric() => {
                            if as_attribute {
                                self.builder.append_attribute_value(c);
                            } else {
                                self.consume(c);
                            }
                        }
                        Ch(';') => {
                            self.stream.reconsume();
                            self.parse_error(ParserError::UnknownNamedCharacterReference);
                            return;
                        }
                        StreamEnd => return,
                        _ => {
                            self.stream.reconsume();
                            return;
                        }
                    }
                }
                CcrState::NumericCharacterReference => {
                    char_ref_code = Some(0);

                    match self.stream.read() {
                        Ch(c @ ('X' | 'x')) => {
                            self.temporary_buffer.push(c);
                            ccr_state = CcrState::HexadecimalCharacterReferenceStart;
                        }
                        StreamEnd => {
                            ccr_state = CcrState::DecimalCharacterReferenceStart;
                        }
                        _ => {
                            self.stream.reconsume();
                            ccr_state = CcrState::DecimalCharacterReferenceStart;
                        }
                    }
                }
                CcrState::HexadecimalCharacterReferenceStart => {
                    match self.stream.read() {
                        Ch('0'..='9' | 'A'..='F' | 'a'..='f') => {
                            self.stream.reconsume();
                            ccr_state = CcrState::HexadecimalCharacterReference;
                        }
                        StreamEnd => {
                            self.parse_error(
                                ParserError::AbsenceOfDigitsInNumericCharacterReference,
                            );
                            self.flush_temporary_buffer(as_attribute);
                            return;
                        }
                        _ => {
                            self.parse_error(
                                ParserError::AbsenceOfDigitsInNumericCharacterReference,
                            );
                            self.flush_temporary_buffer(as_attribute);
                            self.stream.reconsume();
                            return;
                        }
                    }
                }
                CcrState::DecimalCharacterReferenceStart => {
                    match self.stream.read() {
                        Ch('0'..='9') => {
                            self.stream.reconsume();
                            ccr_state = CcrState::DecimalCharacterReference;
                        }
                        StreamEnd => {
                            self.parse_error(
                                ParserError::AbsenceOfDigitsInNumericCharacterReference,
                            );
                            self.flush_temporary_buffer(as_attribute);
                            return;
                        }
                        _ => {
                            self.parse_error(
                                ParserError::AbsenceOfDigitsInNumericCharacterReference,
                            );
                            self.flush_temporary_buffer(as_attribute);
                            self.stream.reconsume();
                            return;
                        }
                    }
                }
                CcrState::HexadecimalCharacterReference => {
                    match self.stream.read() {
                        Ch(c @ '0'..='9') => {
                            add_digit(&mut char_ref_code, 16, c as u32 - 0x30);
                        }
                        Ch(c @ 'A'..='F') => {
                            add_digit(&mut char_ref_code, 16, c as u32 - 0x37);
                        }
                        Ch(c @ 'a'..='f') => {
                            add_digit(&mut char_ref_code, 16, c as u32 - 0x57);
                        }
                        Ch(';') => {
                            ccr_state = CcrState::NumericCharacterReferenceEnd;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::MissingSemicolonAfterCharacterReference);
                            ccr_state = CcrState::NumericCharacterReferenceEnd;
                        }
                        _ => {
                            self.parse_error(ParserError::MissingSemicolonAfterCharacterReference);
                            self.stream.reconsume();
                            ccr_state = CcrState::NumericCharacterReferenceEnd;
                        }
                    }
                }
                CcrState::DecimalCharacterReference => {
                    match self.stream.read() {
                        Ch(c @ '0'..='9') => {
                            add_digit(&mut char_ref_code, 10, c as u32 - 0x30);
                        }
                        Ch(';') => {
                            ccr_state = CcrState::NumericCharacterReferenceEnd;
                        }
                        StreamEnd => {
                            self.parse_error(ParserError::MissingSemicolonAfterCharacterReference);
                            ccr_state = CcrState::NumericCharacterReferenceEnd;
                        }
                        _ => {
                            self.parse_error(ParserError::MissingSemicolonAfterCharacterReference);
                            self.stream.reconsume();
                            ccr_state = CcrState::NumericCharacterReferenceEnd;
                        }
                    }
                }
                CcrState::NumericCharacterReferenceEnd => {
                    let overflow = char_ref_code.is_none();
                    let mut code = char_ref_code.unwrap_or(0);

                    if code == 0 && !overflow {
                        self.parse_error(ParserError::NullCharacterReference);
                        code = CHAR_REPLACEMENT as u32;
                    }
                    if code > 0x10FFFF || overflow {
                        self.parse_error(ParserError::CharacterReferenceOutsideUnicodeRange);
                        code = CHAR_REPLACEMENT as u32;
                    }
                    if is_surrogate(code) {
                        self.parse_error(ParserError::SurrogateCharacterReference);
                        code = CHAR_REPLACEMENT as u32;
                    }
                    if is_noncharacter(code) {
                        self.parse_error(ParserError::NoncharacterCharacterReference);
                    }
                    if is_control(code) || code == 0x0D {
                        self.parse_error(ParserError::ControlCharacterReference);
                        if let Some(replacement) = entities::c1_replacement(code) {
                            code = replacement as u32;
                        }
                    }

                    self.temporary_buffer.clear();
                    self.temporary_buffer
                        .push(char::from_u32(code).unwrap_or(CHAR_REPLACEMENT));
                    self.flush_temporary_buffer(as_attribute);
                    return;
                }
            }
        }
    }

    /// Empties the temporary buffer into the attribute value or the pending
    /// text run
    fn flush_temporary_buffer(&mut self, as_attribute: bool) {
        let buffer = std::mem::take(&mut self.temporary_buffer);
        if as_attribute {
            self.builder.append_attribute_value_str(&buffer);
        } else {
            self.consume_str(&buffer);
        }
    }

    /// Greedy longest-prefix match of the upcoming input against the named
    /// reference table. Does not consume anything.
    fn find_entity(&mut self) -> Option<String> {
        let lookahead: Vec<char> = self.stream.peek_slice(*LONGEST_REFERENCE).chars().collect();

        for len in (1..=lookahead.len()).rev() {
            let candidate: String = lookahead[..len].iter().collect();
            if entities::is_named_reference(&candidate) {
                return Some(candidate);
            }
        }

        None
    }
}

fn add_digit(code: &mut Option<u32>, base: u32, digit: u32) {
    if let Some(value) = *code {
        *code = value
            .checked_mul(base)
            .and_then(|shifted| shifted.checked_add(digit));
    }
}

pub(crate) fn is_surrogate(num: u32) -> bool {
    (0xD800..=0xDFFF).contains(&num)
}

pub(crate) fn is_noncharacter(num: u32) -> bool {
    (0xFDD0..=0xFDEF).contains(&num)
        || [
            0xFFFE, 0xFFFF, 0x1FFFE, 0x1FFFF, 0x2FFFE, 0x2FFFF, 0x3FFFE, 0x3FFFF, 0x4FFFE,
            0x4FFFF, 0x5FFFE, 0x5FFFF, 0x6FFFE, 0x6FFFF, 0x7FFFE, 0x7FFFF, 0x8FFFE, 0x8FFFF,
            0x9FFFE, 0x9FFFF, 0xAFFFE, 0xAFFFF, 0xBFFFE, 0xBFFFF, 0xCFFFE, 0xCFFFF, 0xDFFFE,
            0xDFFFF, 0xEFFFE, 0xEFFFF, 0xFFFFE, 0xFFFFF, 0x10FFFE, 0x10FFFF,
        ]
        .contains(&num)
}

pub(crate) fn is_control(num: u32) -> bool {
    // Whitespace is fine
    if [0x0009, 0x000A, 0x000C, 0x000D, 0x0020].contains(&num) {
        return false;
    }

    (0x0001..=0x001F).contains(&num) || (0x007F..=0x009F).contains(&num)
}

#[cfg(test)]
mod tests {
    use crate::error_logger::ErrorLogger;
    use crate::stream::CharStream;
    use crate::tokenizer::token::Token;
    use crate::tokenizer::Tokenizer;
    use std::cell::RefCell;
    use std::rc::Rc;

    macro_rules! entity_tests {
        ($($name:ident : $value:expr)*) => {
            $(
                #[test]
                fn $name() {
                    let (input, expected) = $value;

                    let mut stream = CharStream::from_str(input);
                    let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
                    let mut tokenizer = Tokenizer::new(&mut stream, None, error_logger);

                    let token = tokenizer.next_token().unwrap();
                    match token {
                        Token::Text { text } => assert_eq!(expected, text),
                        other => panic!("expected a text token, got {other}"),
                    }
                }
            )*
        }
    }

    entity_tests! {
        // Numeric references
        entity_0: ("&#10;", "\n")
        entity_1: ("&#0;", "\u{FFFD}")
        entity_2: ("&#x0;", "\u{FFFD}")
        entity_3: ("&#xdeadbeef;", "\u{FFFD}")
        entity_4: ("&#xd888;", "\u{FFFD}")
        entity_5: ("&#9999999;", "\u{FFFD}")
        entity_6: ("&#xbeef;", "\u{BEEF}")
        entity_7: ("&#x10;", "\u{10}")
        entity_8: ("&#;", "&#;")
        entity_9: ("&;", "&;")
        entity_10: ("&", "&")
        entity_11: ("&#x1;", "\u{1}")
        entity_12: ("&#x0008;", "\u{8}")
        entity_13: ("&#0008;", "\u{8}")
        entity_14: ("&#x0009;", "\t")
        entity_15: ("&#x007F;", "\u{7F}")
        entity_16: ("&#x80;", "\u{20AC}")
        entity_17: ("&#x82;", "\u{201A}")
        entity_18: ("&#X8c;", "\u{0152}")
        entity_19: ("&#x8d;", "\u{8D}")
        entity_20: ("&#169;", "\u{A9}")
        entity_21: ("&#169X ", "\u{A9}X ")
        entity_22: ("&#xA9;", "\u{A9}")
        entity_23: ("&#60;", "<")
        entity_24: ("&#x3C;", "<")
        entity_25: ("&#34;", "\"")
        entity_26: ("&#39;", "'")

        // Named references
        entity_100: ("&copy;", "\u{A9}")
        entity_101: ("&copyThing;", "\u{A9}Thing;")
        entity_102: ("&raquo;", "\u{BB}")
        entity_103: ("&laquo;", "\u{AB}")
        entity_104: ("&not;", "\u{AC}")
        entity_105: ("&notit;", "\u{AC}it;")
        entity_106: ("&notin;", "\u{2209}")
        entity_107: ("&fo", "&fo")
        entity_108: ("&xxx", "&xxx")
        entity_109: ("&copy", "\u{A9}")
        entity_110: ("&copy ", "\u{A9} ")
        entity_111: ("&copya", "\u{A9}a")
        entity_112: ("&copya;", "\u{A9}a;")
        entity_113: ("&copy&", "\u{A9}&")
        entity_114: ("&COPY;", "\u{A9}")
        entity_115: ("&amp;", "&")
        entity_116: ("&lt;", "<")
        entity_117: ("&gt;", ">")
        entity_118: ("&quot;", "\"")
        entity_119: ("&apos;", "'")
        entity_120: ("&euro;", "\u{20AC}")
        entity_121: ("&reg;", "\u{AE}")
        entity_122: ("&unknown;", "&unknown;")
        entity_123: ("&hellip;", "\u{2026}")
        entity_124: ("&mdash;", "\u{2014}")
        entity_125: ("&pi;", "\u{3C0}")
    }
}
