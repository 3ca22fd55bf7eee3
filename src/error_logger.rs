//! Parse error reporting.
//!
//! Malformed markup never stops the tokenizer; every error has a local
//! recovery. What the logger collects is a diagnostics side channel: which
//! error, in which state, at which input position. It has no effect on the
//! emitted token stream.

use crate::stream::Location;
use crate::tokenizer::state::State;

/// The recoverable parse errors the tokenizer can report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParserError {
    AbruptClosingOfEmptyComment,
    AbruptDoctypePublicIdentifier,
    AbruptDoctypeSystemIdentifier,
    AbsenceOfDigitsInNumericCharacterReference,
    CdataInHtmlContent,
    CharacterReferenceOutsideUnicodeRange,
    ControlCharacterInInputStream,
    ControlCharacterReference,
    DuplicateAttribute,
    EndTagWithAttributes,
    EndTagWithTrailingSolidus,
    EofBeforeTagName,
    EofInCdata,
    EofInComment,
    EofInDoctype,
    EofInScriptHtmlCommentLikeText,
    EofInTag,
    IncorrectlyClosedComment,
    IncorrectlyOpenedComment,
    InvalidCharacterSequenceAfterDoctypeName,
    InvalidFirstCharacterOfTagName,
    MissingAttributeValue,
    MissingDoctypeName,
    MissingDoctypePublicIdentifier,
    MissingDoctypeSystemIdentifier,
    MissingEndTagName,
    MissingQuoteBeforeDoctypePublicIdentifier,
    MissingQuoteBeforeDoctypeSystemIdentifier,
    MissingSemicolonAfterCharacterReference,
    MissingWhitespaceAfterDoctypePublicKeyword,
    MissingWhitespaceAfterDoctypeSystemKeyword,
    MissingWhitespaceBeforeDoctypeName,
    MissingWhitespaceBetweenAttributes,
    MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers,
    NestedComment,
    NoncharacterCharacterReference,
    NoncharacterInInputStream,
    NullCharacterReference,
    SurrogateCharacterReference,
    UnexpectedCharacterAfterDoctypeSystemIdentifier,
    UnexpectedCharacterInAttributeName,
    UnexpectedCharacterInUnquotedAttributeValue,
    UnexpectedEqualsSignBeforeAttributeName,
    UnexpectedNullCharacter,
    UnexpectedQuestionMarkInsteadOfTagName,
    UnexpectedSolidusInTag,
    UnknownNamedCharacterReference,
}

impl ParserError {
    /// The code for this error, as used by conformance test suites
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserError::AbruptClosingOfEmptyComment => "abrupt-closing-of-empty-comment",
            ParserError::AbruptDoctypePublicIdentifier => "abrupt-doctype-public-identifier",
            ParserError::AbruptDoctypeSystemIdentifier => "abrupt-doctype-system-identifier",
            ParserError::AbsenceOfDigitsInNumericCharacterReference => {
                "absence-of-digits-in-numeric-character-reference"
            }
            ParserError::CdataInHtmlContent => "cdata-in-html-content",
            ParserError::CharacterReferenceOutsideUnicodeRange => {
                "character-reference-outside-unicode-range"
            }
            ParserError::ControlCharacterInInputStream => "control-character-in-input-stream",
            ParserError::ControlCharacterReference => "control-character-reference",
            ParserError::DuplicateAttribute => "duplicate-attribute",
            ParserError::EndTagWithAttributes => "end-tag-with-attributes",
            ParserError::EndTagWithTrailingSolidus => "end-tag-with-trailing-solidus",
            ParserError::EofBeforeTagName => "eof-before-tag-name",
            ParserError::EofInCdata => "eof-in-cdata",
            ParserError::EofInComment => "eof-in-comment",
            ParserError::EofInDoctype => "eof-in-doctype",
            ParserError::EofInScriptHtmlCommentLikeText => "eof-in-script-html-comment-like-text",
            ParserError::EofInTag => "eof-in-tag",
            ParserError::IncorrectlyClosedComment => "incorrectly-closed-comment",
            ParserError::IncorrectlyOpenedComment => "incorrectly-opened-comment",
            ParserError::InvalidCharacterSequenceAfterDoctypeName => {
                "invalid-character-sequence-after-doctype-name"
            }
            ParserError::InvalidFirstCharacterOfTagName => "invalid-first-character-of-tag-name",
            ParserError::MissingAttributeValue => "missing-attribute-value",
            ParserError::MissingDoctypeName => "missing-doctype-name",
            ParserError::MissingDoctypePublicIdentifier => "missing-doctype-public-identifier",
            ParserError::MissingDoctypeSystemIdentifier => "missing-doctype-system-identifier",
            ParserError::MissingEndTagName => "missing-end-tag-name",
            ParserError::MissingQuoteBeforeDoctypePublicIdentifier => {
                "missing-quote-before-doctype-public-identifier"
            }
            ParserError::MissingQuoteBeforeDoctypeSystemIdentifier => {
                "missing-quote-before-doctype-system-identifier"
            }
            ParserError::MissingSemicolonAfterCharacterReference => {
                "missing-semicolon-after-character-reference"
            }
            ParserError::MissingWhitespaceAfterDoctypePublicKeyword => {
                "missing-whitespace-after-doctype-public-keyword"
            }
            ParserError::MissingWhitespaceAfterDoctypeSystemKeyword => {
                "missing-whitespace-after-doctype-system-keyword"
            }
            ParserError::MissingWhitespaceBeforeDoctypeName => {
                "missing-whitespace-before-doctype-name"
            }
            ParserError::MissingWhitespaceBetweenAttributes => {
                "missing-whitespace-between-attributes"
            }
            ParserError::MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers => {
                "missing-whitespace-between-doctype-public-and-system-identifiers"
            }
            ParserError::NestedComment => "nested-comment",
            ParserError::NoncharacterCharacterReference => "noncharacter-character-reference",
            ParserError::NoncharacterInInputStream => "noncharacter-in-input-stream",
            ParserError::NullCharacterReference => "null-character-reference",
            ParserError::SurrogateCharacterReference => "surrogate-character-reference",
            ParserError::UnexpectedCharacterAfterDoctypeSystemIdentifier => {
                "unexpected-character-after-doctype-system-identifier"
            }
            ParserError::UnexpectedCharacterInAttributeName => {
                "unexpected-character-in-attribute-name"
            }
            ParserError::UnexpectedCharacterInUnquotedAttributeValue => {
                "unexpected-character-in-unquoted-attribute-value"
            }
            ParserError::UnexpectedEqualsSignBeforeAttributeName => {
                "unexpected-equals-sign-before-attribute-name"
            }
            ParserError::UnexpectedNullCharacter => "unexpected-null-character",
            ParserError::UnexpectedQuestionMarkInsteadOfTagName => {
                "unexpected-question-mark-instead-of-tag-name"
            }
            ParserError::UnexpectedSolidusInTag => "unexpected-solidus-in-tag",
            ParserError::UnknownNamedCharacterReference => "unknown-named-character-reference",
        }
    }
}

/// One recorded parse error
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    /// The error code
    pub message: String,
    /// The state the tokenizer was in when the error was raised
    pub state: State,
    /// Where in the input the error occurred
    pub location: Location,
}

/// Collects parse errors during a run. Repeated reports of the same error at
/// the same position are stored once.
#[derive(Clone, Debug, Default)]
pub struct ErrorLogger {
    errors: Vec<ParseError>,
}

impl ErrorLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cloned list of the recorded errors
    pub fn get_errors(&self) -> Vec<ParseError> {
        self.errors.clone()
    }

    /// Records an error, unless the same code was already recorded at the
    /// same location
    pub fn add_error(&mut self, error: ParserError, state: State, location: Location) {
        let message = error.as_str();
        if self
            .errors
            .iter()
            .any(|e| e.location == location && e.message == message)
        {
            return;
        }

        self.errors.push(ParseError {
            message: message.to_string(),
            state,
            location,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_reports_stored_once() {
        let mut logger = ErrorLogger::new();
        for _ in 0..5 {
            logger.add_error(
                ParserError::EofInTag,
                State::TagName,
                Location::new(1, 1, 0),
            );
        }
        assert_eq!(logger.get_errors().len(), 1);
    }

    #[test]
    fn distinct_positions_kept() {
        let mut logger = ErrorLogger::new();
        for col in 1..=5 {
            logger.add_error(
                ParserError::EofInTag,
                State::TagName,
                Location::new(1, col, col - 1),
            );
        }
        assert_eq!(logger.get_errors().len(), 5);
    }

    #[test]
    fn distinct_codes_kept() {
        let mut logger = ErrorLogger::new();
        let location = Location::new(1, 1, 0);
        logger.add_error(ParserError::EofInTag, State::TagName, location);
        logger.add_error(ParserError::UnexpectedNullCharacter, State::TagName, location);

        let errors = logger.get_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "eof-in-tag");
        assert_eq!(errors[1].message, "unexpected-null-character");
    }
}
