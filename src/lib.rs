//! HTML5 tokenizer.
//!
//! Turns a stream of decoded characters into a stream of markup tokens (tags,
//! attributes, comments, DOCTYPE declarations, character data, end-of-file)
//! following the WHATWG tokenization state machine. Tokens are pulled lazily
//! with [`tokenizer::Tokenizer::next_token`], or pushed into a
//! [`emitter::TokenSink`]; tree construction is a separate consumer and not
//! part of this crate.
//!
//! ```
//! use strand_html5::tokenize;
//! use strand_html5::tokenizer::token::Token;
//!
//! let tokens = tokenize("<p>hi</p>").unwrap();
//! assert_eq!(tokens.last(), Some(&Token::Eof));
//! ```

pub mod emitter;
pub mod error_logger;
pub mod errors;
pub mod stream;
pub mod testing;
pub mod tokenizer;

use std::cell::RefCell;
use std::rc::Rc;

use crate::emitter::CollectingSink;
use crate::error_logger::ErrorLogger;
use crate::stream::CharStream;
use crate::tokenizer::token::Token;
use crate::tokenizer::Tokenizer;

/// Tokenizes the given input and returns all tokens in emission order,
/// ending with `Token::Eof`. Parse errors are recovered from and discarded;
/// drive a [`tokenizer::Tokenizer`] directly to observe them.
pub fn tokenize(html: &str) -> errors::Result<Vec<Token>> {
    let mut stream = CharStream::from_str(html);
    let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
    let mut tokenizer = Tokenizer::new(&mut stream, None, error_logger);

    let mut sink = CollectingSink::new();
    tokenizer.stream_to(&mut sink)?;

    Ok(sink.tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facade_runs_a_whole_parse() {
        let tokens = tokenize("<p>hi</p>").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens.last(), Some(&Token::Eof));
    }
}
