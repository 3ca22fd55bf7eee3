//! The output boundary: where finished tokens go.

use crate::tokenizer::token::Token;

/// Consumer of the token stream. Tokens arrive in emission order, ending
/// with exactly one `Token::Eof`; a token is immutable once accepted.
pub trait TokenSink {
    fn accept(&mut self, token: Token);
}

/// Sink that collects tokens into a vector, for assertions and small tools
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub tokens: Vec<Token>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenSink for CollectingSink {
    fn accept(&mut self, token: Token) {
        self.tokens.push(token);
    }
}

/// Sink that forwards every token to the `log` facade at debug level
#[derive(Debug, Default)]
pub struct LogSink;

impl TokenSink for LogSink {
    fn accept(&mut self, token: Token) {
        log::debug!("{token}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_preserves_order() {
        let mut sink = CollectingSink::new();
        sink.accept(Token::Text { text: "a".into() });
        sink.accept(Token::EndTag { name: "b".into() });
        sink.accept(Token::Eof);

        assert_eq!(
            sink.tokens,
            vec![
                Token::Text { text: "a".into() },
                Token::EndTag { name: "b".into() },
                Token::Eof,
            ]
        );
    }
}
