use serde_json::Value;
use std::collections::HashSet;
use test_case::test_case;

use strand_html5::testing::fixtures::{fixture_from_filename, Test};
use strand_html5::tokenizer::token::{Attribute, Token, TokenType};

fn assert_tokenization(test: &Test) {
    for mut builder in test.builders() {
        let error_logger = builder.error_logger();
        let mut tokenizer = builder.build();

        let mut tokens = vec![];
        loop {
            let token = tokenizer.next_token().unwrap();
            if token.is_eof() {
                break;
            }
            tokens.push(token);
        }

        assert_eq!(
            tokens.len(),
            test.output.len(),
            "token count mismatch for '{}': got {tokens:?}",
            test.description,
        );

        for (have, expected) in tokens.into_iter().zip(test.output.iter()) {
            assert_token(have, expected, test);
        }

        // Expected error codes must all have been reported; positions are
        // not part of the fixture contract here.
        let reported = error_logger.borrow().get_errors();
        for expected_err in &test.errors {
            assert!(
                reported.iter().any(|e| e.message == expected_err.code),
                "expected error '{}' for '{}', got {:?}",
                expected_err.code,
                test.description,
                reported,
            );
        }
    }
}

fn assert_token(have: Token, expected: &[Value], test: &Test) {
    let expected_type = match expected[0].as_str().unwrap() {
        "DOCTYPE" => TokenType::Doctype,
        "StartTag" => TokenType::StartTag,
        "EndTag" => TokenType::EndTag,
        "Comment" => TokenType::Comment,
        "Character" => TokenType::Text,
        other => panic!("unknown output token type {other:?}"),
    };

    assert_eq!(
        have.token_type(),
        expected_type,
        "incorrect token type for '{}'",
        test.description,
    );

    match have {
        Token::Doctype {
            name,
            force_quirks,
            public_id,
            system_id,
        } => {
            assert_eq!(expected[1].as_str(), name.as_deref(), "incorrect doctype name");
            assert_eq!(
                expected[2].as_str(),
                public_id.as_deref(),
                "incorrect doctype public id"
            );
            assert_eq!(
                expected[3].as_str(),
                system_id.as_deref(),
                "incorrect doctype system id"
            );
            // The last element is the "correctness" flag: true means the
            // doctype did not force quirks mode.
            assert_eq!(
                expected[4].as_bool().unwrap(),
                !force_quirks,
                "incorrect doctype quirks flag"
            );
        }
        Token::StartTag {
            name,
            self_closing,
            attributes,
        } => {
            assert_eq!(
                expected[1].as_str().unwrap(),
                name,
                "incorrect start tag name"
            );

            let expected_attrs: Vec<Attribute> = expected
                .get(2)
                .and_then(|v| v.as_object())
                .map_or(vec![], |map| {
                    map.iter()
                        .filter_map(|(key, value)| {
                            value.as_str().map(|v| Attribute::new(key.clone(), v))
                        })
                        .collect()
                });

            let want: HashSet<_> = expected_attrs.iter().collect();
            let got: HashSet<_> = attributes.iter().collect();
            assert_eq!(want, got, "attribute mismatch on <{name}>");

            if let Some(expected_self_closing) = expected.get(3).and_then(|v| v.as_bool()) {
                assert_eq!(expected_self_closing, self_closing, "self-closing mismatch");
            }
        }
        Token::EndTag { name } => {
            assert_eq!(expected[1].as_str().unwrap(), name, "incorrect end tag");
        }
        Token::Comment { data } => {
            assert_eq!(
                expected[1].as_str().unwrap(),
                data,
                "incorrect comment data"
            );
        }
        Token::Text { text } => {
            let want = expected[1].as_str().unwrap();
            let want = if test.double_escaped.unwrap_or(false) {
                strand_html5::testing::fixtures::escape(want)
            } else {
                want.to_string()
            };
            assert_eq!(want, text, "incorrect character data");
        }
        Token::Eof => panic!("unexpected eof token"),
    }
}

#[test_case("basic.test")]
#[test_case("entities.test")]
#[test_case("recovery.test")]
#[test_case("text_modes.test")]
fn tokenization(filename: &str) {
    let container = fixture_from_filename(filename).unwrap();

    for test in container.tests {
        assert_tokenization(&test);
    }
}
