//! Loading and running html5lib-style tokenizer fixtures.
//!
//! A fixture file is a JSON document with a `tests` array; each test carries
//! the input, the expected token stream, optional expected error codes, and
//! optionally the initial states to run the tokenizer in.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error_logger::ErrorLogger;
use crate::stream::CharStream;
use crate::testing::FIXTURE_ROOT;
use crate::tokenizer::{state::State, Options, Tokenizer};

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Root {
    pub tests: Vec<Test>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    pub code: String,
    #[serde(default)]
    pub line: i64,
    #[serde(default)]
    pub col: i64,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub description: String,
    pub input: String,
    pub output: Vec<Vec<Value>>,
    #[serde(default)]
    pub errors: Vec<Error>,
    #[serde(default)]
    pub double_escaped: Option<bool>,
    #[serde(default)]
    pub initial_states: Vec<String>,
    pub last_start_tag: Option<String>,
}

/// One prepared tokenizer run for a test: its own stream, initial state and
/// remembered last start tag
pub struct TokenizerBuilder {
    stream: CharStream,
    state: State,
    last_start_tag: Option<String>,
    error_logger: Rc<RefCell<ErrorLogger>>,
}

impl TokenizerBuilder {
    pub fn build(&mut self) -> Tokenizer<'_> {
        Tokenizer::new(
            &mut self.stream,
            Some(Options {
                initial_state: self.state,
                last_start_tag: self.last_start_tag.clone().unwrap_or_default(),
            }),
            self.error_logger.clone(),
        )
    }

    pub fn error_logger(&self) -> Rc<RefCell<ErrorLogger>> {
        self.error_logger.clone()
    }
}

impl Test {
    /// One builder per initial state named by the test; data state when none
    /// are given
    pub fn builders(&self) -> Vec<TokenizerBuilder> {
        let mut states = self.initial_states.clone();
        if states.is_empty() {
            states.push(String::from("Data state"));
        }

        states
            .iter()
            .map(|state| {
                let state = match state.as_str() {
                    "Data state" => State::Data,
                    "PLAINTEXT state" => State::Plaintext,
                    "RAWTEXT state" => State::RawText,
                    "RCDATA state" => State::RcData,
                    "Script data state" => State::ScriptData,
                    "CDATA section state" => State::CdataSection,
                    other => panic!("unknown state found in test: {other}"),
                };

                TokenizerBuilder {
                    stream: CharStream::from_str(&self.unescaped_input()),
                    state,
                    last_start_tag: self.last_start_tag.clone(),
                    error_logger: Rc::new(RefCell::new(ErrorLogger::new())),
                }
            })
            .collect()
    }

    /// The input with `\uXXXX` escapes resolved, when the test is marked
    /// double-escaped
    pub fn unescaped_input(&self) -> String {
        if self.double_escaped.unwrap_or(false) {
            escape(&self.input)
        } else {
            self.input.clone()
        }
    }

    /// Runs the test's tokenizer(s) to completion, discarding the output.
    /// Used by the benchmarks.
    pub fn tokenize(&self) {
        for mut builder in self.builders() {
            let mut tokenizer = builder.build();
            while let Ok(token) = tokenizer.next_token() {
                if token.is_eof() {
                    break;
                }
            }
        }
    }
}

/// Resolves `\uXXXX` escapes the fixture format uses for characters JSON
/// cannot carry directly
pub fn escape(input: &str) -> String {
    let re = Regex::new(r"\\u([0-9a-fA-F]{4})").unwrap();
    re.replace_all(input, |caps: &regex::Captures| {
        let hex_val = u32::from_str_radix(&caps[1], 16).unwrap();
        char::from_u32(hex_val).unwrap_or('\u{FFFD}').to_string()
    })
    .into_owned()
}

pub fn fixture_from_filename(filename: &str) -> Result<Root, serde_json::Error> {
    let path = PathBuf::from(FIXTURE_ROOT).join("tokenizer").join(filename);
    fixture_from_path(&path)
}

pub fn fixture_from_path<P>(path: &P) -> Result<Root, serde_json::Error>
where
    P: AsRef<Path>,
{
    let contents = fs::read_to_string(path).unwrap();
    serde_json::from_str(&contents)
}

/// All fixture files under the tokenizer fixture directory
pub fn fixtures() -> impl Iterator<Item = Root> {
    let root = PathBuf::from(FIXTURE_ROOT).join("tokenizer");
    fs::read_dir(root).unwrap().flat_map(|entry| {
        let path = entry.unwrap().path();
        fixture_from_path(&path).ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_resolves_unicode() {
        assert_eq!(escape(r"a\u0041b"), "aAb");
        assert_eq!(escape(r"\u00e9"), "\u{00E9}");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn fixture_parsing() {
        let root: Root = serde_json::from_str(
            r#"{"tests":[{"description":"d","input":"<p>","output":[["StartTag","p",{}]]}]}"#,
        )
        .unwrap();
        assert_eq!(root.tests.len(), 1);
        assert_eq!(root.tests[0].input, "<p>");
        assert!(root.tests[0].errors.is_empty());
        assert_eq!(root.tests[0].builders().len(), 1);
    }
}
