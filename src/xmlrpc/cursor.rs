// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::fmt;
use std::io::Read;

use xml::reader::{self, ParserConfig};
use xml::EventReader;

use crate::config::Config;
use crate::error::ProtocolError;

/// The tokens the codec cares about. Everything else the tokenizer reports
/// (declaration, processing instructions, doctype) collapses into `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Start(String),
    End(String),
    Text(String),
    Other,
}

impl Token {
    pub fn is_start(&self, name: &str) -> bool {
        match *self {
            Token::Start(ref n) => n == name,
            _ => false,
        }
    }

    pub fn is_end(&self, name: &str) -> bool {
        match *self {
            Token::End(ref n) => n == name,
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Token::Start(ref name) => write!(f, "start element {}", name),
            Token::End(ref name) => write!(f, "end element {}", name),
            Token::Text(ref text) => write!(f, "chardata {:?}", text),
            Token::Other => write!(f, "non-element token"),
        }
    }
}

/// One-token lookahead over an XML event stream.
///
/// End of stream is `Ok(None)` from `peek`/`next`; whether that is an error
/// is for the caller to decide. The `expect_*` helpers treat it as one.
pub struct TokenCursor<R: Read> {
    parser: EventReader<R>,
    peeked: Option<Option<Token>>,
    config: Config,
}

impl<R: Read> TokenCursor<R> {
    pub fn new(src: R) -> TokenCursor<R> {
        TokenCursor::with_config(src, Config::default())
    }

    pub fn with_config(src: R, config: Config) -> TokenCursor<R> {
        let parser_config = ParserConfig::new()
            .trim_whitespace(false)
            .whitespace_to_characters(true)
            .cdata_to_characters(true)
            .coalesce_characters(true)
            .ignore_comments(true);
        TokenCursor {
            parser: EventReader::new_with_config(src, parser_config),
            peeked: None,
            config: config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn read_token(&mut self) -> Result<Option<Token>, ProtocolError> {
        let event = self.parser.next().map_err(from_reader_error)?;
        let token = match event {
            reader::XmlEvent::EndDocument => return Ok(None),
            reader::XmlEvent::StartElement { name, .. } => Token::Start(name.local_name),
            reader::XmlEvent::EndElement { name } => Token::End(name.local_name),
            reader::XmlEvent::Characters(s) => Token::Text(s),
            reader::XmlEvent::CData(s) => Token::Text(s),
            reader::XmlEvent::Whitespace(s) => Token::Text(s),
            _ => Token::Other,
        };
        Ok(Some(token))
    }

    /// Next token without consuming it.
    pub fn peek(&mut self) -> Result<Option<&Token>, ProtocolError> {
        if self.peeked.is_none() {
            let token = self.read_token()?;
            self.peeked = Some(token);
        }
        match self.peeked {
            Some(ref token) => Ok(token.as_ref()),
            None => Ok(None),
        }
    }

    pub fn next(&mut self) -> Result<Option<Token>, ProtocolError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.read_token(),
        }
    }

    fn next_or_eof(&mut self) -> Result<Token, ProtocolError> {
        self.next()?.ok_or_else(ProtocolError::eof)
    }

    /// Skips non-element tokens and returns the next start or end element
    /// without consuming it.
    pub fn peek_element(&mut self) -> Result<&Token, ProtocolError> {
        loop {
            match self.peek()? {
                Some(&Token::Start(_)) | Some(&Token::End(_)) => break,
                Some(_) => {}
                None => return Err(ProtocolError::eof()),
            }
            self.next()?;
        }
        match self.peek()? {
            Some(token) => Ok(token),
            None => Err(ProtocolError::eof()),
        }
    }

    pub fn expect_start(&mut self, name: &str) -> Result<(), ProtocolError> {
        loop {
            match self.next_or_eof()? {
                Token::Start(ref n) if n == name => return Ok(()),
                Token::Start(n) => {
                    return Err(ProtocolError::new(format!(
                        "expected start element {}, saw start element {}",
                        name, n
                    )))
                }
                Token::End(n) => {
                    return Err(ProtocolError::new(format!(
                        "expected start element {}, saw end element {}",
                        name, n
                    )))
                }
                _ => {}
            }
        }
    }

    pub fn expect_end(&mut self, name: &str) -> Result<(), ProtocolError> {
        loop {
            match self.next_or_eof()? {
                Token::End(ref n) if n == name => return Ok(()),
                Token::End(n) => {
                    return Err(ProtocolError::new(format!(
                        "expected end element {}, saw end element {}",
                        name, n
                    )))
                }
                Token::Start(n) => {
                    return Err(ProtocolError::new(format!(
                        "expected end element {}, saw start element {}",
                        name, n
                    )))
                }
                _ => {}
            }
        }
    }

    pub fn expect_text(&mut self) -> Result<String, ProtocolError> {
        match self.next_or_eof()? {
            Token::Text(text) => Ok(text),
            token => Err(ProtocolError::new(format!("expected chardata, saw {}", token))),
        }
    }

    /// Character data, or an empty string when the element closes at once.
    pub fn text_or_empty(&mut self) -> Result<String, ProtocolError> {
        let closed = match self.peek()? {
            Some(&Token::End(_)) => true,
            _ => false,
        };
        if closed {
            Ok(String::new())
        } else {
            self.expect_text()
        }
    }

    /// Succeeds only if nothing but non-element tokens remain.
    pub fn expect_eof(&mut self) -> Result<(), ProtocolError> {
        loop {
            match self.next()? {
                None => return Ok(()),
                Some(Token::Start(n)) => {
                    return Err(ProtocolError::new(format!(
                        "expected end of document, saw start element {}",
                        n
                    )))
                }
                Some(Token::End(n)) => {
                    return Err(ProtocolError::new(format!(
                        "expected end of document, saw end element {}",
                        n
                    )))
                }
                Some(_) => {}
            }
        }
    }
}

fn from_reader_error(err: reader::Error) -> ProtocolError {
    let premature_eof = match *err.kind() {
        reader::ErrorKind::UnexpectedEof => true,
        _ => {
            let msg = err.to_string().to_lowercase();
            msg.contains("end of stream") || msg.contains("eof")
        }
    };
    if premature_eof {
        ProtocolError::eof()
    } else {
        ProtocolError::new(format!("malformed xml: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::{Token, TokenCursor};

    fn cursor(s: &str) -> TokenCursor<&[u8]> {
        TokenCursor::new(s.as_bytes())
    }

    #[test]
    fn peek_is_idempotent() {
        let mut c = cursor("<a>x</a>");
        c.expect_start("a").unwrap();
        assert_eq!(Some(&Token::Text("x".into())), c.peek().unwrap());
        assert_eq!(Some(&Token::Text("x".into())), c.peek().unwrap());
        assert_eq!(Some(Token::Text("x".into())), c.next().unwrap());
        assert_eq!(Some(Token::End("a".into())), c.next().unwrap());
    }

    #[test]
    fn peek_element_skips_text_and_declaration() {
        let mut c = cursor("<?xml version=\"1.0\"?>\n<a>\n  <!-- note -->\n  <b/></a>");
        assert!(c.peek_element().unwrap().is_start("a"));
        c.expect_start("a").unwrap();
        assert!(c.peek_element().unwrap().is_start("b"));
    }

    #[test]
    fn expect_start_rejects_wrong_name_and_kind() {
        let mut c = cursor("<a><b/></a>");
        let err = c.expect_start("x").unwrap_err();
        assert_eq!("expected start element x, saw start element a", err.reason());

        let mut c = cursor("<a></a>");
        c.expect_start("a").unwrap();
        let err = c.expect_start("b").unwrap_err();
        assert_eq!("expected start element b, saw end element a", err.reason());
    }

    #[test]
    fn expect_end_rejects_start() {
        let mut c = cursor("<a><b/></a>");
        c.expect_start("a").unwrap();
        let err = c.expect_end("a").unwrap_err();
        assert_eq!("expected end element a, saw start element b", err.reason());
    }

    #[test]
    fn expect_text_requires_chardata() {
        let mut c = cursor("<a><b/></a>");
        c.expect_start("a").unwrap();
        assert!(c.expect_text().is_err());

        let mut c = cursor("<a></a>");
        c.expect_start("a").unwrap();
        assert_eq!("", c.text_or_empty().unwrap());
        c.expect_end("a").unwrap();
    }

    #[test]
    fn end_of_stream_is_a_distinct_outcome() {
        let mut c = cursor("<a/>\n");
        c.expect_start("a").unwrap();
        c.expect_end("a").unwrap();
        c.expect_eof().unwrap();
        assert_eq!(None, c.next().unwrap());
    }

    #[test]
    fn truncated_stream_is_premature_eof() {
        let mut c = cursor("<a><b>");
        c.expect_start("a").unwrap();
        c.expect_start("b").unwrap();
        assert!(c.expect_end("b").is_err());
    }
}
