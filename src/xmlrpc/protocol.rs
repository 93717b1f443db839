// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::io::Read;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use xml::escape::escape_str_pcdata;

use crate::config::Config;
use crate::error::{Error, Fault, ProtocolError};
use crate::xmlrpc::cursor::TokenCursor;
use crate::xmlrpc::decoding::ValueDeserializer;
use crate::xmlrpc::encoding;

/// A `methodCall` document under construction.
#[derive(Debug)]
pub struct Request {
    method: String,
    body: String,
}

impl Request {
    pub fn new(method: &str) -> Request {
        Request {
            method: method.to_string(),
            body: format!(
                "<?xml version=\"1.0\"?>\
                 <methodCall><methodName>{}</methodName>\
                 <params>",
                escape_str_pcdata(method)
            ),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Appends one `<param>`. On failure the request is dropped, so a
    /// partially encoded document can never be sent.
    pub fn argument<T: Serialize + ?Sized>(mut self, object: &T) -> Result<Request, Error> {
        let value = encoding::encode(object)?;
        self.body.push_str("<param>");
        self.body.push_str(&value);
        self.body.push_str("</param>");
        Ok(self)
    }

    pub fn finalize(mut self) -> Vec<u8> {
        self.body.push_str("</params></methodCall>");
        self.body.into_bytes()
    }
}

/// Encodes a complete `methodCall` document. Use `Value` arguments to mix
/// types.
pub fn encode_request<T: Serialize>(method: &str, args: &[T]) -> Result<Vec<u8>, Error> {
    let mut request = Request::new(method);
    for arg in args {
        request = request.argument(arg)?;
    }
    Ok(request.finalize())
}

/// Walks a `methodResponse` document, handing each param's `<value>` to a
/// callback. A `<fault>` body becomes `Error::Fault`.
pub struct ResponseParser<R: Read> {
    cursor: TokenCursor<R>,
}

impl<R: Read> ResponseParser<R> {
    pub fn new(src: R, config: &Config) -> ResponseParser<R> {
        ResponseParser {
            cursor: TokenCursor::with_config(src, config.clone()),
        }
    }

    pub fn parse<F>(mut self, mut on_param: F) -> Result<(), Error>
    where
        F: FnMut(ValueDeserializer<R>) -> Result<(), ProtocolError>,
    {
        self.cursor.expect_start("methodResponse")?;

        if self.cursor.peek_element()?.is_start("fault") {
            let fault = self.parse_fault()?;
            return Err(Error::Fault(fault));
        }

        self.cursor.expect_start("params")?;
        loop {
            self.debug("parsing param");
            let (end, start) = {
                let token = self.cursor.peek_element()?;
                (token.is_end("params"), token.is_start("param"))
            };
            if end {
                self.debug("end of params");
                self.cursor.next()?;
                break;
            } else if start {
                self.debug("new param");
                self.cursor.next()?;
                self.cursor.expect_start("value")?;
                on_param(ValueDeserializer::new(&mut self.cursor))?;
                self.cursor.expect_end("value")?;
                self.cursor.expect_end("param")?;
            } else {
                let token = self.cursor.peek_element()?.to_string();
                return Err(ProtocolError::new(format!("unexpected token: {}", token)).into());
            }
        }

        self.cursor.expect_end("methodResponse")?;
        self.debug("have end of methodResponse");
        self.cursor.expect_eof()?;
        Ok(())
    }

    fn parse_fault(&mut self) -> Result<Fault, ProtocolError> {
        self.cursor.expect_start("fault")?;
        self.cursor.expect_start("value")?;
        let fault = Fault::deserialize(ValueDeserializer::new(&mut self.cursor))?;
        self.cursor.expect_end("value")?;
        self.cursor.expect_end("fault")?;
        self.debug("have fault");
        Ok(fault)
    }

    fn debug(&self, msg: &str) {
        self.cursor.config().debug(format_args!("{}", msg));
    }
}

/// Decodes a response into `target`, overwriting it with each param in turn.
pub fn decode_response<R: Read, T: DeserializeOwned>(src: R, target: &mut T) -> Result<(), Error> {
    decode_response_with(src, target, &Config::default())
}

pub fn decode_response_with<R: Read, T: DeserializeOwned>(
    src: R,
    target: &mut T,
    config: &Config,
) -> Result<(), Error> {
    ResponseParser::new(src, config).parse(|de| {
        *target = T::deserialize(de)?;
        Ok(())
    })
}

/// Decodes every param of a response, in order.
pub fn decode_params<R: Read, T: DeserializeOwned>(src: R) -> Result<Vec<T>, Error> {
    let mut out = Vec::new();
    ResponseParser::new(src, &Config::default()).parse(|de| {
        out.push(T::deserialize(de)?);
        Ok(())
    })?;
    Ok(out)
}
