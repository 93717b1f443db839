// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::io;

use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::Error;
use crate::xmlrpc::protocol::{decode_response_with, Request};

/// Carries request bytes to a server and brings the response body back.
///
/// Implementations own connectivity and status handling; a returned body
/// is assumed to be the server's `methodResponse` document.
pub trait Transport {
    fn post(&mut self, body: &[u8]) -> io::Result<Vec<u8>>;
}

pub struct Client<T: Transport> {
    transport: T,
    config: Config,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Client<T> {
        Client::with_config(transport, Config::default())
    }

    pub fn with_config(transport: T, config: Config) -> Client<T> {
        Client {
            transport: transport,
            config: config,
        }
    }

    /// Sends `request` and decodes the response into `result`.
    ///
    /// `Error::Fault` means the server rejected the call; `Error::Protocol`
    /// means the exchange itself was malformed; `Error::Io` comes from the
    /// transport.
    pub fn call<R: DeserializeOwned>(
        &mut self,
        request: Request,
        result: &mut R,
    ) -> Result<(), Error> {
        debug!("Send XMLRPC request: {}", request.method());
        let body = request.finalize();
        trace!("XMLRPC body: {}", String::from_utf8_lossy(&body));

        let response = self.transport.post(&body)?;
        trace!("Response body: {}", String::from_utf8_lossy(&response));

        decode_response_with(&response[..], result, &self.config)
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fault;
    use crate::xmlrpc::value::Value;
    use std::io;

    /// Answers every call with a canned body and keeps what it was sent.
    struct Canned {
        reply: io::Result<Vec<u8>>,
        sent: Vec<u8>,
    }

    impl Canned {
        fn new(reply: &str) -> Canned {
            Canned {
                reply: Ok(reply.as_bytes().to_vec()),
                sent: Vec::new(),
            }
        }
    }

    impl Transport for Canned {
        fn post(&mut self, body: &[u8]) -> io::Result<Vec<u8>> {
            self.sent = body.to_vec();
            match self.reply {
                Ok(ref reply) => Ok(reply.clone()),
                Err(ref e) => Err(io::Error::new(e.kind(), e.to_string())),
            }
        }
    }

    #[test]
    fn call_posts_request_and_decodes_result() {
        let mut client = Client::new(Canned::new(
            "<methodResponse><params><param><value><int>3</int></value></param></params></methodResponse>",
        ));
        let request = Request::new("add").argument(&1).and_then(|r| r.argument(&2)).unwrap();

        let mut sum = 0i64;
        client.call(request, &mut sum).unwrap();

        assert_eq!(3, sum);
        let sent = String::from_utf8(client.into_transport().sent).unwrap();
        assert!(sent.contains("<methodName>add</methodName>"));
        assert!(sent.ends_with("<param><value><int>2</int></value></param></params></methodCall>"));
    }

    #[test]
    fn call_surfaces_fault() {
        let mut client = Client::new(Canned::new(
            "<methodResponse><fault><value><struct>\
             <member><name>faultCode</name><value><int>-32601</int></value></member>\
             <member><name>faultString</name><value>method not found</value></member>\
             </struct></value></fault></methodResponse>",
        ));

        let mut v = Value::Int(0);
        match client.call(Request::new("nope"), &mut v) {
            Err(Error::Fault(f)) => assert_eq!(Fault::new(-32601, "method not found"), f),
            other => panic!("expected fault, saw {:?}", other),
        }
    }

    #[test]
    fn call_surfaces_transport_error() {
        let mut client = Client::new(Canned {
            reply: Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")),
            sent: Vec::new(),
        });

        let mut v = Value::Int(0);
        match client.call(Request::new("add"), &mut v) {
            Err(Error::Io(e)) => assert_eq!(io::ErrorKind::ConnectionRefused, e.kind()),
            other => panic!("expected io error, saw {:?}", other),
        }
    }
}
