use std::fmt;
use std::io;

use serde::{de, ser, Deserialize, Serialize};
use thiserror::Error;

/// A structured error reported by the remote peer inside `<fault>`.
///
/// The exchange itself succeeded; the remote procedure failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    #[serde(rename = "faultCode")]
    pub code: i64,
    #[serde(rename = "faultString")]
    pub message: String,
}

impl Fault {
    pub fn new(code: i64, message: &str) -> Fault {
        Fault {
            code: code,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "fault {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Fault {}

/// Malformed or unexpected message structure, or a value the codec
/// cannot represent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ProtocolError {
    reason: String,
}

impl ProtocolError {
    pub fn new<S: Into<String>>(reason: S) -> ProtocolError {
        ProtocolError {
            reason: reason.into(),
        }
    }

    pub fn eof() -> ProtocolError {
        ProtocolError::new("eof while parsing response")
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl de::Error for ProtocolError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ProtocolError::new(msg.to_string())
    }
}

impl ser::Error for ProtocolError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ProtocolError::new(msg.to_string())
    }
}

impl From<fmt::Error> for ProtocolError {
    fn from(_: fmt::Error) -> ProtocolError {
        ProtocolError::new("failed to write xml-rpc document")
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fault(#[from] Fault),
    #[error("xml-rpc protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn is_fault(&self) -> bool {
        self.as_fault().is_some()
    }

    pub fn as_fault(&self) -> Option<&Fault> {
        match *self {
            Error::Fault(ref fault) => Some(fault),
            _ => None,
        }
    }

    pub fn is_protocol(&self) -> bool {
        match *self {
            Error::Protocol(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_and_protocol_are_distinguishable() {
        let fault: Error = Fault::new(4, "Too many parameters.").into();
        assert!(fault.is_fault());
        assert!(!fault.is_protocol());
        assert_eq!("fault 4: Too many parameters.", fault.to_string());

        let protocol: Error = ProtocolError::eof().into();
        assert!(protocol.is_protocol());
        assert!(protocol.as_fault().is_none());
        assert_eq!(
            "xml-rpc protocol error: eof while parsing response",
            protocol.to_string()
        );
    }
}
