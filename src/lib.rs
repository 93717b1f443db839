#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod xmlrpc;

pub use crate::config::Config;
pub use crate::error::{Error, Fault, ProtocolError};
pub use crate::xmlrpc::client::{Client, Transport};
pub use crate::xmlrpc::encoding::encode;
pub use crate::xmlrpc::protocol::{
    decode_params, decode_response, decode_response_with, encode_request, Request, ResponseParser,
};
pub use crate::xmlrpc::value::{Bytes, DateTime, Value};
