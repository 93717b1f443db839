// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

#![deny(non_camel_case_types)]

//! XML-RPC codec: serde types in, `methodCall` documents out; `methodResponse`
//! documents in, serde types (or a fault) out.
//!
//! Basic documentation found on Wikipedia
//! http://en.wikipedia.org/wiki/XML-RPC
//!
//! Full specification of the XML-RPC protocol is found here:
//! http://xmlrpc.scripting.com/spec.html
//!
//! Additional errata and hints can be found here:
//! http://effbot.org/zone/xmlrpc-errata.htm
//!
//! Wire types map as follows:
//!
//! | XML-RPC              | Rust                                  |
//! |----------------------|---------------------------------------|
//! | `boolean`            | `bool`                                |
//! | `int`, `i4`, `i2`    | `i32` (and narrower integers)         |
//! | `i8`                 | `i64`                                 |
//! | `double`             | `f64`                                 |
//! | `string`, bare text  | `String`, unit enum variants          |
//! | `base64`             | `Bytes`, `Vec<u8>` when decoding      |
//! | `dateTime.iso8601`   | `DateTime`                            |
//! | `array`              | `Vec<T>`, tuples                      |
//! | `struct`             | structs, `BTreeMap`/`HashMap<String, _>` |
//!
//! `Value` accepts any of the above.

pub mod client;
pub mod cursor;
pub mod decoding;
pub mod encoding;
pub mod protocol;
pub mod value;
