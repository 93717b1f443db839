// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::{self, DeserializeSeed, IntoDeserializer, Visitor};

use crate::error::ProtocolError;
use crate::xmlrpc::cursor::{Token, TokenCursor};
use crate::xmlrpc::value::{DateTime, DATETIME_TOKEN, VALUE_TOKEN};

pub type DecodeResult<T> = Result<T, ProtocolError>;

/// The caller's requested shape, as far as the wire walk needs to know it.
#[derive(Clone, Copy, Debug)]
enum Target {
    /// Anything; the visitor decides. Datetimes are refused.
    Open,
    /// A `Value`, which takes datetimes as a marked enum.
    Value,
    /// A record whose members must all be among `fields`.
    Record(&'static [&'static str]),
    /// A `DateTime`, which wants the raw text.
    DateTime,
    /// Skipped data; datetimes pass as text.
    Ignored,
}

/// Decodes one value from a cursor sitting just past an opening `<value>`.
///
/// Leaves the cursor before the matching `</value>`, which the caller
/// consumes.
pub struct ValueDeserializer<'c, R: Read + 'c> {
    cursor: &'c mut TokenCursor<R>,
}

impl<'c, R: Read> ValueDeserializer<'c, R> {
    pub fn new(cursor: &'c mut TokenCursor<R>) -> ValueDeserializer<'c, R> {
        ValueDeserializer { cursor: cursor }
    }

    /// Finds the wire type tag, consuming its start element. A value with
    /// no inner element yields its character data instead.
    fn scan_type(&mut self) -> DecodeResult<Scan> {
        let mut chardata = String::new();
        loop {
            let closed = match self.cursor.peek()? {
                Some(&Token::End(_)) => true,
                Some(_) => false,
                None => return Err(ProtocolError::eof()),
            };
            if closed {
                return Ok(Scan::Implicit(chardata));
            }
            match self.cursor.next()? {
                Some(Token::Start(name)) => return Ok(Scan::Tagged(name)),
                Some(Token::Text(text)) => chardata.push_str(&text),
                _ => {}
            }
        }
    }

    fn decode<'de, V: Visitor<'de>>(
        mut self,
        target: Target,
        visitor: V,
    ) -> DecodeResult<V::Value> {
        let type_name = match self.scan_type()? {
            Scan::Tagged(name) => name,
            Scan::Implicit(text) => return visitor.visit_string(text),
        };
        self.cursor
            .config()
            .debug(format_args!("parse value, type {}", type_name));

        let value: DecodeResult<V::Value> = match type_name.as_str() {
            "boolean" => match self.cursor.expect_text()?.as_str() {
                "0" => visitor.visit_bool(false),
                "1" => visitor.visit_bool(true),
                other => Err(ProtocolError::new(format!(
                    "invalid value {:?} for boolean",
                    other
                ))),
            },
            "int" | "i2" | "i4" => {
                let text = self.cursor.expect_text()?;
                let n = text.parse::<i32>().map_err(|e| {
                    ProtocolError::new(format!("invalid {} {:?}: {}", type_name, text, e))
                })?;
                visitor.visit_i32(n)
            }
            "i8" => {
                let text = self.cursor.expect_text()?;
                let n = text
                    .parse::<i64>()
                    .map_err(|e| ProtocolError::new(format!("invalid i8 {:?}: {}", text, e)))?;
                visitor.visit_i64(n)
            }
            "double" => {
                let text = self.cursor.expect_text()?;
                let n = text
                    .parse::<f64>()
                    .map_err(|e| ProtocolError::new(format!("invalid double {:?}: {}", text, e)))?;
                visitor.visit_f64(n)
            }
            "string" => visitor.visit_string(self.cursor.text_or_empty()?),
            "base64" => {
                let mut text = self.cursor.text_or_empty()?;
                text.retain(|c| !c.is_ascii_whitespace());
                let bytes = STANDARD
                    .decode(&text)
                    .map_err(|e| ProtocolError::new(format!("invalid base64: {}", e)))?;
                visitor.visit_byte_buf(bytes)
            }
            "dateTime.iso8601" => {
                let text = self.cursor.expect_text()?;
                text.parse::<DateTime>()?;
                match target {
                    Target::DateTime | Target::Ignored => visitor.visit_string(text),
                    Target::Value => visitor.visit_enum(DateTimeAccess { text: text }),
                    _ => Err(ProtocolError::new(format!(
                        "cannot decode dateTime.iso8601 into {}",
                        &visitor as &dyn de::Expected
                    ))),
                }
            }
            "array" if matches!(target, Target::Record(_)) => {
                Err(ProtocolError::new("cannot decode xmlrpc array into struct"))
            }
            "array" => {
                self.cursor.expect_start("data")?;
                let value = visitor.visit_seq(ArrayAccess {
                    cursor: &mut *self.cursor,
                })?;
                self.cursor.expect_end("data")?;
                Ok(value)
            }
            "struct" => {
                let fields = match target {
                    Target::Record(fields) => Some(fields),
                    _ => None,
                };
                visitor.visit_map(StructAccess {
                    cursor: &mut *self.cursor,
                    fields: fields,
                })
            }
            _ => Err(ProtocolError::new(format!("unexpected type {}", type_name))),
        };
        let value = value?;

        self.cursor.expect_end(&type_name)?;
        Ok(value)
    }
}

enum Scan {
    Tagged(String),
    Implicit(String),
}

impl<'de, 'c, R: Read> de::Deserializer<'de> for ValueDeserializer<'c, R> {
    type Error = ProtocolError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> DecodeResult<V::Value> {
        self.decode(Target::Open, visitor)
    }

    // no nil on the wire, so anything present is Some
    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> DecodeResult<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> DecodeResult<V::Value> {
        match name {
            DATETIME_TOKEN => self.decode(Target::DateTime, visitor),
            VALUE_TOKEN => self.decode(Target::Value, visitor),
            _ => visitor.visit_newtype_struct(self),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> DecodeResult<V::Value> {
        self.decode(Target::Record(fields), visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> DecodeResult<V::Value> {
        self.decode(Target::Open, UnitVariantVisitor { name: name, inner: visitor })
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> DecodeResult<V::Value> {
        self.decode(Target::Ignored, visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map
        identifier
    }
}

struct ArrayAccess<'c, R: Read + 'c> {
    cursor: &'c mut TokenCursor<R>,
}

impl<'de, 'c, R: Read> de::SeqAccess<'de> for ArrayAccess<'c, R> {
    type Error = ProtocolError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> DecodeResult<Option<T::Value>> {
        match *self.cursor.peek_element()? {
            Token::Start(_) => {}
            _ => return Ok(None),
        }
        self.cursor.expect_start("value")?;
        let value = seed.deserialize(ValueDeserializer::new(&mut *self.cursor))?;
        self.cursor.expect_end("value")?;
        Ok(Some(value))
    }
}

struct StructAccess<'c, R: Read + 'c> {
    cursor: &'c mut TokenCursor<R>,
    fields: Option<&'static [&'static str]>,
}

impl<'de, 'c, R: Read> de::MapAccess<'de> for StructAccess<'c, R> {
    type Error = ProtocolError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> DecodeResult<Option<K::Value>> {
        match *self.cursor.peek_element()? {
            Token::Start(_) => {}
            _ => return Ok(None),
        }
        self.cursor.expect_start("member")?;
        self.cursor.expect_start("name")?;
        let name = self.cursor.text_or_empty()?;
        self.cursor.expect_end("name")?;
        if let Some(fields) = self.fields {
            if !fields.contains(&name.as_str()) {
                return Err(ProtocolError::new(format!(
                    "cannot find struct field named {}",
                    name
                )));
            }
        }
        seed.deserialize(name.into_deserializer()).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> DecodeResult<V::Value> {
        self.cursor.expect_start("value")?;
        let value = seed.deserialize(ValueDeserializer::new(&mut *self.cursor))?;
        self.cursor.expect_end("value")?;
        self.cursor.expect_end("member")?;
        Ok(value)
    }
}

/// Presents a datetime to `Value` as a newtype variant named by the
/// private marker.
struct DateTimeAccess {
    text: String,
}

impl<'de> de::EnumAccess<'de> for DateTimeAccess {
    type Error = ProtocolError;
    type Variant = DateTimeAccess;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> DecodeResult<(V::Value, DateTimeAccess)> {
        let tag: de::value::StrDeserializer<ProtocolError> = DATETIME_TOKEN.into_deserializer();
        let tag = seed.deserialize(tag)?;
        Ok((tag, self))
    }
}

impl<'de> de::VariantAccess<'de> for DateTimeAccess {
    type Error = ProtocolError;

    fn unit_variant(self) -> DecodeResult<()> {
        Err(ProtocolError::new("dateTime.iso8601 carries text"))
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> DecodeResult<T::Value> {
        seed.deserialize(self.text.into_deserializer())
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> DecodeResult<V::Value> {
        Err(ProtocolError::new("dateTime.iso8601 carries text"))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> DecodeResult<V::Value> {
        Err(ProtocolError::new("dateTime.iso8601 carries text"))
    }
}

/// Turns the text of a value into a unit enum variant.
struct UnitVariantVisitor<V> {
    name: &'static str,
    inner: V,
}

impl<'de, V: Visitor<'de>> Visitor<'de> for UnitVariantVisitor<V> {
    type Value = V::Value;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "a variant name of enum {}", self.name)
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<V::Value, E> {
        self.inner.visit_enum(v.into_deserializer())
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<V::Value, E> {
        self.visit_string(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::ValueDeserializer;
    use crate::error::ProtocolError;
    use crate::xmlrpc::cursor::TokenCursor;
    use crate::xmlrpc::value::{Bytes, DateTime, Value};
    use serde::de::DeserializeOwned;
    use serde::Deserialize;
    use std::collections::HashMap;
    use time::macros::datetime;

    /// Decodes a bare `<value>...</value>` document.
    fn decode<T: DeserializeOwned>(xml: &str) -> Result<T, ProtocolError> {
        let mut cursor = TokenCursor::new(xml.as_bytes());
        cursor.expect_start("value")?;
        let v = T::deserialize(ValueDeserializer::new(&mut cursor))?;
        cursor.expect_end("value")?;
        cursor.expect_eof()?;
        Ok(v)
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(true, decode::<bool>("<value><boolean>1</boolean></value>").unwrap());
        assert_eq!(-12, decode::<i32>("<value><i4>-12</i4></value>").unwrap());
        assert_eq!(3, decode::<i64>("<value><i2>3</i2></value>").unwrap());
        assert_eq!(1.5, decode::<f64>("<value><double>1.5</double></value>").unwrap());
        assert_eq!(2.0, decode::<f64>("<value><int>2</int></value>").unwrap());
        assert_eq!(
            123456789012,
            decode::<i64>("<value><i8>123456789012</i8></value>").unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_bad_scalar_text() {
        assert!(decode::<bool>("<value><boolean>true</boolean></value>").is_err());
        assert!(decode::<i32>("<value><int>12345678901</int></value>").is_err());
        assert!(decode::<i32>("<value><int>x</int></value>").is_err());
        assert!(decode::<u8>("<value><int>300</int></value>").is_err());
        assert!(decode::<f64>("<value><double></double></value>").is_err());
    }

    #[test]
    fn test_decode_unexpected_type() {
        let err = decode::<Value>("<value><nil/></value>").unwrap_err();
        assert_eq!("unexpected type nil", err.reason());
    }

    #[test]
    fn test_decode_implicit_text() {
        assert_eq!("hello", decode::<String>("<value>hello</value>").unwrap());
        assert_eq!(
            Value::String("hello".to_string()),
            decode::<Value>("<value>hello</value>").unwrap()
        );
        assert_eq!("", decode::<String>("<value></value>").unwrap());
        assert_eq!("", decode::<String>("<value/>").unwrap());
        assert_eq!("  ", decode::<String>("<value>  </value>").unwrap());
    }

    #[test]
    fn test_decode_empty_string_and_base64() {
        assert_eq!("", decode::<String>("<value><string></string></value>").unwrap());
        assert_eq!("", decode::<String>("<value><string/></value>").unwrap());
        assert_eq!(Bytes(Vec::new()), decode::<Bytes>("<value><base64></base64></value>").unwrap());
    }

    #[test]
    fn test_decode_string_is_verbatim() {
        assert_eq!(
            " a & b ",
            decode::<String>("<value><string> a &amp; b </string></value>").unwrap()
        );
    }

    #[test]
    fn test_decode_base64_ignores_line_wrapping() {
        let v = decode::<Value>("<value><base64>aGVs\nbG8=</base64></value>").unwrap();
        assert_eq!(Value::Base64(b"hello".to_vec()), v);
        assert!(decode::<Bytes>("<value><base64>!!</base64></value>").is_err());
    }

    #[test]
    fn test_decode_datetime() {
        let xml = "<value><dateTime.iso8601>19980717T14:08:55</dateTime.iso8601></value>";
        let expected = DateTime(datetime!(1998-07-17 14:08:55));
        assert_eq!(expected, decode::<DateTime>(xml).unwrap());
        assert_eq!(Value::DateTime(expected), decode::<Value>(xml).unwrap());
        assert!(decode::<Value>("<value><dateTime.iso8601>1998-07-17</dateTime.iso8601></value>").is_err());
    }

    #[test]
    fn test_decode_datetime_only_into_datetime_or_value() {
        let xml = "<value><dateTime.iso8601>19980717T14:08:55</dateTime.iso8601></value>";

        let err = decode::<HashMap<String, String>>(xml).unwrap_err();
        assert!(err.reason().starts_with("cannot decode dateTime.iso8601 into"), "{}", err);
        assert!(decode::<String>(xml).is_err());
        assert!(decode::<Record>(xml).is_err());

        let wrapped = format!("<value><array><data>{}</data></array></value>", xml);
        assert_eq!(1, decode::<Vec<DateTime>>(&wrapped).unwrap().len());
        assert!(decode::<Vec<String>>(&wrapped).is_err());
    }

    #[test]
    fn test_decode_member_named_like_marker_stays_a_member() {
        let xml = "<value><struct>\
                   <member><name>$__xmlrpc_private_DateTime</name><value>x</value></member>\
                   </struct></value>";
        let v = decode::<Value>(xml).unwrap();
        assert_eq!(Some("x"), v.get("$__xmlrpc_private_DateTime").and_then(|m| m.as_str()));
    }

    #[test]
    fn test_decode_array_lengths() {
        for &n in &[0usize, 1, 5, 1000] {
            let mut xml = String::from("<value><array><data>");
            for i in 0..n {
                xml.push_str(&format!("<value><int>{}</int></value>", i));
            }
            xml.push_str("</data></array></value>");

            let typed = decode::<Vec<i32>>(&xml).unwrap();
            assert_eq!(n, typed.len());
            assert_eq!((0..n as i32).collect::<Vec<_>>(), typed);

            let open = decode::<Value>(&xml).unwrap();
            assert_eq!(Some(n), open.as_array().map(|a| a.len()));
        }
    }

    #[test]
    fn test_decode_array_mixed_and_nested() {
        let xml = "<value><array><data>\
                   <value>a</value>\
                   <value><array><data><value><boolean>0</boolean></value></data></array></value>\
                   </data></array></value>";
        assert_eq!(
            Value::Array(vec![
                Value::String("a".to_string()),
                Value::Array(vec![Value::Boolean(false)]),
            ]),
            decode::<Value>(xml).unwrap()
        );
    }

    #[test]
    fn test_decode_tuple_rejects_extra_elements() {
        let xml = "<value><array><data>\
                   <value><int>1</int></value><value><int>2</int></value><value><int>3</int></value>\
                   </data></array></value>";
        assert_eq!((1, 2, 3), decode::<(i32, i32, i32)>(xml).unwrap());
        assert!(decode::<(i32, i32)>(xml).is_err());
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Record {
        name: String,
        #[serde(rename = "type")]
        kind: String,
        ttl: Option<i32>,
    }

    #[test]
    fn test_decode_record_in_any_member_order() {
        let xml = "<value><struct>\
                   <member><name>type</name><value><string>A</string></value></member>\
                   <member><name>name</name><value>www</value></member>\
                   </struct></value>";
        assert_eq!(
            Record {
                name: "www".to_string(),
                kind: "A".to_string(),
                ttl: None,
            },
            decode::<Record>(xml).unwrap()
        );
    }

    #[test]
    fn test_decode_record_rejects_unknown_member() {
        let xml = "<value><struct>\
                   <member><name>name</name><value>www</value></member>\
                   <member><name>type</name><value>A</value></member>\
                   <member><name>Name</name><value>www</value></member>\
                   </struct></value>";
        let err = decode::<Record>(xml).unwrap_err();
        assert_eq!("cannot find struct field named Name", err.reason());
    }

    #[test]
    fn test_decode_record_honours_rename_only() {
        // the Rust field name is not a wire name once renamed
        let xml = "<value><struct>\
                   <member><name>name</name><value>www</value></member>\
                   <member><name>kind</name><value>A</value></member>\
                   </struct></value>";
        assert!(decode::<Record>(xml).is_err());
    }

    #[test]
    fn test_decode_record_rejects_array() {
        #[derive(Deserialize, Debug)]
        struct Pair {
            a: i32,
        }
        let xml = "<value><array><data><value><int>1</int></value></data></array></value>";
        let err = decode::<Pair>(xml).unwrap_err();
        assert_eq!("cannot decode xmlrpc array into struct", err.reason());
    }

    #[test]
    fn test_decode_map_and_open_struct() {
        let xml = "<value><struct>\
                   <member><name>a</name><value><int>1</int></value></member>\
                   <member><name>b</name><value><i8>2</i8></value></member>\
                   </struct></value>";
        let map = decode::<HashMap<String, i64>>(xml).unwrap();
        assert_eq!(2, map.len());
        assert_eq!(Some(&2), map.get("b"));

        let open = decode::<Value>(xml).unwrap();
        assert_eq!(Some(&Value::Int(1)), open.get("a"));
        assert_eq!(Some(&Value::Int64(2)), open.get("b"));
    }

    #[test]
    fn test_decode_struct_structure_errors() {
        assert!(decode::<Value>("<value><struct><member><value>1</value></member></struct></value>").is_err());
        assert!(decode::<Value>("<value><struct><member><name>a</name><value>1</value></struct></value>").is_err());
        assert!(decode::<Value>("<value><array><value>1</value></array></value>").is_err());
        assert!(decode::<Value>("<value><int>1</i4></value>").is_err());
    }

    #[test]
    fn test_decode_unit_enum_from_text() {
        #[derive(Deserialize, Debug, PartialEq)]
        enum Kind {
            A,
            Cname,
        }
        assert_eq!(Kind::Cname, decode::<Kind>("<value>Cname</value>").unwrap());
        assert_eq!(Kind::A, decode::<Kind>("<value><string>A</string></value>").unwrap());
        assert!(decode::<Kind>("<value>MX</value>").is_err());
        assert!(decode::<Kind>("<value><int>1</int></value>").is_err());
    }
}
