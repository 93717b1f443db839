// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{
    self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor,
};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::error::ProtocolError;
use crate::xmlrpc::encoding;

/// Newtype-struct name the encoder and decoder recognise as `dateTime.iso8601`.
pub(crate) const DATETIME_TOKEN: &str = "$__xmlrpc_private_DateTime";

/// Newtype-struct name `Value` asks for, so the decoder knows it may hand
/// over a datetime.
pub(crate) const VALUE_TOKEN: &str = "$__xmlrpc_private_Value";

const ISO8601: &[FormatItem<'static>] =
    format_description!("[year][month][day]T[hour]:[minute]:[second]");

/// An XML-RPC `dateTime.iso8601`: `YYYYMMDDThh:mm:ss`, no offset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DateTime(pub PrimitiveDateTime);

impl DateTime {
    pub fn new(datetime: PrimitiveDateTime) -> DateTime {
        DateTime(datetime)
    }

    pub fn inner(&self) -> PrimitiveDateTime {
        self.0
    }
}

impl From<PrimitiveDateTime> for DateTime {
    fn from(datetime: PrimitiveDateTime) -> DateTime {
        DateTime(datetime)
    }
}

impl FromStr for DateTime {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<DateTime, ProtocolError> {
        PrimitiveDateTime::parse(s, ISO8601)
            .map(DateTime)
            .map_err(|e| ProtocolError::new(format!("invalid dateTime.iso8601 {:?}: {}", s, e)))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = self.0.format(ISO8601).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl Serialize for DateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(DATETIME_TOKEN, &self.to_string())
    }
}

impl<'de> Deserialize<'de> for DateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<DateTime, D::Error> {
        struct DateTimeVisitor;

        impl<'de> Visitor<'de> for DateTimeVisitor {
            type Value = DateTime;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a dateTime.iso8601 value")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<DateTime, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_newtype_struct<D>(self, d: D) -> Result<DateTime, D::Error>
            where
                D: Deserializer<'de>,
            {
                d.deserialize_str(self)
            }
        }

        deserializer.deserialize_newtype_struct(DATETIME_TOKEN, DateTimeVisitor)
    }
}

/// A raw byte sequence, carried on the wire as `<base64>`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Bytes {
        Bytes(bytes)
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        struct BytesVisitor;

        impl<'de> Visitor<'de> for BytesVisitor {
            type Value = Bytes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a base64 byte sequence")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Bytes, E> {
                Ok(Bytes(v.to_vec()))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Bytes, E> {
                Ok(Bytes(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Bytes, A::Error> {
                let mut bytes = Vec::new();
                while let Some(b) = seq.next_element()? {
                    bytes.push(b);
                }
                Ok(Bytes(bytes))
            }
        }

        deserializer.deserialize_byte_buf(BytesVisitor)
    }
}

pub type Array = Vec<Value>;
pub type Struct = BTreeMap<String, Value>;

/// Represents any XML-RPC value; the open decode target.
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Boolean(bool),
    Int(i32),
    Int64(i64),
    Double(f64),
    String(String),
    Base64(Vec<u8>),
    DateTime(DateTime),
    Array(Array),
    Struct(Struct),
}

impl Value {
    /// If the value is a Struct, returns the member named `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_struct().and_then(|members| members.get(key))
    }

    /// Follows `keys` through nested Structs.
    pub fn find_path(&self, keys: &[&str]) -> Option<&Value> {
        let mut target = self;
        for key in keys {
            target = target.get(key)?;
        }
        Some(target)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int(n) => Some(n),
            Value::Int64(n) if n >= i32::MIN as i64 && n <= i32::MAX as i64 => Some(n as i32),
            _ => None,
        }
    }

    /// Either integer width, widened.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(n) => Some(n as i64),
            Value::Int64(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(n) => Some(n as f64),
            Value::Double(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::String(ref s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match *self {
            Value::Base64(ref b) => Some(b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime> {
        match *self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match *self {
            Value::Array(ref a) => Some(a),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match *self {
            Value::Struct(ref s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! from_impl {
    ($($t:ty => $variant:ident),+) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Value { Value::$variant(v.into()) }
        })+
    }
}

from_impl! {
    bool => Boolean,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    u8 => Int,
    u16 => Int,
    i64 => Int64,
    u32 => Int64,
    f32 => Double,
    f64 => Double,
    String => String,
    Vec<u8> => Base64,
    DateTime => DateTime,
    Array => Array,
    Struct => Struct
}

impl<'a> From<&'a str> for Value {
    fn from(v: &'a str) -> Value {
        Value::String(v.to_string())
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Value {
        Value::Base64(v.0)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Value::Boolean(b) => serializer.serialize_bool(b),
            Value::Int(n) => serializer.serialize_i32(n),
            Value::Int64(n) => serializer.serialize_i64(n),
            Value::Double(n) => serializer.serialize_f64(n),
            Value::String(ref s) => serializer.serialize_str(s),
            Value::Base64(ref b) => serializer.serialize_bytes(b),
            Value::DateTime(ref dt) => dt.serialize(serializer),
            Value::Array(ref values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for v in values {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Value::Struct(ref members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (k, v) in members {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any XML-RPC value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Boolean(v))
    }

    fn visit_i8<E: de::Error>(self, v: i8) -> Result<Value, E> {
        Ok(Value::Int(v as i32))
    }

    fn visit_i16<E: de::Error>(self, v: i16) -> Result<Value, E> {
        Ok(Value::Int(v as i32))
    }

    fn visit_i32<E: de::Error>(self, v: i32) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int64(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        if v <= i64::MAX as u64 {
            Ok(Value::Int64(v as i64))
        } else {
            Err(E::custom(format!("integer {} does not fit in i8", v)))
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Double(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::Base64(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Base64(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut values = Vec::new();
        while let Some(v) = seq.next_element()? {
            values.push(v);
        }
        Ok(Value::Array(values))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut members = BTreeMap::new();
        while let Some((k, v)) = map.next_entry()? {
            members.insert(k, v);
        }
        Ok(Value::Struct(members))
    }

    // the decoder's datetime signal
    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Value, A::Error> {
        let (tag, variant): (String, A::Variant) = data.variant()?;
        if tag != DATETIME_TOKEN {
            return Err(de::Error::custom(format!("unexpected enum variant {}", tag)));
        }
        let text: String = variant.newtype_variant()?;
        text.parse().map(Value::DateTime).map_err(de::Error::custom)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<Value, D::Error> {
        d.deserialize_any(self)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_newtype_struct(VALUE_TOKEN, ValueVisitor)
    }
}

impl fmt::Display for Value {
    /// Encodes the value as its XML `<value>` fragment
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut encoder = encoding::Encoder::new(f);
        self.serialize(&mut encoder).map_err(|_| fmt::Error)
    }
}
