// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::ser::{self, Impossible, Serialize};
use xml::escape::escape_str_pcdata;

use crate::error::ProtocolError;
use crate::xmlrpc::value::DATETIME_TOKEN;

pub type EncodeResult = Result<(), ProtocolError>;

/// Shortcut function to encode a `T` into one XML `<value>` fragment
pub fn encode<T: Serialize + ?Sized>(object: &T) -> Result<String, ProtocolError> {
    let mut s = String::new();
    {
        let mut encoder = Encoder::new(&mut s);
        object.serialize(&mut encoder)?;
    }
    Ok(s)
}

fn escape_str<W: fmt::Write>(wr: &mut W, v: &str) -> EncodeResult {
    wr.write_str(escape_str_pcdata(v).as_ref())?;
    Ok(())
}

fn unsupported(what: &str) -> ProtocolError {
    ProtocolError::new(format!("don't know how to encode {}", what))
}

/// A structure for implementing serialization to XML-RPC.
///
/// Every value is written wrapped in its own `<value>` element.
pub struct Encoder<'a, W: fmt::Write + 'a> {
    writer: &'a mut W,
    datetime: bool,
}

impl<'a, W: fmt::Write> Encoder<'a, W> {
    /// Creates a new XML-RPC encoder whose output will be written to the writer
    /// specified.
    pub fn new(writer: &'a mut W) -> Encoder<'a, W> {
        Encoder {
            writer: writer,
            datetime: false,
        }
    }

    fn scalar(&mut self, tag: &str, text: &str) -> EncodeResult {
        write!(self.writer, "<value><{}>", tag)?;
        escape_str(self.writer, text)?;
        write!(self.writer, "</{}></value>", tag)?;
        Ok(())
    }
}

impl<'a, 'b, W: fmt::Write> ser::Serializer for &'b mut Encoder<'a, W> {
    type Ok = ();
    type Error = ProtocolError;

    type SerializeSeq = Compound<'a, 'b, W>;
    type SerializeTuple = Compound<'a, 'b, W>;
    type SerializeTupleStruct = Compound<'a, 'b, W>;
    type SerializeTupleVariant = Impossible<(), ProtocolError>;
    type SerializeMap = Compound<'a, 'b, W>;
    type SerializeStruct = Compound<'a, 'b, W>;
    type SerializeStructVariant = Impossible<(), ProtocolError>;

    fn serialize_bool(self, v: bool) -> EncodeResult {
        self.scalar("boolean", if v { "1" } else { "0" })
    }

    fn serialize_i8(self, v: i8) -> EncodeResult {
        self.serialize_i32(v as i32)
    }
    fn serialize_i16(self, v: i16) -> EncodeResult {
        self.serialize_i32(v as i32)
    }
    fn serialize_i32(self, v: i32) -> EncodeResult {
        self.scalar("int", &v.to_string())
    }
    fn serialize_i64(self, v: i64) -> EncodeResult {
        self.scalar("i8", &v.to_string())
    }

    fn serialize_u8(self, v: u8) -> EncodeResult {
        self.serialize_u32(v as u32)
    }
    fn serialize_u16(self, v: u16) -> EncodeResult {
        self.serialize_u32(v as u32)
    }
    fn serialize_u32(self, v: u32) -> EncodeResult {
        self.scalar("int", &v.to_string())
    }
    // a strict peer reads i8 as signed, so values above i64::MAX won't survive
    fn serialize_u64(self, v: u64) -> EncodeResult {
        self.scalar("i8", &v.to_string())
    }

    fn serialize_f32(self, v: f32) -> EncodeResult {
        self.serialize_f64(v as f64)
    }
    fn serialize_f64(self, v: f64) -> EncodeResult {
        self.scalar("double", &format!("{:.6}", v))
    }

    fn serialize_char(self, v: char) -> EncodeResult {
        let mut buf = [0; 4];
        self.serialize_str(v.encode_utf8(&mut buf))
    }

    fn serialize_str(self, v: &str) -> EncodeResult {
        if self.datetime {
            self.datetime = false;
            return self.scalar("dateTime.iso8601", v);
        }
        self.writer.write_str("<value>")?;
        escape_str(self.writer, v)?;
        self.writer.write_str("</value>")?;
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> EncodeResult {
        self.scalar("base64", &STANDARD.encode(v))
    }

    fn serialize_none(self) -> EncodeResult {
        Err(unsupported("None, XML-RPC has no nil"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> EncodeResult {
        value.serialize(self)
    }

    fn serialize_unit(self) -> EncodeResult {
        Err(unsupported("()"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> EncodeResult {
        Err(unsupported(name))
    }

    // enums without data are encoded as their variant name
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> EncodeResult {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> EncodeResult {
        if name == DATETIME_TOKEN {
            self.datetime = true;
            let res = value.serialize(&mut *self);
            self.datetime = false;
            return res;
        }
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _index: u32,
        variant: &'static str,
        _value: &T,
    ) -> EncodeResult {
        Err(unsupported(&format!("enum variant {}::{}", name, variant)))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ProtocolError> {
        self.writer.write_str("<value><array><data>")?;
        Ok(Compound { encoder: self })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, ProtocolError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, ProtocolError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, ProtocolError> {
        Err(unsupported(&format!("enum variant {}::{}", name, variant)))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ProtocolError> {
        self.writer.write_str("<value><struct>")?;
        Ok(Compound { encoder: self })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, ProtocolError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, ProtocolError> {
        Err(unsupported(&format!("enum variant {}::{}", name, variant)))
    }
}

#[doc(hidden)]
pub struct Compound<'a, 'b, W: fmt::Write + 'a> {
    encoder: &'b mut Encoder<'a, W>,
}

impl<'a, 'b, W: fmt::Write> Compound<'a, 'b, W> {
    fn member_name(&mut self, name: &str) -> EncodeResult {
        self.encoder.writer.write_str("<member><name>")?;
        escape_str(self.encoder.writer, name)?;
        self.encoder.writer.write_str("</name>")?;
        Ok(())
    }
}

impl<'a, 'b, W: fmt::Write> ser::SerializeSeq for Compound<'a, 'b, W> {
    type Ok = ();
    type Error = ProtocolError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> EncodeResult {
        value.serialize(&mut *self.encoder)
    }

    fn end(self) -> EncodeResult {
        self.encoder.writer.write_str("</data></array></value>")?;
        Ok(())
    }
}

impl<'a, 'b, W: fmt::Write> ser::SerializeTuple for Compound<'a, 'b, W> {
    type Ok = ();
    type Error = ProtocolError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> EncodeResult {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> EncodeResult {
        ser::SerializeSeq::end(self)
    }
}

impl<'a, 'b, W: fmt::Write> ser::SerializeTupleStruct for Compound<'a, 'b, W> {
    type Ok = ();
    type Error = ProtocolError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> EncodeResult {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> EncodeResult {
        ser::SerializeSeq::end(self)
    }
}

impl<'a, 'b, W: fmt::Write> ser::SerializeMap for Compound<'a, 'b, W> {
    type Ok = ();
    type Error = ProtocolError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> EncodeResult {
        let name = key.serialize(MemberName)?;
        self.member_name(&name)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> EncodeResult {
        value.serialize(&mut *self.encoder)?;
        self.encoder.writer.write_str("</member>")?;
        Ok(())
    }

    fn end(self) -> EncodeResult {
        self.encoder.writer.write_str("</struct></value>")?;
        Ok(())
    }
}

impl<'a, 'b, W: fmt::Write> ser::SerializeStruct for Compound<'a, 'b, W> {
    type Ok = ();
    type Error = ProtocolError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> EncodeResult {
        self.member_name(key)?;
        ser::SerializeMap::serialize_value(self, value)
    }

    fn end(self) -> EncodeResult {
        ser::SerializeMap::end(self)
    }
}

/// Accepts only string-like map keys.
struct MemberName;

fn key_must_be_a_string() -> ProtocolError {
    ProtocolError::new("cannot encode maps with non-strings as keys")
}

impl ser::Serializer for MemberName {
    type Ok = String;
    type Error = ProtocolError;

    type SerializeSeq = Impossible<String, ProtocolError>;
    type SerializeTuple = Impossible<String, ProtocolError>;
    type SerializeTupleStruct = Impossible<String, ProtocolError>;
    type SerializeTupleVariant = Impossible<String, ProtocolError>;
    type SerializeMap = Impossible<String, ProtocolError>;
    type SerializeStruct = Impossible<String, ProtocolError>;
    type SerializeStructVariant = Impossible<String, ProtocolError>;

    fn serialize_str(self, v: &str) -> Result<String, ProtocolError> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String, ProtocolError> {
        Ok(v.to_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<String, ProtocolError> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, ProtocolError> {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_i8(self, _v: i8) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_i16(self, _v: i16) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_i32(self, _v: i32) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_i64(self, _v: i64) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_u8(self, _v: u8) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_u16(self, _v: u16) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_u32(self, _v: u32) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_u64(self, _v: u64) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_f32(self, _v: f32) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_f64(self, _v: f64) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_bytes(self, _v: &[u8]) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_none(self) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_unit(self) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, ProtocolError> {
        Err(key_must_be_a_string())
    }
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, ProtocolError> {
        Err(key_must_be_a_string())
    }
}
