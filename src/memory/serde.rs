/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of ZXBUS, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Utilities for serializing memory banks as base64 strings or just bytes in binary serializers.
use core::fmt;
use std::borrow::Cow;

use base64::{Engine as _, engine::general_purpose};
use serde::{
    Serialize, Serializer, Deserialize, Deserializer,
    ser::SerializeSeq,
    de::{self, Visitor}
};

/// Serializes a list of memory banks, each as a base64 string for human
/// readable formats or as raw bytes for binary ones.
pub fn serialize_banks<S>(banks: &[Box<[u8]>], serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer
{
    let mut seq = serializer.serialize_seq(Some(banks.len()))?;
    for bank in banks {
        seq.serialize_element(&BankRef(bank))?;
    }
    seq.end()
}

/// Deserializes a list of memory banks serialized with [serialize_banks].
pub fn deserialize_banks<'de, D>(deserializer: D) -> Result<Vec<Box<[u8]>>, D::Error>
    where D: Deserializer<'de>
{
    let banks: Vec<Bank> = Deserialize::deserialize(deserializer)?;
    Ok(banks.into_iter().map(|Bank(buf)| buf).collect())
}

struct BankRef<'a>(&'a [u8]);

impl<'a> Serialize for BankRef<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&general_purpose::STANDARD.encode(self.0))
        }
        else {
            serializer.serialize_bytes(self.0)
        }
    }
}

struct Bank(Box<[u8]>);

impl<'de> Deserialize<'de> for Bank {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            Deserialize::deserialize(deserializer).and_then(|string: Cow<str>|
                general_purpose::STANDARD.decode(&*string).map_err(de::Error::custom)
            )
            .map(|buf| Bank(buf.into_boxed_slice()))
        }
        else {
            deserializer.deserialize_byte_buf(ByteBufVisitor)
                        .map(|buf| Bank(buf.into_boxed_slice()))
        }
    }
}

struct ByteBufVisitor;

impl Visitor<'_> for ByteBufVisitor {
    type Value = Vec<u8>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a byte array")
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(Vec::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(Vec::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Vec::from(v))
    }
}
