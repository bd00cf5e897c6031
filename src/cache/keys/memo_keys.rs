use std::fmt;

use serde::Serialize;
use serde::ser;
use sha2::{Digest, Sha256};

/// 根据参数的结构化序列化结果生成记忆化键
///
/// 先转换为 `serde_json::Value`，对象键按字典序排列，
/// 结构相同的参数得到相同的键。无法序列化时返回 `None`。
/// JSON 会把 NaN 和正负无穷都写成 `null`，含非有限浮点数的参数同样返回 `None`。
pub fn memo_key<A: Serialize + ?Sized>(args: &A) -> Option<String> {
    if let Err(e) = args.serialize(FiniteFloats) {
        tracing::warn!("Arguments not representable as a key, skipping memo cache: {}", e);
        return None;
    }
    let value = match serde_json::to_value(args) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Arguments not serializable, skipping memo cache: {}", e);
            return None;
        }
    };
    let bytes = serde_json::to_vec(&value).ok()?;
    let digest = Sha256::digest(&bytes);
    Some(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

#[derive(Debug)]
struct KeyError(String);

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for KeyError {}

impl ser::Error for KeyError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        KeyError(msg.to_string())
    }
}

/// 只遍历参数结构，遇到非有限浮点数时报错，不产生输出
#[derive(Clone, Copy)]
struct FiniteFloats;

impl FiniteFloats {
    fn check(value: f64) -> Result<(), KeyError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(KeyError(format!("non-finite float {}", value)))
        }
    }
}

impl ser::Serializer for FiniteFloats {
    type Ok = ();
    type Error = KeyError;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _: bool) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_i8(self, _: i8) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_i16(self, _: i16) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_i32(self, _: i32) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_i64(self, _: i64) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_u8(self, _: u8) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_u16(self, _: u16) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_u32(self, _: u32) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_u64(self, _: u64) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_f32(self, v: f32) -> Result<(), KeyError> {
        Self::check(f64::from(v))
    }
    fn serialize_f64(self, v: f64) -> Result<(), KeyError> {
        Self::check(v)
    }
    fn serialize_char(self, _: char) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_str(self, _: &str) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_bytes(self, _: &[u8]) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_none(self) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), KeyError> {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_unit_struct(self, _: &'static str) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Result<(), KeyError> {
        Ok(())
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<(), KeyError> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Result<(), KeyError> {
        value.serialize(self)
    }
    fn serialize_seq(self, _: Option<usize>) -> Result<Self, KeyError> {
        Ok(self)
    }
    fn serialize_tuple(self, _: usize) -> Result<Self, KeyError> {
        Ok(self)
    }
    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self, KeyError> {
        Ok(self)
    }
    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, KeyError> {
        Ok(self)
    }
    fn serialize_map(self, _: Option<usize>) -> Result<Self, KeyError> {
        Ok(self)
    }
    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self, KeyError> {
        Ok(self)
    }
    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, KeyError> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteFloats {
    type Ok = ();
    type Error = KeyError;
    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), KeyError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), KeyError> {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteFloats {
    type Ok = ();
    type Error = KeyError;
    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), KeyError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), KeyError> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteFloats {
    type Ok = ();
    type Error = KeyError;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), KeyError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), KeyError> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteFloats {
    type Ok = ();
    type Error = KeyError;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), KeyError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), KeyError> {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteFloats {
    type Ok = ();
    type Error = KeyError;
    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), KeyError> {
        key.serialize(*self)
    }
    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), KeyError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), KeyError> {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteFloats {
    type Ok = ();
    type Error = KeyError;
    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _: &'static str,
        value: &T,
    ) -> Result<(), KeyError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), KeyError> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteFloats {
    type Ok = ();
    type Error = KeyError;
    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _: &'static str,
        value: &T,
    ) -> Result<(), KeyError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), KeyError> {
        Ok(())
    }
}
