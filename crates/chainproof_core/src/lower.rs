//! Lowering of `Serialize` values into the JSON data model.
//!
//! `serde_json::to_value` maps NaN and infinities to `null` and stringifies
//! integer map keys, both of which would let distinct values share a
//! canonical encoding. This serializer rejects those cases instead and bounds
//! nesting so that self-referential `Serialize` impls fail rather than
//! overflow the stack.

use crate::error::EncodingError;
use serde::ser::{self, Serialize};
use serde_json::{Map, Number, Value};

/// Lower a value into a `serde_json::Value`, nesting at most `max_depth`
/// containers deep.
///
/// # Errors
///
/// Returns error for non-finite floats, non-string map keys, excessive
/// nesting, or a failing `Serialize` impl.
pub fn to_value<T: Serialize + ?Sized>(value: &T, max_depth: usize) -> Result<Value, EncodingError> {
    value.serialize(Lowering {
        depth: 0,
        limit: max_depth,
    })
}

#[derive(Clone, Copy)]
struct Lowering {
    depth: usize,
    limit: usize,
}

impl Lowering {
    fn enter(self) -> Result<Self, EncodingError> {
        if self.depth >= self.limit {
            return Err(EncodingError::DepthExceeded { limit: self.limit });
        }
        Ok(Self {
            depth: self.depth + 1,
            limit: self.limit,
        })
    }
}

fn key_string(key: Value) -> Result<String, EncodingError> {
    match key {
        Value::String(s) => Ok(s),
        Value::Null => Err(EncodingError::NonStringKey { kind: "null" }),
        Value::Bool(_) => Err(EncodingError::NonStringKey { kind: "bool" }),
        Value::Number(_) => Err(EncodingError::NonStringKey { kind: "number" }),
        Value::Array(_) => Err(EncodingError::NonStringKey { kind: "sequence" }),
        Value::Object(_) => Err(EncodingError::NonStringKey { kind: "mapping" }),
    }
}

fn tagged(variant: &'static str, inner: Value) -> Value {
    let mut map = Map::new();
    map.insert(variant.to_owned(), inner);
    Value::Object(map)
}

impl ser::Serializer for Lowering {
    type Ok = Value;
    type Error = EncodingError;
    type SerializeSeq = SeqLowering;
    type SerializeTuple = SeqLowering;
    type SerializeTupleStruct = SeqLowering;
    type SerializeTupleVariant = VariantSeqLowering;
    type SerializeMap = MapLowering;
    type SerializeStruct = MapLowering;
    type SerializeStructVariant = VariantMapLowering;

    fn serialize_bool(self, v: bool) -> Result<Value, EncodingError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, EncodingError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, EncodingError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, EncodingError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, EncodingError> {
        Ok(Value::Number(Number::from(v)))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, EncodingError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, EncodingError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, EncodingError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, EncodingError> {
        Ok(Value::Number(Number::from(v)))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, EncodingError> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, EncodingError> {
        Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| EncodingError::NonFinite {
                value: format!("{v:?}"),
            })
    }

    fn serialize_char(self, v: char) -> Result<Value, EncodingError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, EncodingError> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, EncodingError> {
        Ok(Value::Array(
            v.iter().map(|b| Value::Number(Number::from(*b))).collect(),
        ))
    }

    fn serialize_none(self) -> Result<Value, EncodingError> {
        Ok(Value::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value, EncodingError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, EncodingError> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, EncodingError> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, EncodingError> {
        Ok(Value::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, EncodingError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, EncodingError> {
        let inner = value.serialize(self.enter()?)?;
        Ok(tagged(variant, inner))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqLowering, EncodingError> {
        Ok(SeqLowering {
            child: self.enter()?,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqLowering, EncodingError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqLowering, EncodingError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSeqLowering, EncodingError> {
        // One level for the variant wrapper, one for the sequence.
        let child = self.enter()?.enter()?;
        Ok(VariantSeqLowering {
            variant,
            inner: SeqLowering {
                child,
                items: Vec::with_capacity(len),
            },
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapLowering, EncodingError> {
        Ok(MapLowering {
            child: self.enter()?,
            map: Map::new(),
            pending_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapLowering, EncodingError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantMapLowering, EncodingError> {
        let child = self.enter()?.enter()?;
        Ok(VariantMapLowering {
            variant,
            inner: MapLowering {
                child,
                map: Map::new(),
                pending_key: None,
            },
        })
    }
}

struct SeqLowering {
    child: Lowering,
    items: Vec<Value>,
}

impl SeqLowering {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodingError> {
        self.items.push(value.serialize(self.child)?);
        Ok(())
    }
}

impl ser::SerializeSeq for SeqLowering {
    type Ok = Value;
    type Error = EncodingError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodingError> {
        self.push(value)
    }

    fn end(self) -> Result<Value, EncodingError> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SeqLowering {
    type Ok = Value;
    type Error = EncodingError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodingError> {
        self.push(value)
    }

    fn end(self) -> Result<Value, EncodingError> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTupleStruct for SeqLowering {
    type Ok = Value;
    type Error = EncodingError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodingError> {
        self.push(value)
    }

    fn end(self) -> Result<Value, EncodingError> {
        Ok(Value::Array(self.items))
    }
}

struct VariantSeqLowering {
    variant: &'static str,
    inner: SeqLowering,
}

impl ser::SerializeTupleVariant for VariantSeqLowering {
    type Ok = Value;
    type Error = EncodingError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodingError> {
        self.inner.push(value)
    }

    fn end(self) -> Result<Value, EncodingError> {
        Ok(tagged(self.variant, Value::Array(self.inner.items)))
    }
}

struct MapLowering {
    child: Lowering,
    map: Map<String, Value>,
    pending_key: Option<String>,
}

impl ser::SerializeMap for MapLowering {
    type Ok = Value;
    type Error = EncodingError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), EncodingError> {
        let key = key.serialize(self.child)?;
        self.pending_key = Some(key_string(key)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodingError> {
        let key = self.pending_key.take().ok_or_else(|| EncodingError::Unserializable {
            reason: "map value serialized before its key".to_string(),
        })?;
        self.map.insert(key, value.serialize(self.child)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodingError> {
        Ok(Value::Object(self.map))
    }
}

impl ser::SerializeStruct for MapLowering {
    type Ok = Value;
    type Error = EncodingError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodingError> {
        self.map.insert(key.to_owned(), value.serialize(self.child)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodingError> {
        Ok(Value::Object(self.map))
    }
}

struct VariantMapLowering {
    variant: &'static str,
    inner: MapLowering,
}

impl ser::SerializeStructVariant for VariantMapLowering {
    type Ok = Value;
    type Error = EncodingError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodingError> {
        self.inner
            .map
            .insert(key.to_owned(), value.serialize(self.inner.child)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodingError> {
        Ok(tagged(self.variant, Value::Object(self.inner.map)))
    }
}
