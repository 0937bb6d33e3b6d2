//! `serde`-compatible deserializer over a raw YAML value.
//!
//! Decoding goes through this deserializer instead of `serde_yaml`'s own so
//! that failures come back as [`DecodeError`], which keeps type mismatches
//! apart from every other kind of error.

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer,
    value::{MapDeserializer, SeqDeserializer},
};
use serde_yaml::{Mapping, Number, Value};

use crate::error::DecodeError;

/// Decodes a raw YAML value into `T`.
///
/// # Errors
///
/// Returns [`DecodeError::ShapeMismatch`] if the value's structure does not fit
/// `T`, and [`DecodeError::Malformed`] for any other failure.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, DecodeError> {
    T::deserialize(ValueDeserializer::new(value))
}

fn unexpected(value: &Value) -> de::Unexpected<'_> {
    match value {
        Value::Null => de::Unexpected::Unit,
        Value::Bool(value) => de::Unexpected::Bool(*value),
        Value::Number(number) => {
            if let Some(value) = number.as_u64() {
                de::Unexpected::Unsigned(value)
            } else if let Some(value) = number.as_i64() {
                de::Unexpected::Signed(value)
            } else if let Some(value) = number.as_f64() {
                de::Unexpected::Float(value)
            } else {
                de::Unexpected::Other("number")
            }
        }
        Value::String(s) => de::Unexpected::Str(s),
        Value::Sequence(_) => de::Unexpected::Seq,
        Value::Mapping(_) => de::Unexpected::Map,
        Value::Tagged(_) => de::Unexpected::Other("tagged value"),
    }
}

fn visit_number<'de, V: de::Visitor<'de>>(
    number: &Number,
    visitor: V,
) -> Result<V::Value, DecodeError> {
    if let Some(value) = number.as_u64() {
        visitor.visit_u64(value)
    } else if let Some(value) = number.as_i64() {
        visitor.visit_i64(value)
    } else if let Some(value) = number.as_f64() {
        visitor.visit_f64(value)
    } else {
        Err(DecodeError::malformed(format_args!("unsupported number {number}")))
    }
}

/// Deserializer borrowing a single YAML value.
#[derive(Debug, Clone, Copy)]
pub struct ValueDeserializer<'a> {
    value: &'a Value,
}

impl<'a> ValueDeserializer<'a> {
    /// Wraps a raw value. Tags (`!Tag value`) are looked through.
    #[must_use]
    pub fn new(mut value: &'a Value) -> Self {
        while let Value::Tagged(tagged) = value {
            value = &tagged.value;
        }
        Self { value }
    }

    fn invalid_type(&self, expected: &str) -> DecodeError {
        de::Error::invalid_type(unexpected(self.value), &expected)
    }

    fn parse_sequence<'de, V: de::Visitor<'de>>(
        items: &[Value],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        let mut deserializer = SeqDeserializer::new(items.iter().map(ValueDeserializer::new));
        let seq = visitor.visit_seq(&mut deserializer)?;
        deserializer.end()?;
        Ok(seq)
    }

    fn parse_mapping<'de, V: de::Visitor<'de>>(
        mapping: &Mapping,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        let mut deserializer = MapDeserializer::new(
            mapping
                .iter()
                .map(|(key, value)| (ValueDeserializer::new(key), ValueDeserializer::new(value))),
        );
        let map = visitor.visit_map(&mut deserializer)?;
        deserializer.end()?;
        Ok(map)
    }
}

impl<'de> Deserializer<'de> for ValueDeserializer<'_> {
    type Error = DecodeError;

    fn deserialize_any<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(value) => visitor.visit_bool(*value),
            Value::Number(number) => visit_number(number, visitor),
            Value::String(s) => visitor.visit_str(s),
            Value::Sequence(items) => Self::parse_sequence(items, visitor),
            Value::Mapping(mapping) => Self::parse_mapping(mapping, visitor),
            Value::Tagged(_) => Err(self.invalid_type("untagged value")),
        }
    }

    fn deserialize_option<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: de::Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Sequence(items) => Self::parse_sequence(items, visitor),
            Value::Null => Self::parse_sequence(&[], visitor),
            _ => Err(self.invalid_type("a sequence")),
        }
    }

    fn deserialize_tuple<V: de::Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: de::Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Mapping(mapping) => Self::parse_mapping(mapping, visitor),
            Value::Null => Self::parse_mapping(&Mapping::new(), visitor),
            _ => Err(self.invalid_type("a mapping")),
        }
    }

    fn deserialize_struct<V: de::Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: de::Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let (variant, value) = match self.value {
            Value::String(s) => (s.as_str(), None),
            Value::Mapping(mapping) if mapping.len() == 1 => match mapping.iter().next() {
                Some((Value::String(variant), value)) => (variant.as_str(), Some(value)),
                _ => return Err(self.invalid_type("a string or a mapping with a single key")),
            },
            _ => return Err(self.invalid_type("a string or a mapping with a single key")),
        };
        visitor.visit_enum(EnumDeserializer { variant, value })
    }

    fn deserialize_bool<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Bool(value) => visitor.visit_bool(*value),
            _ => Err(self.invalid_type("a boolean")),
        }
    }

    fn deserialize_i8<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_number(visitor)
    }

    fn deserialize_i16<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_number(visitor)
    }

    fn deserialize_i32<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_number(visitor)
    }

    fn deserialize_i64<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_number(visitor)
    }

    fn deserialize_u8<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_number(visitor)
    }

    fn deserialize_u16<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_number(visitor)
    }

    fn deserialize_u32<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_number(visitor)
    }

    fn deserialize_u64<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_number(visitor)
    }

    fn deserialize_f32<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_number(visitor)
    }

    fn deserialize_f64<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_number(visitor)
    }

    // Scalars decode into strings the way YAML authors expect: `port: 80`
    // may still feed a string field.
    fn deserialize_string<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::String(s) => visitor.visit_str(s),
            Value::Bool(value) => visitor.visit_string(value.to_string()),
            Value::Number(number) => visitor.visit_string(number.to_string()),
            _ => Err(self.invalid_type("a string")),
        }
    }

    fn deserialize_str<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_char<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_bytes<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::String(s) => visitor.visit_bytes(s.as_bytes()),
            Value::Sequence(items) => Self::parse_sequence(items, visitor),
            _ => Err(self.invalid_type("a string or a sequence")),
        }
    }

    fn deserialize_byte_buf<V: de::Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_identifier<V: de::Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_unit<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            _ => Err(self.invalid_type("null")),
        }
    }

    fn deserialize_unit_struct<V: de::Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_ignored_any<V: de::Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}

impl ValueDeserializer<'_> {
    fn deserialize_number<'de, V: de::Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::Number(number) => visit_number(number, visitor),
            _ => Err(self.invalid_type("a number")),
        }
    }
}

impl IntoDeserializer<'_, DecodeError> for ValueDeserializer<'_> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

#[derive(Debug)]
struct EnumDeserializer<'a> {
    variant: &'a str,
    value: Option<&'a Value>,
}

impl<'a, 'de> de::EnumAccess<'de> for EnumDeserializer<'a> {
    type Error = DecodeError;
    type Variant = VariantDeserializer<'a>;

    fn variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<(T::Value, Self::Variant), Self::Error> {
        let variant: de::value::StrDeserializer<'_, DecodeError> =
            self.variant.into_deserializer();
        let tag = seed.deserialize(variant)?;
        Ok((tag, VariantDeserializer { value: self.value }))
    }
}

#[derive(Debug)]
struct VariantDeserializer<'a> {
    value: Option<&'a Value>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer<'_> {
    type Error = DecodeError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        match self.value {
            None | Some(Value::Null) => Ok(()),
            Some(value) => Err(de::Error::invalid_type(unexpected(value), &"unit variant")),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, Self::Error> {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(de::Error::invalid_type(
                de::Unexpected::UnitVariant,
                &"newtype variant",
            )),
        }
    }

    fn tuple_variant<V: de::Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.value {
            Some(value) => ValueDeserializer::new(value).deserialize_seq(visitor),
            None => Err(de::Error::invalid_type(
                de::Unexpected::UnitVariant,
                &"tuple variant",
            )),
        }
    }

    fn struct_variant<V: de::Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.value {
            Some(value) => ValueDeserializer::new(value).deserialize_map(visitor),
            None => Err(de::Error::invalid_type(
                de::Unexpected::UnitVariant,
                &"struct variant",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Range {
        #[serde(default)]
        min: u32,
        #[serde(default)]
        max: u32,
    }

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_decode_struct() {
        let range: Range = from_value(&yaml("min: 1\nmax: 10")).unwrap();
        assert_eq!(range, Range { min: 1, max: 10 });
    }

    #[test]
    fn test_scalar_into_struct_is_shape_mismatch() {
        let err = from_value::<Range>(&yaml("\"1-10\"")).unwrap_err();
        assert!(err.is_shape_mismatch(), "{err}");
    }

    #[test]
    fn test_mapping_into_string_is_shape_mismatch() {
        let err = from_value::<String>(&yaml("a: b")).unwrap_err();
        assert!(err.is_shape_mismatch(), "{err}");
    }

    #[test]
    fn test_nested_type_mismatch_is_shape_mismatch() {
        let err = from_value::<Range>(&yaml("min: lots")).unwrap_err();
        assert!(err.is_shape_mismatch(), "{err}");
    }

    #[test]
    fn test_out_of_range_number_is_malformed() {
        let err = from_value::<u8>(&yaml("300")).unwrap_err();
        assert!(!err.is_shape_mismatch(), "{err}");
    }

    #[test]
    fn test_scalars_coerce_to_string() {
        let value: String = from_value(&yaml("8080")).unwrap();
        assert_eq!(value, "8080");
        let value: String = from_value(&yaml("true")).unwrap();
        assert_eq!(value, "true");
    }

    #[test]
    fn test_decode_collections() {
        let items: Vec<String> = from_value(&yaml("[a, b]")).unwrap();
        assert_eq!(items, ["a", "b"]);

        let map: BTreeMap<String, String> = from_value(&yaml("LOG_LEVEL: debug")).unwrap();
        assert_eq!(map["LOG_LEVEL"], "debug");
    }

    #[test]
    fn test_null_decodes_as_empty_collection() {
        let items: Vec<String> = from_value(&Value::Null).unwrap();
        assert!(items.is_empty());

        let map: BTreeMap<String, String> = from_value(&yaml("~")).unwrap();
        assert!(map.is_empty());

        let range: Range = from_value(&Value::Null).unwrap();
        assert_eq!(range, Range { min: 0, max: 0 });
    }

    #[test]
    fn test_decode_option() {
        let value: Option<bool> = from_value(&Value::Null).unwrap();
        assert_eq!(value, None);
        let value: Option<bool> = from_value(&yaml("false")).unwrap();
        assert_eq!(value, Some(false));
    }

    #[test]
    fn test_decode_unit_enum() {
        #[derive(Debug, Deserialize, PartialEq)]
        enum Protocol {
            #[serde(rename = "http")]
            Http,
            #[serde(rename = "grpc")]
            Grpc,
        }

        let protocol: Protocol = from_value(&yaml("grpc")).unwrap();
        assert_eq!(protocol, Protocol::Grpc);

        let err = from_value::<Protocol>(&yaml("smtp")).unwrap_err();
        assert!(!err.is_shape_mismatch(), "{err}");
    }
}
