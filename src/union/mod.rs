//! Two-variant manifest fields.
//!
//! Many manifest keys accept either a short scalar form or a rich structured
//! form, e.g. `count: 3` versus `count: { range: 1-10, cpu_percentage: 70 }`.
//! [`Union`] and [`AOrB`] hold whichever form the document used and decide
//! between the two at decode time:
//!
//! 1. Try the plain form. On success the value is plain.
//! 2. If the plain form failed with a shape mismatch, try the structured form.
//! 3. Any other decode error stops immediately.
//! 4. If neither form matches, the value stays unset. This is not an error.
//!
//! [`Union`] additionally treats a decoded zero value as "no match", so an
//! empty plain result falls through to the structured form. [`AOrB`] accepts
//! any successful decode.

mod decode;
mod zero;

pub use decode::{ValueDeserializer, from_value};
pub(crate) use zero::impl_is_zero;
pub use zero::IsZero;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::DecodeError;

/// Borrowed view of whichever variant a two-variant field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant<'a, P, S> {
    /// The plain form.
    Plain(&'a P),
    /// The structured form.
    Structured(&'a S),
}

/// Result of a successful two-variant decode.
enum Decoded<P, S> {
    Unset,
    Plain(P),
    Structured(S),
}

fn attempt<T: DeserializeOwned>(
    raw: &Value,
    accept: fn(&T) -> bool,
) -> Result<Option<T>, DecodeError> {
    match from_value::<T>(raw) {
        Ok(value) if accept(&value) => Ok(Some(value)),
        Ok(_) => Ok(None),
        Err(err) if err.is_shape_mismatch() => Ok(None),
        Err(err) => Err(err),
    }
}

fn decode_either<P, S>(
    raw: &Value,
    accept_plain: fn(&P) -> bool,
    accept_structured: fn(&S) -> bool,
) -> Result<Decoded<P, S>, DecodeError>
where
    P: DeserializeOwned,
    S: DeserializeOwned,
{
    if let Some(plain) = attempt(raw, accept_plain)? {
        return Ok(Decoded::Plain(plain));
    }
    if let Some(structured) = attempt(raw, accept_structured)? {
        return Ok(Decoded::Structured(structured));
    }
    Ok(Decoded::Unset)
}

/// Converts a decode failure into another deserializer's error, keeping the
/// message without the variant prefix.
pub(crate) fn to_de_error<E: de::Error>(err: DecodeError) -> E {
    match err {
        DecodeError::ShapeMismatch { message } | DecodeError::Malformed { message } => {
            E::custom(message)
        }
    }
}

const fn accept_any<T>(_: &T) -> bool {
    true
}

fn accept_non_zero<T: IsZero>(value: &T) -> bool {
    !value.is_zero()
}

/// A field holding a plain value, a structured value, or nothing.
///
/// A plain or structured result that decodes to its zero value does not count
/// as a match. Both payload types therefore implement [`IsZero`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Union<P, S> {
    /// Neither form was present.
    Unset,
    /// The short scalar form.
    Plain(P),
    /// The rich structured form.
    Structured(S),
}

impl<P, S> Default for Union<P, S> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<P, S> Union<P, S> {
    /// Returns true if the plain form is set.
    #[must_use]
    pub const fn is_plain(&self) -> bool {
        matches!(self, Self::Plain(_))
    }

    /// Returns true if the structured form is set.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Returns true if neither form is set.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Returns the plain value, if set.
    #[must_use]
    pub const fn plain(&self) -> Option<&P> {
        match self {
            Self::Plain(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the structured value, if set.
    #[must_use]
    pub const fn structured(&self) -> Option<&S> {
        match self {
            Self::Structured(value) => Some(value),
            _ => None,
        }
    }

    /// Returns whichever form is set.
    #[must_use]
    pub const fn value(&self) -> Option<Variant<'_, P, S>> {
        match self {
            Self::Unset => None,
            Self::Plain(value) => Some(Variant::Plain(value)),
            Self::Structured(value) => Some(Variant::Structured(value)),
        }
    }
}

impl<P, S> Union<P, S>
where
    P: DeserializeOwned + IsZero,
    S: DeserializeOwned + IsZero,
{
    /// Decodes a raw document value, replacing whatever was held before.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] if either attempt fails for a reason
    /// other than a shape mismatch. The value is left unset in that case.
    pub fn decode(&mut self, raw: &Value) -> Result<(), DecodeError> {
        *self = Self::Unset;
        if raw.is_null() {
            return Ok(());
        }
        *self = match decode_either(raw, accept_non_zero::<P>, accept_non_zero::<S>)? {
            Decoded::Unset => Self::Unset,
            Decoded::Plain(value) => Self::Plain(value),
            Decoded::Structured(value) => Self::Structured(value),
        };
        Ok(())
    }
}

impl<P, S> IsZero for Union<P, S> {
    fn is_zero(&self) -> bool {
        self.is_unset()
    }
}

impl<'de, P, S> Deserialize<'de> for Union<P, S>
where
    P: DeserializeOwned + IsZero,
    S: DeserializeOwned + IsZero,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let mut union = Self::Unset;
        union.decode(&raw).map_err(to_de_error)?;
        Ok(union)
    }
}

impl<P: Serialize, S: Serialize> Serialize for Union<P, S> {
    fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
        match self {
            Self::Unset => serializer.serialize_none(),
            Self::Plain(value) => value.serialize(serializer),
            Self::Structured(value) => value.serialize(serializer),
        }
    }
}

/// A field holding either an `A` or a `B`, tried in that order.
///
/// Unlike [`Union`], any successful decode counts as a match, so the payload
/// types do not need a zero predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AOrB<A, B> {
    /// Neither form was present.
    Unset,
    /// The first form.
    A(A),
    /// The second form.
    B(B),
}

impl<A, B> Default for AOrB<A, B> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<A, B> AOrB<A, B> {
    /// Returns true if the first form is set.
    #[must_use]
    pub const fn is_a(&self) -> bool {
        matches!(self, Self::A(_))
    }

    /// Returns true if the second form is set.
    #[must_use]
    pub const fn is_b(&self) -> bool {
        matches!(self, Self::B(_))
    }

    /// Returns true if neither form is set.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Returns whichever form is set.
    #[must_use]
    pub const fn value(&self) -> Option<Variant<'_, A, B>> {
        match self {
            Self::Unset => None,
            Self::A(value) => Some(Variant::Plain(value)),
            Self::B(value) => Some(Variant::Structured(value)),
        }
    }
}

impl<A: DeserializeOwned, B: DeserializeOwned> AOrB<A, B> {
    /// Decodes a raw document value, replacing whatever was held before.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] if either attempt fails for a reason
    /// other than a shape mismatch.
    pub fn decode(&mut self, raw: &Value) -> Result<(), DecodeError> {
        *self = Self::Unset;
        // An empty key is absent, not an empty collection.
        if raw.is_null() {
            return Ok(());
        }
        *self = match decode_either(raw, accept_any::<A>, accept_any::<B>)? {
            Decoded::Unset => Self::Unset,
            Decoded::Plain(value) => Self::A(value),
            Decoded::Structured(value) => Self::B(value),
        };
        Ok(())
    }
}

impl<A, B> IsZero for AOrB<A, B> {
    fn is_zero(&self) -> bool {
        self.is_unset()
    }
}

impl<'de, A: DeserializeOwned, B: DeserializeOwned> Deserialize<'de> for AOrB<A, B> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let mut value = Self::Unset;
        value.decode(&raw).map_err(to_de_error)?;
        Ok(value)
    }
}

impl<A: Serialize, B: Serialize> Serialize for AOrB<A, B> {
    fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
        match self {
            Self::Unset => serializer.serialize_none(),
            Self::A(value) => value.serialize(serializer),
            Self::B(value) => value.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    struct Scaling {
        #[serde(default)]
        range: String,
        #[serde(default)]
        cpu_percentage: u32,
    }

    impl_is_zero!(Scaling { range, cpu_percentage });

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    struct Strict {
        #[serde(default)]
        range: String,
    }

    impl IsZero for Strict {
        fn is_zero(&self) -> bool {
            self.range.is_empty()
        }
    }

    impl Strict {
        fn check(range: &str) -> Result<Self, String> {
            if range.contains('-') {
                Ok(Self {
                    range: range.to_string(),
                })
            } else {
                Err(format!("invalid range {range}"))
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    #[serde(try_from = "String")]
    struct Checked(Strict);

    impl TryFrom<String> for Checked {
        type Error = String;

        fn try_from(value: String) -> Result<Self, Self::Error> {
            Strict::check(&value).map(Self)
        }
    }

    impl IsZero for Checked {
        fn is_zero(&self) -> bool {
            self.0.is_zero()
        }
    }

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_plain_value() {
        let mut count: Union<u32, Scaling> = Union::default();
        count.decode(&yaml("3")).unwrap();
        assert!(count.is_plain());
        assert!(!count.is_structured());
        assert_eq!(count.value(), Some(Variant::Plain(&3)));
    }

    #[test]
    fn test_structured_value() {
        let mut count: Union<u32, Scaling> = Union::default();
        count.decode(&yaml("range: 1-10\ncpu_percentage: 70")).unwrap();
        assert!(count.is_structured());
        assert_eq!(
            count.structured(),
            Some(&Scaling {
                range: String::from("1-10"),
                cpu_percentage: 70,
            })
        );
    }

    #[test]
    fn test_zero_plain_falls_through_to_unset() {
        let mut count: Union<u32, Scaling> = Union::default();
        count.decode(&yaml("0")).unwrap();
        assert!(count.is_unset());
        assert!(count.is_zero());
        assert_eq!(count.value(), None);
    }

    #[test]
    fn test_zero_plain_falls_through_to_structured() {
        // An empty mapping decodes as an all-empty plain record, so the
        // structured form gets its turn.
        let mut value: Union<Scaling, BTreeMap<String, String>> = Union::default();
        value.decode(&yaml("{}")).unwrap();
        assert!(value.is_unset());

        value.decode(&yaml("extra: field")).unwrap();
        assert!(value.is_structured());
    }

    #[test]
    fn test_neither_shape_is_unset_without_error() {
        let mut count: Union<u32, Scaling> = Union::default();
        count.decode(&yaml("[1, 2]")).unwrap();
        assert!(!count.is_plain());
        assert!(!count.is_structured());
    }

    #[test]
    fn test_decode_resets_previous_state() {
        let mut count: Union<u32, Scaling> = Union::default();
        count.decode(&yaml("5")).unwrap();
        assert!(count.is_plain());

        count.decode(&yaml("range: 1-4")).unwrap();
        assert!(count.is_structured());
        assert!(!count.is_plain());

        count.decode(&yaml("[]")).unwrap();
        assert!(count.is_unset());
    }

    #[test]
    fn test_malformed_plain_stops_decoding() {
        let mut value: Union<Checked, Scaling> = Union::Structured(Scaling::default());
        let err = value.decode(&yaml("not-a-range")).unwrap_err();
        assert!(!err.is_shape_mismatch());
        assert!(value.is_unset());
    }

    #[test]
    fn test_malformed_structured_propagates() {
        let mut value: Union<String, BTreeMap<String, Checked>> = Union::default();
        let err = value.decode(&yaml("spot: nope")).unwrap_err();
        assert_eq!(err, DecodeError::malformed("invalid range nope"));
    }

    #[test]
    fn test_a_or_b_accepts_zero_values() {
        let mut command: AOrB<String, Vec<String>> = AOrB::default();
        command.decode(&yaml("\"\"")).unwrap();
        assert!(command.is_a());

        command.decode(&yaml("[]")).unwrap();
        assert!(command.is_b());

        command.decode(&yaml("key: value")).unwrap();
        assert!(command.is_unset());
    }

    #[test]
    fn test_null_is_unset() {
        let mut command: AOrB<String, Vec<String>> = AOrB::A(String::from("npm start"));
        command.decode(&Value::Null).unwrap();
        assert!(command.is_unset());

        let mut count: Union<u32, Scaling> = Union::Plain(3);
        count.decode(&yaml("~")).unwrap();
        assert!(count.is_unset());
    }

    #[test]
    fn test_a_or_b_round_trip() {
        let values: [AOrB<String, Vec<String>>; 2] = [
            AOrB::A(String::from("npm run start")),
            AOrB::B(vec![
                String::from("/bin/sh"),
                String::from("-c"),
                String::from("echo hi"),
            ]),
        ];

        for value in values {
            let raw = serde_yaml::to_value(&value).unwrap();
            let mut decoded: AOrB<String, Vec<String>> = AOrB::default();
            decoded.decode(&raw).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(decoded.is_a(), value.is_a());
            assert_eq!(decoded.is_b(), value.is_b());
        }

        let raw = serde_yaml::to_value(AOrB::<String, Vec<String>>::Unset).unwrap();
        assert!(raw.is_null());
    }

    #[test]
    fn test_deserialize_as_field() {
        #[derive(Debug, Deserialize)]
        struct Service {
            #[serde(default)]
            count: Union<u32, Scaling>,
            #[serde(default)]
            command: AOrB<String, Vec<String>>,
        }

        let service: Service = serde_yaml::from_str("count:\n  range: 2-8\n").unwrap();
        assert!(service.count.is_structured());
        assert!(service.command.is_unset());

        let service: Service = serde_yaml::from_str("count:\n  range: [1]\n").unwrap();
        assert!(service.count.is_unset());

        let err = serde_yaml::from_str::<Service>("count:\n  cpu_percentage: 99999999999\n")
            .unwrap_err();
        assert!(err.to_string().contains("invalid value"), "{err}");
    }

    #[test]
    fn test_serialize_round_trip() {
        let values: [Union<u32, Scaling>; 2] = [
            Union::Plain(4),
            Union::Structured(Scaling {
                range: String::from("1-10"),
                cpu_percentage: 50,
            }),
        ];

        for value in values {
            let raw = serde_yaml::to_value(&value).unwrap();
            let mut decoded: Union<u32, Scaling> = Union::default();
            decoded.decode(&raw).unwrap();
            assert_eq!(decoded, value);
        }

        let raw = serde_yaml::to_value(Union::<u32, Scaling>::Unset).unwrap();
        assert!(raw.is_null());
    }
}
