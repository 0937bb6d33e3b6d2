//! [`Merge`] implementations for the field kinds a manifest is built from.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde_yaml::Value;

use super::Merge;
use crate::error::OverlayError;
use crate::union::{AOrB, IsZero, Union};

macro_rules! impl_merge_for_scalars {
    ($($ty:ty),*) => {
        $(
            impl Merge for $ty {
                fn merge(&mut self, patch: &Self) -> Result<(), OverlayError> {
                    if !patch.is_zero() {
                        self.clone_from(patch);
                    }
                    Ok(())
                }

                fn merge_present(&mut self, patch: &Self) -> Result<(), OverlayError> {
                    self.clone_from(patch);
                    Ok(())
                }
            }
        )*
    };
}

impl_merge_for_scalars!(String, bool, u8, u16, u32, u64, i32, i64, f64);

impl<T: Merge + Clone> Merge for Option<T> {
    fn merge(&mut self, patch: &Self) -> Result<(), OverlayError> {
        match (self.as_mut(), patch) {
            (_, None) => Ok(()),
            (Some(base), Some(patch)) => base.merge_present(patch),
            (None, Some(patch)) => {
                *self = Some(patch.clone());
                Ok(())
            }
        }
    }
}

impl<T: Clone> Merge for Vec<T> {
    fn merge(&mut self, patch: &Self) -> Result<(), OverlayError> {
        if !patch.is_empty() {
            self.clone_from(patch);
        }
        Ok(())
    }

    fn merge_present(&mut self, patch: &Self) -> Result<(), OverlayError> {
        self.clone_from(patch);
        Ok(())
    }
}

impl<K, V> Merge for BTreeMap<K, V>
where
    K: Ord + Clone + Display,
    V: Merge + Clone,
{
    fn merge(&mut self, patch: &Self) -> Result<(), OverlayError> {
        for (key, value) in patch {
            match self.get_mut(key) {
                Some(base) => base
                    .merge(value)
                    .map_err(|err| err.within(&key.to_string()))?,
                None => {
                    self.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }
}

impl<P, S> Merge for Union<P, S>
where
    P: Merge + Clone,
    S: Merge + Clone,
{
    fn merge(&mut self, patch: &Self) -> Result<(), OverlayError> {
        match (&mut *self, patch) {
            (_, Self::Unset) => Ok(()),
            (Self::Plain(base), Self::Plain(patch)) => base.merge_present(patch),
            (Self::Structured(base), Self::Structured(patch)) => base.merge(patch),
            _ => {
                self.clone_from(patch);
                Ok(())
            }
        }
    }
}

impl<A: Clone, B: Clone> Merge for AOrB<A, B> {
    fn merge(&mut self, patch: &Self) -> Result<(), OverlayError> {
        if !patch.is_unset() {
            self.clone_from(patch);
        }
        Ok(())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => format!("<{}>", kind_of(other)),
    }
}

// Free-form values: mappings merge by key, anything else replaces, and a
// mapping may only be overridden by another mapping.
impl Merge for Value {
    fn merge(&mut self, patch: &Self) -> Result<(), OverlayError> {
        if patch.is_null() {
            return Ok(());
        }

        if let (Self::Mapping(base), Self::Mapping(patch)) = (&mut *self, patch) {
            for (key, value) in patch {
                match base.get_mut(key) {
                    Some(existing) => existing
                        .merge(value)
                        .map_err(|err| err.within(&key_label(key)))?,
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
            return Ok(());
        }

        if !self.is_null() && (self.is_mapping() || patch.is_mapping()) {
            return Err(OverlayError::conflict(
                "",
                format!(
                    "cannot override a {} with a {}",
                    kind_of(self),
                    kind_of(patch)
                ),
            ));
        }

        self.clone_from(patch);
        Ok(())
    }
}

/// Implements [`Merge`] for a record by merging each listed field in turn.
/// Conflicts are reported with the field name prepended to their path.
macro_rules! impl_merge {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::overlay::Merge for $ty {
            fn merge(
                &mut self,
                patch: &Self,
            ) -> ::core::result::Result<(), $crate::error::OverlayError> {
                $(
                    $crate::overlay::Merge::merge(&mut self.$field, &patch.$field)
                        .map_err(|err| err.within(stringify!($field)))?;
                )*
                ::core::result::Result::Ok(())
            }
        }
    };
}

pub(crate) use impl_merge;

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_present_scalar_replaces_with_zero() {
        let mut base = Some(String::from("linux/amd64"));
        base.merge(&Some(String::new())).unwrap();
        assert_eq!(base.as_deref(), Some(""));
    }

    #[test]
    fn test_union_same_variant_structured_merges() {
        let mut base: Union<u32, BTreeMap<String, String>> = Union::Structured(BTreeMap::from([
            (String::from("range"), String::from("1-10")),
        ]));
        let patch = Union::Structured(BTreeMap::from([(
            String::from("spot_from"),
            String::from("2"),
        )]));
        base.merge(&patch).unwrap();

        let merged = base.structured().unwrap();
        assert_eq!(merged["range"], "1-10");
        assert_eq!(merged["spot_from"], "2");
    }

    #[test]
    fn test_union_variant_switch_replaces() {
        let mut base: Union<u32, BTreeMap<String, String>> = Union::Plain(1);
        let patch = Union::Structured(BTreeMap::from([(
            String::from("range"),
            String::from("1-4"),
        )]));
        base.merge(&patch).unwrap();
        assert_eq!(base, patch);

        base.merge(&Union::Unset).unwrap();
        assert_eq!(base, patch);

        base.merge(&Union::Plain(3)).unwrap();
        assert_eq!(base, Union::Plain(3));
    }

    #[test]
    fn test_a_or_b_replaced_when_set() {
        let mut base: AOrB<String, Vec<String>> = AOrB::A(String::from("npm start"));
        base.merge(&AOrB::Unset).unwrap();
        assert!(base.is_a());

        base.merge(&AOrB::B(vec![String::from("node"), String::from("app.js")]))
            .unwrap();
        assert!(base.is_b());
    }

    #[test]
    fn test_value_mappings_merge_deeply() {
        let mut base = yaml("logging:\n  driver: awsfirelens\n  options:\n    Name: cloudwatch\n");
        let patch = yaml("logging:\n  options:\n    region: us-west-2\n");
        base.merge(&patch).unwrap();
        assert_eq!(
            base,
            yaml(
                "logging:\n  driver: awsfirelens\n  options:\n    Name: cloudwatch\n    region: us-west-2\n"
            )
        );
    }

    #[test]
    fn test_value_mapping_replaced_by_scalar_conflicts() {
        let mut base = yaml("logging:\n  driver: awsfirelens\n");
        let patch = yaml("logging: disabled\n");
        let err = base.merge(&patch).unwrap_err();
        assert_eq!(
            err,
            OverlayError::conflict("logging", "cannot override a mapping with a string")
        );
    }

    #[test]
    fn test_value_null_base_takes_patch() {
        let mut base = yaml("sidecar: ~\n");
        base.merge(&yaml("sidecar:\n  image: nginx\n")).unwrap();
        assert_eq!(base, yaml("sidecar:\n  image: nginx\n"));
    }

    #[test]
    fn test_map_conflict_path_includes_key() {
        let mut base = BTreeMap::from([(String::from("xray"), yaml("enabled: true"))]);
        let patch = BTreeMap::from([(String::from("xray"), yaml("[1, 2]"))]);
        let err = base.merge(&patch).unwrap_err();
        assert_eq!(
            err,
            OverlayError::conflict("xray", "cannot override a mapping with a sequence")
        );
    }
}
