//! Zero-value predicate.
//!
//! A value is "zero" when it carries no information: `0`, `""`, `false`,
//! `None`, an empty collection, or a record whose fields are all zero.

use std::collections::{BTreeMap, HashMap};

/// Types that can tell whether they hold their zero value.
pub trait IsZero {
    /// Returns true if the value is the zero value for its type.
    fn is_zero(&self) -> bool;
}

macro_rules! impl_is_zero_for_numbers {
    ($($ty:ty),*) => {
        $(
            impl IsZero for $ty {
                fn is_zero(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

impl_is_zero_for_numbers!(u8, u16, u32, u64, usize, i8, i16, i32, i64);

impl IsZero for f64 {
    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl IsZero for bool {
    fn is_zero(&self) -> bool {
        !*self
    }
}

impl IsZero for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsZero for Option<T> {
    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

impl<T> IsZero for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> IsZero for BTreeMap<K, V> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S> IsZero for HashMap<K, V, S> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for serde_yaml::Value {
    fn is_zero(&self) -> bool {
        self.is_null()
    }
}

/// Implements [`IsZero`] for a record: zero iff every listed field is zero.
macro_rules! impl_is_zero {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::union::IsZero for $ty {
            fn is_zero(&self) -> bool {
                true $(&& $crate::union::IsZero::is_zero(&self.$field))*
            }
        }
    };
}

pub(crate) use impl_is_zero;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Range {
        min: u32,
        max: u32,
        spot_from: Option<u32>,
    }

    impl_is_zero!(Range { min, max, spot_from });

    #[test]
    fn test_primitive_zero_values() {
        assert!(0u32.is_zero());
        assert!(!256u32.is_zero());
        assert!(String::new().is_zero());
        assert!(!String::from("x").is_zero());
        assert!(false.is_zero());
        assert!(None::<bool>.is_zero());
        assert!(!Some(false).is_zero());
        assert!(Vec::<String>::new().is_zero());
        assert!(serde_yaml::Value::Null.is_zero());
    }

    #[test]
    fn test_record_zero_requires_all_fields_zero() {
        assert!(Range::default().is_zero());

        let range = Range {
            spot_from: Some(0),
            ..Range::default()
        };
        assert!(!range.is_zero());

        let range = Range {
            max: 10,
            ..Range::default()
        };
        assert!(!range.is_zero());
    }
}
