//! The record capability: field tables and scan slots for mappable structs.
//!
//! A [`Record`] describes its settable fields in declaration order and hands
//! out one mutable [`Scan`] slot per field. Implement it by hand or let the
//! [`record!`](crate::record!) macro generate it alongside the struct.

use crate::scan::Scan;

/// A settable field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Rust field name.
    pub name: &'static str,

    /// Explicit column name; overrides name normalization when present.
    pub tag: Option<&'static str>,
}

impl FieldDef {
    pub const fn new(name: &'static str, tag: Option<&'static str>) -> Self {
        Self { name, tag }
    }
}

/// A fixed-shape struct the mapper can populate from a result row.
///
/// `scan_targets` must return exactly one slot per entry of `fields`, in the
/// same order.
pub trait Record: Default + Send {
    /// Settable fields in declaration order.
    fn fields() -> &'static [FieldDef];

    /// Mutable slots for every field, in the order of [`Record::fields`].
    fn scan_targets(&mut self) -> Vec<&mut dyn Scan>;
}

/// Declares a struct and implements [`Record`] for it.
///
/// A field may carry an explicit column name with a trailing `as "column"`.
/// Every field type must implement [`FromValue`](crate::scan::FromValue) and
/// the struct must implement `Default`.
///
/// ```
/// hsql::record! {
///     #[derive(Debug, Default)]
///     pub struct UserInfo {
///         pub id: i64 as "id",
///         pub front_cover: String,
///         pub balance: Option<i64>,
///     }
/// }
///
/// use hsql::Record;
/// assert_eq!(UserInfo::fields()[0].tag, Some("id"));
/// assert_eq!(UserInfo::fields()[1].name, "front_cover");
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty $(as $tag:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            fn fields() -> &'static [$crate::FieldDef] {
                const FIELDS: &[$crate::FieldDef] = &[
                    $($crate::FieldDef::new(stringify!($field), $crate::__record_tag!($($tag)?)),)*
                ];
                FIELDS
            }

            fn scan_targets(&mut self) -> ::std::vec::Vec<&mut dyn $crate::Scan> {
                ::std::vec![$(&mut self.$field as &mut dyn $crate::Scan),*]
            }
        }

        impl<'a> ::std::convert::From<&'a mut $name> for $crate::Destination<'a, $name> {
            fn from(record: &'a mut $name) -> Self {
                $crate::Destination::One(record)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_tag {
    () => {
        ::std::option::Option::None
    };
    ($tag:literal) => {
        ::std::option::Option::Some($tag)
    };
}
