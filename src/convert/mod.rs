use std::borrow::Cow;

use indexmap::IndexMap;

use crate::{types::Type, KlickhouseError, Result, Value};

mod json;
mod raw_row;
mod std_deserialize;
mod std_serialize;
mod unit_value;
mod vec_tuple;

pub use json::Json;
pub use raw_row::{RawRow, RowIndex};
pub use unit_value::UnitValue;
pub use vec_tuple::VecTuple;

/// A type that can be converted to a raw Clickhouse SQL value.
///
/// `type_hint` carries the column's declared type when one is known (e.g.
/// while serializing an insert block against a known schema), so types with
/// more than one wire representation for the same Rust value (`Decimal`,
/// `Bytes`) can pick the right one. It is `None` for dynamically-typed rows.
pub trait ToSql {
    fn to_sql(self, type_hint: Option<&Type>) -> Result<Value>;
}

impl ToSql for Value {
    fn to_sql(self, _type_hint: Option<&Type>) -> Result<Value> {
        Ok(self)
    }
}

pub fn unexpected_type(type_: &Type) -> KlickhouseError {
    KlickhouseError::DeserializeError(format!("unexpected type: {}", type_))
}

/// A type that can be converted from a raw Clickhouse SQL value.
pub trait FromSql: Sized {
    fn from_sql(type_: &Type, value: Value) -> Result<Self>;
}

impl FromSql for Value {
    fn from_sql(_type_: &Type, value: Value) -> Result<Self> {
        Ok(value)
    }
}

/// A row that can be deserialized from, and serialized to, the columns of a
/// block. Usually implemented for a plain struct by hand for a handful of
/// fields; `RawRow` and `UnitValue` cover the dynamically-typed and
/// single-column cases.
pub trait Row: Sized {
    /// Number of columns this row always produces, if fixed.
    const COLUMN_COUNT: Option<usize>;

    /// Column names this row expects to read, in order, if known ahead of
    /// query execution (used to build a `SELECT <names>` when the caller
    /// only supplies `FROM`-style SQL). `None` means "whatever the server
    /// sends back".
    fn column_names() -> Option<Vec<Cow<'static, str>>> {
        None
    }

    fn deserialize_row(map: Vec<(&str, &Type, Value)>) -> Result<Self>;

    fn serialize_row(self, type_hints: &IndexMap<String, Type>) -> Result<Vec<(Cow<'static, str>, Value)>>;
}
