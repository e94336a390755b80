use chrono::{NaiveDate, TimeDelta, TimeZone};
use chrono_tz::{Tz, UTC};

use crate::{
    convert::{unexpected_type, FromSql, ToSql},
    types::Type,
    Result, Value,
};

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

/// Wrapper type for Clickhouse `Date` type. Days since 1970-01-01.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Debug, Default)]
pub struct Date(pub u16);

impl ToSql for Date {
    fn to_sql(self, _type_hint: Option<&Type>) -> Result<Value> {
        Ok(Value::Date(self))
    }
}

impl FromSql for Date {
    fn from_sql(type_: &Type, value: Value) -> Result<Self> {
        if !matches!(type_, Type::Date) {
            return Err(unexpected_type(type_));
        }
        match value {
            Value::Date(x) => Ok(x),
            _ => unimplemented!(),
        }
    }
}

impl From<Date> for NaiveDate {
    fn from(date: Date) -> Self {
        epoch() + TimeDelta::days(date.0 as i64)
    }
}

impl From<NaiveDate> for Date {
    fn from(other: NaiveDate) -> Self {
        Self(other.signed_duration_since(epoch()).num_days() as u16)
    }
}

/// Wrapper type for Clickhouse `Date32` type. Signed days since 1970-01-01, covering
/// the extended range `1900-01-01` to `2299-12-31`.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Debug, Default)]
pub struct Date32(pub i32);

impl ToSql for Date32 {
    fn to_sql(self, _type_hint: Option<&Type>) -> Result<Value> {
        Ok(Value::Date32(self.0))
    }
}

impl FromSql for Date32 {
    fn from_sql(type_: &Type, value: Value) -> Result<Self> {
        if !matches!(type_, Type::Date32) {
            return Err(unexpected_type(type_));
        }
        match value {
            Value::Date32(x) => Ok(Self(x)),
            _ => unimplemented!(),
        }
    }
}

impl From<Date32> for NaiveDate {
    fn from(date: Date32) -> Self {
        epoch() + TimeDelta::days(date.0 as i64)
    }
}

impl From<NaiveDate> for Date32 {
    fn from(other: NaiveDate) -> Self {
        Self(other.signed_duration_since(epoch()).num_days() as i32)
    }
}

/// Wrapper type for Clickhouse `DateTime` type. Seconds since the epoch, in a given timezone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DateTime(pub Tz, pub u32);

impl ToSql for DateTime {
    fn to_sql(self, _type_hint: Option<&Type>) -> Result<Value> {
        Ok(Value::DateTime(self))
    }
}

impl FromSql for DateTime {
    fn from_sql(type_: &Type, value: Value) -> Result<Self> {
        if !matches!(type_, Type::DateTime(_)) {
            return Err(unexpected_type(type_));
        }
        match value {
            Value::DateTime(x) => Ok(x),
            _ => unimplemented!(),
        }
    }
}

impl Default for DateTime {
    fn default() -> Self {
        Self(UTC, 0)
    }
}

impl From<DateTime> for chrono::DateTime<Tz> {
    fn from(date: DateTime) -> Self {
        let utc = chrono::DateTime::from_timestamp(date.1 as i64, 0).unwrap();
        utc.with_timezone(&date.0)
    }
}

impl From<chrono::DateTime<Tz>> for DateTime {
    fn from(other: chrono::DateTime<Tz>) -> Self {
        Self(other.timezone(), other.timestamp() as u32)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DateTime {
    fn from(other: chrono::DateTime<chrono::Utc>) -> Self {
        Self(chrono_tz::UTC, other.timestamp() as u32)
    }
}

/// A timezone-and-precision-carrying `DateTime64` value: `(timezone, raw ticks, precision)`.
///
/// Precision is the number of sub-second decimal digits (0-9); `raw` counts ticks of
/// `10^-precision` seconds since the epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DynDateTime64(pub Tz, pub u64, pub usize);

/// Wrapper type for Clickhouse `DateTime64(PRECISION)` type, with the precision carried
/// statically so it can round-trip through [`FromSql`]/[`ToSql`] without a runtime check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DateTime64<const PRECISION: usize>(pub Tz, pub u64);

impl<const PRECISION: usize> ToSql for DateTime64<PRECISION> {
    fn to_sql(self, _type_hint: Option<&Type>) -> Result<Value> {
        Ok(Value::DateTime64(DynDateTime64(self.0, self.1, PRECISION)))
    }
}

impl<const PRECISION: usize> FromSql for DateTime64<PRECISION> {
    fn from_sql(type_: &Type, value: Value) -> Result<Self> {
        if !matches!(type_, Type::DateTime64(p, _) if *p == PRECISION) {
            return Err(unexpected_type(type_));
        }
        match value {
            Value::DateTime64(DynDateTime64(tz, raw, _)) => Ok(Self(tz, raw)),
            _ => unimplemented!(),
        }
    }
}

impl<const PRECISION: usize> Default for DateTime64<PRECISION> {
    fn default() -> Self {
        Self(UTC, 0)
    }
}

impl<const PRECISION: usize> From<DateTime64<PRECISION>> for chrono::DateTime<Tz> {
    fn from(date: DateTime64<PRECISION>) -> Self {
        let scale = 10i64.pow(PRECISION as u32);
        let secs = date.1 as i64 / scale;
        let nanos = (date.1 as i64 % scale) * 10i64.pow(9 - PRECISION as u32);
        let utc = chrono::DateTime::from_timestamp(secs, nanos as u32).unwrap();
        utc.with_timezone(&date.0)
    }
}

impl<const PRECISION: usize> From<chrono::DateTime<Tz>> for DateTime64<PRECISION> {
    fn from(other: chrono::DateTime<Tz>) -> Self {
        let scale = 10i64.pow(PRECISION as u32);
        let raw = other.timestamp() * scale
            + (other.timestamp_subsec_nanos() as i64) / 10i64.pow(9 - PRECISION as u32);
        Self(other.timezone(), raw as u64)
    }
}

#[cfg(test)]
mod chrono_tests {
    use super::*;
    use chrono_tz::UTC;

    #[test]
    fn test_date() {
        for i in 0..30000u16 {
            let date = Date(i);
            let naive_date: NaiveDate = date.into();
            let new_date = Date::from(naive_date);
            assert_eq!(new_date, date);
        }
    }

    #[test]
    fn test_datetime() {
        for i in (0..30000u32).map(|x| x * 10000) {
            let date = DateTime(UTC, i);
            let chrono_date: chrono::DateTime<Tz> = date.into();
            let new_date = DateTime::from(chrono_date);
            assert_eq!(new_date, date);
        }
    }

    #[test]
    fn test_consistency_with_convert_for_str() {
        let test_date = "2022-04-22 00:00:00";

        let dt = chrono::NaiveDateTime::parse_from_str(test_date, "%Y-%m-%d %H:%M:%S").unwrap();

        let chrono_date = dt.and_utc().with_timezone(&UTC);

        let date = DateTime(UTC, dt.and_utc().timestamp() as u32);

        let new_chrono_date: chrono::DateTime<Tz> = date.into();

        assert_eq!(new_chrono_date, chrono_date);
    }

    #[test]
    fn test_datetime64_roundtrip() {
        let date = DateTime64::<3>(UTC, 1_650_585_600_123);
        let chrono_date: chrono::DateTime<Tz> = date.into();
        let new_date = DateTime64::<3>::from(chrono_date);
        assert_eq!(new_date, date);
    }
}
