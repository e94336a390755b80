use tokio::io::AsyncReadExt;

use crate::{io::ClickhouseRead, values::Value, Result};

use super::{Deserializer, DeserializerState, Type};

/// Shared batch-decode for types whose wire format is a cumulative `u64`
/// offset per row followed by a single flattened inner column -- same
/// shape as `Array(T)` itself. `Ring`/`Polygon`/`MultiPolygon` reuse this
/// via the `array_deser!` macro in `geo.rs`.
pub trait ArrayDeserializerGeneric {
    type Item;

    fn inner_type(type_: &Type) -> &Type;
    fn inner_value(items: Vec<Self::Item>) -> Value;
    fn item_mapping(value: Value) -> Self::Item;
}

pub struct ArrayDeserializer;
impl ArrayDeserializerGeneric for ArrayDeserializer {
    type Item = Value;

    fn inner_type(type_: &Type) -> &Type {
        type_.unwrap_array()
    }

    fn inner_value(items: Vec<Self::Item>) -> Value {
        Value::Array(items)
    }

    fn item_mapping(value: Value) -> Self::Item {
        value
    }
}

impl<T: ArrayDeserializerGeneric + 'static> Deserializer for T {
    async fn read_prefix<R: ClickhouseRead>(
        type_: &Type,
        reader: &mut R,
        state: &mut DeserializerState,
    ) -> Result<()> {
        T::inner_type(type_).deserialize_prefix(reader, state).await
    }

    async fn read<R: ClickhouseRead>(
        type_: &Type,
        reader: &mut R,
        rows: usize,
        state: &mut DeserializerState,
    ) -> Result<Vec<Value>> {
        let inner_type = T::inner_type(type_);
        let mut offsets = Vec::with_capacity(rows);
        for _ in 0..rows {
            offsets.push(reader.read_u64_le().await?);
        }
        let total = offsets.last().copied().unwrap_or(0) as usize;
        let mut flat = inner_type
            .deserialize_column(reader, total, state)
            .await?
            .into_iter()
            .map(T::item_mapping);

        let mut out = Vec::with_capacity(rows);
        let mut prev = 0u64;
        for offset in offsets {
            let len = (offset - prev) as usize;
            prev = offset;
            let items = (&mut flat).take(len).collect::<Vec<_>>();
            out.push(T::inner_value(items));
        }
        Ok(out)
    }
}
