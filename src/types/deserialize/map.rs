use tokio::io::AsyncReadExt;

use crate::{io::ClickhouseRead, values::Value, Result};

use super::{Deserializer, DeserializerState, Type};

pub struct MapDeserializer;

impl Deserializer for MapDeserializer {
    async fn read_prefix<R: ClickhouseRead>(
        type_: &Type,
        reader: &mut R,
        state: &mut DeserializerState,
    ) -> Result<()> {
        match type_ {
            Type::Map(key, value) => {
                let nested = Type::Array(Box::new(Type::Tuple(vec![
                    (**key).clone(),
                    (**value).clone(),
                ])));
                nested.deserialize_prefix(reader, state).await?;
            }
            _ => unimplemented!(),
        }
        Ok(())
    }

    async fn read<R: ClickhouseRead>(
        type_: &Type,
        reader: &mut R,
        rows: usize,
        state: &mut DeserializerState,
    ) -> Result<Vec<Value>> {
        let (key_type, value_type) = match type_ {
            Type::Map(key, value) => (&**key, &**value),
            _ => unimplemented!(),
        };
        let mut offsets = Vec::with_capacity(rows);
        for _ in 0..rows {
            offsets.push(reader.read_u64_le().await?);
        }
        let total = offsets.last().copied().unwrap_or(0) as usize;
        let mut keys = key_type
            .deserialize_column(reader, total, state)
            .await?
            .into_iter();
        let mut values = value_type
            .deserialize_column(reader, total, state)
            .await?
            .into_iter();

        let mut out = Vec::with_capacity(rows);
        let mut prev = 0u64;
        for offset in offsets {
            let len = (offset - prev) as usize;
            prev = offset;
            let row_keys = (&mut keys).take(len).collect::<Vec<_>>();
            let row_values = (&mut values).take(len).collect::<Vec<_>>();
            out.push(Value::Map(row_keys, row_values));
        }
        Ok(out)
    }
}
