use tokio::io::AsyncWriteExt;

use crate::{io::ClickhouseWrite, values::Value, KlickhouseError, Result};

use super::{Serializer, SerializerState, Type};

pub struct MapSerializer;

impl Serializer for MapSerializer {
    async fn write_prefix<W: ClickhouseWrite>(
        type_: &Type,
        writer: &mut W,
        state: &mut SerializerState,
    ) -> Result<()> {
        match type_ {
            Type::Map(key, value) => {
                let nested = Type::Array(Box::new(Type::Tuple(vec![
                    (**key).clone(),
                    (**value).clone(),
                ])));
                nested.serialize_prefix(writer, state).await?;
            }
            _ => unimplemented!(),
        }
        Ok(())
    }

    async fn write<W: ClickhouseWrite>(
        type_: &Type,
        values: Vec<Value>,
        writer: &mut W,
        state: &mut SerializerState,
    ) -> Result<()> {
        let (key_type, value_type) = match type_ {
            Type::Map(key_type, value_type) => (&**key_type, &**value_type),
            _ => unimplemented!(),
        };
        // Maps are wire-identical to `Array(Tuple(K, V))`: a cumulative offset
        // per row followed by the flattened key and value columns.
        let mut offset = 0u64;
        let mut all_keys = Vec::with_capacity(values.len());
        let mut all_values = Vec::with_capacity(values.len());
        for value in values {
            match value {
                Value::Map(keys, values) => {
                    offset += keys.len() as u64;
                    writer.write_u64_le(offset).await?;
                    all_keys.extend(keys);
                    all_values.extend(values);
                }
                _ => {
                    return Err(KlickhouseError::SerializeError(format!(
                        "MapSerializer called with non-map value for {type_:?}"
                    )))
                }
            }
        }
        key_type.serialize_column(all_keys, writer, state).await?;
        value_type.serialize_column(all_values, writer, state).await?;
        Ok(())
    }
}
