use crate::{io::ClickhouseRead, values::Value, Result};

use super::{Deserializer, DeserializerState, Type};

pub struct TupleDeserializer;

impl Deserializer for TupleDeserializer {
    async fn read_prefix<R: ClickhouseRead>(
        type_: &Type,
        reader: &mut R,
        state: &mut DeserializerState,
    ) -> Result<()> {
        match type_ {
            Type::Tuple(inner) => {
                for item in inner {
                    item.deserialize_prefix(reader, state).await?;
                }
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
        let field_types = match type_ {
            Type::Tuple(inner) => inner,
            _ => unimplemented!(),
        };
        let mut columns = Vec::with_capacity(field_types.len());
        for field_type in field_types {
            columns.push(
                field_type
                    .deserialize_column(reader, rows, state)
                    .await?
                    .into_iter(),
            );
        }
        let mut out = Vec::with_capacity(rows);
        for _ in 0..rows {
            let fields = columns
                .iter_mut()
                .map(|column| column.next().unwrap())
                .collect();
            out.push(Value::Tuple(fields));
        }
        Ok(out)
    }
}
