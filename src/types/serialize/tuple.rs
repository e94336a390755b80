use crate::{io::ClickhouseWrite, values::Value, KlickhouseError, Result};

use super::{Serializer, SerializerState, Type};

pub struct TupleSerializer;

impl Serializer for TupleSerializer {
    async fn write_prefix<W: ClickhouseWrite>(
        type_: &Type,
        writer: &mut W,
        state: &mut SerializerState,
    ) -> Result<()> {
        match type_ {
            Type::Tuple(inner) => {
                for item in inner {
                    item.serialize_prefix(writer, state).await?;
                }
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
        let field_types = match type_ {
            Type::Tuple(inner) => inner,
            _ => unimplemented!(),
        };
        let mut columns: Vec<Vec<Value>> = field_types
            .iter()
            .map(|_| Vec::with_capacity(values.len()))
            .collect();
        for value in values {
            match value {
                Value::Tuple(fields) => {
                    if fields.len() != field_types.len() {
                        return Err(KlickhouseError::SerializeError(format!(
                            "tuple arity mismatch: got {} expected {}",
                            fields.len(),
                            field_types.len()
                        )));
                    }
                    for (column, field) in columns.iter_mut().zip(fields) {
                        column.push(field);
                    }
                }
                _ => {
                    return Err(KlickhouseError::SerializeError(format!(
                        "TupleSerializer called with non-tuple value for {type_:?}"
                    )))
                }
            }
        }
        for (field_type, column) in field_types.iter().zip(columns) {
            field_type.serialize_column(column, writer, state).await?;
        }
        Ok(())
    }
}
