//! Reading staged rows back into records
//!
//! Query results arrive as JSON objects keyed by column name. The decoder
//! maps them onto the descriptor's columns, then re-keys them by record field
//! so `serde` can rebuild the original record type.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::descriptor::DatasetDescriptor;
use super::encoder::cell_from_json;
use crate::models::Row;
use crate::sql::SerializationError;

/// Decodes query rows using a descriptor's columns
#[derive(Debug, Clone, Copy)]
pub struct RowDecoder<'a> {
    descriptor: &'a DatasetDescriptor,
}

impl<'a> RowDecoder<'a> {
    pub fn new(descriptor: &'a DatasetDescriptor) -> Self {
        Self { descriptor }
    }

    /// Convert one result row (keyed by column name) to a typed row
    pub fn decode_row(&self, index: usize, value: &Value) -> Result<Row, SerializationError> {
        let columns = value
            .as_object()
            .ok_or_else(|| SerializationError::InvalidRecord {
                index,
                reason: "result row is not an object".to_string(),
            })?;

        self.descriptor
            .columns()
            .iter()
            .map(|column| match columns.get(&column.name) {
                Some(v) => cell_from_json(column, v),
                None => Ok(crate::models::Cell::Null),
            })
            .collect()
    }

    /// Field map for a typed row, skipping constant columns
    pub fn to_record_value(&self, row: &Row) -> Value {
        let mut fields = Map::new();
        for (column, cell) in self.descriptor.columns().iter().zip(row) {
            if let Some(field) = column.field() {
                fields.insert(field.to_string(), cell.to_json());
            }
        }
        Value::Object(fields)
    }

    /// Rebuild a record from one result row
    pub fn decode<R: DeserializeOwned>(&self, index: usize, value: &Value) -> Result<R, SerializationError> {
        let row = self.decode_row(index, value)?;
        serde_json::from_value(self.to_record_value(&row)).map_err(|e| {
            SerializationError::InvalidRecord {
                index,
                reason: e.to_string(),
            }
        })
    }

    /// Rebuild every record of a result set
    pub fn decode_all<R: DeserializeOwned>(&self, rows: &[Value]) -> Result<Vec<R>, SerializationError> {
        rows.iter()
            .enumerate()
            .map(|(index, value)| self.decode(index, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::{ColumnSpec, RowEncoder};
    use crate::models::{BrokerSecurityMapping, Cell, ColumnType};
    use chrono::NaiveDate;
    use serde_json::json;

    fn descriptor() -> DatasetDescriptor {
        DatasetDescriptor::builder("broker_security_mappings")
            .staging_table("stg_broker_security_map")
            .column(ColumnSpec::text("broker_code").required())
            .column(ColumnSpec::text("security_id").required())
            .column(ColumnSpec::text("ticker"))
            .column(ColumnSpec::text("cusip"))
            .column(ColumnSpec::text("isin"))
            .column(ColumnSpec::date("updated_on"))
            .column(ColumnSpec::constant(
                "source",
                ColumnType::Text,
                Cell::Text("fund-publish".into()),
            ))
            .move_procedure("usp_update_broker_security_map", false)
            .build()
            .unwrap()
    }

    #[test]
    fn test_decode_result_row() {
        let descriptor = descriptor();
        let decoder = RowDecoder::new(&descriptor);
        let mapping: BrokerSecurityMapping = decoder
            .decode(
                0,
                &json!({
                    "broker_code": "GS",
                    "security_id": "S-1",
                    "ticker": "O'NEIL",
                    "cusip": null,
                    "updated_on": "2024-06-03",
                    "source": "fund-publish"
                }),
            )
            .unwrap();

        assert_eq!(mapping.ticker.as_deref(), Some("O'NEIL"));
        assert_eq!(mapping.isin, None);
        assert_eq!(mapping.updated_on, NaiveDate::from_ymd_opt(2024, 6, 3));
    }

    #[test]
    fn test_encode_then_decode() {
        let descriptor = descriptor();
        let mapping = BrokerSecurityMapping {
            broker_code: "MS".into(),
            security_id: "S-9".into(),
            ticker: Some("XYZ".into()),
            cusip: Some("123456789".into()),
            isin: None,
            updated_on: None,
        };

        let row = RowEncoder::new(&descriptor).encode(0, &mapping).unwrap();
        let decoder = RowDecoder::new(&descriptor);
        let back: BrokerSecurityMapping =
            serde_json::from_value(decoder.to_record_value(&row)).unwrap();
        assert_eq!(back, mapping);
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let descriptor = descriptor();
        let result: Result<BrokerSecurityMapping, _> =
            RowDecoder::new(&descriptor).decode(2, &json!("GS"));
        assert!(matches!(
            result,
            Err(SerializationError::InvalidRecord { index: 2, .. })
        ));
    }
}
