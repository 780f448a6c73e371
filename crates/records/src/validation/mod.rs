//! Per-record validation persistence
//!
//! Two parallel artifacts per snapshot under `validation/`:
//!
//! - `records_batch_{N}.parquet`: full rows with the nested rule-fact
//!   list, batched exactly like the catalog stream;
//! - `validation_index.parquet`: the lightweight projection (no facts),
//!   fully rewritten on every flush.

mod reader;
mod registry;
mod writer;

pub use reader::ValidationReader;
pub use registry::ValidationWriterRegistry;
pub use writer::ValidationWriter;

use std::sync::Arc;

use arrow::array::{
    Array, ArrayBuilder, ArrayRef, BooleanArray, BooleanBuilder, Int32Array, Int32Builder,
    Int64Array, ListArray, ListBuilder, StringArray, StringBuilder, StructArray, StructBuilder,
};
use arrow::datatypes::{DataType, Field, Fields};
use arrow::record_batch::RecordBatch;

use oaistore_core::{RecordObservation, RecordValidation, Result, RuleFact, StoreError};

use crate::catalog::{bool_column, int64_column, string_column};

const FACTS_COLUMN: &str = "rule_facts_list";

fn occurrence_list_type() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
}

fn fact_fields() -> Fields {
    Fields::from(vec![
        Field::new("rule_id", DataType::Int32, false),
        Field::new("valid_occurrences", occurrence_list_type(), true),
        Field::new("invalid_occurrences", occurrence_list_type(), true),
        Field::new("is_valid", DataType::Boolean, false),
    ])
}

fn fact_struct_builder() -> StructBuilder {
    let builders: Vec<Box<dyn ArrayBuilder>> = vec![
        Box::new(Int32Builder::new()),
        Box::new(ListBuilder::new(StringBuilder::new())),
        Box::new(ListBuilder::new(StringBuilder::new())),
        Box::new(BooleanBuilder::new()),
    ];
    StructBuilder::new(fact_fields(), builders)
}

/// Encode full validation rows (nested facts) as one Arrow batch
pub(crate) fn validations_to_batch(rows: &[RecordValidation]) -> Result<RecordBatch> {
    let identifier: ArrayRef = Arc::new(StringArray::from_iter_values(
        rows.iter().map(|r| r.identifier.as_str()),
    ));
    let datestamp: ArrayRef = Arc::new(Int64Array::from_iter_values(
        rows.iter().map(|r| r.datestamp),
    ));
    let record_is_valid: ArrayRef = Arc::new(BooleanArray::from(
        rows.iter().map(|r| r.record_is_valid).collect::<Vec<bool>>(),
    ));
    let is_transformed: ArrayRef = Arc::new(BooleanArray::from(
        rows.iter().map(|r| r.is_transformed).collect::<Vec<bool>>(),
    ));
    let published: ArrayRef = Arc::new(StringArray::from(
        rows.iter()
            .map(|r| r.published_metadata_hash.as_deref())
            .collect::<Vec<Option<&str>>>(),
    ));

    let mut facts = ListBuilder::new(fact_struct_builder())
        .with_field(Field::new("fact", DataType::Struct(fact_fields()), true));
    for row in rows {
        if row.rule_facts.is_empty() {
            facts.append(false);
            continue;
        }
        for fact in &row.rule_facts {
            let fact_builder = facts.values();
            fact_builder
                .field_builder::<Int32Builder>(0)
                .expect("rule_id builder")
                .append_value(fact.rule_id);
            append_occurrences(fact_builder, 1, &fact.valid_occurrences);
            append_occurrences(fact_builder, 2, &fact.invalid_occurrences);
            fact_builder
                .field_builder::<BooleanBuilder>(3)
                .expect("is_valid builder")
                .append_value(fact.is_valid);
            fact_builder.append(true);
        }
        facts.append(true);
    }
    let facts: ArrayRef = Arc::new(facts.finish());

    RecordBatch::try_from_iter_with_nullable(vec![
        ("identifier", identifier, false),
        ("datestamp", datestamp, false),
        ("record_is_valid", record_is_valid, false),
        ("is_transformed", is_transformed, false),
        ("published_metadata_hash", published, true),
        (FACTS_COLUMN, facts, true),
    ])
    .map_err(|e| StoreError::store_io_with_source("assemble validation batch", e))
}

fn append_occurrences(builder: &mut StructBuilder, index: usize, occurrences: &[String]) {
    let list = builder
        .field_builder::<ListBuilder<StringBuilder>>(index)
        .expect("occurrence list builder");
    for occurrence in occurrences {
        list.values().append_value(occurrence);
    }
    list.append(true);
}

/// Decode one Arrow batch back into full validation rows
pub(crate) fn batch_to_validations(batch: &RecordBatch) -> Result<Vec<RecordValidation>> {
    let identifier = string_column(batch, "identifier")?;
    let datestamp = int64_column(batch, "datestamp")?;
    let record_is_valid = bool_column(batch, "record_is_valid")?;
    let is_transformed = bool_column(batch, "is_transformed")?;
    let published = string_column(batch, "published_metadata_hash")?;
    let facts = batch
        .column_by_name(FACTS_COLUMN)
        .ok_or_else(|| StoreError::parse(format!("missing column {}", FACTS_COLUMN)))?
        .as_any()
        .downcast_ref::<ListArray>()
        .ok_or_else(|| StoreError::parse("rule_facts_list is not a list"))?;

    let mut rows = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let rule_facts = if facts.is_null(row) {
            Vec::new()
        } else {
            decode_facts(&facts.value(row))?
        };
        rows.push(RecordValidation {
            identifier: identifier.value(row).to_string(),
            datestamp: datestamp.value(row),
            record_is_valid: record_is_valid.value(row),
            is_transformed: is_transformed.value(row),
            published_metadata_hash: if published.is_null(row) {
                None
            } else {
                Some(published.value(row).to_string())
            },
            rule_facts,
        });
    }
    Ok(rows)
}

fn decode_facts(values: &ArrayRef) -> Result<Vec<RuleFact>> {
    let structs = values
        .as_any()
        .downcast_ref::<StructArray>()
        .ok_or_else(|| StoreError::parse("rule fact entry is not a struct"))?;
    let rule_id = struct_field::<Int32Array>(structs, "rule_id")?;
    let valid = struct_field::<ListArray>(structs, "valid_occurrences")?;
    let invalid = struct_field::<ListArray>(structs, "invalid_occurrences")?;
    let is_valid = struct_field::<BooleanArray>(structs, "is_valid")?;

    let mut facts = Vec::with_capacity(structs.len());
    for i in 0..structs.len() {
        facts.push(RuleFact {
            rule_id: rule_id.value(i),
            valid_occurrences: decode_occurrences(valid, i)?,
            invalid_occurrences: decode_occurrences(invalid, i)?,
            is_valid: is_valid.value(i),
        });
    }
    Ok(facts)
}

fn struct_field<'a, T: 'static>(structs: &'a StructArray, name: &str) -> Result<&'a T> {
    structs
        .column_by_name(name)
        .ok_or_else(|| StoreError::parse(format!("missing fact field {}", name)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| StoreError::parse(format!("fact field {} has wrong type", name)))
}

fn decode_occurrences(lists: &ListArray, index: usize) -> Result<Vec<String>> {
    if lists.is_null(index) {
        return Ok(Vec::new());
    }
    let values = lists.value(index);
    let strings = values
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| StoreError::parse("occurrence list is not UTF8"))?;
    Ok((0..strings.len())
        .filter(|&i| !strings.is_null(i))
        .map(|i| strings.value(i).to_string())
        .collect())
}

/// Encode lightweight projection rows as one Arrow batch
pub(crate) fn observations_to_batch(rows: &[RecordObservation]) -> Result<RecordBatch> {
    let identifier: ArrayRef = Arc::new(StringArray::from_iter_values(
        rows.iter().map(|r| r.identifier.as_str()),
    ));
    let datestamp: ArrayRef = Arc::new(Int64Array::from_iter_values(
        rows.iter().map(|r| r.datestamp),
    ));
    let record_is_valid: ArrayRef = Arc::new(BooleanArray::from(
        rows.iter().map(|r| r.record_is_valid).collect::<Vec<bool>>(),
    ));
    let is_transformed: ArrayRef = Arc::new(BooleanArray::from(
        rows.iter().map(|r| r.is_transformed).collect::<Vec<bool>>(),
    ));
    let published: ArrayRef = Arc::new(StringArray::from(
        rows.iter()
            .map(|r| r.published_metadata_hash.as_deref())
            .collect::<Vec<Option<&str>>>(),
    ));

    RecordBatch::try_from_iter_with_nullable(vec![
        ("identifier", identifier, false),
        ("datestamp", datestamp, false),
        ("record_is_valid", record_is_valid, false),
        ("is_transformed", is_transformed, false),
        ("published_metadata_hash", published, true),
    ])
    .map_err(|e| StoreError::store_io_with_source("assemble index batch", e))
}

/// Decode one Arrow batch back into lightweight projection rows
pub(crate) fn batch_to_observations(batch: &RecordBatch) -> Result<Vec<RecordObservation>> {
    let identifier = string_column(batch, "identifier")?;
    let datestamp = int64_column(batch, "datestamp")?;
    let record_is_valid = bool_column(batch, "record_is_valid")?;
    let is_transformed = bool_column(batch, "is_transformed")?;
    let published = string_column(batch, "published_metadata_hash")?;

    let mut rows = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        rows.push(RecordObservation {
            identifier: identifier.value(row).to_string(),
            datestamp: datestamp.value(row),
            record_is_valid: record_is_valid.value(row),
            is_transformed: is_transformed.value(row),
            published_metadata_hash: if published.is_null(row) {
                None
            } else {
                Some(published.value(row).to_string())
            },
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<RecordValidation> {
        vec![
            RecordValidation::new("oai:x:1", 1000, true),
            RecordValidation::new("oai:x:2", 2000, false)
                .with_transformed(true)
                .with_published_hash("ffaa")
                .with_fact(RuleFact::new(42, vec![], vec!["2022".into()], false))
                .with_fact(RuleFact::new(
                    7,
                    vec!["a".into(), "b".into()],
                    vec![],
                    true,
                )),
            RecordValidation::new("oai:x:3", 3000, false),
        ]
    }

    #[test]
    fn test_validation_batch_round_trip() {
        let rows = sample_rows();
        let batch = validations_to_batch(&rows).unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch_to_validations(&batch).unwrap(), rows);
    }

    #[test]
    fn test_empty_facts_survive_round_trip() {
        let rows = vec![RecordValidation::new("oai:x:1", 1, true)];
        let batch = validations_to_batch(&rows).unwrap();
        let back = batch_to_validations(&batch).unwrap();
        assert!(back[0].rule_facts.is_empty());
    }

    #[test]
    fn test_observation_batch_round_trip() {
        let rows: Vec<RecordObservation> =
            sample_rows().iter().map(|r| r.observation()).collect();
        let batch = observations_to_batch(&rows).unwrap();
        assert_eq!(batch_to_observations(&batch).unwrap(), rows);
    }

    #[test]
    fn test_empty_batch_is_valid() {
        let batch = observations_to_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert!(batch_to_observations(&batch).unwrap().is_empty());
    }
}
