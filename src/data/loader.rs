use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::data::model::{Dataset, SkippedRow};
use crate::data::schema::Schema;
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Load policy
// ---------------------------------------------------------------------------

/// How the loader treats rows that fail validation.
///
/// Strict (the default; clinical data integrity matters): any malformed row
/// fails the whole load. Tolerant: malformed rows are excluded and recorded
/// on the dataset, and the load fails only when their share of the source
/// exceeds `max_invalid_ratio`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadPolicy {
    pub strict: bool,
    pub max_invalid_ratio: f64,
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self {
            strict: true,
            max_invalid_ratio: 0.1,
        }
    }
}

impl LoadPolicy {
    pub fn tolerant(max_invalid_ratio: f64) -> Self {
        Self {
            strict: false,
            max_invalid_ratio,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load and validate a delimited source file. The whole source is read into
/// memory; the dataset is small enough that streaming is not worth it.
pub fn load_path(path: &Path, schema: &Schema, policy: LoadPolicy) -> Result<Dataset, LoadError> {
    let file = std::fs::File::open(path)?;
    let dataset = load_reader(file, schema, policy)?;
    log::info!(
        "loaded {} records ({} skipped) from {}",
        dataset.len(),
        dataset.skipped().len(),
        path.display()
    );
    Ok(dataset)
}

/// Load and validate a delimited source from any reader.
///
/// Expected layout: a header row naming the schema's columns, then one row
/// per patient. Raw header names are normalized (trimmed, internal spaces to
/// underscores, uppercased) before matching, since the published survey file
/// mixes trailing spaces and space-separated words. After normalization the
/// match is exact and case-sensitive. Extra columns are ignored.
pub fn load_reader<R: Read>(
    source: R,
    schema: &Schema,
    policy: LoadPolicy,
) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();
    for def in schema.fields() {
        if !headers.iter().any(|h| *h == def.name) {
            return Err(LoadError::MissingColumn(def.name.clone()));
        }
    }

    let mut records = Vec::new();
    let mut skipped = Vec::new();

    for (source_index, row) in reader.records().enumerate() {
        let row = row?;
        let raw: BTreeMap<String, String> = headers
            .iter()
            .zip(row.iter())
            .map(|(h, cell)| (h.clone(), cell.to_string()))
            .collect();

        match schema.validate(&raw, records.len()) {
            Ok(record) => records.push(Arc::new(record)),
            Err(violation) => {
                log::warn!("row {source_index} rejected: {violation}");
                skipped.push(SkippedRow {
                    source_index,
                    violation,
                });
            }
        }
    }

    let invalid_rows = skipped.len();
    let total_rows = records.len() + invalid_rows;
    let over_threshold = total_rows > 0
        && invalid_rows as f64 / total_rows as f64 > policy.max_invalid_ratio;
    if invalid_rows > 0 && (policy.strict || over_threshold) {
        log::error!("load failed: {invalid_rows} of {total_rows} rows invalid");
        return Err(LoadError::TooManyInvalid {
            invalid_rows,
            total_rows,
        });
    }

    Ok(Dataset::new(records, schema.clone(), skipped))
}

/// Canonical column name: trimmed, internal spaces collapsed to `_`,
/// uppercased. `"FATIGUE "` and `"CHRONIC DISEASE"` both normalize cleanly.
fn normalize_header(raw: &str) -> String {
    raw.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::FieldValue;

    const HEADER: &str = "GENDER,AGE,SMOKING,YELLOW_FINGERS,ANXIETY,PEER_PRESSURE,\
CHRONIC DISEASE,FATIGUE ,ALLERGY ,WHEEZING,ALCOHOL CONSUMING,COUGHING,\
SHORTNESS OF BREATH,SWALLOWING DIFFICULTY,CHEST PAIN,LUNG_CANCER";

    fn source(rows: &[&str]) -> String {
        let mut s = String::from(HEADER);
        for row in rows {
            s.push('\n');
            s.push_str(row);
        }
        s
    }

    fn row(gender: &str, age: &str, label: &str) -> String {
        format!("{gender},{age},2,1,2,1,2,1,2,1,2,1,2,1,2,{label}")
    }

    #[test]
    fn loads_and_normalizes_survey_headers() {
        let src = source(&[&row("M", "63", "YES"), &row("F", "51", "NO")]);
        let schema = Schema::lung_cancer_survey();
        let ds = load_reader(src.as_bytes(), &schema, LoadPolicy::default()).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records()[0].row_id(), 0);
        assert_eq!(ds.records()[1].row_id(), 1);
        // "CHRONIC DISEASE" header reached the record as CHRONIC_DISEASE
        assert_eq!(
            ds.records()[0].get("CHRONIC_DISEASE"),
            Some(&FieldValue::Bool(true))
        );
    }

    #[test]
    fn unique_value_index_reflects_loaded_rows() {
        let src = source(&[
            &row("M", "63", "YES"),
            &row("F", "51", "NO"),
            &row("F", "63", "NO"),
        ]);
        let schema = Schema::lung_cancer_survey();
        let ds = load_reader(src.as_bytes(), &schema, LoadPolicy::default()).unwrap();

        // The sets a presentation layer offers in its filter widgets.
        let genders = ds.unique_values("GENDER").unwrap();
        assert_eq!(
            genders.iter().cloned().collect::<Vec<_>>(),
            vec![
                FieldValue::Categorical("F".into()),
                FieldValue::Categorical("M".into()),
            ]
        );
        let ages = ds.unique_values("AGE").unwrap();
        assert_eq!(
            ages.iter().cloned().collect::<Vec<_>>(),
            vec![FieldValue::Integer(51), FieldValue::Integer(63)]
        );
        assert!(ds.unique_values("BLOOD_TYPE").is_none());
    }

    #[test]
    fn loading_twice_yields_identical_rows() {
        let src = source(&[&row("M", "63", "YES"), &row("F", "51", "NO")]);
        let schema = Schema::lung_cancer_survey();
        let a = load_reader(src.as_bytes(), &schema, LoadPolicy::default()).unwrap();
        let b = load_reader(src.as_bytes(), &schema, LoadPolicy::default()).unwrap();
        for (x, y) in a.records().iter().zip(b.records()) {
            assert_eq!(x, y);
        }
    }

    #[test]
    fn strict_load_fails_on_a_single_bad_row() {
        let src = source(&[&row("M", "63", "YES"), &row("F", "not-a-number", "NO")]);
        let schema = Schema::lung_cancer_survey();
        let err = load_reader(src.as_bytes(), &schema, LoadPolicy::default()).unwrap_err();
        match err {
            LoadError::TooManyInvalid {
                invalid_rows,
                total_rows,
            } => {
                assert_eq!(invalid_rows, 1);
                assert_eq!(total_rows, 2);
            }
            other => panic!("expected TooManyInvalid, got {other:?}"),
        }
    }

    #[test]
    fn tolerant_load_skips_and_reports_bad_rows() {
        let src = source(&[
            &row("M", "63", "YES"),
            &row("F", "oops", "NO"),
            &row("F", "51", "NO"),
        ]);
        let schema = Schema::lung_cancer_survey();
        let ds = load_reader(src.as_bytes(), &schema, LoadPolicy::tolerant(0.5)).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.skipped().len(), 1);
        assert_eq!(ds.skipped()[0].source_index, 1);
        assert_eq!(ds.skipped()[0].violation.column, "AGE");
        // Row ids stay contiguous over accepted rows.
        assert_eq!(ds.records()[1].row_id(), 1);
        assert_eq!(ds.records()[1].get("AGE"), Some(&FieldValue::Integer(51)));
    }

    #[test]
    fn tolerant_load_still_fails_over_threshold() {
        let src = source(&[&row("M", "63", "YES"), &row("F", "oops", "NO")]);
        let schema = Schema::lung_cancer_survey();
        let err = load_reader(src.as_bytes(), &schema, LoadPolicy::tolerant(0.25)).unwrap_err();
        assert!(matches!(err, LoadError::TooManyInvalid { .. }));
    }

    #[test]
    fn missing_schema_column_is_fatal() {
        let src = "GENDER,AGE\nM,63";
        let schema = Schema::lung_cancer_survey();
        let err = load_reader(src.as_bytes(), &schema, LoadPolicy::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(col) if col == "SMOKING"));
    }
}
