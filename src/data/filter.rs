use std::collections::{BTreeMap, BTreeSet};

use crate::data::model::{Dataset, FieldValue, Record};
use crate::data::schema::FieldKind;
use crate::error::FilterError;

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// One per-field predicate. A record passes a `FilterSpec` iff it passes
/// every predicate in it (logical AND).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Field equals this exact value.
    Equals(FieldValue),
    /// Field is an integer within `min..=max`.
    Range { min: i64, max: i64 },
    /// Field is one of these values. An empty set matches nothing.
    OneOf(BTreeSet<FieldValue>),
}

/// Declarative filter: field name → predicate. Stateless; owned by the
/// caller for the duration of one query. An empty spec is the identity
/// filter.
pub type FilterSpec = BTreeMap<String, Predicate>;

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Return indices of records that pass all predicates, in dataset order.
///
/// The spec is checked up front: a predicate naming a field the schema does
/// not declare, a range over a non-integer field, or a range with
/// `min > max`, is caller misuse and fails; it never masquerades as an
/// empty result. A well-formed predicate that
/// simply matches no row (e.g. a set of values absent from the data) yields
/// an empty result. Single pass, short-circuit per record.
pub fn filtered_indices(dataset: &Dataset, spec: &FilterSpec) -> Result<Vec<usize>, FilterError> {
    for (field, predicate) in spec {
        let Some(def) = dataset.schema().field(field) else {
            return Err(FilterError::UnknownField(field.clone()));
        };
        if let Predicate::Range { min, max } = predicate {
            if !matches!(def.kind, FieldKind::Integer { .. }) {
                return Err(FilterError::RangeOnNonInteger(field.clone()));
            }
            if min > max {
                return Err(FilterError::InvalidRange {
                    field: field.clone(),
                    min: *min,
                    max: *max,
                });
            }
        }
    }

    Ok(dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, rec)| matches_all(rec, spec))
        .map(|(i, _)| i)
        .collect())
}

fn matches_all(record: &Record, spec: &FilterSpec) -> bool {
    spec.iter().all(|(field, predicate)| {
        record
            .get(field)
            .is_some_and(|value| matches(predicate, value))
    })
}

fn matches(predicate: &Predicate, value: &FieldValue) -> bool {
    match predicate {
        Predicate::Equals(expected) => value == expected,
        Predicate::Range { min, max } => value
            .as_i64()
            .is_some_and(|n| n >= *min && n <= *max),
        Predicate::OneOf(allowed) => allowed.contains(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{load_reader, LoadPolicy};
    use crate::data::schema::Schema;

    fn dataset() -> Dataset {
        let src = "\
GENDER,AGE,SMOKING,YELLOW_FINGERS,ANXIETY,PEER_PRESSURE,CHRONIC_DISEASE,FATIGUE,\
ALLERGY,WHEEZING,ALCOHOL_CONSUMING,COUGHING,SHORTNESS_OF_BREATH,SWALLOWING_DIFFICULTY,\
CHEST_PAIN,LUNG_CANCER
M,69,2,1,2,1,1,2,1,2,2,2,2,2,2,YES
F,74,1,1,1,1,2,2,2,1,1,1,2,2,2,YES
M,59,1,1,1,2,1,2,1,2,1,2,2,1,2,NO
F,63,2,2,2,1,1,1,1,2,1,1,1,2,1,NO
M,51,1,2,1,1,1,2,1,1,1,2,1,1,1,NO";
        load_reader(src.as_bytes(), &Schema::lung_cancer_survey(), LoadPolicy::default()).unwrap()
    }

    fn one_of(values: &[&str]) -> Predicate {
        Predicate::OneOf(
            values
                .iter()
                .map(|v| FieldValue::Categorical(v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn empty_spec_is_identity() {
        let ds = dataset();
        let idx = filtered_indices(&ds, &FilterSpec::new()).unwrap();
        assert_eq!(idx, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn range_preserves_source_order() {
        let ds = dataset();
        let spec = FilterSpec::from([("AGE".to_string(), Predicate::Range { min: 50, max: 70 })]);
        let idx = filtered_indices(&ds, &spec).unwrap();
        assert_eq!(idx, vec![0, 2, 3, 4]);
    }

    #[test]
    fn predicates_combine_with_and() {
        let ds = dataset();
        let spec = FilterSpec::from([
            ("AGE".to_string(), Predicate::Range { min: 50, max: 70 }),
            (
                "SMOKING".to_string(),
                Predicate::Equals(FieldValue::Bool(true)),
            ),
        ]);
        let idx = filtered_indices(&ds, &spec).unwrap();
        assert_eq!(idx, vec![0, 3]);
    }

    #[test]
    fn membership_filter_matches_label() {
        let ds = dataset();
        let spec = FilterSpec::from([("LUNG_CANCER".to_string(), one_of(&["YES"]))]);
        let idx = filtered_indices(&ds, &spec).unwrap();
        assert_eq!(idx, vec![0, 1]);
    }

    #[test]
    fn absent_value_yields_empty_not_error() {
        let ds = dataset();
        let spec = FilterSpec::from([("SMOKING".to_string(), one_of(&["unknown"]))]);
        let idx = filtered_indices(&ds, &spec).unwrap();
        assert!(idx.is_empty());
    }

    #[test]
    fn unknown_field_is_an_error() {
        let ds = dataset();
        let spec = FilterSpec::from([("BLOOD_TYPE".to_string(), one_of(&["A"]))]);
        let err = filtered_indices(&ds, &spec).unwrap_err();
        assert_eq!(err, FilterError::UnknownField("BLOOD_TYPE".into()));
    }

    #[test]
    fn inverted_range_is_an_error_not_empty() {
        let ds = dataset();
        let spec = FilterSpec::from([("AGE".to_string(), Predicate::Range { min: 80, max: 10 })]);
        let err = filtered_indices(&ds, &spec).unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidRange {
                field: "AGE".into(),
                min: 80,
                max: 10
            }
        );
    }

    #[test]
    fn range_over_non_integer_field_is_an_error() {
        let ds = dataset();
        let spec = FilterSpec::from([(
            "GENDER".to_string(),
            Predicate::Range { min: 0, max: 10 },
        )]);
        let err = filtered_indices(&ds, &spec).unwrap_err();
        assert_eq!(err, FilterError::RangeOnNonInteger("GENDER".into()));
    }

    #[test]
    fn value_counts_over_filtered_rows() {
        let ds = dataset();
        let spec = FilterSpec::from([("AGE".to_string(), Predicate::Range { min: 50, max: 70 })]);
        let idx = filtered_indices(&ds, &spec).unwrap();
        let counts = ds.value_counts("LUNG_CANCER", &idx);
        assert_eq!(counts.get(&FieldValue::Categorical("YES".into())), Some(&1));
        assert_eq!(counts.get(&FieldValue::Categorical("NO".into())), Some(&3));
    }
}
