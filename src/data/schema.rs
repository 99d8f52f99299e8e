use std::collections::{BTreeMap, BTreeSet};

use crate::data::model::{FieldValue, Record};
use crate::error::SchemaViolation;

// ---------------------------------------------------------------------------
// Field kinds
// ---------------------------------------------------------------------------

/// Declared type of one schema column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer with an inclusive valid range.
    Integer { min: i64, max: i64 },
    /// Survey-style boolean: `1` = no, `2` = yes; `YES`/`NO` spellings are
    /// accepted too (the raw source mixes both).
    Bool,
    /// Bounded categorical; values outside the set are rejected.
    Categorical { values: BTreeSet<String> },
}

/// One declared column: its canonical name, its type, and whether it feeds
/// the prediction model (the outcome label does not).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub is_feature: bool,
}

// ---------------------------------------------------------------------------
// Schema – the canonical record shape
// ---------------------------------------------------------------------------

/// The canonical record shape: an ordered list of field definitions. The
/// validator is the only place untyped input becomes a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The columns that feed the model, in declaration order.
    pub fn feature_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.is_feature)
    }

    /// Validate one raw row (column name → raw text) into a typed [`Record`]
    /// with the given row id. Fails on the first violating column, in
    /// declaration order. Columns not declared by the schema are ignored.
    pub fn validate(
        &self,
        raw: &BTreeMap<String, String>,
        row_id: usize,
    ) -> Result<Record, SchemaViolation> {
        let mut values = BTreeMap::new();
        for def in &self.fields {
            let text = raw
                .get(&def.name)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| SchemaViolation::new(&def.name, "missing value"))?;
            let value = parse_field(&def.kind, text)
                .map_err(|reason| SchemaViolation::new(&def.name, reason))?;
            values.insert(def.name.clone(), value);
        }
        Ok(Record::new(row_id, values))
    }

    /// The schema of the lung-cancer survey source: gender, age, thirteen
    /// yes/no clinical and lifestyle flags, and the outcome label.
    pub fn lung_cancer_survey() -> Schema {
        let bool_features = [
            "SMOKING",
            "YELLOW_FINGERS",
            "ANXIETY",
            "PEER_PRESSURE",
            "CHRONIC_DISEASE",
            "FATIGUE",
            "ALLERGY",
            "WHEEZING",
            "ALCOHOL_CONSUMING",
            "COUGHING",
            "SHORTNESS_OF_BREATH",
            "SWALLOWING_DIFFICULTY",
            "CHEST_PAIN",
        ];

        let mut fields = vec![
            FieldDef {
                name: "GENDER".into(),
                kind: FieldKind::Categorical {
                    values: ["M", "F"].into_iter().map(String::from).collect(),
                },
                is_feature: true,
            },
            FieldDef {
                name: "AGE".into(),
                kind: FieldKind::Integer { min: 0, max: 120 },
                is_feature: true,
            },
        ];
        fields.extend(bool_features.into_iter().map(|name| FieldDef {
            name: name.into(),
            kind: FieldKind::Bool,
            is_feature: true,
        }));
        fields.push(FieldDef {
            name: "LUNG_CANCER".into(),
            kind: FieldKind::Categorical {
                values: ["YES", "NO"].into_iter().map(String::from).collect(),
            },
            is_feature: false,
        });
        Schema::new(fields)
    }
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

fn parse_field(kind: &FieldKind, text: &str) -> Result<FieldValue, String> {
    match kind {
        FieldKind::Integer { min, max } => {
            let n: i64 = text
                .parse()
                .map_err(|_| format!("'{text}' is not an integer"))?;
            if n < *min || n > *max {
                return Err(format!("{n} is outside the valid range {min}..={max}"));
            }
            Ok(FieldValue::Integer(n))
        }
        FieldKind::Bool => match text {
            "1" => Ok(FieldValue::Bool(false)),
            "2" => Ok(FieldValue::Bool(true)),
            _ if text.eq_ignore_ascii_case("no") => Ok(FieldValue::Bool(false)),
            _ if text.eq_ignore_ascii_case("yes") => Ok(FieldValue::Bool(true)),
            _ => Err(format!("'{text}' is not a survey boolean (1/2 or YES/NO)")),
        },
        FieldKind::Categorical { values } => {
            if values.contains(text) {
                Ok(FieldValue::Categorical(text.to_string()))
            } else {
                Err(format!("'{text}' is not one of {values:?}"))
            }
        }
    }
}
