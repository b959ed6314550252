//! Personnel records and datasets.
//!
//! Uploaded datasets arrive as a JSON object mapping record IDs to loosely
//! typed records. Field values may be strings, numbers, or booleans; they are
//! normalized to text on the way in so the accessor can apply one parsing
//! rule everywhere. Nulls, arrays, and nested objects are treated as absent.

use serde::{Deserialize, Deserializer, Serialize};

// ─── Fields ─────────────────────────────────────────────────────────────────

/// Selector for a single record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Active,
    OrgRole,
    Race,
    EducationLevel,
    TradeSpecialty,
    Gender,
    HoursWorked,
    EfficiencyScore,
    Salary,
    Wage,
    YearsExperience,
    FullName,
}

impl Field {
    /// The JSON key this field is read from.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Active => "Individual_Active",
            Field::OrgRole => "Org_Role",
            Field::Race => "race",
            Field::EducationLevel => "education_level",
            Field::TradeSpecialty => "trade_specialty",
            Field::Gender => "gender",
            Field::HoursWorked => "Hours_Worked",
            Field::EfficiencyScore => "Efficiency_Score",
            Field::Salary => "salary",
            Field::Wage => "wage",
            Field::YearsExperience => "years_experience",
            Field::FullName => "Full_Name",
        }
    }
}

// ─── Record ─────────────────────────────────────────────────────────────────

/// One personnel entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque identifier (the key of the uploaded mapping).
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "Individual_Active", default, deserialize_with = "lenient_text")]
    pub active: Option<String>,
    #[serde(rename = "Org_Role", default, deserialize_with = "lenient_text")]
    pub org_role: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub race: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub education_level: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub trade_specialty: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub gender: Option<String>,
    #[serde(rename = "Hours_Worked", default, deserialize_with = "lenient_text")]
    pub hours_worked: Option<String>,
    #[serde(rename = "Efficiency_Score", default, deserialize_with = "lenient_text")]
    pub efficiency_score: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub salary: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub wage: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub years_experience: Option<String>,
    #[serde(rename = "Full_Name", default, deserialize_with = "lenient_text")]
    pub full_name: Option<String>,
}

impl Record {
    /// Raw text of a field, if present.
    pub fn get(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Active => &self.active,
            Field::OrgRole => &self.org_role,
            Field::Race => &self.race,
            Field::EducationLevel => &self.education_level,
            Field::TradeSpecialty => &self.trade_specialty,
            Field::Gender => &self.gender,
            Field::HoursWorked => &self.hours_worked,
            Field::EfficiencyScore => &self.efficiency_score,
            Field::Salary => &self.salary,
            Field::Wage => &self.wage,
            Field::YearsExperience => &self.years_experience,
            Field::FullName => &self.full_name,
        };
        value.as_deref()
    }

    /// Field text with surrounding whitespace removed; `None` when absent or blank.
    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).map(str::trim).filter(|s| !s.is_empty())
    }

    /// Numeric value of a field; `None` when absent or not a finite number.
    pub fn number(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(parse_numeric)
    }

    /// Whether the active flag is exactly `"true"`. A JSON `true` is stored
    /// as that text on the way in, so it counts too.
    pub fn is_active(&self) -> bool {
        self.get(Field::Active) == Some("true")
    }
}

/// Parse a numeric field value from its leading decimal prefix.
///
/// Leading whitespace is skipped, then an optional sign, digits with an
/// optional fraction, and an optional exponent are read; whatever follows
/// (`%`, ` hrs`, ` USD`) is ignored. Values with no leading number, NaN and
/// infinities are rejected.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = match bytes.first() {
        Some(b'+') | Some(b'-') => 1,
        _ => 0,
    };
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        // A bare trailing dot ("5.") is left out of the prefix.
        if frac_end > end + 1 {
            has_digits = true;
            end = frac_end;
        }
    }
    if !has_digits {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Deserialize any JSON scalar as text; everything else becomes `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

// ─── Dataset ────────────────────────────────────────────────────────────────

/// A named snapshot of records, in upload order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset from the uploaded `{id: record}` mapping.
    ///
    /// Entries that are not JSON objects are skipped with a warning. Key order
    /// is preserved, so grouped counts follow first-seen order.
    pub fn from_mapping(
        name: impl Into<String>,
        mapping: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let name = name.into();
        let mut records = Vec::with_capacity(mapping.len());

        for (id, value) in mapping {
            if !value.is_object() {
                tracing::warn!(dataset = %name, record = %id, "skipping non-object record");
                continue;
            }
            match serde_json::from_value::<Record>(value) {
                Ok(mut record) => {
                    record.id = id;
                    records.push(record);
                }
                Err(e) => {
                    tracing::warn!(dataset = %name, record = %id, error = %e, "skipping malformed record");
                }
            }
        }

        Self { name, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_fields_accept_numbers_and_bools() {
        let record: Record = serde_json::from_value(json!({
            "Individual_Active": true,
            "Hours_Worked": 42,
            "Efficiency_Score": "88.5",
            "Full_Name": "Ada Lovelace",
            "salary": null,
            "wage": ["not", "a", "scalar"],
        }))
        .unwrap();

        assert!(record.is_active());
        assert_eq!(record.number(Field::HoursWorked), Some(42.0));
        assert_eq!(record.number(Field::EfficiencyScore), Some(88.5));
        assert_eq!(record.text(Field::FullName), Some("Ada Lovelace"));
        assert!(record.get(Field::Salary).is_none());
        assert!(record.get(Field::Wage).is_none());
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric(" 12.5 "), Some(12.5));
        assert_eq!(parse_numeric("87%"), Some(87.0));
        assert_eq!(parse_numeric("-3"), Some(-3.0));
        assert_eq!(parse_numeric(".5"), Some(0.5));
        assert_eq!(parse_numeric("1e3"), Some(1000.0));
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("n/a"), None);
        assert_eq!(parse_numeric("NaN"), None);
        assert_eq!(parse_numeric("inf"), None);
        assert_eq!(parse_numeric("-"), None);
        assert_eq!(parse_numeric("."), None);
    }

    #[test]
    fn test_parse_numeric_reads_leading_prefix() {
        assert_eq!(parse_numeric("40 hrs"), Some(40.0));
        assert_eq!(parse_numeric("50000.00 USD"), Some(50000.0));
        assert_eq!(parse_numeric("7.5h"), Some(7.5));
        assert_eq!(parse_numeric("5."), Some(5.0));
        assert_eq!(parse_numeric("2e"), Some(2.0));
        assert_eq!(parse_numeric("about 40"), None);
    }

    #[test]
    fn test_active_flag_is_exact() {
        let mut record = Record::default();
        assert!(!record.is_active());
        record.active = Some("false".into());
        assert!(!record.is_active());
        record.active = Some("TRUE".into());
        assert!(!record.is_active());
        record.active = Some(" true".into());
        assert!(!record.is_active());
        record.active = Some("true".into());
        assert!(record.is_active());
    }

    #[test]
    fn test_from_mapping_preserves_order_and_ids() {
        let mapping = json!({
            "u3": {"Full_Name": "Third"},
            "u1": {"Full_Name": "First"},
            "bogus": 17,
            "u2": {"Full_Name": "Second"},
        });
        let serde_json::Value::Object(map) = mapping else {
            panic!("expected object");
        };

        let dataset = Dataset::from_mapping("Q1", map);
        assert_eq!(dataset.name, "Q1");
        assert_eq!(dataset.len(), 3);
        let ids: Vec<&str> = dataset.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["u3", "u1", "u2"]);
    }

    #[test]
    fn test_field_keys_match_upload_schema() {
        assert_eq!(Field::HoursWorked.key(), "Hours_Worked");
        assert_eq!(Field::TradeSpecialty.key(), "trade_specialty");
    }
}
