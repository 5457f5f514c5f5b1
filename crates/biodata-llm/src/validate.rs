//! Project an untrusted JSON object onto [`BiodataRecord`].
//!
//! Every field is checked on its own. A value that fails its check becomes
//! `None`; the rest of the record is kept. Keys outside the schema are ignored.

use biodata_core::{BiodataRecord, Field, Gender, MaritalStatus};
use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static HONORIFIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(mrs|mr|ms|dr)(\.\s*|\s+)").unwrap());
static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\p{L}[\p{L} .'\-]*$").unwrap());
static LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\p{L}[\p{L} \-'&./]*$").unwrap());
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static FOUR_DIGIT_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\D)\d{4}(\D|$)").unwrap());
static INSTITUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(university|college|school|institute|academy)\b").unwrap());

static NULL: Value = Value::Null;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d", "%d.%m.%Y"];
const MIN_BIRTH_YEAR: i32 = 1900;
const MIN_AGE: u32 = 1;
const MAX_AGE: u32 = 120;

/// Trimmed non-empty string value. Numbers, booleans, arrays and objects yield `None`.
fn text(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn char_len_between(s: &str, min: usize, max: usize) -> bool {
    let n = s.chars().count();
    (min..=max).contains(&n)
}

pub fn full_name(value: &Value) -> Option<String> {
    let mut name = text(value)?;
    while let Some(m) = HONORIFIC.find(name) {
        name = name[m.end()..].trim_start();
    }
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    (char_len_between(&name, 2, 60) && NAME.is_match(&name)).then_some(name)
}

pub fn age(value: &Value) -> Option<u32> {
    let years = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))?,
        Value::String(s) => DIGITS.find(s)?.as_str().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(years)
        .ok()
        .filter(|y| (MIN_AGE..=MAX_AGE).contains(y))
}

/// Calendar date with a four-digit year, not before 1900 and not in the future.
pub fn date_of_birth(value: &Value) -> Option<NaiveDate> {
    let raw = text(value)?;
    // chrono's `%Y` also takes one- and two-digit years.
    if !FOUR_DIGIT_YEAR.is_match(raw) {
        return None;
    }
    let today = Utc::now().date_naive();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .filter(|date| date.year() >= MIN_BIRTH_YEAR && *date <= today)
}

pub fn height(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        other => text(other)?.to_string(),
    };
    (raw.chars().count() <= 20 && raw.chars().any(|c| c.is_ascii_digit())).then_some(raw)
}

pub fn gender(value: &Value) -> Option<Gender> {
    match text(value)?.to_lowercase().as_str() {
        "male" | "m" | "man" | "boy" => Some(Gender::Male),
        "female" | "f" | "woman" | "girl" => Some(Gender::Female),
        _ => None,
    }
}

fn fold(s: &str) -> String {
    s.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn marital_status(value: &Value) -> Option<MaritalStatus> {
    let folded = fold(text(value)?);
    if matches!(folded.as_str(), "unmarried" | "never married") {
        return Some(MaritalStatus::UnMarried);
    }
    MaritalStatus::ALL
        .into_iter()
        .find(|status| fold(status.as_str()) == folded)
}

/// Short label such as a profession, religion or caste.
pub fn label(value: &Value) -> Option<String> {
    let raw = text(value)?;
    (char_len_between(raw, 2, 60) && LABEL.is_match(raw)).then(|| raw.to_string())
}

pub fn education(value: &Value) -> Option<String> {
    let raw = text(value)?;
    (raw.chars().count() <= 100 && !INSTITUTION.is_match(raw)).then(|| raw.to_string())
}

pub fn location(value: &Value) -> Option<String> {
    let raw = text(value)?;
    (raw.chars().count() <= 120).then(|| raw.to_string())
}

/// Build a record from a parsed model response.
pub fn validate_record(map: &Map<String, Value>) -> BiodataRecord {
    let get = |field: Field| map.get(field.key()).unwrap_or(&NULL);

    let record = BiodataRecord {
        full_name: full_name(get(Field::FullName)),
        age: age(get(Field::Age)),
        date_of_birth: date_of_birth(get(Field::DateOfBirth)),
        height: height(get(Field::Height)),
        gender: gender(get(Field::Gender)),
        marital_status: marital_status(get(Field::MaritalStatus)),
        profession: label(get(Field::Profession)),
        education: education(get(Field::Education)),
        religion: label(get(Field::Religion)),
        caste: label(get(Field::Caste)),
        location: location(get(Field::Location)),
    };

    let rejected: Vec<&str> = Field::ALL
        .iter()
        .filter(|f| !get(**f).is_null() && !record.is_set(**f))
        .map(|f| f.key())
        .collect();
    if !rejected.is_empty() {
        tracing::debug!(fields = ?rejected, "Dropped values that failed validation");
    }
    let unknown = map.keys().filter(|k| Field::from_key(k).is_none()).count();
    if unknown > 0 {
        tracing::debug!(unknown, "Ignored keys outside the schema");
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn age_accepts_numbers_and_digit_strings() {
        assert_eq!(age(&json!(28)), Some(28));
        assert_eq!(age(&json!(28.0)), Some(28));
        assert_eq!(age(&json!("28 years")), Some(28));
        assert_eq!(age(&json!("one hundred")), None);
        assert_eq!(age(&json!(0)), None);
        assert_eq!(age(&json!(121)), None);
        assert_eq!(age(&json!(-4)), None);
        assert_eq!(age(&json!(27.5)), None);
        assert_eq!(age(&json!(true)), None);
    }

    #[test]
    fn names_lose_honorifics() {
        assert_eq!(full_name(&json!("Dr. Asha  Patel")), Some("Asha Patel".into()));
        assert_eq!(full_name(&json!("mrs Meera O'Neil")), Some("Meera O'Neil".into()));
        assert_eq!(full_name(&json!("R2-D2")), None);
        assert_eq!(full_name(&json!("A")), None);
        assert_eq!(full_name(&json!("Mr.Ravi Kumar")), Some("Ravi Kumar".into()));
        assert_eq!(full_name(&json!("Dr.")), None);
        assert_eq!(full_name(&json!("Drishti Rao")), Some("Drishti Rao".into()));
        assert_eq!(full_name(&json!("Msizi Dube")), Some("Msizi Dube".into()));
    }

    #[test]
    fn dates_normalize_from_common_formats() {
        let expected = NaiveDate::from_ymd_opt(1996, 4, 12);
        for raw in ["1996-04-12", "12-04-1996", "12/04/1996", "1996/04/12", "12.04.1996"] {
            assert_eq!(date_of_birth(&json!(raw)), expected, "{raw}");
        }
        assert_eq!(date_of_birth(&json!("1996-02-30")), None);
        assert_eq!(date_of_birth(&json!("April 1996")), None);
        assert_eq!(date_of_birth(&json!("12-04-96")), None);
        assert_eq!(date_of_birth(&json!("12/04/96")), None);
        assert_eq!(date_of_birth(&json!("12-04-0096")), None);
        assert_eq!(date_of_birth(&json!("01-01-2999")), None);
    }

    #[test]
    fn height_needs_a_digit() {
        assert_eq!(height(&json!("5'4\"")), Some("5'4\"".into()));
        assert_eq!(height(&json!(168)), Some("168".into()));
        assert_eq!(height(&json!("tall")), None);
        assert_eq!(height(&json!("5 feet 4 inches approximately")), None);
    }

    #[test]
    fn gender_and_marital_status_canonicalize() {
        assert_eq!(gender(&json!("F")), Some(Gender::Female));
        assert_eq!(gender(&json!("Boy")), Some(Gender::Male));
        assert_eq!(gender(&json!("other")), None);
        assert_eq!(marital_status(&json!("never married")), Some(MaritalStatus::UnMarried));
        assert_eq!(marital_status(&json!("un_married")), Some(MaritalStatus::UnMarried));
        assert_eq!(marital_status(&json!("AWAITING-DIVORCE")), Some(MaritalStatus::AwaitingDivorce));
        assert_eq!(marital_status(&json!("engaged")), None);
    }

    #[test]
    fn education_rejects_institutions() {
        assert_eq!(education(&json!("B.Tech Computer Science")), Some("B.Tech Computer Science".into()));
        assert_eq!(education(&json!("Delhi University")), None);
    }

    #[test]
    fn record_keeps_valid_fields_and_nulls_the_rest() {
        let map = json!({
            "full_name": "Asha Patel",
            "age": "one hundred",
            "gender": "female",
            "religion": {"name": "Hindu"},
            "caste": ["Patel"],
            "location": "  ",
            "favourite_colour": "blue"
        });
        let record = validate_record(map.as_object().unwrap());
        assert_eq!(record.full_name.as_deref(), Some("Asha Patel"));
        assert_eq!(record.age, None);
        assert_eq!(record.gender, Some(Gender::Female));
        assert_eq!(record.religion, None);
        assert_eq!(record.caste, None);
        assert_eq!(record.location, None);
        assert_eq!(record.filled_count(), 2);
        assert_eq!(record.to_json().as_object().unwrap().len(), 11);
    }
}
