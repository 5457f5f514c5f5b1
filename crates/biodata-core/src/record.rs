//! The fixed biodata schema.
//!
//! [`BiodataRecord`] always serializes with all eleven keys present; a value
//! the extractor could not find or validate is `null`.

use chrono::NaiveDate;
use serde::Serialize;

/// One key of the biodata schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FullName,
    Age,
    DateOfBirth,
    Height,
    Gender,
    MaritalStatus,
    Profession,
    Education,
    Religion,
    Caste,
    Location,
}

impl Field {
    /// Every field in schema order.
    pub const ALL: [Field; 11] = [
        Field::FullName,
        Field::Age,
        Field::DateOfBirth,
        Field::Height,
        Field::Gender,
        Field::MaritalStatus,
        Field::Profession,
        Field::Education,
        Field::Religion,
        Field::Caste,
        Field::Location,
    ];

    /// JSON key.
    pub fn key(&self) -> &'static str {
        match self {
            Field::FullName => "full_name",
            Field::Age => "age",
            Field::DateOfBirth => "date_of_birth",
            Field::Height => "height",
            Field::Gender => "gender",
            Field::MaritalStatus => "marital_status",
            Field::Profession => "profession",
            Field::Education => "education",
            Field::Religion => "religion",
            Field::Caste => "caste",
            Field::Location => "location",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Expected type and format, as shown to the language model.
    pub fn description(&self) -> &'static str {
        match self {
            Field::FullName => "string. The person's full name, without titles (Mr., Dr.) or relations",
            Field::Age => "integer. Age in years",
            Field::DateOfBirth => "string. Date of birth formatted as YYYY-MM-DD",
            Field::Height => "string. Height exactly as written, e.g. 5'6\" or 168 cm",
            Field::Gender => "string. One of: Male, Female",
            Field::MaritalStatus => {
                "string. One of: Single, Married, Divorced, Widowed, Separated, Un-Married, Awaiting Divorce"
            }
            Field::Profession => "string. Job title or profession only, not the employer",
            Field::Education => "string. Highest degree or qualification only, not the institution",
            Field::Religion => "string. Religion name only",
            Field::Caste => "string. Caste or community name",
            Field::Location => "string. City, state or country where the person lives",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
    Separated,
    #[serde(rename = "Un-Married")]
    UnMarried,
    #[serde(rename = "Awaiting Divorce")]
    AwaitingDivorce,
}

impl MaritalStatus {
    pub const ALL: [MaritalStatus; 7] = [
        MaritalStatus::Single,
        MaritalStatus::Married,
        MaritalStatus::Divorced,
        MaritalStatus::Widowed,
        MaritalStatus::Separated,
        MaritalStatus::UnMarried,
        MaritalStatus::AwaitingDivorce,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaritalStatus::Single => "Single",
            MaritalStatus::Married => "Married",
            MaritalStatus::Divorced => "Divorced",
            MaritalStatus::Widowed => "Widowed",
            MaritalStatus::Separated => "Separated",
            MaritalStatus::UnMarried => "Un-Married",
            MaritalStatus::AwaitingDivorce => "Awaiting Divorce",
        }
    }
}

/// A structured profile. Field order matches [`Field::ALL`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BiodataRecord {
    pub full_name: Option<String>,
    pub age: Option<u32>,
    pub date_of_birth: Option<NaiveDate>,
    pub height: Option<String>,
    pub gender: Option<Gender>,
    pub marital_status: Option<MaritalStatus>,
    pub profession: Option<String>,
    pub education: Option<String>,
    pub religion: Option<String>,
    pub caste: Option<String>,
    pub location: Option<String>,
}

impl BiodataRecord {
    /// The all-null record.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_set(&self, field: Field) -> bool {
        match field {
            Field::FullName => self.full_name.is_some(),
            Field::Age => self.age.is_some(),
            Field::DateOfBirth => self.date_of_birth.is_some(),
            Field::Height => self.height.is_some(),
            Field::Gender => self.gender.is_some(),
            Field::MaritalStatus => self.marital_status.is_some(),
            Field::Profession => self.profession.is_some(),
            Field::Education => self.education.is_some(),
            Field::Religion => self.religion.is_some(),
            Field::Caste => self.caste.is_some(),
            Field::Location => self.location.is_some(),
        }
    }

    /// Number of non-null fields.
    pub fn filled_count(&self) -> usize {
        Field::ALL.iter().filter(|f| self.is_set(**f)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.filled_count() == 0
    }

    /// JSON object with exactly the schema keys.
    pub fn to_json(&self) -> serde_json::Value {
        // Serializing a struct of Options cannot fail.
        serde_json::to_value(self).unwrap_or_else(|_| Self::null_json())
    }

    /// The all-null record as a JSON object.
    pub fn null_json() -> serde_json::Value {
        let map = Field::ALL
            .iter()
            .map(|f| (f.key().to_string(), serde_json::Value::Null))
            .collect();
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_has_exactly_eleven_keys() {
        let json = BiodataRecord::empty().to_json();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 11);
        for field in Field::ALL {
            assert!(obj.contains_key(field.key()), "missing {field}");
        }
        assert!(obj.values().all(|v| v.is_null()));
    }

    #[test]
    fn filled_record_serializes_typed_values() {
        let record = BiodataRecord {
            full_name: Some("Priya Sharma".into()),
            age: Some(28),
            date_of_birth: NaiveDate::from_ymd_opt(1996, 4, 12),
            marital_status: Some(MaritalStatus::UnMarried),
            gender: Some(Gender::Female),
            ..Default::default()
        };
        let json = record.to_json();
        assert_eq!(json["age"], 28);
        assert_eq!(json["date_of_birth"], "1996-04-12");
        assert_eq!(json["marital_status"], "Un-Married");
        assert_eq!(json["gender"], "Female");
        assert!(json["caste"].is_null());
        assert_eq!(json.as_object().unwrap().len(), 11);
        assert_eq!(record.filled_count(), 5);
    }

    #[test]
    fn field_keys_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_key(field.key()), Some(field));
        }
        assert_eq!(Field::from_key("zip_code"), None);
    }

    #[test]
    fn null_json_matches_empty_record() {
        assert_eq!(BiodataRecord::null_json(), BiodataRecord::empty().to_json());
        assert!(BiodataRecord::empty().is_empty());
    }
}
