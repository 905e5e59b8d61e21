//! Request and change-set models for user mutations

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ValidationRules;
use crate::validation::{parse_birthdate, validate_gender};

/// Body of a profile update request. Every field is optional; a field that
/// is absent from the JSON stays `None` and leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<String>,
}

/// A validated profile update, ready for the store.
///
/// Outer `None` means "not supplied, keep"; `Some(None)` means the caller
/// sent an empty string and the stored value is cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub gender: Option<Option<String>>,
    pub birthdate: Option<Option<NaiveDate>>,
}

impl ProfileUpdate {
    /// Check every supplied field against the rules, gender first then birthdate.
    pub fn validate(self, rules: &ValidationRules) -> Result<ProfileChanges, String> {
        let gender = match self.gender {
            Some(gender) => {
                validate_gender(&gender, &rules.allowed_genders)?;
                Some((!gender.is_empty()).then_some(gender))
            }
            None => None,
        };

        let birthdate = match self.birthdate.as_deref() {
            Some("") => Some(None),
            Some(raw) => Some(Some(parse_birthdate(raw)?)),
            None => None,
        };

        Ok(ProfileChanges {
            name: self.name,
            gender,
            birthdate,
        })
    }
}
