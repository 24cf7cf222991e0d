//! Read-path shaping for pupil records.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::pupil::Pupil;

/// A pupil as returned to clients: the stored record without its portal
/// password, plus the derived `fullName` and `age`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafePupil {
    #[serde(flatten)]
    pupil: Pupil,
    full_name: String,
    age: i32,
}

/// Removes `onlinePassword` and attaches derived fields as of `today`.
pub fn project_on(mut pupil: Pupil, today: NaiveDate) -> SafePupil {
    pupil.fields.online_password = None;
    let full_name = pupil.full_name();
    let age = pupil.age_on(today);
    SafePupil {
        pupil,
        full_name,
        age,
    }
}

pub fn project(pupil: Pupil) -> SafePupil {
    project_on(pupil, chrono::Utc::now().date_naive())
}

pub fn project_all(pupils: Vec<Pupil>) -> Vec<SafePupil> {
    let today = chrono::Utc::now().date_naive();
    pupils
        .into_iter()
        .map(|pupil| project_on(pupil, today))
        .collect()
}
