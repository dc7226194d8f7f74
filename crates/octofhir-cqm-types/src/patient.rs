//! Patient demographics consulted by age-based predicates

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The demographic anchor of a patient timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Missing birth dates make age predicates indeterminate
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

impl Patient {
    pub fn new(id: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: String::new(),
            birth_date: None,
        }
    }

    pub fn with_birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = last_name.into();
        self
    }

    /// Name used in narratives
    pub fn display_name(&self) -> &str {
        if self.first_name.is_empty() {
            &self.id
        } else {
            &self.first_name
        }
    }

    /// Age in completed years at `instant`, `None` without a birth date
    pub fn age_at(&self, instant: DateTime<Utc>) -> Option<i32> {
        let birth = self.birth_date?;
        let as_of = instant.date_naive();
        let mut years = as_of.year() - birth.year();
        // Adjust if birthday hasn't occurred yet this year
        if (as_of.month(), as_of.day()) < (birth.month(), birth.day()) {
            years -= 1;
        }
        Some(years)
    }

    /// The instant (midnight UTC) the patient turns `age`
    pub fn birthday_at_age(&self, age: u32) -> Option<DateTime<Utc>> {
        let birth = self.birth_date?;
        let birthday = birth.checked_add_months(Months::new(age.checked_mul(12)?))?;
        Some(birthday.and_hms_opt(0, 0, 0)?.and_utc())
    }

    /// Whole days from `instant` until the patient turns `age`; negative once passed
    pub fn days_until_age(&self, age: u32, instant: DateTime<Utc>) -> Option<i64> {
        self.birthday_at_age(age)
            .map(|birthday| (birthday - instant).num_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn patient(y: i32, m: u32, d: u32) -> Patient {
        Patient::new("p1", "Ada").with_birth_date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_age_at_before_and_after_birthday() {
        let p = patient(1974, 6, 15);
        assert_eq!(p.age_at(Utc.with_ymd_and_hms(2024, 6, 14, 0, 0, 0).unwrap()), Some(49));
        assert_eq!(p.age_at(Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()), Some(50));
    }

    #[test]
    fn test_age_without_birth_date() {
        let p = Patient::new("p2", "Bo");
        assert_eq!(p.age_at(Utc::now()), None);
        assert_eq!(p.days_until_age(50, Utc::now()), None);
    }

    #[test]
    fn test_days_until_age() {
        let p = patient(1974, 6, 15);
        let end = Utc.with_ymd_and_hms(2024, 6, 5, 0, 0, 0).unwrap();
        assert_eq!(p.days_until_age(50, end), Some(10));
    }

    #[test]
    fn test_leap_day_birthday_clamps() {
        let p = patient(2000, 2, 29);
        assert_eq!(
            p.birthday_at_age(1),
            Some(Utc.with_ymd_and_hms(2001, 2, 28, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        assert_eq!(Patient::new("p3", "").display_name(), "p3");
        assert_eq!(Patient::new("p3", "Cy").display_name(), "Cy");
    }
}
