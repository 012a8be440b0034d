use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_super_admin: bool,
    /// SHA-256 digest of the single live refresh token.
    pub refresh_token: Option<String>,
    pub last_login_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_super_admin: bool,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_super_admin: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolunteerStatus {
    Active,
    Inactive,
    Left,
}

impl VolunteerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolunteerStatus::Active => "ACTIVE",
            VolunteerStatus::Inactive => "INACTIVE",
            VolunteerStatus::Left => "LEFT",
        }
    }
}

impl fmt::Display for VolunteerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VolunteerStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(VolunteerStatus::Active),
            "INACTIVE" => Ok(VolunteerStatus::Inactive),
            "LEFT" => Ok(VolunteerStatus::Left),
            other => Err(format!("unknown volunteer status {other}")),
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = volunteers)]
pub struct Volunteer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = volunteers)]
pub struct NewVolunteer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub notes: Option<String>,
}

/// Outer `None` leaves a column untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = volunteers)]
pub struct VolunteerChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub cpf: Option<Option<String>>,
    pub birth_date: Option<Option<NaiveDate>>,
    pub address: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub status: Option<String>,
    pub emergency_contact_name: Option<Option<String>>,
    pub emergency_contact_phone: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = workshops)]
pub struct Workshop {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub weekday: Option<i32>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub capacity: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = workshops)]
pub struct NewWorkshop {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub weekday: Option<i32>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = workshops)]
pub struct WorkshopChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub weekday: Option<Option<i32>>,
    pub start_time: Option<Option<NaiveTime>>,
    pub end_time: Option<Option<NaiveTime>>,
    pub capacity: Option<Option<i32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipationRole {
    Facilitator,
    Assistant,
    Observer,
}

impl ParticipationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipationRole::Facilitator => "FACILITATOR",
            ParticipationRole::Assistant => "ASSISTANT",
            ParticipationRole::Observer => "OBSERVER",
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = participations)]
#[diesel(belongs_to(Volunteer))]
#[diesel(belongs_to(Workshop))]
pub struct Participation {
    pub id: Uuid,
    pub volunteer_id: Uuid,
    pub workshop_id: Uuid,
    pub date: NaiveDate,
    pub role: Option<String>,
    pub hours: Option<i32>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = participations)]
pub struct NewParticipation {
    pub id: Uuid,
    pub volunteer_id: Uuid,
    pub workshop_id: Uuid,
    pub date: NaiveDate,
    pub role: Option<String>,
    pub hours: Option<i32>,
    pub notes: Option<String>,
}

/// Identity of a participation link: one role per volunteer, workshop and day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipationKey {
    pub volunteer_id: Uuid,
    pub workshop_id: Uuid,
    pub date: NaiveDate,
    pub role: Option<String>,
}

impl ParticipationKey {
    pub fn matches(&self, participation: &Participation) -> bool {
        participation.volunteer_id == self.volunteer_id
            && participation.workshop_id == self.workshop_id
            && participation.date == self.date
            && participation.role == self.role
    }
}

impl From<&NewParticipation> for ParticipationKey {
    fn from(value: &NewParticipation) -> Self {
        Self {
            volunteer_id: value.volunteer_id,
            workshop_id: value.workshop_id,
            date: value.date,
            role: value.role.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volunteer_status_parses_case_insensitively() {
        assert_eq!(
            "inactive".parse::<VolunteerStatus>(),
            Ok(VolunteerStatus::Inactive)
        );
        assert_eq!(" ACTIVE ".parse::<VolunteerStatus>(), Ok(VolunteerStatus::Active));
        assert!("gone".parse::<VolunteerStatus>().is_err());
    }

    #[test]
    fn participation_key_treats_missing_roles_as_equal() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let row = Participation {
            id: Uuid::new_v4(),
            volunteer_id: Uuid::new_v4(),
            workshop_id: Uuid::new_v4(),
            date,
            role: None,
            hours: None,
            notes: None,
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: chrono::Utc::now().naive_utc(),
        };
        let key = ParticipationKey {
            volunteer_id: row.volunteer_id,
            workshop_id: row.workshop_id,
            date,
            role: None,
        };
        assert!(key.matches(&row));

        let other_role = ParticipationKey {
            role: Some("ASSISTANT".into()),
            ..key
        };
        assert!(!other_role.matches(&row));
    }
}
