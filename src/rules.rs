//! Cross-entity checks that keep volunteers, workshops and their
//! participation links consistent.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ConflictKind, Entity, ServiceError, ServiceResult, StoreError};
use crate::models::{
    NewParticipation, Participation, ParticipationKey, ParticipationRole, VolunteerChanges,
    VolunteerStatus,
};
use crate::repository::{ParticipationFilter, Repositories};

#[derive(Debug, Clone)]
pub struct CreateParticipation {
    pub volunteer_id: Uuid,
    pub workshop_id: Uuid,
    pub date: NaiveDate,
    pub role: Option<ParticipationRole>,
    pub hours: Option<i32>,
    pub notes: Option<String>,
}

/// Data needed to render a volunteer's term document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerTerm {
    pub volunteer_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub workshops: Vec<String>,
    pub generated_on: NaiveDate,
}

#[derive(Clone)]
pub struct ConsistencyRules {
    repos: Repositories,
}

impl ConsistencyRules {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn create_participation(
        &self,
        input: CreateParticipation,
    ) -> ServiceResult<Participation> {
        if let Some(hours) = input.hours {
            if hours < 0 {
                return Err(ServiceError::Validation(
                    "hours must not be negative".into(),
                ));
            }
        }
        if self.repos.volunteers.find(input.volunteer_id).await?.is_none() {
            return Err(ServiceError::NotFound(Entity::Volunteer));
        }
        if self.repos.workshops.find(input.workshop_id).await?.is_none() {
            return Err(ServiceError::NotFound(Entity::Workshop));
        }

        let participation = NewParticipation {
            id: Uuid::new_v4(),
            volunteer_id: input.volunteer_id,
            workshop_id: input.workshop_id,
            date: input.date,
            role: input.role.map(|role| role.as_str().to_owned()),
            hours: input.hours,
            notes: input.notes,
        };
        let key = ParticipationKey::from(&participation);
        if self.repos.participations.find_by_key(&key).await?.is_some() {
            return Err(ServiceError::Conflict(ConflictKind::DuplicateParticipation));
        }

        match self.repos.participations.insert(participation).await {
            Ok(created) => {
                tracing::info!(
                    participation_id = %created.id,
                    volunteer_id = %created.volunteer_id,
                    workshop_id = %created.workshop_id,
                    "participation created"
                );
                Ok(created)
            }
            // Lost a race with a concurrent insert of the same key.
            Err(StoreError::UniqueViolation(_)) => Err(ServiceError::Conflict(
                ConflictKind::DuplicateParticipation,
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Marks the volunteer as having left today. Repeated calls move the end
    /// date forward.
    pub async fn exit_volunteer(&self, id: Uuid) -> ServiceResult<()> {
        let changes = VolunteerChanges {
            end_date: Some(Some(Utc::now().date_naive())),
            status: Some(VolunteerStatus::Inactive.as_str().to_owned()),
            ..Default::default()
        };
        self.repos
            .volunteers
            .update(id, changes)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Volunteer))?;
        tracing::info!(volunteer_id = %id, "volunteer exited");
        Ok(())
    }

    /// Returns how many participations went with the volunteer.
    pub async fn delete_volunteer(&self, id: Uuid) -> ServiceResult<usize> {
        let removed = self
            .repos
            .volunteers
            .delete(id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Volunteer))?;
        tracing::info!(volunteer_id = %id, participations = removed, "volunteer deleted");
        Ok(removed)
    }

    pub async fn delete_workshop(&self, id: Uuid) -> ServiceResult<usize> {
        let removed = self
            .repos
            .workshops
            .delete(id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Workshop))?;
        tracing::info!(workshop_id = %id, participations = removed, "workshop deleted");
        Ok(removed)
    }

    pub async fn delete_participation(&self, id: Uuid) -> ServiceResult<()> {
        if !self.repos.participations.delete(id).await? {
            return Err(ServiceError::NotFound(Entity::Participation));
        }
        Ok(())
    }

    pub async fn volunteer_term(&self, id: Uuid) -> ServiceResult<VolunteerTerm> {
        let volunteer = self
            .repos
            .volunteers
            .find(id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Volunteer))?;

        let participations = self
            .repos
            .participations
            .list(ParticipationFilter {
                volunteer_id: Some(id),
                workshop_id: None,
            })
            .await?;

        let mut seen = HashSet::new();
        let mut workshops = Vec::new();
        for participation in participations {
            if !seen.insert(participation.workshop_id) {
                continue;
            }
            // A workshop removed underneath a link is skipped, not an error.
            if let Some(workshop) = self.repos.workshops.find(participation.workshop_id).await? {
                workshops.push(workshop.name);
            }
        }

        Ok(VolunteerTerm {
            volunteer_id: volunteer.id,
            full_name: volunteer.full_name,
            email: volunteer.email,
            phone: volunteer.phone,
            cpf: volunteer.cpf,
            start_date: volunteer.start_date,
            end_date: volunteer.end_date,
            workshops,
            generated_on: Utc::now().date_naive(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewVolunteer, NewWorkshop};

    async fn seeded() -> (ConsistencyRules, Repositories, Uuid, Uuid) {
        let repos = Repositories::in_memory();
        let volunteer = repos
            .volunteers
            .insert(NewVolunteer {
                id: Uuid::new_v4(),
                first_name: "Ana".into(),
                last_name: "Souza".into(),
                full_name: "Ana Souza".into(),
                email: Some("ana@example.com".into()),
                phone: None,
                cpf: None,
                birth_date: None,
                address: None,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                end_date: None,
                status: VolunteerStatus::Active.as_str().into(),
                emergency_contact_name: None,
                emergency_contact_phone: None,
                notes: None,
            })
            .await
            .unwrap();
        let workshop = repos
            .workshops
            .insert(NewWorkshop {
                id: Uuid::new_v4(),
                name: "Robotics".into(),
                description: None,
                is_active: true,
                weekday: Some(2),
                start_time: None,
                end_time: None,
                capacity: None,
            })
            .await
            .unwrap();
        (
            ConsistencyRules::new(repos.clone()),
            repos,
            volunteer.id,
            workshop.id,
        )
    }

    fn link(volunteer_id: Uuid, workshop_id: Uuid, role: Option<ParticipationRole>) -> CreateParticipation {
        CreateParticipation {
            volunteer_id,
            workshop_id,
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            role,
            hours: Some(2),
            notes: None,
        }
    }

    #[tokio::test]
    async fn participation_requires_existing_parents() {
        let (rules, _repos, volunteer_id, workshop_id) = seeded().await;

        let missing_volunteer = rules
            .create_participation(link(Uuid::new_v4(), workshop_id, None))
            .await
            .unwrap_err();
        assert!(matches!(
            missing_volunteer,
            ServiceError::NotFound(Entity::Volunteer)
        ));

        let missing_workshop = rules
            .create_participation(link(volunteer_id, Uuid::new_v4(), None))
            .await
            .unwrap_err();
        assert!(matches!(
            missing_workshop,
            ServiceError::NotFound(Entity::Workshop)
        ));
    }

    #[tokio::test]
    async fn duplicate_link_is_a_conflict_but_other_role_is_not() {
        let (rules, _repos, volunteer_id, workshop_id) = seeded().await;

        rules
            .create_participation(link(volunteer_id, workshop_id, None))
            .await
            .unwrap();
        let duplicate = rules
            .create_participation(link(volunteer_id, workshop_id, None))
            .await
            .unwrap_err();
        assert!(matches!(
            duplicate,
            ServiceError::Conflict(ConflictKind::DuplicateParticipation)
        ));

        rules
            .create_participation(link(
                volunteer_id,
                workshop_id,
                Some(ParticipationRole::Assistant),
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deleting_a_volunteer_removes_its_participations() {
        let (rules, repos, volunteer_id, workshop_id) = seeded().await;
        rules
            .create_participation(link(volunteer_id, workshop_id, None))
            .await
            .unwrap();

        assert_eq!(rules.delete_volunteer(volunteer_id).await.unwrap(), 1);
        let remaining = repos
            .participations
            .list(ParticipationFilter::default())
            .await
            .unwrap();
        assert!(remaining.is_empty());
        assert!(matches!(
            rules.delete_volunteer(volunteer_id).await,
            Err(ServiceError::NotFound(Entity::Volunteer))
        ));
    }

    #[tokio::test]
    async fn deleting_a_workshop_removes_its_participations() {
        let (rules, repos, volunteer_id, workshop_id) = seeded().await;
        rules
            .create_participation(link(volunteer_id, workshop_id, None))
            .await
            .unwrap();

        assert_eq!(rules.delete_workshop(workshop_id).await.unwrap(), 1);
        assert_eq!(
            repos
                .participations
                .count_distinct_volunteers(workshop_id)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn exit_marks_volunteer_inactive_today() {
        let (rules, repos, volunteer_id, _workshop_id) = seeded().await;
        rules.exit_volunteer(volunteer_id).await.unwrap();
        repos
            .volunteers
            .update(
                volunteer_id,
                VolunteerChanges {
                    end_date: Some(NaiveDate::from_ymd_opt(2024, 2, 1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        rules.exit_volunteer(volunteer_id).await.unwrap();

        let volunteer = repos.volunteers.find(volunteer_id).await.unwrap().unwrap();
        assert_eq!(volunteer.status, "INACTIVE");
        assert_eq!(volunteer.end_date, Some(Utc::now().date_naive()));

        assert!(matches!(
            rules.exit_volunteer(Uuid::new_v4()).await,
            Err(ServiceError::NotFound(Entity::Volunteer))
        ));
    }

    #[tokio::test]
    async fn term_lists_each_linked_workshop_once() {
        let (rules, _repos, volunteer_id, workshop_id) = seeded().await;
        rules
            .create_participation(link(volunteer_id, workshop_id, None))
            .await
            .unwrap();
        rules
            .create_participation(link(
                volunteer_id,
                workshop_id,
                Some(ParticipationRole::Facilitator),
            ))
            .await
            .unwrap();

        let term = rules.volunteer_term(volunteer_id).await.unwrap();
        assert_eq!(term.full_name, "Ana Souza");
        assert_eq!(term.workshops, vec!["Robotics".to_string()]);
    }

    #[tokio::test]
    async fn deleting_a_missing_participation_is_not_found() {
        let (rules, _repos, _volunteer_id, _workshop_id) = seeded().await;
        assert!(matches!(
            rules.delete_participation(Uuid::new_v4()).await,
            Err(ServiceError::NotFound(Entity::Participation))
        ));
    }
}
