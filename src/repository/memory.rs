use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    NewParticipation, NewUser, NewVolunteer, NewWorkshop, Participation, ParticipationKey, User,
    UserChanges, Volunteer, VolunteerChanges, VolunteerStatus, Workshop, WorkshopChanges,
};

use super::{
    Page, PageRequest, ParticipationFilter, ParticipationRepository, UserFilter, UserRepository,
    VolunteerFilter, VolunteerRepository, WorkshopFilter, WorkshopRepository,
};

/// Process-local store with the same uniqueness rules as the database
/// schema. Contents live for the lifetime of the process.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    volunteers: Vec<Volunteer>,
    workshops: Vec<Workshop>,
    participations: Vec<Participation>,
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim).filter(|n| !n.is_empty()) {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

/// Newest first, then sliced to the requested page.
fn paginate<T: Clone>(
    rows: Vec<&T>,
    created_at: impl Fn(&T) -> NaiveDateTime,
    page: PageRequest,
) -> Page<T> {
    let mut rows = rows;
    rows.reverse();
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .cloned()
        .collect();
    Page {
        items,
        total,
        page: page.page,
        limit: page.limit,
    }
}

fn apply<T>(slot: &mut T, change: Option<T>) {
    if let Some(value) = change {
        *slot = value;
    }
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn volunteer_email_taken(&self, email: Option<&str>, except: Option<Uuid>) -> bool {
        let Some(email) = email else {
            return false;
        };
        self.volunteers
            .iter()
            .any(|v| v.email.as_deref() == Some(email) && Some(v.id) != except)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_refresh_token(&self, token_hash: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.refresh_token.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn list(&self, filter: UserFilter) -> StoreResult<Page<User>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .users
            .iter()
            .filter(|u| contains_ci(&u.name, filter.q.as_deref()))
            .collect();
        Ok(paginate(rows, |u: &User| u.created_at, filter.page))
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&user.email, None) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        let at = now();
        let row = User {
            id: user.id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            is_super_admin: user.is_super_admin,
            refresh_token: None,
            last_login_at: None,
            created_at: at,
            updated_at: at,
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut tables = self.tables.lock().await;
        if let Some(email) = changes.email.as_deref() {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::UniqueViolation("users_email_key".into()));
            }
        }
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        apply(&mut user.name, changes.name);
        apply(&mut user.email, changes.email);
        apply(&mut user.password_hash, changes.password_hash);
        apply(&mut user.is_super_admin, changes.is_super_admin);
        user.updated_at = now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        Ok(tables.users.len() < before)
    }

    async fn record_login(
        &self,
        id: Uuid,
        token_hash: &str,
        at: NaiveDateTime,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        user.refresh_token = Some(token_hash.to_owned());
        user.last_login_at = Some(at);
        user.updated_at = at;
        Ok(true)
    }

    async fn replace_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: Option<&str>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let Some(user) = tables
            .users
            .iter_mut()
            .find(|u| u.id == id && u.refresh_token.as_deref() == Some(expected))
        else {
            return Ok(false);
        };
        user.refresh_token = replacement.map(str::to_owned);
        user.updated_at = now();
        Ok(true)
    }
}

#[async_trait]
impl VolunteerRepository for MemoryStore {
    async fn list(&self, filter: VolunteerFilter) -> StoreResult<Page<Volunteer>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .volunteers
            .iter()
            .filter(|v| contains_ci(&v.full_name, filter.q.as_deref()))
            .filter(|v| match filter.status {
                Some(status) => v.status == status.as_str(),
                None => true,
            })
            .collect();
        Ok(paginate(rows, |v: &Volunteer| v.created_at, filter.page))
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Volunteer>> {
        let tables = self.tables.lock().await;
        Ok(tables.volunteers.iter().find(|v| v.id == id).cloned())
    }

    async fn insert(&self, volunteer: NewVolunteer) -> StoreResult<Volunteer> {
        let mut tables = self.tables.lock().await;
        if tables.volunteer_email_taken(volunteer.email.as_deref(), None) {
            return Err(StoreError::UniqueViolation("volunteers_email_key".into()));
        }
        let at = now();
        let row = Volunteer {
            id: volunteer.id,
            first_name: volunteer.first_name,
            last_name: volunteer.last_name,
            full_name: volunteer.full_name,
            email: volunteer.email,
            phone: volunteer.phone,
            cpf: volunteer.cpf,
            birth_date: volunteer.birth_date,
            address: volunteer.address,
            start_date: volunteer.start_date,
            end_date: volunteer.end_date,
            status: volunteer.status,
            emergency_contact_name: volunteer.emergency_contact_name,
            emergency_contact_phone: volunteer.emergency_contact_phone,
            notes: volunteer.notes,
            created_at: at,
            updated_at: at,
        };
        tables.volunteers.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: VolunteerChanges) -> StoreResult<Option<Volunteer>> {
        let mut tables = self.tables.lock().await;
        if let Some(Some(email)) = changes.email.as_ref() {
            if tables.volunteer_email_taken(Some(email), Some(id)) {
                return Err(StoreError::UniqueViolation("volunteers_email_key".into()));
            }
        }
        let Some(volunteer) = tables.volunteers.iter_mut().find(|v| v.id == id) else {
            return Ok(None);
        };
        apply(&mut volunteer.first_name, changes.first_name);
        apply(&mut volunteer.last_name, changes.last_name);
        apply(&mut volunteer.full_name, changes.full_name);
        apply(&mut volunteer.email, changes.email);
        apply(&mut volunteer.phone, changes.phone);
        apply(&mut volunteer.cpf, changes.cpf);
        apply(&mut volunteer.birth_date, changes.birth_date);
        apply(&mut volunteer.address, changes.address);
        apply(&mut volunteer.start_date, changes.start_date);
        apply(&mut volunteer.end_date, changes.end_date);
        apply(&mut volunteer.status, changes.status);
        apply(
            &mut volunteer.emergency_contact_name,
            changes.emergency_contact_name,
        );
        apply(
            &mut volunteer.emergency_contact_phone,
            changes.emergency_contact_phone,
        );
        apply(&mut volunteer.notes, changes.notes);
        volunteer.updated_at = now();
        Ok(Some(volunteer.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<usize>> {
        let mut tables = self.tables.lock().await;
        let before = tables.volunteers.len();
        tables.volunteers.retain(|v| v.id != id);
        if tables.volunteers.len() == before {
            return Ok(None);
        }
        let linked = tables.participations.len();
        tables.participations.retain(|p| p.volunteer_id != id);
        Ok(Some(linked - tables.participations.len()))
    }

    async fn count_by_status(&self, status: VolunteerStatus) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .volunteers
            .iter()
            .filter(|v| v.status == status.as_str())
            .count() as i64)
    }
}

#[async_trait]
impl WorkshopRepository for MemoryStore {
    async fn list(&self, filter: WorkshopFilter) -> StoreResult<Page<Workshop>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .workshops
            .iter()
            .filter(|w| contains_ci(&w.name, filter.q.as_deref()))
            .filter(|w| filter.is_active.map_or(true, |active| w.is_active == active))
            .collect();
        Ok(paginate(rows, |w: &Workshop| w.created_at, filter.page))
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Workshop>> {
        let tables = self.tables.lock().await;
        Ok(tables.workshops.iter().find(|w| w.id == id).cloned())
    }

    async fn insert(&self, workshop: NewWorkshop) -> StoreResult<Workshop> {
        let mut tables = self.tables.lock().await;
        let at = now();
        let row = Workshop {
            id: workshop.id,
            name: workshop.name,
            description: workshop.description,
            is_active: workshop.is_active,
            weekday: workshop.weekday,
            start_time: workshop.start_time,
            end_time: workshop.end_time,
            capacity: workshop.capacity,
            created_at: at,
            updated_at: at,
        };
        tables.workshops.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: WorkshopChanges) -> StoreResult<Option<Workshop>> {
        let mut tables = self.tables.lock().await;
        let Some(workshop) = tables.workshops.iter_mut().find(|w| w.id == id) else {
            return Ok(None);
        };
        apply(&mut workshop.name, changes.name);
        apply(&mut workshop.description, changes.description);
        apply(&mut workshop.is_active, changes.is_active);
        apply(&mut workshop.weekday, changes.weekday);
        apply(&mut workshop.start_time, changes.start_time);
        apply(&mut workshop.end_time, changes.end_time);
        apply(&mut workshop.capacity, changes.capacity);
        workshop.updated_at = now();
        Ok(Some(workshop.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<usize>> {
        let mut tables = self.tables.lock().await;
        let before = tables.workshops.len();
        tables.workshops.retain(|w| w.id != id);
        if tables.workshops.len() == before {
            return Ok(None);
        }
        let linked = tables.participations.len();
        tables.participations.retain(|p| p.workshop_id != id);
        Ok(Some(linked - tables.participations.len()))
    }
}

#[async_trait]
impl ParticipationRepository for MemoryStore {
    async fn list(&self, filter: ParticipationFilter) -> StoreResult<Vec<Participation>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Participation> = tables
            .participations
            .iter()
            .filter(|p| filter.volunteer_id.map_or(true, |id| p.volunteer_id == id))
            .filter(|p| filter.workshop_id.map_or(true, |id| p.workshop_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Participation>> {
        let tables = self.tables.lock().await;
        Ok(tables.participations.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_key(&self, key: &ParticipationKey) -> StoreResult<Option<Participation>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .participations
            .iter()
            .find(|p| key.matches(p))
            .cloned())
    }

    async fn insert(&self, participation: NewParticipation) -> StoreResult<Participation> {
        let mut tables = self.tables.lock().await;
        let key = ParticipationKey::from(&participation);
        if tables.participations.iter().any(|p| key.matches(p)) {
            return Err(StoreError::UniqueViolation(
                "participations_unique_link".into(),
            ));
        }
        let at = now();
        let row = Participation {
            id: participation.id,
            volunteer_id: participation.volunteer_id,
            workshop_id: participation.workshop_id,
            date: participation.date,
            role: participation.role,
            hours: participation.hours,
            notes: participation.notes,
            created_at: at,
            updated_at: at,
        };
        tables.participations.push(row.clone());
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.participations.len();
        tables.participations.retain(|p| p.id != id);
        Ok(tables.participations.len() < before)
    }

    async fn count_distinct_volunteers(&self, workshop_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        let distinct: HashSet<Uuid> = tables
            .participations
            .iter()
            .filter(|p| p.workshop_id == workshop_id)
            .map(|p| p.volunteer_id)
            .collect();
        Ok(distinct.len() as i64)
    }

    async fn count_distinct_workshops(&self) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        let distinct: HashSet<Uuid> = tables.participations.iter().map(|p| p.workshop_id).collect();
        Ok(distinct.len() as i64)
    }
}
