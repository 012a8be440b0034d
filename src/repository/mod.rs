//! Persistence seams. Every store the services touch sits behind one of these
//! traits so the durable Postgres implementation and the process-local one
//! are interchangeable.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::db::PgPool;
use crate::error::StoreResult;
use crate::models::{
    NewParticipation, NewUser, NewVolunteer, NewWorkshop, Participation, ParticipationKey, User,
    UserChanges, Volunteer, VolunteerChanges, VolunteerStatus, Workshop, WorkshopChanges,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 1000;

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Saturates instead of overflowing on absurd page numbers; such a page
    /// is simply past the end.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub q: Option<String>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Default)]
pub struct VolunteerFilter {
    pub q: Option<String>,
    pub status: Option<VolunteerStatus>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Default)]
pub struct WorkshopFilter {
    pub q: Option<String>,
    pub is_active: Option<bool>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Default)]
pub struct ParticipationFilter {
    pub volunteer_id: Option<Uuid>,
    pub workshop_id: Option<Uuid>,
}

/// Credential store. The refresh slot holds at most one digest per user.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// `email` must already be case-folded.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_refresh_token(&self, token_hash: &str) -> StoreResult<Option<User>>;

    async fn list(&self, filter: UserFilter) -> StoreResult<Page<User>>;

    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    async fn update(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    /// Unconditionally overwrites the refresh slot and stamps the login time.
    async fn record_login(
        &self,
        id: Uuid,
        token_hash: &str,
        at: NaiveDateTime,
    ) -> StoreResult<bool>;

    /// Compare-and-set on the refresh slot. Returns `false` when the stored
    /// digest no longer equals `expected`.
    async fn replace_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: Option<&str>,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait VolunteerRepository: Send + Sync + 'static {
    async fn list(&self, filter: VolunteerFilter) -> StoreResult<Page<Volunteer>>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<Volunteer>>;

    async fn insert(&self, volunteer: NewVolunteer) -> StoreResult<Volunteer>;

    async fn update(&self, id: Uuid, changes: VolunteerChanges) -> StoreResult<Option<Volunteer>>;

    /// Removes the volunteer and its participations as one unit. Returns the
    /// number of participations removed, or `None` when the volunteer is absent.
    async fn delete(&self, id: Uuid) -> StoreResult<Option<usize>>;

    async fn count_by_status(&self, status: VolunteerStatus) -> StoreResult<i64>;
}

#[async_trait]
pub trait WorkshopRepository: Send + Sync + 'static {
    async fn list(&self, filter: WorkshopFilter) -> StoreResult<Page<Workshop>>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<Workshop>>;

    async fn insert(&self, workshop: NewWorkshop) -> StoreResult<Workshop>;

    async fn update(&self, id: Uuid, changes: WorkshopChanges) -> StoreResult<Option<Workshop>>;

    /// Same contract as [`VolunteerRepository::delete`].
    async fn delete(&self, id: Uuid) -> StoreResult<Option<usize>>;
}

#[async_trait]
pub trait ParticipationRepository: Send + Sync + 'static {
    /// Newest participation date first.
    async fn list(&self, filter: ParticipationFilter) -> StoreResult<Vec<Participation>>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<Participation>>;

    async fn find_by_key(&self, key: &ParticipationKey) -> StoreResult<Option<Participation>>;

    async fn insert(&self, participation: NewParticipation) -> StoreResult<Participation>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn count_distinct_volunteers(&self, workshop_id: Uuid) -> StoreResult<i64>;

    async fn count_distinct_workshops(&self) -> StoreResult<i64>;
}

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub volunteers: Arc<dyn VolunteerRepository>,
    pub workshops: Arc<dyn WorkshopRepository>,
    pub participations: Arc<dyn ParticipationRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::default()))
    }

    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + VolunteerRepository + WorkshopRepository + ParticipationRepository,
    {
        Self {
            users: store.clone(),
            volunteers: store.clone(),
            workshops: store.clone(),
            participations: store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PageRequest;

    #[test]
    fn page_request_clamps_inputs() {
        let page = PageRequest::new(Some(0), Some(5000));
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, super::MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 0);

        let third = PageRequest::new(Some(3), Some(10));
        assert_eq!(third.offset(), 20);
    }

    #[test]
    fn huge_page_number_saturates_offset() {
        let page = PageRequest::new(Some(i64::MAX), Some(20));
        assert_eq!(page.offset(), i64::MAX);
    }
}
