use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::{
    dsl::{count_distinct, count_star},
    pg::Pg,
    prelude::*,
    PgConnection,
};
use uuid::Uuid;

use crate::db::PgPool;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    NewParticipation, NewUser, NewVolunteer, NewWorkshop, Participation, ParticipationKey, User,
    UserChanges, Volunteer, VolunteerChanges, VolunteerStatus, Workshop, WorkshopChanges,
};
use crate::schema::{participations, users, volunteers, workshops};

use super::{
    Page, ParticipationFilter, ParticipationRepository, UserFilter, UserRepository,
    VolunteerFilter, VolunteerRepository, WorkshopFilter, WorkshopRepository,
};

/// Diesel-backed store. Diesel is synchronous, so every call is moved onto
/// the blocking pool together with its own pooled connection.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| StoreError::Pool(err.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Substring pattern with `\`, `%` and `_` matched literally.
fn like_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for ch in q.trim().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn filtered_users(filter: &UserFilter) -> users::BoxedQuery<'static, Pg> {
    let mut query = users::table.into_boxed();
    if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
        query = query.filter(users::name.ilike(like_pattern(q)));
    }
    query
}

fn filtered_volunteers(filter: &VolunteerFilter) -> volunteers::BoxedQuery<'static, Pg> {
    let mut query = volunteers::table.into_boxed();
    if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
        query = query.filter(volunteers::full_name.ilike(like_pattern(q)));
    }
    if let Some(status) = filter.status {
        query = query.filter(volunteers::status.eq(status.as_str()));
    }
    query
}

fn filtered_workshops(filter: &WorkshopFilter) -> workshops::BoxedQuery<'static, Pg> {
    let mut query = workshops::table.into_boxed();
    if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
        query = query.filter(workshops::name.ilike(like_pattern(q)));
    }
    if let Some(is_active) = filter.is_active {
        query = query.filter(workshops::is_active.eq(is_active));
    }
    query
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_owned();
        self.with_conn(move |conn| {
            Ok(users::table
                .filter(users::email.eq(email))
                .first::<User>(conn)
                .optional()?)
        })
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.with_conn(move |conn| Ok(users::table.find(id).first::<User>(conn).optional()?))
            .await
    }

    async fn find_by_refresh_token(&self, token_hash: &str) -> StoreResult<Option<User>> {
        let token_hash = token_hash.to_owned();
        self.with_conn(move |conn| {
            Ok(users::table
                .filter(users::refresh_token.eq(token_hash))
                .first::<User>(conn)
                .optional()?)
        })
        .await
    }

    async fn list(&self, filter: UserFilter) -> StoreResult<Page<User>> {
        self.with_conn(move |conn| {
            let total: i64 = filtered_users(&filter).count().get_result(conn)?;
            let items = filtered_users(&filter)
                .order(users::created_at.desc())
                .limit(filter.page.limit)
                .offset(filter.page.offset())
                .load::<User>(conn)?;
            Ok(Page {
                items,
                total,
                page: filter.page.page,
                limit: filter.page.limit,
            })
        })
        .await
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        self.with_conn(move |conn| {
            diesel::insert_into(users::table)
                .values(&user)
                .execute(conn)?;
            Ok(users::table.find(user.id).first(conn)?)
        })
        .await
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        self.with_conn(move |conn| {
            let updated = diesel::update(users::table.find(id))
                .set((&changes, users::updated_at.eq(now())))
                .execute(conn)?;
            if updated == 0 {
                return Ok(None);
            }
            Ok(users::table.find(id).first(conn).optional()?)
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        self.with_conn(move |conn| Ok(diesel::delete(users::table.find(id)).execute(conn)? > 0))
            .await
    }

    async fn record_login(
        &self,
        id: Uuid,
        token_hash: &str,
        at: NaiveDateTime,
    ) -> StoreResult<bool> {
        let token_hash = token_hash.to_owned();
        self.with_conn(move |conn| {
            let updated = diesel::update(users::table.find(id))
                .set((
                    users::refresh_token.eq(Some(token_hash)),
                    users::last_login_at.eq(Some(at)),
                    users::updated_at.eq(at),
                ))
                .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    async fn replace_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: Option<&str>,
    ) -> StoreResult<bool> {
        let expected = expected.to_owned();
        let replacement = replacement.map(str::to_owned);
        self.with_conn(move |conn| {
            let updated = diesel::update(
                users::table
                    .filter(users::id.eq(id))
                    .filter(users::refresh_token.eq(expected)),
            )
            .set((
                users::refresh_token.eq(replacement),
                users::updated_at.eq(now()),
            ))
            .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }
}

#[async_trait]
impl VolunteerRepository for PgStore {
    async fn list(&self, filter: VolunteerFilter) -> StoreResult<Page<Volunteer>> {
        self.with_conn(move |conn| {
            let total: i64 = filtered_volunteers(&filter).count().get_result(conn)?;
            let items = filtered_volunteers(&filter)
                .order(volunteers::created_at.desc())
                .limit(filter.page.limit)
                .offset(filter.page.offset())
                .load::<Volunteer>(conn)?;
            Ok(Page {
                items,
                total,
                page: filter.page.page,
                limit: filter.page.limit,
            })
        })
        .await
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Volunteer>> {
        self.with_conn(move |conn| {
            Ok(volunteers::table
                .find(id)
                .first::<Volunteer>(conn)
                .optional()?)
        })
        .await
    }

    async fn insert(&self, volunteer: NewVolunteer) -> StoreResult<Volunteer> {
        self.with_conn(move |conn| {
            diesel::insert_into(volunteers::table)
                .values(&volunteer)
                .execute(conn)?;
            Ok(volunteers::table.find(volunteer.id).first(conn)?)
        })
        .await
    }

    async fn update(&self, id: Uuid, changes: VolunteerChanges) -> StoreResult<Option<Volunteer>> {
        self.with_conn(move |conn| {
            let updated = diesel::update(volunteers::table.find(id))
                .set((&changes, volunteers::updated_at.eq(now())))
                .execute(conn)?;
            if updated == 0 {
                return Ok(None);
            }
            Ok(volunteers::table.find(id).first(conn).optional()?)
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<usize>> {
        self.with_conn(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let removed = diesel::delete(
                    participations::table.filter(participations::volunteer_id.eq(id)),
                )
                .execute(conn)?;
                let deleted = diesel::delete(volunteers::table.find(id)).execute(conn)?;
                // The foreign key keeps an absent volunteer from having rows to remove.
                Ok((deleted > 0).then_some(removed))
            })
        })
        .await
    }

    async fn count_by_status(&self, status: VolunteerStatus) -> StoreResult<i64> {
        self.with_conn(move |conn| {
            Ok(volunteers::table
                .filter(volunteers::status.eq(status.as_str()))
                .select(count_star())
                .first(conn)?)
        })
        .await
    }
}

#[async_trait]
impl WorkshopRepository for PgStore {
    async fn list(&self, filter: WorkshopFilter) -> StoreResult<Page<Workshop>> {
        self.with_conn(move |conn| {
            let total: i64 = filtered_workshops(&filter).count().get_result(conn)?;
            let items = filtered_workshops(&filter)
                .order(workshops::created_at.desc())
                .limit(filter.page.limit)
                .offset(filter.page.offset())
                .load::<Workshop>(conn)?;
            Ok(Page {
                items,
                total,
                page: filter.page.page,
                limit: filter.page.limit,
            })
        })
        .await
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Workshop>> {
        self.with_conn(move |conn| {
            Ok(workshops::table
                .find(id)
                .first::<Workshop>(conn)
                .optional()?)
        })
        .await
    }

    async fn insert(&self, workshop: NewWorkshop) -> StoreResult<Workshop> {
        self.with_conn(move |conn| {
            diesel::insert_into(workshops::table)
                .values(&workshop)
                .execute(conn)?;
            Ok(workshops::table.find(workshop.id).first(conn)?)
        })
        .await
    }

    async fn update(&self, id: Uuid, changes: WorkshopChanges) -> StoreResult<Option<Workshop>> {
        self.with_conn(move |conn| {
            let updated = diesel::update(workshops::table.find(id))
                .set((&changes, workshops::updated_at.eq(now())))
                .execute(conn)?;
            if updated == 0 {
                return Ok(None);
            }
            Ok(workshops::table.find(id).first(conn).optional()?)
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<usize>> {
        self.with_conn(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let removed = diesel::delete(
                    participations::table.filter(participations::workshop_id.eq(id)),
                )
                .execute(conn)?;
                let deleted = diesel::delete(workshops::table.find(id)).execute(conn)?;
                Ok((deleted > 0).then_some(removed))
            })
        })
        .await
    }
}

#[async_trait]
impl ParticipationRepository for PgStore {
    async fn list(&self, filter: ParticipationFilter) -> StoreResult<Vec<Participation>> {
        self.with_conn(move |conn| {
            let mut query = participations::table.into_boxed();
            if let Some(volunteer_id) = filter.volunteer_id {
                query = query.filter(participations::volunteer_id.eq(volunteer_id));
            }
            if let Some(workshop_id) = filter.workshop_id {
                query = query.filter(participations::workshop_id.eq(workshop_id));
            }
            Ok(query
                .order((
                    participations::date.desc(),
                    participations::created_at.desc(),
                ))
                .load::<Participation>(conn)?)
        })
        .await
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Participation>> {
        self.with_conn(move |conn| {
            Ok(participations::table
                .find(id)
                .first::<Participation>(conn)
                .optional()?)
        })
        .await
    }

    async fn find_by_key(&self, key: &ParticipationKey) -> StoreResult<Option<Participation>> {
        let key = key.clone();
        self.with_conn(move |conn| {
            let mut query = participations::table
                .filter(participations::volunteer_id.eq(key.volunteer_id))
                .filter(participations::workshop_id.eq(key.workshop_id))
                .filter(participations::date.eq(key.date))
                .into_boxed();
            query = match key.role {
                Some(role) => query.filter(participations::role.eq(role)),
                None => query.filter(participations::role.is_null()),
            };
            Ok(query.first::<Participation>(conn).optional()?)
        })
        .await
    }

    async fn insert(&self, participation: NewParticipation) -> StoreResult<Participation> {
        self.with_conn(move |conn| {
            diesel::insert_into(participations::table)
                .values(&participation)
                .execute(conn)?;
            Ok(participations::table.find(participation.id).first(conn)?)
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        self.with_conn(move |conn| {
            Ok(diesel::delete(participations::table.find(id)).execute(conn)? > 0)
        })
        .await
    }

    async fn count_distinct_volunteers(&self, workshop_id: Uuid) -> StoreResult<i64> {
        self.with_conn(move |conn| {
            Ok(participations::table
                .filter(participations::workshop_id.eq(workshop_id))
                .select(count_distinct(participations::volunteer_id))
                .first(conn)?)
        })
        .await
    }

    async fn count_distinct_workshops(&self) -> StoreResult<i64> {
        self.with_conn(move |conn| {
            Ok(participations::table
                .select(count_distinct(participations::workshop_id))
                .first(conn)?)
        })
        .await
    }
}
