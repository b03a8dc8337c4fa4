use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::{CredentialStore, ProfileStore, StoreError, TrendStore};
use crate::models::{
    NewTrend, NewUser, Profile, ProfileInput, Trend, TrendFilter, TrendUpdate, User, UserUpdate,
};

/// Process-local store for running without Postgres and for tests.
///
/// Each map is lock-sharded; a per-user read-modify-write happens under the
/// shard guard of that user, so refresh rotation is a true compare-and-swap.
/// When both maps are touched, `emails` is locked before `users`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    users: DashMap<Uuid, User>,
    /// lowercased email -> user id
    emails: DashMap<String, Uuid>,
    /// user id -> profile
    profiles: DashMap<Uuid, Profile>,
    trends: DashMap<Uuid, Trend>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.inner.users.len()
    }

    fn id_for_email(&self, email: &str) -> Option<Uuid> {
        self.inner
            .emails
            .get(&email.to_lowercase())
            .map(|entry| *entry.value())
    }

    fn reset_token_holder(&self, token_hash: &str) -> Option<Uuid> {
        let now = Utc::now();
        self.inner
            .users
            .iter()
            .find(|user| reset_window_open(user, token_hash, now))
            .map(|user| user.id)
    }
}

fn reset_window_open(user: &User, token_hash: &str, now: DateTime<Utc>) -> bool {
    digest_eq(user.reset_token_hash.as_deref(), token_hash)
        && user.reset_token_expires_at.is_some_and(|at| at > now)
}

fn digest_eq(stored: Option<&str>, presented: &str) -> bool {
    stored
        .map(|hash| hash.as_bytes().ct_eq(presented.as_bytes()).into())
        .unwrap_or(false)
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = self.id_for_email(email) else {
            return Ok(None);
        };
        Ok(self.inner.users.get(&id).map(|user| user.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.users.get(&id).map(|user| user.clone()))
    }

    async fn create(
        &self,
        new_user: NewUser,
        profile: Option<ProfileInput>,
    ) -> Result<(User, Option<Profile>), StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        match self.inner.emails.entry(new_user.email.to_lowercase()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict("users_email_key".to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let user = User {
            id,
            email: new_user.email,
            password_hash: new_user.password_hash,
            full_name: new_user.full_name,
            refresh_token_hash: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.users.insert(id, user.clone());

        let profile = profile.map(|input| {
            let profile = Profile {
                id: Uuid::now_v7(),
                user_id: id,
                domain: input.domain,
                title: input.title,
                experience_level: input.experience_level,
                bio: input.bio,
                created_at: now,
                updated_at: now,
            };
            self.inner.profiles.insert(id, profile.clone());
            profile
        });

        Ok((user, profile))
    }

    async fn update(&self, id: Uuid, changes: &UserUpdate) -> Result<Option<User>, StoreError> {
        let Some(current_email) = self.inner.users.get(&id).map(|u| u.email.to_lowercase()) else {
            return Ok(None);
        };

        if let Some(email) = &changes.email {
            let key = email.to_lowercase();
            if key != current_email {
                match self.inner.emails.entry(key) {
                    Entry::Occupied(_) => {
                        return Err(StoreError::Conflict("users_email_key".to_string()));
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(id);
                    }
                }
                self.inner.emails.remove(&current_email);
            }
        }

        let Some(mut user) = self.inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(full_name) = &changes.full_name {
            user.full_name = Some(full_name.clone());
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_refresh_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<(), StoreError> {
        if let Some(mut user) = self.inner.users.get_mut(&id) {
            user.refresh_token_hash = token_hash.map(str::to_string);
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current_hash: &str,
        next_hash: &str,
    ) -> Result<bool, StoreError> {
        let Some(mut user) = self.inner.users.get_mut(&id) else {
            return Ok(false);
        };

        if !digest_eq(user.refresh_token_hash.as_deref(), current_hash) {
            return Ok(false);
        }

        user.refresh_token_hash = Some(next_hash.to_string());
        Ok(true)
    }

    async fn set_password_reset_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let Some(id) = self.id_for_email(email) else {
            return Ok(None);
        };
        let Some(mut user) = self.inner.users.get_mut(&id) else {
            return Ok(None);
        };

        user.reset_token_hash = Some(token_hash.to_string());
        user.reset_token_expires_at = Some(expires_at);
        Ok(Some(user.clone()))
    }

    async fn verify_reset_token(&self, token_hash: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .reset_token_holder(token_hash)
            .and_then(|id| self.inner.users.get(&id).map(|user| user.clone())))
    }

    async fn reset_password(
        &self,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let Some(id) = self.reset_token_holder(token_hash) else {
            return Ok(None);
        };
        let Some(mut user) = self.inner.users.get_mut(&id) else {
            return Ok(None);
        };

        // Re-check under the guard; a concurrent reset may have consumed it.
        if !reset_window_open(&user, token_hash, Utc::now()) {
            return Ok(None);
        }

        user.password_hash = password_hash.to_string();
        user.reset_token_hash = None;
        user.reset_token_expires_at = None;
        user.refresh_token_hash = None;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let Some((_, user)) = self.inner.users.remove(&id) else {
            return Ok(false);
        };
        self.inner.emails.remove(&user.email.to_lowercase());
        self.inner.profiles.remove(&id);
        Ok(true)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.inner.profiles.get(&user_id).map(|p| p.clone()))
    }

    async fn upsert(&self, user_id: Uuid, input: &ProfileInput) -> Result<Profile, StoreError> {
        let now = Utc::now();
        let profile = self
            .inner
            .profiles
            .entry(user_id)
            .and_modify(|profile| {
                if let Some(domain) = &input.domain {
                    profile.domain = Some(domain.clone());
                }
                if let Some(title) = &input.title {
                    profile.title = Some(title.clone());
                }
                if let Some(level) = &input.experience_level {
                    profile.experience_level = Some(level.clone());
                }
                if let Some(bio) = &input.bio {
                    profile.bio = Some(bio.clone());
                }
                profile.updated_at = now;
            })
            .or_insert_with(|| Profile {
                id: Uuid::now_v7(),
                user_id,
                domain: input.domain.clone(),
                title: input.title.clone(),
                experience_level: input.experience_level.clone(),
                bio: input.bio.clone(),
                created_at: now,
                updated_at: now,
            });
        Ok(profile.clone())
    }
}

#[async_trait]
impl TrendStore for MemoryStore {
    async fn list(&self, filter: &TrendFilter) -> Result<Vec<Trend>, StoreError> {
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());

        let mut trends: Vec<Trend> = self
            .inner
            .trends
            .iter()
            .filter(|trend| {
                filter
                    .domain
                    .as_ref()
                    .is_none_or(|domain| trend.domain.as_ref() == Some(domain))
            })
            .filter(|trend| {
                needle.as_ref().is_none_or(|needle| {
                    trend.title.to_lowercase().contains(needle)
                        || trend
                            .description
                            .as_ref()
                            .is_some_and(|d| d.to_lowercase().contains(needle))
                })
            })
            .filter(|trend| {
                filter
                    .created_after
                    .is_none_or(|after| trend.created_at >= after)
            })
            .map(|trend| trend.clone())
            .collect();

        trends.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(trends
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn domains(&self) -> Result<Vec<String>, StoreError> {
        let domains: BTreeSet<String> = self
            .inner
            .trends
            .iter()
            .filter_map(|trend| trend.domain.clone())
            .collect();
        Ok(domains.into_iter().collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Trend>, StoreError> {
        Ok(self.inner.trends.get(&id).map(|t| t.clone()))
    }

    async fn create(&self, new_trend: NewTrend) -> Result<Trend, StoreError> {
        let trend = build_trend(new_trend, Utc::now());
        self.inner.trends.insert(trend.id, trend.clone());
        Ok(trend)
    }

    async fn create_many(&self, new_trends: Vec<NewTrend>) -> Result<Vec<Trend>, StoreError> {
        let now = Utc::now();
        let trends: Vec<Trend> = new_trends
            .into_iter()
            .map(|new_trend| build_trend(new_trend, now))
            .collect();

        for trend in &trends {
            self.inner.trends.insert(trend.id, trend.clone());
        }
        Ok(trends)
    }

    async fn update(&self, id: Uuid, changes: &TrendUpdate) -> Result<Option<Trend>, StoreError> {
        let Some(mut trend) = self.inner.trends.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(domain) = &changes.domain {
            trend.domain = domain.clone();
        }
        if let Some(title) = &changes.title {
            trend.title = title.clone();
        }
        if let Some(description) = &changes.description {
            trend.description = description.clone();
        }
        if let Some(source) = &changes.source {
            trend.source = source.clone();
        }
        trend.updated_at = Utc::now();
        Ok(Some(trend.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.trends.remove(&id).is_some())
    }
}

fn build_trend(new_trend: NewTrend, now: DateTime<Utc>) -> Trend {
    Trend {
        id: Uuid::now_v7(),
        domain: new_trend.domain,
        title: new_trend.title,
        description: new_trend.description,
        source: new_trend.source,
        created_at: now,
        updated_at: now,
    }
}
