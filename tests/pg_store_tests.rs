//! Contract tests for the Postgres store. Skipped unless `DATABASE_URL`
//! points at a server where a scratch database can be created.

mod common;

use chrono::{Duration, Utc};
use skilltrack::db::PgStore;
use skilltrack::db::trends::contains_pattern;
use skilltrack::models::{NewTrend, NewUser, ProfileInput, TrendFilter, TrendUpdate, UserUpdate};
use skilltrack::store::{CredentialStore, ProfileStore, StoreError, TrendStore};

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        password_hash: "$argon2id$placeholder".to_string(),
        full_name: None,
    }
}

#[tokio::test]
async fn pg_user_lifecycle() {
    let Some(db) = common::spawn_db().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());

    CredentialStore::ping(&store).await.unwrap();

    let (user, profile) = CredentialStore::create(
        &store,
        new_user("pg@example.com"),
        Some(ProfileInput {
            domain: Some("Cloud".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(profile.unwrap().domain.as_deref(), Some("Cloud"));

    let found = store.find_by_email("PG@example.com").await.unwrap().unwrap();
    assert_eq!(found.id, user.id);

    let err = CredentialStore::create(&store, new_user("Pg@Example.com"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let updated = CredentialStore::update(
        &store,
        user.id,
        &UserUpdate {
            full_name: Some("Renamed".to_string()),
            email: None,
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.full_name.as_deref(), Some("Renamed"));
    assert_eq!(updated.email, "pg@example.com");

    assert!(CredentialStore::delete(&store, user.id).await.unwrap());
    assert!(store.find_by_user(user.id).await.unwrap().is_none());
    assert!(!CredentialStore::delete(&store, user.id).await.unwrap());

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn pg_refresh_rotation_is_compare_and_swap() {
    let Some(db) = common::spawn_db().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let (user, _) = CredentialStore::create(&store, new_user("cas@example.com"), None)
        .await
        .unwrap();

    store.update_refresh_token(user.id, Some("digest-1")).await.unwrap();

    assert!(
        store
            .rotate_refresh_token(user.id, "digest-1", "digest-2")
            .await
            .unwrap()
    );
    assert!(
        !store
            .rotate_refresh_token(user.id, "digest-1", "digest-3")
            .await
            .unwrap()
    );

    store.update_refresh_token(user.id, None).await.unwrap();
    assert!(
        !store
            .rotate_refresh_token(user.id, "digest-2", "digest-4")
            .await
            .unwrap()
    );

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn pg_password_reset_window() {
    let Some(db) = common::spawn_db().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let (user, _) = CredentialStore::create(&store, new_user("reset@example.com"), None)
        .await
        .unwrap();
    store.update_refresh_token(user.id, Some("refresh")).await.unwrap();

    assert!(
        store
            .set_password_reset_token("nobody@example.com", "x", Utc::now())
            .await
            .unwrap()
            .is_none()
    );

    store
        .set_password_reset_token("reset@example.com", "stale", Utc::now() - Duration::seconds(1))
        .await
        .unwrap();
    assert!(store.verify_reset_token("stale").await.unwrap().is_none());

    store
        .set_password_reset_token("reset@example.com", "fresh", Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    let holder = store.verify_reset_token("fresh").await.unwrap().unwrap();
    assert_eq!(holder.id, user.id);

    let after = store
        .reset_password("fresh", "$argon2id$new")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.password_hash, "$argon2id$new");
    assert!(after.reset_token_hash.is_none());
    assert!(after.reset_token_expires_at.is_none());
    assert!(after.refresh_token_hash.is_none());
    assert!(store.verify_reset_token("fresh").await.unwrap().is_none());

    // The token was consumed by the write above.
    assert!(
        store
            .reset_password("fresh", "$argon2id$again")
            .await
            .unwrap()
            .is_none()
    );
    let stored = CredentialStore::find_by_id(&store, user.id).await.unwrap().unwrap();
    assert_eq!(stored.password_hash, "$argon2id$new");

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn pg_profile_upsert_keeps_unset_fields() {
    let Some(db) = common::spawn_db().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let (user, _) = CredentialStore::create(&store, new_user("profile@example.com"), None)
        .await
        .unwrap();

    store
        .upsert(
            user.id,
            &ProfileInput {
                domain: Some("Web".to_string()),
                title: Some("Dev".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let profile = store
        .upsert(
            user.id,
            &ProfileInput {
                bio: Some("Hi".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(profile.domain.as_deref(), Some("Web"));
    assert_eq!(profile.title.as_deref(), Some("Dev"));
    assert_eq!(profile.bio.as_deref(), Some("Hi"));

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn pg_trend_queries() {
    let Some(db) = common::spawn_db().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());

    for (domain, title) in [("AI", "Agents"), ("AI", "RAG pipelines"), ("Web", "HTMX")] {
        TrendStore::create(
            &store,
            NewTrend {
                domain: Some(domain.to_string()),
                title: title.to_string(),
                description: None,
                source: None,
            },
        )
        .await
        .unwrap();
    }

    let ai = store
        .list(&TrendFilter {
            domain: Some("AI".to_string()),
            limit: 50,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(ai.len(), 2);

    let searched = store
        .list(&TrendFilter {
            search: Some("rag".to_string()),
            limit: 50,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);

    let paged = store
        .list(&TrendFilter {
            limit: 1,
            offset: 1,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(paged.len(), 1);

    assert_eq!(store.domains().await.unwrap(), vec!["AI", "Web"]);

    let id = ai[0].id;
    assert!(TrendStore::delete(&store, id).await.unwrap());
    assert!(TrendStore::find_by_id(&store, id).await.unwrap().is_none());

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn pg_concurrent_resets_consume_token_once() {
    let Some(db) = common::spawn_db().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    CredentialStore::create(&store, new_user("race-reset@example.com"), None)
        .await
        .unwrap();
    store
        .set_password_reset_token(
            "race-reset@example.com",
            "shared",
            Utc::now() + Duration::hours(1),
        )
        .await
        .unwrap();

    let attempts = (0..5).map(|i| {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .reset_password("shared", &format!("$argon2id$attempt-{i}"))
                .await
                .unwrap()
        })
    });
    let results = futures_util::future::join_all(attempts).await;

    let consumed = results
        .into_iter()
        .filter(|r| r.as_ref().unwrap().is_some())
        .count();
    assert_eq!(consumed, 1);

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn pg_failed_profile_insert_leaves_no_user() {
    let Some(db) = common::spawn_db().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());

    let result = CredentialStore::create(
        &store,
        new_user("atomic@example.com"),
        Some(ProfileInput {
            experience_level: Some("wizard".to_string()),
            ..Default::default()
        }),
    )
    .await;
    assert!(result.is_err());
    assert!(
        store
            .find_by_email("atomic@example.com")
            .await
            .unwrap()
            .is_none()
    );

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn pg_bulk_create_and_nullable_domain() {
    let Some(db) = common::spawn_db().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());

    let created = store
        .create_many(vec![
            NewTrend {
                domain: Some("AI".to_string()),
                title: "Agents".to_string(),
                ..Default::default()
            },
            NewTrend {
                title: "Unfiled".to_string(),
                description: Some("No domain yet".to_string()),
                ..Default::default()
            },
        ])
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
    assert!(created[1].domain.is_none());

    assert_eq!(store.domains().await.unwrap(), vec!["AI"]);

    let cleared = TrendStore::update(
        &store,
        created[1].id,
        &TrendUpdate {
            description: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert!(cleared.description.is_none());
    assert_eq!(cleared.title, "Unfiled");

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn pg_search_treats_wildcards_literally() {
    let Some(db) = common::spawn_db().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());

    for title in ["100% rust", "1000 rust", "snake_case", "snakeXcase"] {
        TrendStore::create(
            &store,
            NewTrend {
                title: title.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    for (term, expected) in [("0%", 1), ("e_c", 1), ("%", 1), ("rust", 2)] {
        let found = store
            .list(&TrendFilter {
                search: Some(term.to_string()),
                limit: 50,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), expected, "search for {term:?}");
    }

    common::cleanup_db(db).await;
}

#[test]
fn contains_pattern_escapes_like_wildcards() {
    assert_eq!(contains_pattern("rag"), "%rag%");
    assert_eq!(contains_pattern("50%_a\\b"), "%50\\%\\_a\\\\b%");
}
