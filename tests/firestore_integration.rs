// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). They are skipped otherwise.
//!
//! The emulator keeps state across tests, so every test uses unique IDs.

use animago_api::db::{SightingStore, UserUpdate};
use animago_api::models::{Comment, Coordinates, Sighting, User};
use std::sync::Arc;

mod common;
use common::test_db;

/// Generate a unique ID for test isolation.
fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

fn test_sighting(sighting_id: &str, user_id: &str) -> Sighting {
    let now = chrono::Utc::now();
    Sighting {
        sighting_id: sighting_id.to_string(),
        user_id: user_id.to_string(),
        timestamp: now,
        created_at: now,
        updated_at: now,
        coordinates: Coordinates::new(37.3318, -122.0312),
        altitude: Some(12.0),
        accuracy: None,
        species: "Western Scrub-Jay".to_string(),
        description: "A blue bird on a fence.".to_string(),
        sighting_url: format!("https://storage.googleapis.com/test/{}.jpg", sighting_id),
        comments: vec![],
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_roundtrip() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("user");

    assert!(db.get_user(&user_id).await.unwrap().is_none());

    let mut user = User::new(user_id.as_str(), "Test", "User");
    user.email = Some("test@example.com".to_string());
    db.create_user(&user).await.unwrap();

    let fetched = db.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(fetched, user);

    println!("✓ User created and read back: user_id={}", user_id);
}

#[tokio::test]
async fn test_award_sighting_uses_transforms() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("user");
    db.create_user(&User::new(user_id.as_str(), "Award", "Test"))
        .await
        .unwrap();

    assert_eq!(
        db.award_sighting(&user_id, "s-1", 100).await.unwrap(),
        UserUpdate::Applied
    );
    // Array union: the same reference is not appended twice
    assert_eq!(
        db.award_sighting(&user_id, "s-1", 100).await.unwrap(),
        UserUpdate::Applied
    );

    let user = db.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(user.xp, 200);
    assert_eq!(user.sightings, vec!["s-1".to_string()]);
}

#[tokio::test]
async fn test_award_sighting_skips_missing_user() {
    require_emulator!();

    let db = test_db().await;
    let result = db
        .award_sighting(&unique_id("ghost"), "s-1", 100)
        .await
        .unwrap();
    assert_eq!(result, UserUpdate::Skipped { matches: 0 });
}

#[tokio::test]
async fn test_concurrent_awards_are_not_lost() {
    require_emulator!();

    let db = Arc::new(test_db().await);
    let user_id = unique_id("user");
    db.create_user(&User::new(user_id.as_str(), "Busy", "User"))
        .await
        .unwrap();

    let mut handles = vec![];
    for i in 0..5 {
        let db = db.clone();
        let user_id = user_id.clone();
        handles.push(tokio::spawn(async move {
            db.award_sighting(&user_id, &format!("s-{}", i), 100).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), UserUpdate::Applied);
    }

    let user = db.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(user.xp, 500);
    assert_eq!(user.sightings.len(), 5);
}

// ═══════════════════════════════════════════════════════════════════════════
// SIGHTING TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_sighting_roundtrip_and_comments() {
    require_emulator!();

    let db = test_db().await;
    let sighting_id = unique_id("sighting");
    let user_id = unique_id("user");
    db.insert_sighting(&test_sighting(&sighting_id, &user_id))
        .await
        .unwrap();

    let fetched = db.get_sighting(&sighting_id).await.unwrap().unwrap();
    assert_eq!(fetched.species, "Western Scrub-Jay");
    assert_eq!(fetched.altitude, Some(12.0));

    let comment = Comment::new("commenter", "Nice!");
    assert_eq!(db.append_comment(&sighting_id, &comment).await.unwrap(), 1);
    assert_eq!(
        db.append_comment(&unique_id("missing"), &comment)
            .await
            .unwrap(),
        0
    );

    let fetched = db.get_sighting(&sighting_id).await.unwrap().unwrap();
    assert_eq!(fetched.comments.len(), 1);
    assert_eq!(fetched.comments[0].comment, "Nice!");

    let mine = db.sightings_for_user(&user_id).await.unwrap();
    assert_eq!(mine.len(), 1);
}
