//! End-to-end poll flows against a real database.
//!
//! These tests require a running `PostgreSQL` instance whose user may create
//! databases; every test works in its own freshly migrated database.
//! Run with: `cargo test -p quickpoll-core --test poll_flow -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `quickpoll_test`)
//!   `TEST_DB_PASSWORD` (default: `quickpoll_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use quickpoll_common::{AppError, PollConfig};
use quickpoll_core::{
    CastVoteInput, CreatePollInput, CreatedPoll, ListPollsQuery, OptionTextUpdate, PollService,
    PollSort, UpdatePollInput,
};
use quickpoll_db::{
    entities::poll::VotingSecurityLevel,
    repositories::{IndividualVoteRepository, PollOptionRepository},
    test_utils::TestDatabase,
};

async fn setup() -> (TestDatabase, PollService) {
    let db = TestDatabase::create_unique()
        .await
        .expect("Failed to create test database");
    let conn = db
        .connect_owned()
        .await
        .expect("Failed to open service connection");
    let service = PollService::new(Arc::new(conn), PollConfig::default());
    (db, service)
}

async fn create(service: &PollService, options: &[&str], multiple: bool) -> CreatedPoll {
    service
        .create_poll(CreatePollInput {
            question: "Favorite color?".to_string(),
            options: options.iter().map(ToString::to_string).collect(),
            allow_multiple_selections: multiple,
            is_public: true,
            ..Default::default()
        })
        .await
        .expect("Failed to create poll")
}

fn select<S: AsRef<str>>(ids: &[S]) -> CastVoteInput {
    CastVoteInput {
        selected_option_ids: ids.iter().map(|id| id.as_ref().to_string()).collect(),
    }
}

fn option_id(created: &CreatedPoll, text: &str) -> String {
    created
        .poll
        .options
        .iter()
        .find(|o| o.text == text)
        .map(|o| o.id.clone())
        .expect("option exists")
}

/// Every option counter must equal its number of live ballots.
async fn assert_tallies_consistent(db: &TestDatabase, poll_id: &str) {
    let options = PollOptionRepository::new(db.connection())
        .find_by_poll(poll_id)
        .await
        .unwrap();
    let ballots = IndividualVoteRepository::new(db.connection())
        .count_by_option(poll_id)
        .await
        .unwrap();

    for option in options {
        let live = ballots.get(&option.id).copied().unwrap_or(0);
        assert_eq!(
            u64::try_from(option.votes).unwrap(),
            live,
            "tally of option '{}' drifted from its ballots",
            option.text
        );
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_red_blue_recast() {
    let (db, service) = setup().await;
    let created = create(&service, &["Red", "Blue"], false).await;
    let poll_id = created.poll.poll.id.clone();
    let red = option_id(&created, "Red");
    let blue = option_id(&created, "Blue");

    let first = service
        .cast_vote(&poll_id, select(&[&red]), None)
        .await
        .unwrap();
    let token = first.new_token.clone().expect("token minted");
    assert!(first.persist_token);
    assert_eq!(first.poll.total_votes(), 1);

    let second = service
        .cast_vote(&poll_id, select(&[&blue]), Some(token))
        .await
        .unwrap();
    assert!(second.new_token.is_none());

    let poll = service.get_poll(&poll_id).await.unwrap();
    let votes: Vec<(&str, i32)> = poll
        .options
        .iter()
        .map(|o| (o.text.as_str(), o.votes))
        .collect();
    assert_eq!(votes, vec![("Red", 0), ("Blue", 1)]);
    assert_tallies_consistent(&db, &poll_id).await;

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_recast_replaces_multi_selection() {
    let (db, service) = setup().await;
    let created = create(&service, &["Red", "Green", "Blue"], true).await;
    let poll_id = created.poll.poll.id.clone();
    let red = option_id(&created, "Red");
    let green = option_id(&created, "Green");
    let blue = option_id(&created, "Blue");

    let outcome = service
        .cast_vote(&poll_id, select(&[&red, &green]), None)
        .await
        .unwrap();
    let token = outcome.new_token.unwrap();

    for _ in 0..3 {
        service
            .cast_vote(&poll_id, select(&[&green, &blue]), Some(token.clone()))
            .await
            .unwrap();
    }

    let poll = service.get_poll(&poll_id).await.unwrap();
    assert_eq!(poll.total_votes(), 2);
    assert_tallies_consistent(&db, &poll_id).await;

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_rejected_votes_leave_tallies_unchanged() {
    let (db, service) = setup().await;
    let created = create(&service, &["Red", "Blue"], false).await;
    let poll_id = created.poll.poll.id.clone();
    let red = option_id(&created, "Red");
    let blue = option_id(&created, "Blue");

    let token = service
        .cast_vote(&poll_id, select(&[&red]), None)
        .await
        .unwrap()
        .new_token;

    let unknown = service
        .cast_vote(&poll_id, select(&["not-an-option"]), token.clone())
        .await;
    assert!(matches!(unknown, Err(AppError::InvalidVote(_))));

    let two = service
        .cast_vote(&poll_id, select(&[&red, &blue]), token)
        .await;
    assert!(matches!(two, Err(AppError::InvalidVote(_))));

    let poll = service.get_poll(&poll_id).await.unwrap();
    assert_eq!(poll.total_votes(), 1);
    assert_eq!(poll.options[0].votes, 1);
    assert_tallies_consistent(&db, &poll_id).await;

    db.drop_database().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_votes_keep_tallies_consistent() {
    let (db, service) = setup().await;
    let created = create(&service, &["Red", "Blue"], false).await;
    let poll_id = created.poll.poll.id.clone();
    let red = option_id(&created, "Red");
    let blue = option_id(&created, "Blue");

    let mut handles = Vec::new();
    for i in 0..20 {
        let service = service.clone();
        let poll_id = poll_id.clone();
        let choice = if i % 2 == 0 { red.clone() } else { blue.clone() };
        handles.push(tokio::spawn(async move {
            service
                .cast_vote(&poll_id, select(&[&choice]), None)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let poll = service.get_poll(&poll_id).await.unwrap();
    assert_eq!(poll.total_votes(), 20);
    assert_tallies_consistent(&db, &poll_id).await;

    db.drop_database().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires running PostgreSQL instance"]
async fn test_opposite_order_multi_selections_all_apply() {
    let (db, service) = setup().await;
    let created = create(&service, &["Red", "Green", "Blue", "Yellow"], true).await;
    let poll_id = created.poll.poll.id.clone();
    let forward: Vec<String> = created.poll.options.iter().map(|o| o.id.clone()).collect();
    let backward: Vec<String> = forward.iter().rev().cloned().collect();

    let mut first_token = None;
    let mut second_token = None;
    for _ in 0..50 {
        let (a, b) = tokio::join!(
            service.cast_vote(&poll_id, select(&forward), first_token.clone()),
            service.cast_vote(&poll_id, select(&backward), second_token.clone()),
        );
        let a = a.expect("forward ballot rejected");
        let b = b.expect("backward ballot rejected");
        first_token = first_token.or(a.new_token);
        second_token = second_token.or(b.new_token);
    }

    let poll = service.get_poll(&poll_id).await.unwrap();
    assert!(poll.options.iter().all(|o| o.votes == 2));
    assert_tallies_consistent(&db, &poll_id).await;

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_option_removal_rules() {
    let (db, service) = setup().await;
    let created = create(&service, &["Red", "Green", "Blue"], false).await;
    let poll_id = created.poll.poll.id.clone();
    let code = created.modification_code.clone();
    let red = option_id(&created, "Red");
    let green = option_id(&created, "Green");

    service
        .cast_vote(&poll_id, select(&[&red]), None)
        .await
        .unwrap();

    let denied = service
        .update_poll(
            &poll_id,
            UpdatePollInput {
                modification_code: code.clone(),
                option_ids_to_remove: vec![red.clone()],
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(denied, Err(AppError::UpdateNotAllowed(_))));
    assert!(service.get_edit_history(&poll_id).await.unwrap().is_empty());

    let updated = service
        .update_poll(
            &poll_id,
            UpdatePollInput {
                modification_code: code,
                option_ids_to_remove: vec![green.clone()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.options.len(), 2);
    assert!(updated.poll.updated_at >= created.poll.poll.updated_at);

    let history = service.get_edit_history(&poll_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].field_changed, "option_removed");
    assert_eq!(history[0].option_id_changed, None);
    assert_eq!(history[0].old_value.as_deref(), Some("Green"));
    assert_eq!(
        history[0].change_description.as_deref(),
        Some(format!("Option 'Green' (ID: {green}) removed.").as_str())
    );
    assert_tallies_consistent(&db, &poll_id).await;

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_renames_and_noop_updates() {
    let (db, service) = setup().await;
    let created = create(&service, &["Red", "Blue"], false).await;
    let poll_id = created.poll.poll.id.clone();
    let code = created.modification_code.clone();
    let red = option_id(&created, "Red");

    let duplicate = service
        .update_poll(
            &poll_id,
            UpdatePollInput {
                modification_code: code.clone(),
                options_to_update: vec![OptionTextUpdate {
                    id: red.clone(),
                    text: "BLUE".to_string(),
                }],
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(duplicate, Err(AppError::DuplicateOptionText(_))));

    let noop = service
        .update_poll(
            &poll_id,
            UpdatePollInput {
                modification_code: code.clone(),
                question: Some("Favorite color?".to_string()),
                options_to_update: vec![OptionTextUpdate {
                    id: red.clone(),
                    text: "Red".to_string(),
                }],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(noop.poll.updated_at, created.poll.poll.updated_at);
    assert!(service.get_edit_history(&poll_id).await.unwrap().is_empty());

    service
        .update_poll(
            &poll_id,
            UpdatePollInput {
                modification_code: code,
                options_to_update: vec![OptionTextUpdate {
                    id: red.clone(),
                    text: "Crimson".to_string(),
                }],
                options_to_add: vec!["Red".to_string()],
                is_public: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let history = service.get_edit_history(&poll_id).await.unwrap();
    let fields: Vec<&str> = history.iter().map(|h| h.field_changed.as_str()).collect();
    assert_eq!(fields, vec!["is_public", "option_added", "option_text_updated"]);
    assert_eq!(history[2].option_id_changed.as_deref(), Some(red.as_str()));

    let poll = service.get_poll(&poll_id).await.unwrap();
    let texts: Vec<&str> = poll.options.iter().map(|o| o.text.as_str()).collect();
    assert_eq!(texts, vec!["Crimson", "Blue", "Red"]);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_delete_poll_removes_everything() {
    let (db, service) = setup().await;
    let created = create(&service, &["Red", "Blue"], false).await;
    let poll_id = created.poll.poll.id.clone();
    let red = option_id(&created, "Red");

    service
        .cast_vote(&poll_id, select(&[&red]), None)
        .await
        .unwrap();

    assert!(matches!(
        service.delete_poll(&poll_id, "wrong").await,
        Err(AppError::InvalidCapability)
    ));
    assert!(
        service
            .verify_modification_code(&poll_id, &created.modification_code)
            .await
            .unwrap()
    );

    service
        .delete_poll(&poll_id, &created.modification_code)
        .await
        .unwrap();

    assert!(matches!(
        service.get_poll(&poll_id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.get_edit_history(&poll_id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.cast_vote(&poll_id, select(&[&red]), None).await,
        Err(AppError::NotFound(_))
    ));
    assert!(
        !service
            .verify_modification_code(&poll_id, &created.modification_code)
            .await
            .unwrap()
    );

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_list_polls_search_and_sort() {
    let (db, service) = setup().await;

    let quiet = create(&service, &["Yes", "No"], false).await;
    let busy = service
        .create_poll(CreatePollInput {
            question: "Best PIZZA topping?".to_string(),
            creator_display_name: Some("Merry Quasar".to_string()),
            options: vec!["Basil".to_string(), "Olive".to_string()],
            is_public: true,
            ..Default::default()
        })
        .await
        .unwrap();
    service
        .create_poll(CreatePollInput {
            question: "Hidden pizza poll".to_string(),
            options: vec!["A".to_string(), "B".to_string()],
            is_public: false,
            ..Default::default()
        })
        .await
        .unwrap();

    let basil = option_id(&busy, "Basil");
    for _ in 0..2 {
        service
            .cast_vote(&busy.poll.poll.id, select(&[&basil]), None)
            .await
            .unwrap();
    }

    let by_votes = service
        .list_polls(ListPollsQuery {
            sort: PollSort::TotalVotesDesc,
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<&str> = by_votes.iter().map(|p| p.poll.id.as_str()).collect();
    assert_eq!(ids, vec![busy.poll.poll.id.as_str(), quiet.poll.poll.id.as_str()]);

    let searched = service
        .list_polls(ListPollsQuery {
            search: Some("pizza".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].poll.id, busy.poll.poll.id);

    let by_creator = service
        .list_polls(ListPollsQuery {
            search: Some("quasar".to_string()),
            sort: PollSort::QuestionAsc,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_creator.len(), 1);

    let page = service
        .list_polls(ListPollsQuery {
            sort: PollSort::CreatedAtAsc,
            limit: Some(1),
            offset: 1,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].poll.id, busy.poll.poll.id);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_voting_without_security_never_revises() {
    let (db, service) = setup().await;
    let created = service
        .create_poll(CreatePollInput {
            question: "Open poll".to_string(),
            options: vec!["Up".to_string(), "Down".to_string()],
            voting_security_level: VotingSecurityLevel::None,
            ..Default::default()
        })
        .await
        .unwrap();
    let poll_id = created.poll.poll.id.clone();
    let up = option_id(&created, "Up");

    let first = service
        .cast_vote(&poll_id, select(&[&up]), None)
        .await
        .unwrap();
    assert!(!first.persist_token);

    service
        .cast_vote(&poll_id, select(&[&up]), first.new_token)
        .await
        .unwrap();

    let poll = service.get_poll(&poll_id).await.unwrap();
    assert_eq!(poll.total_votes(), 2);
    assert_tallies_consistent(&db, &poll_id).await;

    db.drop_database().await.unwrap();
}
