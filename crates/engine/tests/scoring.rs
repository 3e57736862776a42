use chrono::{Duration, Utc};

use engine::{EngineError, EventStatus, NotificationKind};

mod common;

use common::{competition_new, engine_with_db, event_new, make_admin, tomorrow, user};

struct League {
    engine: engine::Engine,
    competition_id: String,
    alice: String,
    bob: String,
    carol: String,
}

/// Alice runs a public league that Bob and Carol joined.
async fn league() -> League {
    let (engine, _db) = engine_with_db().await;
    let alice = user(&engine, "alice").await;
    let bob = user(&engine, "bob").await;
    let carol = user(&engine, "carol").await;
    let competition = engine
        .create_competition(&alice, competition_new("League", true))
        .await
        .unwrap();
    for member in [&bob, &carol] {
        engine
            .join_competition(&competition.id, member, None)
            .await
            .unwrap();
    }
    League {
        engine,
        competition_id: competition.id,
        alice,
        bob,
        carol,
    }
}

#[tokio::test]
async fn only_commissioners_create_valid_events() {
    let l = league().await;
    let now = Utc::now();

    let err = l
        .engine
        .create_event(&l.competition_id, &l.bob, event_new("Derby", tomorrow()), now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = l
        .engine
        .create_event(
            &l.competition_id,
            &l.alice,
            event_new("Yesterday", now - Duration::days(1)),
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let mut input = event_new("One horse race", tomorrow());
    input.options = vec!["Home".to_string(), " Home ".to_string()];
    let err = l
        .engine
        .create_event(&l.competition_id, &l.alice, input, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let later = l
        .engine
        .create_event(
            &l.competition_id,
            &l.alice,
            event_new("Later", now + Duration::days(3)),
            now,
        )
        .await
        .unwrap();
    let sooner = l
        .engine
        .create_event(&l.competition_id, &l.alice, event_new("Sooner", tomorrow()), now)
        .await
        .unwrap();
    assert_eq!(sooner.points, 3);
    let events = l.engine.events(&l.competition_id, &l.bob).await.unwrap();
    let ids: Vec<_> = events.iter().map(|e| e.id.clone()).collect();
    assert_eq!(ids, vec![sooner.id, later.id]);
}

#[tokio::test]
async fn picks_upsert_until_locked() {
    let l = league().await;
    let now = Utc::now();
    let event_date = tomorrow();
    let event = l
        .engine
        .create_event(&l.competition_id, &l.alice, event_new("Derby", event_date), now)
        .await
        .unwrap();

    let first = l
        .engine
        .make_pick(&l.bob, &l.competition_id, &event.id, "Home", now)
        .await
        .unwrap();
    let second = l
        .engine
        .make_pick(&l.bob, &l.competition_id, &event.id, "Away", now)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.selection, "Away");
    assert_eq!(
        l.engine
            .user_picks(&l.competition_id, &l.bob)
            .await
            .unwrap()
            .len(),
        1
    );

    let err = l
        .engine
        .make_pick(&l.bob, &l.competition_id, &event.id, "Nobody", now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = l
        .engine
        .event_picks(&event.id, &l.carol, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let after_kickoff = event_date + Duration::minutes(1);
    let err = l
        .engine
        .make_pick(&l.bob, &l.competition_id, &event.id, "Home", after_kickoff)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Locked("event has started".to_string()));

    let visible = l
        .engine
        .event_picks(&event.id, &l.carol, after_kickoff)
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].username, "bob");
}

#[tokio::test]
async fn live_and_completed_competitions_lock_picks() {
    let l = league().await;
    let now = Utc::now();
    let event = l
        .engine
        .create_event(&l.competition_id, &l.alice, event_new("Derby", tomorrow()), now)
        .await
        .unwrap();

    let err = l
        .engine
        .set_event_status(&event.id, &l.alice, EventStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
    let live = l
        .engine
        .set_event_status(&event.id, &l.alice, EventStatus::Live)
        .await
        .unwrap();
    assert_eq!(live.status().unwrap(), EventStatus::Live);

    let err = l
        .engine
        .make_pick(&l.bob, &l.competition_id, &event.id, "Home", now)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Locked("event is no longer upcoming".to_string())
    );

    let other = l
        .engine
        .create_event(&l.competition_id, &l.alice, event_new("Cup", tomorrow()), now)
        .await
        .unwrap();
    l.engine
        .complete_competition(&l.competition_id, &l.alice)
        .await
        .unwrap();
    let err = l
        .engine
        .make_pick(&l.bob, &l.competition_id, &other.id, "Home", now)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Locked("competition is completed".to_string())
    );
}

#[tokio::test]
async fn non_members_cannot_pick() {
    let l = league().await;
    let now = Utc::now();
    let dave = user(&l.engine, "dave").await;
    let event = l
        .engine
        .create_event(&l.competition_id, &l.alice, event_new("Derby", tomorrow()), now)
        .await
        .unwrap();

    let err = l
        .engine
        .make_pick(&dave, &l.competition_id, &event.id, "Home", now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn resolving_scores_ranks_and_notifies() {
    let l = league().await;
    let now = Utc::now();
    let derby = l
        .engine
        .create_event(&l.competition_id, &l.alice, event_new("Derby", tomorrow()), now)
        .await
        .unwrap();

    for (member, selection) in [(&l.alice, "Home"), (&l.bob, "Home"), (&l.carol, "Away")] {
        l.engine
            .make_pick(member, &l.competition_id, &derby.id, selection, now)
            .await
            .unwrap();
    }

    let err = l
        .engine
        .resolve_event(&derby.id, &l.alice, "Nobody")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
    let err = l
        .engine
        .resolve_event(&derby.id, &l.bob, "Home")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let resolved = l
        .engine
        .resolve_event(&derby.id, &l.alice, "Home")
        .await
        .unwrap();
    assert_eq!(resolved.winner.as_deref(), Some("Home"));
    assert_eq!(resolved.status().unwrap(), EventStatus::Completed);

    let err = l
        .engine
        .resolve_event(&derby.id, &l.alice, "Away")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyResolved(_)));

    let board = l
        .engine
        .leaderboard(&l.competition_id, &l.carol)
        .await
        .unwrap();
    let view: Vec<(&str, u64, i64, u64)> = board
        .iter()
        .map(|e| (e.username.as_str(), e.rank, e.score, e.correct_picks))
        .collect();
    assert_eq!(
        view,
        vec![("alice", 1, 3, 1), ("bob", 1, 3, 1), ("carol", 3, 0, 0)]
    );

    let picks = l
        .engine
        .user_picks(&l.competition_id, &l.carol)
        .await
        .unwrap();
    assert_eq!(picks[0].is_correct, Some(false));
    assert_eq!(picks[0].points_awarded, 0);

    let notes = l.engine.notifications(&l.carol, true).await.unwrap();
    assert_eq!(notes[0].kind, NotificationKind::EventResolved.as_str());

    let global = l.engine.global_leaderboard(None).await.unwrap();
    assert_eq!(global[0].total_score, 3);
    assert_eq!(global[2].username, "carol");
    assert_eq!(global[2].rank, 3);
}

#[tokio::test]
async fn deleting_resolved_event_reverts_points() {
    let (engine, db) = engine_with_db().await;
    let alice = user(&engine, "alice").await;
    let admin = user(&engine, "root").await;
    make_admin(&db, &admin).await;
    let now = Utc::now();
    let competition = engine
        .create_competition(&alice, competition_new("League", true))
        .await
        .unwrap();
    let event = engine
        .create_event(&competition.id, &admin, event_new("Derby", tomorrow()), now)
        .await
        .unwrap();
    engine
        .make_pick(&alice, &competition.id, &event.id, "Draw", now)
        .await
        .unwrap();
    engine
        .resolve_event(&event.id, &alice, "Draw")
        .await
        .unwrap();
    let board = engine.leaderboard(&competition.id, &alice).await.unwrap();
    assert_eq!(board[0].score, 3);

    engine.delete_event(&event.id, &admin).await.unwrap();
    let board = engine.leaderboard(&competition.id, &alice).await.unwrap();
    assert_eq!(board[0].score, 0);
    assert_eq!(board[0].correct_picks, 0);
    assert!(engine.events(&competition.id, &alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn leaving_drops_scored_picks() {
    let l = league().await;
    let now = Utc::now();
    let derby = l
        .engine
        .create_event(&l.competition_id, &l.alice, event_new("Derby", tomorrow()), now)
        .await
        .unwrap();
    for member in [&l.bob, &l.carol] {
        l.engine
            .make_pick(member, &l.competition_id, &derby.id, "Draw", now)
            .await
            .unwrap();
    }
    l.engine
        .resolve_event(&derby.id, &l.alice, "Draw")
        .await
        .unwrap();

    l.engine
        .leave_competition(&l.competition_id, &l.bob)
        .await
        .unwrap();
    l.engine
        .remove_member(&l.competition_id, &l.carol, &l.alice)
        .await
        .unwrap();
    let picks = l
        .engine
        .event_picks(&derby.id, &l.alice, now)
        .await
        .unwrap();
    assert!(picks.is_empty());

    l.engine
        .join_competition(&l.competition_id, &l.bob, None)
        .await
        .unwrap();
    assert!(
        l.engine
            .user_picks(&l.competition_id, &l.bob)
            .await
            .unwrap()
            .is_empty()
    );
    let board = l
        .engine
        .leaderboard(&l.competition_id, &l.alice)
        .await
        .unwrap();
    let bob = board.iter().find(|e| e.username == "bob").unwrap();
    assert_eq!((bob.score, bob.correct_picks), (0, 0));

    l.engine.delete_event(&derby.id, &l.alice).await.unwrap();
    let board = l
        .engine
        .leaderboard(&l.competition_id, &l.alice)
        .await
        .unwrap();
    assert!(board.iter().all(|e| e.score == 0));
}

#[tokio::test]
async fn dashboard_lists_open_events_and_ranks() {
    let l = league().await;
    let now = Utc::now();
    let picked = l
        .engine
        .create_event(&l.competition_id, &l.alice, event_new("Picked", tomorrow()), now)
        .await
        .unwrap();
    let open = l
        .engine
        .create_event(
            &l.competition_id,
            &l.alice,
            event_new("Open", now + Duration::days(2)),
            now,
        )
        .await
        .unwrap();
    l.engine
        .make_pick(&l.bob, &l.competition_id, &picked.id, "Home", now)
        .await
        .unwrap();

    let dashboard = l.engine.dashboard(&l.bob, now).await.unwrap();
    assert_eq!(dashboard.competitions.len(), 1);
    assert_eq!(dashboard.competitions[0].member_count, 3);
    assert_eq!(dashboard.competitions[0].rank, 1);
    let open_ids: Vec<_> = dashboard.open_events.iter().map(|e| e.id.clone()).collect();
    assert_eq!(open_ids, vec![open.id]);
    assert_eq!(dashboard.unread_notifications, 0);
}
