use chrono::Duration;
use prep_core::model::{
    Difficulty, Grading, Item, ItemDetail, ItemDraft, ItemId, ItemOutcome, ItemQuery, SessionId,
    SessionKind, SessionStatus, SessionSummary, SummaryParts, TestCase,
};
use prep_core::time::fixed_now;
use storage::repository::{HistoryRepository, ItemRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn build_item(id: u64, kind: SessionKind, category: &str, company: Option<&str>) -> Item {
    let grading = match kind {
        SessionKind::Mcq => Grading::Choice {
            options: vec!["a".into(), "b".into(), "c".into()],
            correct: 2,
        },
        SessionKind::Coding => Grading::TestCases {
            cases: vec![TestCase::new("1 2", "3")],
        },
        SessionKind::Interview => Grading::RatingOnly,
    };
    ItemDraft {
        id: ItemId::new(id),
        prompt: format!("Explain topic number {id}"),
        category: category.into(),
        difficulty: if id % 2 == 0 {
            Difficulty::Hard
        } else {
            Difficulty::Easy
        },
        company: company.map(Into::into),
        explanation: Some("because".into()),
        grading,
        estimated_secs: 120,
    }
    .validate()
    .unwrap()
}

fn build_summary(kind: SessionKind, offset_secs: i64, score: u8) -> SessionSummary {
    let started = fixed_now();
    let correct = u32::from(score == 100);
    SessionSummary::from_parts(SummaryParts {
        id: SessionId::generate(),
        kind,
        status: SessionStatus::Completed,
        started_at: started,
        completed_at: started + Duration::seconds(offset_secs),
        items_total: 1,
        items_answered: 1,
        items_correct: correct,
        items_incorrect: 1 - correct,
        items_unanswered: 0,
        score_percent: score,
        duration_used_secs: 30,
        categories: Vec::new(),
        per_item_detail: vec![ItemDetail {
            item_id: ItemId::new(1),
            category: "General".into(),
            outcome: if correct == 1 {
                ItemOutcome::Correct
            } else {
                ItemOutcome::Incorrect
            },
            rating: None,
            submitted: Some("1".into()),
        }],
    })
    .unwrap()
}

#[tokio::test]
async fn sqlite_item_bank_roundtrip_and_filters() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_items?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    for id in 1..=4 {
        repo.upsert_item(&build_item(id, SessionKind::Mcq, "Arrays", Some("Acme")))
            .await
            .unwrap();
    }
    repo.upsert_item(&build_item(5, SessionKind::Mcq, "Graphs", None))
        .await
        .unwrap();
    repo.upsert_item(&build_item(6, SessionKind::Coding, "Arrays", None))
        .await
        .unwrap();

    let all = repo
        .find_items(SessionKind::Mcq, &ItemQuery::with_limit(10))
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0], build_item(1, SessionKind::Mcq, "Arrays", Some("Acme")));

    let filtered = repo
        .find_items(
            SessionKind::Mcq,
            &ItemQuery {
                category: Some("arrays".into()),
                difficulty: Some(Difficulty::Hard),
                company: Some("ACME".into()),
                ..ItemQuery::with_limit(10)
            },
        )
        .await
        .unwrap();
    let ids: Vec<u64> = filtered.iter().map(|i| i.id().value()).collect();
    assert_eq!(ids, vec![2, 4]);

    let by_text = repo
        .find_items(
            SessionKind::Mcq,
            &ItemQuery {
                query: Some("NUMBER 5".into()),
                ..ItemQuery::with_limit(10)
            },
        )
        .await
        .unwrap();
    assert_eq!(by_text.len(), 1);

    let limited = repo
        .find_items(SessionKind::Mcq, &ItemQuery::with_limit(2))
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    assert_eq!(repo.count_items(SessionKind::Coding).await.unwrap(), 1);
    assert_eq!(repo.count_items(SessionKind::Interview).await.unwrap(), 0);
}

#[tokio::test]
async fn sqlite_upsert_replaces_existing_item() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_upsert?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.upsert_item(&build_item(1, SessionKind::Interview, "Behavioral", None))
        .await
        .unwrap();
    repo.upsert_item(&build_item(1, SessionKind::Interview, "Leadership", None))
        .await
        .unwrap();

    let items = repo
        .find_items(SessionKind::Interview, &ItemQuery::with_limit(5))
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].category(), "Leadership");
}

#[tokio::test]
async fn sqlite_history_is_append_only_and_ordered() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_history?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let older = build_summary(SessionKind::Mcq, 10, 0);
    let tie_a = build_summary(SessionKind::Mcq, 60, 100);
    let tie_b = build_summary(SessionKind::Mcq, 60, 0);
    let coding = build_summary(SessionKind::Coding, 120, 100);

    let id_older = repo.append_summary(&older).await.unwrap();
    let id_a = repo.append_summary(&tie_a).await.unwrap();
    let id_b = repo.append_summary(&tie_b).await.unwrap();
    repo.append_summary(&coding).await.unwrap();

    let mcq = repo
        .list_summaries(Some(SessionKind::Mcq), 10)
        .await
        .unwrap();
    let ids: Vec<i64> = mcq.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![id_b, id_a, id_older]);
    assert_eq!(mcq[0].summary, tie_b);

    let everything = repo.list_summaries(None, 10).await.unwrap();
    assert_eq!(everything.len(), 4);
    assert_eq!(everything[0].summary.kind(), SessionKind::Coding);

    let err = repo.append_summary(&tie_a).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    assert_eq!(repo.get_summary(id_a).await.unwrap(), tie_a);
    assert!(matches!(
        repo.get_summary(9_999).await.unwrap_err(),
        StorageError::NotFound
    ));

    let update = sqlx::query("UPDATE session_history SET score_percent = 50 WHERE id = ?1")
        .bind(id_a)
        .execute(repo.pool())
        .await;
    assert!(update.is_err());
    let delete = sqlx::query("DELETE FROM session_history WHERE id = ?1")
        .bind(id_a)
        .execute(repo.pool())
        .await;
    assert!(delete.is_err());
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");
}
