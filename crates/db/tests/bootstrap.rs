use cloudrender_core::status::{JobState, STATUS_IN_QUEUE};
use cloudrender_db::repositories::{JobStatusRepo, VocabularyError};
use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify the seeded vocabulary.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    cloudrender_db::health_check(&pool).await.unwrap();

    let rows = JobStatusRepo::list(&pool).await.unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["in queue", "in progress", "error", "success"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_vocabulary_resolves_every_state(pool: PgPool) {
    let vocabulary = JobStatusRepo::load_vocabulary(&pool).await.unwrap();
    assert_eq!(vocabulary.len(), 4);

    for state in JobState::ALL {
        let code = vocabulary.code_for(state);
        assert_eq!(vocabulary.name_of(code), Some(state.name()));
        assert_eq!(vocabulary.state_of(code), Some(state));
    }
    assert_eq!(vocabulary.code_of(STATUS_IN_QUEUE), Some(1));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_vocabulary_accepts_extra_statuses(pool: PgPool) {
    let row = JobStatusRepo::create(&pool, "paused").await.unwrap();

    let vocabulary = JobStatusRepo::load_vocabulary(&pool).await.unwrap();
    assert_eq!(vocabulary.len(), 5);
    assert_eq!(vocabulary.code_of("paused"), Some(row.id));
    assert_eq!(vocabulary.state_of(row.id), None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_vocabulary_rejects_missing_canonical_status(pool: PgPool) {
    sqlx::query("UPDATE job_statuses SET name = 'renamed' WHERE name = 'success'")
        .execute(&pool)
        .await
        .unwrap();

    let result = JobStatusRepo::load_vocabulary(&pool).await;
    assert!(matches!(result, Err(VocabularyError::Invalid(_))));
}
