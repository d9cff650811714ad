//! Repository and resolver tests for the users crate

use backstage_config::DatabaseConfig;
use backstage_database::initialize_database;
use backstage_users::{
    IdentityResolver, ParticipantKind, ParticipantRef, ParticipantRepository,
    SqliteIdentityResolver, UserError,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn create_test_database() -> (SqlitePool, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test_users_repo.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", db_path.display()),
        max_connections: 2,
        ..DatabaseConfig::default()
    };

    let pool = initialize_database(&config)
        .await
        .expect("Failed to create test database");
    (pool, temp_dir)
}

#[tokio::test]
async fn resolve_returns_participant_of_requested_kind() {
    let (pool, _temp_dir) = create_test_database().await;
    let repo = ParticipantRepository::new(pool);
    repo.insert(ParticipantKind::Artist, 5, "nova").await.unwrap();
    repo.insert(ParticipantKind::Producer, 1_000_000, "beatsmith")
        .await
        .unwrap();

    let resolver = SqliteIdentityResolver::new(repo);

    let artist = resolver.resolve(ParticipantKind::Artist, 5).await.unwrap();
    assert_eq!(artist.username, "nova");
    assert_eq!(artist.reference(), ParticipantRef::artist(5));

    let producer = resolver
        .resolve_ref(ParticipantRef::producer(1_000_000))
        .await
        .unwrap();
    assert_eq!(producer.username, "beatsmith");
}

#[tokio::test]
async fn resolve_never_falls_back_to_other_kind() {
    let (pool, _temp_dir) = create_test_database().await;
    let repo = ParticipantRepository::new(pool);
    repo.insert(ParticipantKind::Artist, 42, "solo").await.unwrap();

    let resolver = SqliteIdentityResolver::new(repo);
    let err = resolver
        .resolve(ParticipantKind::Producer, 42)
        .await
        .unwrap_err();

    assert_eq!(err, UserError::not_found(ParticipantKind::Producer, 42));
}

#[tokio::test]
async fn same_numeric_id_can_exist_in_both_kinds() {
    let (pool, _temp_dir) = create_test_database().await;
    let repo = ParticipantRepository::new(pool);
    repo.insert(ParticipantKind::Artist, 1, "artist-one").await.unwrap();
    repo.insert(ParticipantKind::Producer, 1, "producer-one")
        .await
        .unwrap();

    let artist = repo.find(ParticipantRef::artist(1)).await.unwrap().unwrap();
    let producer = repo.find(ParticipantRef::producer(1)).await.unwrap().unwrap();

    assert_eq!(artist.username, "artist-one");
    assert_eq!(producer.username, "producer-one");
}
