use crate::credentials::CredentialStore;
use crate::db::*;
use crate::error::Error;
use crate::types::{CredentialId, CredentialStatus};
use tempfile::NamedTempFile;

async fn open() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

#[tokio::test]
async fn test_added_credentials_load_with_defaults() {
    let (db, _file) = open().await;

    let first = db.add_credential("key-one", "Primary").await.unwrap();
    let second = db.add_credential("key-two", "Backup").await.unwrap();

    let credentials = db.load_credentials().await.unwrap();
    assert_eq!(credentials.len(), 2);
    assert_eq!(credentials[0].id, first);
    assert_eq!(credentials[1].id, second);
    assert_eq!(credentials[0].key_value, "key-one");
    assert_eq!(credentials[0].name, "Primary");
    assert_eq!(credentials[0].remaining, 2500);
    assert_eq!(credentials[0].status, CredentialStatus::Active);
    assert!(credentials[0].last_refresh.is_none());

    db.close().await;
}

#[tokio::test]
async fn test_duplicate_key_is_rejected() {
    let (db, _file) = open().await;

    db.add_credential("key-one", "Primary").await.unwrap();
    let result = db.add_credential("key-one", "Again").await;
    assert!(matches!(result, Err(Error::Validation(_))));

    db.close().await;
}

#[tokio::test]
async fn test_save_round_trips_quota_state() {
    let (db, _file) = open().await;
    let id = db.add_credential("key-one", "Primary").await.unwrap();

    let mut credential = db.load_credentials().await.unwrap().remove(0);
    credential.remaining = 7;
    credential.total_used = 12;
    credential.status = CredentialStatus::LowQuota;
    credential.last_refresh = chrono::DateTime::from_timestamp(1_700_000_000, 0);
    db.save_credential(&credential).await.unwrap();

    let loaded = db.load_credentials().await.unwrap().remove(0);
    assert_eq!(loaded.id, id);
    assert_eq!(loaded, credential);

    db.close().await;
}

#[tokio::test]
async fn test_remove_is_soft_and_key_can_return() {
    let (db, _file) = open().await;
    let id = db.add_credential("key-one", "Primary").await.unwrap();

    db.remove_credential(id).await.unwrap();
    assert!(db.load_credentials().await.unwrap().is_empty());

    let missing = db.remove_credential(id).await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
    assert!(matches!(
        db.remove_credential(CredentialId(999)).await,
        Err(Error::NotFound(_))
    ));

    let again = db.add_credential("key-one", "Restored").await.unwrap();
    assert_eq!(again, id);
    let credentials = db.load_credentials().await.unwrap();
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0].name, "Restored");

    db.close().await;
}
