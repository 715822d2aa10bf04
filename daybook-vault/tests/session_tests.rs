use std::sync::Arc;
use std::time::Duration;

use daybook_vault::{
    Authenticator, MemoryAuthenticator, Session, SessionState, VaultError, spawn_idle_watchdog,
};
use pretty_assertions::assert_eq;

#[test]
fn signup_then_unlock_round_trip() {
    let session = Session::new();
    let (record, token) = session.create_account("Str0ngP@ss!").unwrap();
    assert_eq!(session.state(), SessionState::Unlocked);
    let original_key = session.master_key().unwrap();

    // Simulated restart: a fresh session unlocks from the stored record
    let restarted = Session::new();
    assert_eq!(restarted.state(), SessionState::Locked);
    restarted.unlock(&record, "Str0ngP@ss!").unwrap();
    assert_eq!(restarted.state(), SessionState::Unlocked);
    assert_eq!(
        original_key.as_bytes(),
        restarted.master_key().unwrap().as_bytes()
    );

    // The record never contains the raw key or token
    assert_eq!(token.storage_hash(), record.auth_token_hash);
}

#[test]
fn wrong_password_leaves_session_locked() {
    let session = Session::new();
    let (record, _) = session.create_account("Str0ngP@ss!").unwrap();

    let locked = Session::new();
    let result = locked.unlock(&record, "WrongPass");
    assert!(matches!(result, Err(VaultError::IncorrectPassword)));
    assert_eq!(locked.state(), SessionState::Locked);
    assert!(matches!(
        locked.master_key(),
        Err(VaultError::MissingKeyMaterial)
    ));
}

#[test]
fn tampered_record_cannot_unlock() {
    let session = Session::new();
    let (record, _) = session.create_account("Str0ngP@ss!").unwrap();

    // Corrupt one byte of the stored wrapped key
    let mut bytes = base64_decode(&record.encrypted_master_key);
    bytes[0] ^= 0xFF;
    let mut tampered = record.clone();
    tampered.encrypted_master_key = base64_encode(&bytes);

    let fresh = Session::new();
    assert!(matches!(
        fresh.unlock(&tampered, "Str0ngP@ss!"),
        Err(VaultError::IncorrectPassword)
    ));
}

#[test]
fn change_password_keeps_master_key_and_rotates_token() {
    let session = Session::new();
    let (record, old_token) = session.create_account("Str0ngP@ss!").unwrap();
    let key_before = session.master_key().unwrap();

    let (new_record, new_token) = session
        .change_password(&record, "Str0ngP@ss!", "N3wPassphrase!")
        .unwrap();
    assert_ne!(old_token.storage_hash(), new_token.storage_hash());
    // Validator is untouched: same master key, same check artifact
    assert_eq!(record.validator_hash, new_record.validator_hash);
    assert_ne!(record.encrypted_master_key, new_record.encrypted_master_key);

    // Old password is dead, new password unlocks the same master key
    let fresh = Session::new();
    assert!(matches!(
        fresh.unlock(&new_record, "Str0ngP@ss!"),
        Err(VaultError::IncorrectPassword)
    ));
    fresh.unlock(&new_record, "N3wPassphrase!").unwrap();
    assert_eq!(
        key_before.as_bytes(),
        fresh.master_key().unwrap().as_bytes()
    );
}

#[test]
fn change_password_with_wrong_old_password_fails() {
    let session = Session::new();
    let (record, _) = session.create_account("Str0ngP@ss!").unwrap();

    let result = session.change_password(&record, "WrongPass", "N3wPassphrase!");
    assert!(matches!(result, Err(VaultError::IncorrectPassword)));
}

#[test]
fn idle_timeout_locks_session() {
    let session = Session::with_idle_timeout(Duration::ZERO);
    session.create_account("Str0ngP@ss!").unwrap();
    assert!(session.is_unlocked());

    // Every interval has elapsed once the timeout is zero
    assert!(matches!(
        session.master_key(),
        Err(VaultError::MissingKeyMaterial)
    ));
    assert_eq!(session.state(), SessionState::Locked);
}

#[tokio::test]
async fn watchdog_locks_idle_session() {
    let session = Arc::new(Session::with_idle_timeout(Duration::from_millis(50)));
    session.create_account("Str0ngP@ss!").unwrap();

    let handle = spawn_idle_watchdog(session.clone());
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(session.state(), SessionState::Locked);
    handle.abort();
}

#[test]
fn account_record_serializes_with_documented_field_names() {
    let session = Session::new();
    let (record, _) = session.create_account("Str0ngP@ss!").unwrap();

    let json = serde_json::to_value(&record).unwrap();
    for field in [
        "kdfSalt",
        "kdfIterations",
        "validatorHash",
        "encryptedMasterKey",
        "masterKeyIV",
        "authTokenHash",
        "createdAt",
    ] {
        assert!(json.get(field).is_some(), "missing field {field}");
    }

    // Full storage round trip
    let restored: daybook_vault::AccountRecord = serde_json::from_value(json).unwrap();
    let fresh = Session::new();
    fresh.unlock(&restored, "Str0ngP@ss!").unwrap();
}

#[test]
fn authenticator_accepts_token_and_rejects_strangers() {
    let session = Session::new();
    let (record, token) = session.create_account("Str0ngP@ss!").unwrap();

    let auth = MemoryAuthenticator::new();
    auth.register(&record).unwrap();

    let credential = auth.login(&token).unwrap();
    let fetched = auth.account_for(&credential).unwrap();
    assert_eq!(fetched.auth_token_hash, record.auth_token_hash);

    // A token for another password gets nothing
    let stranger = daybook_crypto::derive_auth_token("SomeOtherPass!").unwrap();
    assert!(matches!(auth.login(&stranger), Err(VaultError::Auth(_))));
}

fn base64_decode(value: &str) -> Vec<u8> {
    use base64::{Engine, engine::general_purpose::STANDARD};
    STANDARD.decode(value).unwrap()
}

fn base64_encode(value: &[u8]) -> String {
    use base64::{Engine, engine::general_purpose::STANDARD};
    STANDARD.encode(value)
}
