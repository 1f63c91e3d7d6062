//! テスト用のメモリ上のストア実装
//!
//! `set_unavailable(true)` で障害を再現できる。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{User, VerificationRecord};
use crate::repositories::{
    AccountStore, CREDENTIAL_PROVIDER_ID, StoreError, StoredCredential, VerificationStore,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
}

fn check_available(flag: &AtomicBool) -> Result<(), StoreError> {
    if flag.load(Ordering::SeqCst) {
        return Err(StoreError::Unavailable("injected failure".to_string()));
    }
    Ok(())
}

struct AccountEntry {
    user: User,
    /// provider_id -> password hash
    credentials: HashMap<String, String>,
}

#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, AccountEntry>>,
    unavailable: AtomicBool,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// ユーザーとアカウントを追加
    pub fn add_account(
        &self,
        name: &str,
        email: &str,
        provider_id: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            email_verified: false,
            phone: None,
            phone_verified: false,
            blood_group: None,
            wilaya: None,
            commune: None,
            last_donation: None,
            donation_type: None,
            emergency_available: false,
            created_at: now,
            updated_at: now,
        };

        let mut credentials = HashMap::new();
        credentials.insert(provider_id.to_string(), password_hash.to_string());

        lock(&self.accounts)?.insert(
            user.id,
            AccountEntry {
                user: user.clone(),
                credentials,
            },
        );

        Ok(user)
    }

    /// 電話番号を設定
    pub fn set_phone(&self, user_id: Uuid, phone: &str) -> Result<(), StoreError> {
        let mut accounts = lock(&self.accounts)?;
        let entry = accounts.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        entry.user.phone = Some(phone.to_string());
        Ok(())
    }

    /// 保存済みのパスワードハッシュを取得
    pub fn credential(&self, user_id: Uuid, provider_id: &str) -> Option<String> {
        lock(&self.accounts)
            .ok()?
            .get(&user_id)
            .and_then(|entry| entry.credentials.get(provider_id).cloned())
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        check_available(&self.unavailable)?;
        Ok(lock(&self.accounts)?
            .values()
            .find(|entry| entry.user.email == email)
            .map(|entry| entry.user.clone()))
    }

    async fn find_credential(
        &self,
        identifier: &str,
    ) -> Result<Option<StoredCredential>, StoreError> {
        check_available(&self.unavailable)?;
        Ok(lock(&self.accounts)?
            .values()
            .find(|entry| {
                entry.user.email == identifier || entry.user.phone.as_deref() == Some(identifier)
            })
            .map(|entry| StoredCredential {
                user: entry.user.clone(),
                password_hash: entry.credentials.get(CREDENTIAL_PROVIDER_ID).cloned(),
            }))
    }

    async fn update_credential(
        &self,
        user_id: Uuid,
        provider_id: &str,
        password_hash: &str,
        updated_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        check_available(&self.unavailable)?;
        let mut accounts = lock(&self.accounts)?;
        let entry = accounts.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        let credential = entry
            .credentials
            .get_mut(provider_id)
            .ok_or(StoreError::NotFound)?;
        *credential = password_hash.to_string();
        entry.user.updated_at = updated_at;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryVerificationStore {
    records: Mutex<HashMap<Uuid, VerificationRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryVerificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みレコードのスナップショット
    pub fn records(&self) -> Vec<VerificationRecord> {
        lock(&self.records)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl VerificationStore for InMemoryVerificationStore {
    async fn insert(&self, record: &VerificationRecord) -> Result<(), StoreError> {
        check_available(&self.unavailable)?;
        lock(&self.records)?.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_all_by_tag(&self, tag: &str) -> Result<Vec<VerificationRecord>, StoreError> {
        check_available(&self.unavailable)?;
        Ok(lock(&self.records)?
            .values()
            .filter(|record| record.identifier == tag)
            .cloned()
            .collect())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        check_available(&self.unavailable)?;
        Ok(lock(&self.records)?.remove(&id).is_some())
    }

    async fn consume(
        &self,
        id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        check_available(&self.unavailable)?;
        let mut records = lock(&self.records)?;
        let live = records
            .get(&id)
            .is_some_and(|record| !record.is_expired(now));
        if !live {
            return Ok(None);
        }
        Ok(records.remove(&id))
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        check_available(&self.unavailable)?;
        let mut records = lock(&self.records)?;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[tokio::test]
    async fn test_consume_succeeds_once() {
        let store = InMemoryVerificationStore::new();
        let now = OffsetDateTime::now_utc();
        let record =
            VerificationRecord::password_reset("a@example.com", "tok", now + Duration::hours(1), now);
        store.insert(&record).await.unwrap();

        assert!(store.consume(record.id, now).await.unwrap().is_some());
        assert!(store.consume(record.id, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_consume_refuses_expired_record() {
        let store = InMemoryVerificationStore::new();
        let now = OffsetDateTime::now_utc();
        let record = VerificationRecord::password_reset("a@example.com", "tok", now, now);
        store.insert(&record).await.unwrap();

        let later = now + Duration::seconds(1);
        assert!(store.consume(record.id, later).await.unwrap().is_none());
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_live_records() {
        let store = InMemoryVerificationStore::new();
        let now = OffsetDateTime::now_utc();
        let live =
            VerificationRecord::password_reset("a@example.com", "live", now + Duration::hours(1), now);
        let dead =
            VerificationRecord::password_reset("a@example.com", "dead", now - Duration::hours(1), now);
        store.insert(&live).await.unwrap();
        store.insert(&dead).await.unwrap();

        assert_eq!(store.delete_expired(now).await.unwrap(), 1);
        let remaining = store.records();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, live.id);
    }

    #[tokio::test]
    async fn test_update_credential_unknown_provider() {
        let store = InMemoryAccountStore::new();
        let user = store
            .add_account("Alice", "alice@example.com", "google", "x")
            .unwrap();
        let result = store
            .update_credential(user.id, CREDENTIAL_PROVIDER_ID, "hash", OffsetDateTime::now_utc())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_find_credential_by_email_or_phone() {
        let store = InMemoryAccountStore::new();
        let user = store
            .add_account("Alice", "alice@example.com", CREDENTIAL_PROVIDER_ID, "hash")
            .unwrap();
        store.set_phone(user.id, "0555123456").unwrap();

        let by_email = store.find_credential("alice@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.user.id, user.id);
        assert_eq!(by_email.password_hash.as_deref(), Some("hash"));

        let by_phone = store.find_credential("0555123456").await.unwrap().unwrap();
        assert_eq!(by_phone.user.id, user.id);

        assert!(store.find_credential("0555000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = InMemoryAccountStore::new();
        store.set_unavailable(true);
        let result = store.find_by_email("alice@example.com").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
