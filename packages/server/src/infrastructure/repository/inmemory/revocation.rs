//! InMemory revocation store with lazily expiring entries.
//!
//! Expired entries are dropped on lookup and on every `revoke`, so the map never
//! holds more than the tokens revoked within the last token lifetime.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use hiroba_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, RevocationStore};

/// Fingerprint → expiry (epoch millis)
pub struct InMemoryRevocationStore {
    entries: Mutex<HashMap<String, i64>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRevocationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Entries that have not expired yet
    pub async fn len(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, expires_at| *expires_at > now);
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, RepositoryError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().await;
        match entries.get(fingerprint) {
            Some(&expires_at) if expires_at > now => Ok(true),
            Some(_) => {
                entries.remove(fingerprint);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn revoke(&self, fingerprint: String, ttl: Duration) -> Result<(), RepositoryError> {
        let now = self.clock.now_millis();
        let expires_at = now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX));
        let mut entries = self.entries.lock().await;
        entries.retain(|_, expires| *expires > now);
        let entry = entries.entry(fingerprint).or_insert(expires_at);
        *entry = (*entry).max(expires_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hiroba_shared::time::ManualClock;

    use super::*;

    #[tokio::test]
    async fn test_revoked_entry_expires_with_ttl() {
        // テスト項目: TTL が切れるまでは失効扱い、切れたら失効扱いでなくなる
        // given (前提条件):
        let clock = Arc::new(ManualClock::new(0));
        let store = InMemoryRevocationStore::new(clock.clone());

        // when (操作):
        store
            .revoke("abc".to_string(), Duration::from_secs(10))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(store.is_revoked("abc").await.unwrap());
        clock.advance_millis(9_999);
        assert!(store.is_revoked("abc").await.unwrap());
        clock.advance_millis(1);
        assert!(!store.is_revoked("abc").await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_fingerprint_is_not_revoked() {
        // テスト項目: 登録されていない fingerprint は失効扱いでない
        // given (前提条件):
        let store = InMemoryRevocationStore::new(Arc::new(ManualClock::new(0)));

        // when (操作):
        let revoked = store.is_revoked("missing").await.unwrap();

        // then (期待する結果):
        assert!(!revoked);
    }

    #[tokio::test]
    async fn test_revoke_keeps_the_longer_ttl() {
        // テスト項目: 同じ fingerprint の再登録で TTL が短くならない
        // given (前提条件):
        let clock = Arc::new(ManualClock::new(0));
        let store = InMemoryRevocationStore::new(clock.clone());
        store
            .revoke("abc".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        // when (操作):
        store
            .revoke("abc".to_string(), Duration::from_secs(1))
            .await
            .unwrap();
        clock.advance_secs(30);

        // then (期待する結果):
        assert!(store.is_revoked("abc").await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_revoke_drops_expired_entries() {
        // テスト項目: 期限切れのエントリは再参照されなくても次の revoke で削除される
        // given (前提条件):
        let clock = Arc::new(ManualClock::new(0));
        let store = InMemoryRevocationStore::new(clock.clone());
        for i in 0..1000 {
            store
                .revoke(format!("token-{}", i), Duration::from_secs(1))
                .await
                .unwrap();
        }
        clock.advance_secs(60);

        // when (操作):
        store
            .revoke("latest".to_string(), Duration::from_secs(1))
            .await
            .unwrap();

        // then (期待する結果):
        let entries = store.entries.lock().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("latest"));
    }
}
