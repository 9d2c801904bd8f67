//! In-process stores
//!
//! Same observable behavior as the SeaORM stores, including all-or-nothing
//! commits and the membership uniqueness constraint.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MembershipStore, OrganizationStore, PendingWrite};
use crate::entity::organization::{self, sibling_order};
use crate::entity::user_organization::{self, NewMembership};
use crate::entity::user_organization_change_log::{self, NewChangeLog};
use crate::error::{AppError, AppResult};

#[derive(Default)]
pub struct MemoryOrganizationStore {
    rows: RwLock<BTreeMap<Uuid, organization::Model>>,
}

impl MemoryOrganizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select<F>(&self, filter: F) -> Vec<organization::Model>
    where
        F: Fn(&organization::Model) -> bool,
    {
        let rows = self.rows.read().await;
        let mut out: Vec<organization::Model> =
            rows.values().filter(|m| filter(m)).cloned().collect();
        out.sort_by(sibling_order);
        out
    }
}

#[async_trait]
impl OrganizationStore for MemoryOrganizationStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<organization::Model>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<organization::Model>> {
        Ok(self
            .select(|m| m.valid && m.code.as_deref() == Some(code))
            .await
            .into_iter()
            .next())
    }

    async fn find_children(&self, parent: Option<Uuid>) -> AppResult<Vec<organization::Model>> {
        Ok(self.select(|m| m.valid && m.parent_id == parent).await)
    }

    async fn find_direct_children(&self, id: Uuid) -> AppResult<Vec<organization::Model>> {
        Ok(self.select(|m| m.parent_id == Some(id)).await)
    }

    async fn count_children(&self, parent: Option<Uuid>) -> AppResult<u64> {
        Ok(self.find_children(parent).await?.len() as u64)
    }

    async fn find_by_name_contains(&self, keyword: &str) -> AppResult<Vec<organization::Model>> {
        Ok(self.select(|m| m.valid && m.name.contains(keyword)).await)
    }

    async fn find_by_manager(&self, manager_id: &str) -> AppResult<Vec<organization::Model>> {
        Ok(self
            .select(|m| m.valid && m.manager_id.as_deref() == Some(manager_id))
            .await)
    }

    async fn find_all(&self, include_disabled: bool) -> AppResult<Vec<organization::Model>> {
        Ok(self.select(|m| include_disabled || m.valid).await)
    }

    async fn commit(&self, writes: Vec<PendingWrite>) -> AppResult<()> {
        // One write lock for the whole batch
        let mut rows = self.rows.write().await;
        for write in writes {
            match write {
                PendingWrite::Save(model) => {
                    rows.insert(model.id, model);
                }
                PendingWrite::Delete(id) => {
                    rows.remove(&id);
                }
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct MembershipTables {
    memberships: BTreeMap<i64, user_organization::Model>,
    change_logs: Vec<user_organization_change_log::Model>,
    next_membership_id: i64,
    next_log_id: i64,
}

#[derive(Default)]
pub struct MemoryMembershipStore {
    tables: RwLock<MembershipTables>,
}

impl MemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select<F>(&self, filter: F) -> Vec<user_organization::Model>
    where
        F: Fn(&user_organization::Model) -> bool,
    {
        let tables = self.tables.read().await;
        tables.memberships.values().filter(|m| filter(m)).cloned().collect()
    }
}

fn pair_taken(
    tables: &MembershipTables,
    id: Option<i64>,
    user_id: &str,
    organization_id: Uuid,
) -> bool {
    tables.memberships.values().any(|m| {
        Some(m.id) != id && m.user_id == user_id && m.organization_id == organization_id
    })
}

#[async_trait]
impl MembershipStore for MemoryMembershipStore {
    async fn insert(&self, membership: NewMembership) -> AppResult<user_organization::Model> {
        let mut tables = self.tables.write().await;
        if pair_taken(&tables, None, &membership.user.id, membership.organization_id) {
            return Err(AppError::DuplicateMembership {
                user: membership.user.identifier,
                organization: membership.organization_id,
            });
        }

        tables.next_membership_id += 1;
        let now = Utc::now();
        let model = user_organization::Model {
            id: tables.next_membership_id,
            user_id: membership.user.id,
            user_identifier: membership.user.identifier,
            organization_id: membership.organization_id,
            is_primary: membership.is_primary,
            created_at: now,
            updated_at: now,
        };
        tables.memberships.insert(model.id, model.clone());
        Ok(model)
    }

    async fn update(
        &self,
        mut membership: user_organization::Model,
    ) -> AppResult<user_organization::Model> {
        let mut tables = self.tables.write().await;
        if !tables.memberships.contains_key(&membership.id) {
            return Err(AppError::NotFound(format!("Membership {}", membership.id)));
        }
        if pair_taken(
            &tables,
            Some(membership.id),
            &membership.user_id,
            membership.organization_id,
        ) {
            return Err(AppError::DuplicateMembership {
                user: membership.user_identifier,
                organization: membership.organization_id,
            });
        }

        membership.updated_at = Utc::now();
        tables.memberships.insert(membership.id, membership.clone());
        Ok(membership)
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        self.tables.write().await.memberships.remove(&id);
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<user_organization::Model>> {
        Ok(self.tables.read().await.memberships.get(&id).cloned())
    }

    async fn find_by_user_and_organization(
        &self,
        user_id: &str,
        organization_id: Uuid,
    ) -> AppResult<Option<user_organization::Model>> {
        Ok(self
            .select(|m| m.user_id == user_id && m.organization_id == organization_id)
            .await
            .into_iter()
            .next())
    }

    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<user_organization::Model>> {
        Ok(self.select(|m| m.user_id == user_id).await)
    }

    async fn find_primary_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Option<user_organization::Model>> {
        Ok(self
            .select(|m| m.user_id == user_id && m.is_primary)
            .await
            .into_iter()
            .next())
    }

    async fn find_by_organization(
        &self,
        organization_id: Uuid,
    ) -> AppResult<Vec<user_organization::Model>> {
        Ok(self.select(|m| m.organization_id == organization_id).await)
    }

    async fn count_by_organization(&self, organization_id: Uuid) -> AppResult<u64> {
        Ok(self.find_by_organization(organization_id).await?.len() as u64)
    }

    async fn append_change_log(
        &self,
        entry: NewChangeLog,
    ) -> AppResult<user_organization_change_log::Model> {
        let mut tables = self.tables.write().await;
        tables.next_log_id += 1;
        let now = Utc::now();
        let model = user_organization_change_log::Model {
            id: tables.next_log_id,
            user_id: entry.user_id,
            organization_id: entry.organization_id,
            new_organization_id: entry.new_organization_id,
            content: entry.content,
            created_at: now,
            updated_at: now,
        };
        tables.change_logs.push(model.clone());
        Ok(model)
    }

    async fn change_logs_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<user_organization_change_log::Model>> {
        let tables = self.tables.read().await;
        Ok(tables
            .change_logs
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::organization::tests::sample;
    use crate::identity::UserRef;
    use crate::store::WriteBatch;

    #[tokio::test]
    async fn test_unflushed_writes_are_invisible() {
        let store = MemoryOrganizationStore::new();
        let root = sample("Root", None, 0);

        let mut batch = WriteBatch::new(&store);
        batch.save(root.clone(), false).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert!(store.find_by_id(root.id).await.unwrap().is_none());

        batch.flush().await.unwrap();
        assert!(batch.is_empty());
        assert_eq!(store.find_by_id(root.id).await.unwrap(), Some(root));
    }

    #[tokio::test]
    async fn test_batches_do_not_share_queued_writes() {
        let store = MemoryOrganizationStore::new();
        let kept = sample("Kept", None, 0);
        store.save(kept.clone()).await.unwrap();

        let mut deleting = WriteBatch::new(&store);
        deleting.delete(kept.id, false).await.unwrap();

        // Another caller commits its own write
        let mut other = WriteBatch::new(&store);
        other.save(sample("Other", None, 1), true).await.unwrap();
        store.save(sample("Direct", None, 2)).await.unwrap();
        assert!(store.find_by_id(kept.id).await.unwrap().is_some());

        drop(deleting);
        assert!(store.find_by_id(kept.id).await.unwrap().is_some());
        assert_eq!(store.find_all(true).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_valid_filters() {
        let store = MemoryOrganizationStore::new();
        let root = sample("Root", None, 0);
        let mut hidden = sample("Hidden", Some(root.id), 0);
        hidden.valid = false;
        hidden.code = Some("HID".to_string());
        let shown = sample("Shown", Some(root.id), 5);

        store
            .commit(vec![
                PendingWrite::Save(root.clone()),
                PendingWrite::Save(hidden.clone()),
                PendingWrite::Save(shown.clone()),
            ])
            .await
            .unwrap();

        assert_eq!(store.find_children(Some(root.id)).await.unwrap(), vec![shown.clone()]);
        assert_eq!(store.find_direct_children(root.id).await.unwrap().len(), 2);
        assert_eq!(store.count_children(Some(root.id)).await.unwrap(), 1);
        assert_eq!(store.count_children(None).await.unwrap(), 1);
        assert!(store.find_by_code("HID").await.unwrap().is_none());
        assert_eq!(store.find_all(true).await.unwrap().len(), 3);
        assert_eq!(store.find_all(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_membership_pair_is_unique() {
        let store = MemoryMembershipStore::new();
        let org = Uuid::now_v7();
        let new = NewMembership {
            user: UserRef::new("1", "alice"),
            organization_id: org,
            is_primary: false,
        };

        let first = store.insert(new.clone()).await.unwrap();
        assert_eq!(first.id, 1);
        assert!(matches!(
            store.insert(new).await,
            Err(AppError::DuplicateMembership { .. })
        ));
    }
}
