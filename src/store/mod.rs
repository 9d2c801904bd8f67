//! Persistence abstraction
//!
//! The services only talk to these traits. `sea` backs them with a SeaORM
//! connection, `memory` keeps everything in process.

use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::organization;
use crate::entity::user_organization::{self, NewMembership};
use crate::entity::user_organization_change_log::{self, NewChangeLog};
use crate::error::AppResult;
use crate::tree::{OrganizationTree, TreeNode};

pub mod memory;
pub mod sea;

pub use memory::{MemoryMembershipStore, MemoryOrganizationStore};
pub use sea::{SeaMembershipStore, SeaOrganizationStore};

/// One write inside a [`WriteBatch`]
#[derive(Clone, Debug)]
pub enum PendingWrite {
    Save(organization::Model),
    Delete(Uuid),
}

/// Call-scoped unit of work over an [`OrganizationStore`].
///
/// Writes made with `flush = false` stay in this batch until a flushing
/// write or [`WriteBatch::flush`] hands them to the store as one commit.
/// Other batches never see or commit them. Dropping the batch discards
/// whatever is still queued.
pub struct WriteBatch<'a, S: ?Sized> {
    store: &'a S,
    pending: Vec<PendingWrite>,
}

impl<'a, S> WriteBatch<'a, S>
where
    S: OrganizationStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            pending: Vec::new(),
        }
    }

    pub async fn save(
        &mut self,
        organization: organization::Model,
        flush: bool,
    ) -> AppResult<()> {
        self.push(PendingWrite::Save(organization), flush).await
    }

    pub async fn delete(&mut self, id: Uuid, flush: bool) -> AppResult<()> {
        self.push(PendingWrite::Delete(id), flush).await
    }

    /// Commits everything queued so far
    pub async fn flush(&mut self) -> AppResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let writes = std::mem::take(&mut self.pending);
        self.store.commit(writes).await
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    async fn push(&mut self, write: PendingWrite, flush: bool) -> AppResult<()> {
        self.pending.push(write);
        if flush {
            self.flush().await?;
        }
        Ok(())
    }
}

/// Organization persistence.
///
/// Lookups return `None`/empty on no match. "Valid only" queries skip rows
/// with `valid = false`; ordered queries sort by `sort_number`, then `name`.
///
/// Every write goes through [`OrganizationStore::commit`]. `save` and
/// `delete` commit a single write; batching belongs to the caller's
/// [`WriteBatch`]. Reads only observe committed rows.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Any validity
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<organization::Model>>;

    /// Valid only
    async fn find_by_code(&self, code: &str) -> AppResult<Option<organization::Model>>;

    /// Valid children of `parent`, ordered; `None` lists roots
    async fn find_children(&self, parent: Option<Uuid>) -> AppResult<Vec<organization::Model>>;

    /// Every direct child of `id` regardless of validity, ordered.
    /// Only one level deep; see `OrganizationService::all_subordinates`
    /// for the full subtree.
    async fn find_direct_children(&self, id: Uuid) -> AppResult<Vec<organization::Model>>;

    /// Number of valid children of `parent`; `None` counts roots
    async fn count_children(&self, parent: Option<Uuid>) -> AppResult<u64>;

    /// Valid rows whose name contains `keyword`, ordered
    async fn find_by_name_contains(&self, keyword: &str) -> AppResult<Vec<organization::Model>>;

    /// Valid rows managed by `manager_id`, ordered
    async fn find_by_manager(&self, manager_id: &str) -> AppResult<Vec<organization::Model>>;

    /// Every row, ordered
    async fn find_all(&self, include_disabled: bool) -> AppResult<Vec<organization::Model>>;

    /// Applies `writes` in order, all or nothing
    async fn commit(&self, writes: Vec<PendingWrite>) -> AppResult<()>;

    async fn save(&self, organization: organization::Model) -> AppResult<()> {
        self.commit(vec![PendingWrite::Save(organization)]).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.commit(vec![PendingWrite::Delete(id)]).await
    }

    /// Valid roots, ordered
    async fn find_roots(&self) -> AppResult<Vec<organization::Model>> {
        self.find_children(None).await
    }

    /// Valid organizations exactly `level` hops below a root.
    ///
    /// Computed on the materialized tree (disabled ancestors still count
    /// as hops).
    async fn find_by_level(&self, level: usize) -> AppResult<Vec<organization::Model>> {
        let tree = OrganizationTree::from_models(self.find_all(true).await?);
        Ok(tree
            .at_level(level)
            .into_iter()
            .filter(|m| m.valid)
            .cloned()
            .collect())
    }

    /// Nested structure of valid organizations from the valid roots down
    async fn find_tree_structure(&self) -> AppResult<Vec<TreeNode>> {
        let tree = OrganizationTree::from_models(self.find_all(false).await?);

        // `from_models` promotes rows whose parent is missing (here: disabled)
        // to roots; drop those subtrees.
        Ok(tree
            .forest()
            .into_iter()
            .filter(|node| node.organization.parent_id.is_none())
            .collect())
    }
}

/// Membership and change-log persistence
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Fails with `AppError::DuplicateMembership` when the
    /// (user, organization) pair already exists
    async fn insert(&self, membership: NewMembership) -> AppResult<user_organization::Model>;

    async fn update(
        &self,
        membership: user_organization::Model,
    ) -> AppResult<user_organization::Model>;

    async fn delete(&self, id: i64) -> AppResult<()>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<user_organization::Model>>;

    async fn find_by_user_and_organization(
        &self,
        user_id: &str,
        organization_id: Uuid,
    ) -> AppResult<Option<user_organization::Model>>;

    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<user_organization::Model>>;

    async fn find_primary_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Option<user_organization::Model>>;

    async fn find_by_organization(
        &self,
        organization_id: Uuid,
    ) -> AppResult<Vec<user_organization::Model>>;

    async fn count_by_organization(&self, organization_id: Uuid) -> AppResult<u64>;

    async fn append_change_log(
        &self,
        entry: NewChangeLog,
    ) -> AppResult<user_organization_change_log::Model>;

    /// Oldest first
    async fn change_logs_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<user_organization_change_log::Model>>;
}
