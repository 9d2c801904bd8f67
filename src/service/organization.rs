//! Organization service
//!
//! The only place that changes tree structure. Every mutation validates
//! first and writes second, so a rejected call leaves the store untouched.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::organization;
use crate::error::{AppError, AppResult, OptionExt};
use crate::identity::UserRef;
use crate::store::{OrganizationStore, WriteBatch};
use crate::tree::{TreeNode, PATH_SEPARATOR};

/// Input of [`OrganizationService::create`]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub name: String,
    pub description: Option<String>,
    pub code: Option<String>,
    pub parent_id: Option<Uuid>,
    pub manager: Option<UserRef>,
    #[serde(default)]
    pub sort_number: i32,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl NewOrganization {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn under(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_sort_number(mut self, sort_number: i32) -> Self {
        self.sort_number = sort_number;
        self
    }
}

/// Partial update.
///
/// `None` leaves a field unchanged. Nullable columns take
/// `Some(None)` to clear and `Some(Some(v))` to set.
#[derive(Clone, Debug, Default)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub code: Option<Option<String>>,
    pub parent_id: Option<Option<Uuid>>,
    pub manager: Option<Option<UserRef>>,
    pub sort_number: Option<i32>,
    pub valid: Option<bool>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationStatistics {
    pub id: Uuid,
    pub name: String,
    pub level: usize,
    pub direct_children_count: usize,
    pub total_descendants_count: usize,
    pub has_manager: bool,
    pub manager_name: Option<String>,
    pub is_root: bool,
    pub is_leaf: bool,
    pub full_path: String,
}

/// Runs after organizations are deleted, with the removed rows
/// (deepest first). Used to cascade rows that reference them.
#[async_trait]
pub trait RemovalHook: Send + Sync {
    /// Returns the number of dependent rows removed
    async fn organizations_removed(&self, removed: &[organization::Model]) -> AppResult<u64>;
}

pub struct OrganizationService<S> {
    store: Arc<S>,
    removal_hook: Option<Arc<dyn RemovalHook>>,
}

impl<S> Clone for OrganizationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            removal_hook: self.removal_hook.clone(),
        }
    }
}

impl<S: OrganizationStore> OrganizationService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            removal_hook: None,
        }
    }

    pub fn with_removal_hook(mut self, hook: Arc<dyn RemovalHook>) -> Self {
        self.removal_hook = Some(hook);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn load(&self, id: Uuid) -> AppResult<organization::Model> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_not_found(format!("Organization {id}"))
    }

    pub async fn find(&self, id: Uuid) -> AppResult<Option<organization::Model>> {
        self.store.find_by_id(id).await
    }

    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<organization::Model>> {
        self.store.find_by_code(code).await
    }

    pub async fn create(&self, input: NewOrganization) -> AppResult<organization::Model> {
        if let Some(parent_id) = input.parent_id {
            self.load(parent_id).await?;
        }

        let now = Utc::now();
        let mut model = organization::Model {
            id: Uuid::now_v7(),
            name: input.name,
            description: input.description,
            code: input.code,
            valid: true,
            parent_id: input.parent_id,
            manager_id: None,
            manager_name: None,
            phone: input.phone,
            address: input.address,
            sort_number: input.sort_number,
            created_at: now,
            updated_at: now,
        };
        model.set_manager(input.manager);
        model.validate_attributes()?;

        self.store.save(model.clone()).await?;
        tracing::info!(id = %model.id, "Created organization {}", model.name);
        Ok(model)
    }

    pub async fn update(
        &self,
        id: Uuid,
        changes: UpdateOrganization,
    ) -> AppResult<organization::Model> {
        let mut model = self.load(id).await?;

        if let Some(parent_id) = changes.parent_id {
            self.validate_parent_change(id, parent_id).await?;
            model.parent_id = parent_id;
        }
        if let Some(name) = changes.name {
            model.name = name;
        }
        if let Some(description) = changes.description {
            model.description = description;
        }
        if let Some(code) = changes.code {
            model.code = code;
        }
        if let Some(manager) = changes.manager {
            model.set_manager(manager);
        }
        if let Some(sort_number) = changes.sort_number {
            model.sort_number = sort_number;
        }
        if let Some(valid) = changes.valid {
            model.valid = valid;
        }
        if let Some(phone) = changes.phone {
            model.phone = phone;
        }
        if let Some(address) = changes.address {
            model.address = address;
        }
        model.validate_attributes()?;
        model.updated_at = Utc::now();

        self.store.save(model.clone()).await?;
        tracing::info!(id = %id, "Updated organization {}", model.name);
        Ok(model)
    }

    /// Re-parents `id`; `None` detaches it into a root
    pub async fn move_to(
        &self,
        id: Uuid,
        new_parent: Option<Uuid>,
    ) -> AppResult<organization::Model> {
        let mut model = self.load(id).await?;
        self.validate_parent_change(id, new_parent).await?;

        model.parent_id = new_parent;
        model.updated_at = Utc::now();
        self.store.save(model.clone()).await?;

        tracing::info!(id = %id, parent = ?new_parent, "Moved organization {}", model.name);
        Ok(model)
    }

    /// Deletes `id`. Without `force` the node must have no children at all
    /// (disabled ones included); with `force` the whole subtree goes,
    /// deepest first, in one commit. The removal hook then cascades to
    /// dependent rows. Returns the number of organizations removed.
    pub async fn delete(&self, id: Uuid, force: bool) -> AppResult<u64> {
        let model = self.load(id).await?;
        let children = self.store.find_direct_children(id).await?;

        if !children.is_empty() && !force {
            return Err(AppError::HasChildren);
        }

        let name = model.name.clone();
        let mut doomed = Vec::new();
        let mut seen = HashSet::from([id]);
        self.collect_post_order(children, &mut seen, &mut doomed).await?;
        doomed.push(model);

        let mut batch = WriteBatch::new(self.store.as_ref());
        for organization in &doomed {
            batch.delete(organization.id, false).await?;
        }
        batch.flush().await?;

        let cascaded = match &self.removal_hook {
            Some(hook) => hook.organizations_removed(&doomed).await?,
            None => 0,
        };

        let count = doomed.len() as u64;
        tracing::info!(id = %id, removed = count, cascaded, "Deleted organization {}", name);
        Ok(count)
    }

    async fn collect_post_order(
        &self,
        children: Vec<organization::Model>,
        seen: &mut HashSet<Uuid>,
        out: &mut Vec<organization::Model>,
    ) -> AppResult<()> {
        // Explicit stack instead of async recursion: (node, children expanded)
        let mut stack: Vec<(organization::Model, bool)> =
            children.into_iter().rev().map(|c| (c, false)).collect();

        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                out.push(node);
                continue;
            }
            if !seen.insert(node.id) {
                return Err(AppError::CorruptHierarchy(node.id));
            }
            let grandchildren = self.store.find_direct_children(node.id).await?;
            stack.push((node, true));
            for child in grandchildren.into_iter().rev() {
                stack.push((child, false));
            }
        }
        Ok(())
    }

    async fn validate_parent_change(&self, id: Uuid, new_parent: Option<Uuid>) -> AppResult<()> {
        let Some(parent_id) = new_parent else {
            return Ok(());
        };
        if parent_id == id {
            return Err(AppError::SelfParent);
        }
        self.load(parent_id).await?;
        if self.is_ancestor(id, parent_id).await? {
            return Err(AppError::CircularReference);
        }
        Ok(())
    }

    /// Root-to-self chain, read one parent at a time
    pub async fn path(&self, id: Uuid) -> AppResult<Vec<organization::Model>> {
        let mut path = vec![self.load(id).await?];
        let mut seen = HashSet::from([id]);

        while let Some(parent_id) = path.last().and_then(|m| m.parent_id) {
            if !seen.insert(parent_id) {
                return Err(AppError::CorruptHierarchy(parent_id));
            }
            match self.store.find_by_id(parent_id).await? {
                Some(parent) => path.push(parent),
                None => break,
            }
        }

        path.reverse();
        Ok(path)
    }

    pub async fn level(&self, id: Uuid) -> AppResult<usize> {
        Ok(self.path(id).await?.len() - 1)
    }

    pub async fn full_path(&self, id: Uuid) -> AppResult<String> {
        let names: Vec<String> = self.path(id).await?.into_iter().map(|m| m.name).collect();
        Ok(names.join(PATH_SEPARATOR))
    }

    /// Whether `ancestor` is on the parent chain of `descendant`.
    /// A node is not its own ancestor.
    pub async fn is_ancestor(&self, ancestor: Uuid, descendant: Uuid) -> AppResult<bool> {
        let mut current = self.load(descendant).await?.parent_id;
        let mut seen = HashSet::from([descendant]);

        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            if !seen.insert(id) {
                return Err(AppError::CorruptHierarchy(id));
            }
            current = self.store.find_by_id(id).await?.and_then(|m| m.parent_id);
        }
        Ok(false)
    }

    /// Deepest organization shared by both root paths; `None` when the two
    /// live in different trees
    pub async fn common_ancestor(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> AppResult<Option<organization::Model>> {
        let path_a = self.path(a).await?;
        let path_b = self.path(b).await?;

        Ok(path_a
            .into_iter()
            .zip(path_b)
            .take_while(|(x, y)| x.id == y.id)
            .last()
            .map(|(x, _)| x))
    }

    /// Direct children, valid only unless `include_disabled`
    pub async fn subordinates(
        &self,
        id: Uuid,
        include_disabled: bool,
    ) -> AppResult<Vec<organization::Model>> {
        if include_disabled {
            self.store.find_direct_children(id).await
        } else {
            self.store.find_children(Some(id)).await
        }
    }

    /// The whole subtree below `id`, pre-order. Disabled organizations and
    /// everything under them are skipped unless `include_disabled`.
    pub async fn all_subordinates(
        &self,
        id: Uuid,
        include_disabled: bool,
    ) -> AppResult<Vec<organization::Model>> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut stack: Vec<organization::Model> = self
            .subordinates(id, include_disabled)
            .await?
            .into_iter()
            .rev()
            .collect();

        while let Some(node) = stack.pop() {
            if !seen.insert(node.id) {
                return Err(AppError::CorruptHierarchy(node.id));
            }
            let children = self.subordinates(node.id, include_disabled).await?;
            stack.extend(children.into_iter().rev());
            out.push(node);
        }
        Ok(out)
    }

    pub async fn statistics(&self, id: Uuid) -> AppResult<OrganizationStatistics> {
        let path = self.path(id).await?;
        let direct = self.subordinates(id, false).await?;
        let all = self.all_subordinates(id, false).await?;
        let has_any_child = !self.store.find_direct_children(id).await?.is_empty();

        let full_path = path
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR);
        let level = path.len() - 1;
        let model = path.into_iter().last().ok_or_not_found(format!("Organization {id}"))?;

        Ok(OrganizationStatistics {
            id: model.id,
            name: model.name,
            level,
            direct_children_count: direct.len(),
            total_descendants_count: all.len(),
            has_manager: model.manager_id.is_some(),
            manager_name: model.manager_name,
            is_root: model.parent_id.is_none(),
            is_leaf: !has_any_child,
            full_path,
        })
    }

    pub async fn search(&self, keyword: &str) -> AppResult<Vec<organization::Model>> {
        self.store.find_by_name_contains(keyword).await
    }

    pub async fn find_by_manager(&self, manager_id: &str) -> AppResult<Vec<organization::Model>> {
        self.store.find_by_manager(manager_id).await
    }

    pub async fn find_by_level(&self, level: usize) -> AppResult<Vec<organization::Model>> {
        self.store.find_by_level(level).await
    }

    pub async fn roots(&self) -> AppResult<Vec<organization::Model>> {
        self.store.find_roots().await
    }

    pub async fn children(&self, parent: Option<Uuid>) -> AppResult<Vec<organization::Model>> {
        self.store.find_children(parent).await
    }

    pub async fn tree(&self) -> AppResult<Vec<TreeNode>> {
        self.store.find_tree_structure().await
    }
}
