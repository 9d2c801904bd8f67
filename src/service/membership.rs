//! Membership service
//!
//! Every mutation is bracketed by snapshots of the row before and after the
//! write; the notifier turns the pair into a change-log entry.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use super::organization::RemovalHook;
use crate::entity::organization;
use crate::entity::user_organization::{self, NewMembership};
use crate::entity::user_organization_change_log;
use crate::error::{AppError, AppResult, OptionExt};
use crate::identity::{UserIdentity, UserRef};
use crate::notifier::{ChangeNotifier, MembershipEvent, MembershipSnapshot};
use crate::store::{MembershipStore, OrganizationStore};
use crate::tree::OrganizationTree;

/// Partial update; `None` leaves a field unchanged
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipChanges {
    pub organization_id: Option<Uuid>,
    pub is_primary: Option<bool>,
}

pub struct MembershipService<O, M> {
    organizations: Arc<O>,
    memberships: Arc<M>,
    notifier: ChangeNotifier<M>,
}

impl<O, M> Clone for MembershipService<O, M> {
    fn clone(&self) -> Self {
        Self {
            organizations: self.organizations.clone(),
            memberships: self.memberships.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<O: OrganizationStore, M: MembershipStore> MembershipService<O, M> {
    pub fn new(organizations: Arc<O>, memberships: Arc<M>) -> Self {
        let notifier = ChangeNotifier::new(memberships.clone());
        Self {
            organizations,
            memberships,
            notifier,
        }
    }

    async fn organization_name(&self, id: Uuid) -> AppResult<String> {
        let organization = self
            .organizations
            .find_by_id(id)
            .await?
            .ok_or_not_found(format!("Organization {id}"))?;
        Ok(organization.name)
    }

    /// Falls back to the organization id when the row is already gone
    async fn snapshot(
        &self,
        membership: &user_organization::Model,
    ) -> AppResult<MembershipSnapshot> {
        let id = membership.organization_id;
        let name = match self.organizations.find_by_id(id).await? {
            Some(organization) => organization.name,
            None => id.to_string(),
        };
        Ok(MembershipSnapshot::new(membership, name))
    }

    async fn load(&self, id: i64) -> AppResult<user_organization::Model> {
        self.memberships
            .find_by_id(id)
            .await?
            .ok_or_not_found(format!("Membership {id}"))
    }

    /// Fails when the user already holds a primary membership other than `except`
    async fn ensure_primary_free(
        &self,
        user: &str,
        user_id: &str,
        except: Option<i64>,
    ) -> AppResult<()> {
        match self.memberships.find_primary_by_user(user_id).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(AppError::PrimaryMembershipTaken(user.to_string()))
            }
            _ => Ok(()),
        }
    }

    pub async fn join(
        &self,
        user: &impl UserIdentity,
        organization_id: Uuid,
        is_primary: bool,
    ) -> AppResult<user_organization::Model> {
        let name = self.organization_name(organization_id).await?;

        if self
            .memberships
            .find_by_user_and_organization(user.user_id(), organization_id)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateMembership {
                user: user.user_identifier().to_string(),
                organization: organization_id,
            });
        }
        if is_primary {
            self.ensure_primary_free(user.user_identifier(), user.user_id(), None)
                .await?;
        }

        let membership = self
            .memberships
            .insert(NewMembership {
                user: UserRef::from_identity(user),
                organization_id,
                is_primary,
            })
            .await?;

        let created = MembershipSnapshot::new(&membership, name);
        self.notifier.notify(MembershipEvent::Created(&created)).await?;
        Ok(membership)
    }

    pub async fn update(
        &self,
        id: i64,
        changes: MembershipChanges,
    ) -> AppResult<user_organization::Model> {
        let current = self.load(id).await?;
        let before = self.snapshot(&current).await?;

        let mut next = current.clone();
        if let Some(organization_id) = changes.organization_id {
            next.organization_id = organization_id;
        }
        if let Some(is_primary) = changes.is_primary {
            next.is_primary = is_primary;
        }

        // Resolves the new organization (NotFound) before anything is written
        let after_name = self.organization_name(next.organization_id).await?;
        if next.is_primary && !current.is_primary {
            self.ensure_primary_free(&current.user_identifier, &current.user_id, Some(id))
                .await?;
        }

        let saved = self.memberships.update(next).await?;
        let after = MembershipSnapshot::new(&saved, after_name);
        self.notifier
            .notify(MembershipEvent::Updated {
                before: &before,
                after: &after,
            })
            .await?;
        Ok(saved)
    }

    pub async fn leave(&self, id: i64) -> AppResult<()> {
        let membership = self.load(id).await?;
        let removed = self.snapshot(&membership).await?;

        self.memberships.delete(id).await?;
        self.notifier.notify(MembershipEvent::Removed(&removed)).await?;
        Ok(())
    }

    /// Returns the number of memberships removed (0 or 1)
    pub async fn remove_by_user_and_organization(
        &self,
        user_id: &str,
        organization_id: Uuid,
    ) -> AppResult<u64> {
        match self
            .memberships
            .find_by_user_and_organization(user_id, organization_id)
            .await?
        {
            Some(membership) => {
                self.leave(membership.id).await?;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    pub async fn find(&self, id: i64) -> AppResult<Option<user_organization::Model>> {
        self.memberships.find_by_id(id).await
    }

    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<user_organization::Model>> {
        self.memberships.find_by_user(user_id).await
    }

    pub async fn find_primary_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Option<user_organization::Model>> {
        self.memberships.find_primary_by_user(user_id).await
    }

    pub async fn find_by_organization(
        &self,
        organization_id: Uuid,
    ) -> AppResult<Vec<user_organization::Model>> {
        self.memberships.find_by_organization(organization_id).await
    }

    pub async fn count_by_organization(&self, organization_id: Uuid) -> AppResult<u64> {
        self.memberships.count_by_organization(organization_id).await
    }

    /// Memberships of `user_id` in `organization_id` or anywhere below it
    pub async fn find_in_hierarchy(
        &self,
        user_id: &str,
        organization_id: Uuid,
    ) -> AppResult<Vec<user_organization::Model>> {
        let tree = OrganizationTree::from_models(self.organizations.find_all(true).await?);
        if !tree.contains(organization_id) {
            return Err(AppError::NotFound(format!("Organization {organization_id}")));
        }

        let scope: HashSet<Uuid> = std::iter::once(organization_id)
            .chain(tree.descendants(organization_id).into_iter().map(|m| m.id))
            .collect();

        Ok(self
            .memberships
            .find_by_user(user_id)
            .await?
            .into_iter()
            .filter(|m| scope.contains(&m.organization_id))
            .collect())
    }

    /// Oldest first
    pub async fn change_logs(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<user_organization_change_log::Model>> {
        self.memberships.change_logs_by_user(user_id).await
    }
}

/// Removes the memberships of deleted organizations, logging each as a leave
#[async_trait]
impl<O, M> RemovalHook for MembershipService<O, M>
where
    O: OrganizationStore + 'static,
    M: MembershipStore + 'static,
{
    async fn organizations_removed(&self, removed: &[organization::Model]) -> AppResult<u64> {
        let mut count = 0;
        for organization in removed {
            for membership in self.memberships.find_by_organization(organization.id).await? {
                let snapshot = MembershipSnapshot::new(&membership, organization.name.clone());
                self.memberships.delete(membership.id).await?;
                self.notifier.notify(MembershipEvent::Removed(&snapshot)).await?;
                count += 1;
            }
        }

        if count > 0 {
            tracing::info!(removed = count, "Removed memberships of deleted organizations");
        }
        Ok(count)
    }
}
