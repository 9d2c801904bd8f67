//! Membership change notifier
//!
//! Turns membership mutations into append-only change-log rows. The pre- and
//! post-images of an update are passed in explicitly, nothing is kept
//! between calls, so one notifier can serve concurrent mutations.

use std::sync::Arc;

use uuid::Uuid;

use crate::entity::user_organization;
use crate::entity::user_organization_change_log::{self, NewChangeLog};
use crate::error::AppResult;
use crate::store::MembershipStore;

/// Membership state as seen by the change log
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipSnapshot {
    pub user_id: String,
    pub user_identifier: String,
    pub organization_id: Uuid,
    pub organization_name: String,
    pub is_primary: bool,
}

impl MembershipSnapshot {
    pub fn new(
        membership: &user_organization::Model,
        organization_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: membership.user_id.clone(),
            user_identifier: membership.user_identifier.clone(),
            organization_id: membership.organization_id,
            organization_name: organization_name.into(),
            is_primary: membership.is_primary,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum MembershipEvent<'a> {
    Created(&'a MembershipSnapshot),
    Updated {
        before: &'a MembershipSnapshot,
        after: &'a MembershipSnapshot,
    },
    Removed(&'a MembershipSnapshot),
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Builds the log entry for an event; `None` when an update touched no
/// tracked field.
pub fn compose_change_log(event: MembershipEvent<'_>) -> Option<NewChangeLog> {
    match event {
        MembershipEvent::Created(m) => Some(NewChangeLog::new(
            &m.user_id,
            m.organization_id,
            format!(
                "user {} joined organization {}",
                m.user_identifier, m.organization_name
            ),
        )),
        MembershipEvent::Updated { before, after } => {
            let organization_changed = before.organization_id != after.organization_id;
            let mut changes = Vec::new();
            if organization_changed {
                changes.push(format!(
                    "organization changed from {} to {}",
                    before.organization_name, after.organization_name
                ));
            }
            if before.is_primary != after.is_primary {
                changes.push(format!(
                    "primary-organization status changed to {}",
                    yes_no(after.is_primary)
                ));
            }
            if changes.is_empty() {
                return None;
            }

            let entry = NewChangeLog::new(
                &after.user_id,
                after.organization_id,
                format!(
                    "user {} membership updated: {}",
                    after.user_identifier,
                    changes.join(", ")
                ),
            );
            Some(if organization_changed {
                entry.with_new_organization(after.organization_id)
            } else {
                entry
            })
        }
        MembershipEvent::Removed(m) => Some(NewChangeLog::new(
            &m.user_id,
            m.organization_id,
            format!(
                "user {} left organization {}",
                m.user_identifier, m.organization_name
            ),
        )),
    }
}

/// Appends change-log rows for membership events
pub struct ChangeNotifier<M> {
    store: Arc<M>,
}

impl<M> Clone for ChangeNotifier<M> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<M: MembershipStore> ChangeNotifier<M> {
    pub fn new(store: Arc<M>) -> Self {
        Self { store }
    }

    pub async fn notify(
        &self,
        event: MembershipEvent<'_>,
    ) -> AppResult<Option<user_organization_change_log::Model>> {
        let Some(entry) = compose_change_log(event) else {
            return Ok(None);
        };

        let log = self.store.append_change_log(entry).await?;
        tracing::info!(user_id = %log.user_id, "Membership change: {}", log.content);
        Ok(Some(log))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(org: Uuid, name: &str, primary: bool) -> MembershipSnapshot {
        MembershipSnapshot {
            user_id: "u-1".to_string(),
            user_identifier: "alice".to_string(),
            organization_id: org,
            organization_name: name.to_string(),
            is_primary: primary,
        }
    }

    #[test]
    fn test_created() {
        let tech = Uuid::now_v7();
        let created = snapshot(tech, "TECH", false);
        let entry = compose_change_log(MembershipEvent::Created(&created)).unwrap();
        assert_eq!(entry.content, "user alice joined organization TECH");
        assert_eq!(entry.organization_id, Some(tech));
        assert_eq!(entry.new_organization_id, None);
    }

    #[test]
    fn test_organization_change() {
        let (tech, hr) = (Uuid::now_v7(), Uuid::now_v7());
        let before = snapshot(tech, "TECH", false);
        let after = snapshot(hr, "HR", false);
        let entry = compose_change_log(MembershipEvent::Updated {
            before: &before,
            after: &after,
        })
        .unwrap();
        assert!(entry.content.contains("from TECH"));
        assert!(entry.content.contains("to HR"));
        assert_eq!(entry.new_organization_id, Some(hr));
    }

    #[test]
    fn test_combined_change() {
        let (tech, hr) = (Uuid::now_v7(), Uuid::now_v7());
        let before = snapshot(tech, "TECH", false);
        let after = snapshot(hr, "HR", true);
        let entry = compose_change_log(MembershipEvent::Updated {
            before: &before,
            after: &after,
        })
        .unwrap();
        assert_eq!(
            entry.content,
            "user alice membership updated: organization changed from TECH to HR, \
             primary-organization status changed to yes"
        );
        assert_eq!(entry.new_organization_id, Some(hr));
    }

    #[test]
    fn test_primary_only_change() {
        let tech = Uuid::now_v7();
        let before = snapshot(tech, "TECH", true);
        let after = snapshot(tech, "TECH", false);
        let entry = compose_change_log(MembershipEvent::Updated {
            before: &before,
            after: &after,
        })
        .unwrap();
        assert!(entry.content.ends_with("primary-organization status changed to no"));
        assert_eq!(entry.new_organization_id, None);
    }

    #[test]
    fn test_untracked_update_is_silent() {
        let tech = Uuid::now_v7();
        let same = snapshot(tech, "TECH", false);
        assert!(compose_change_log(MembershipEvent::Updated {
            before: &same,
            after: &same,
        })
        .is_none());
    }

    #[test]
    fn test_removed() {
        let removed = snapshot(Uuid::nil(), "HR", false);
        let entry = compose_change_log(MembershipEvent::Removed(&removed)).unwrap();
        assert_eq!(entry.content, "user alice left organization HR");
    }
}
