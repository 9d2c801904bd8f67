//! UserOrganizationChangeLog entity - 用户组织变动记录表
//!
//! 表名: user_organization_change_log
//!
//! Append-only. Rows are written by `notifier::ChangeNotifier` only.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 变动内容最大长度
pub const CONTENT_MAX_CHARS: usize = 255;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_organization_change_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 用户ID
    #[sea_orm(column_type = "String(Some(64))")]
    pub user_id: String,

    /// 事件发生时的组织
    #[sea_orm(nullable)]
    pub organization_id: Option<Uuid>,

    /// 变更后的组织 (only for organization reassignment)
    #[sea_orm(nullable)]
    pub new_organization_id: Option<Uuid>,

    /// 变动内容描述
    #[sea_orm(column_type = "String(Some(255))")]
    pub content: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// 创建变动记录的辅助结构
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewChangeLog {
    pub user_id: String,
    pub organization_id: Option<Uuid>,
    pub new_organization_id: Option<Uuid>,
    pub content: String,
}

impl NewChangeLog {
    pub fn new(
        user_id: impl Into<String>,
        organization_id: Uuid,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            organization_id: Some(organization_id),
            new_organization_id: None,
            content: truncate_content(content.into()),
        }
    }

    pub fn with_new_organization(mut self, organization_id: Uuid) -> Self {
        self.new_organization_id = Some(organization_id);
        self
    }
}

fn truncate_content(content: String) -> String {
    if content.chars().count() <= CONTENT_MAX_CHARS {
        content
    } else {
        content.chars().take(CONTENT_MAX_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_truncated_on_char_boundary() {
        let entry = NewChangeLog::new("1", Uuid::nil(), "组".repeat(300));
        assert_eq!(entry.content.chars().count(), CONTENT_MAX_CHARS);
    }

    #[test]
    fn test_with_new_organization() {
        let target = Uuid::now_v7();
        let entry = NewChangeLog::new("1", Uuid::nil(), "moved").with_new_organization(target);
        assert_eq!(entry.new_organization_id, Some(target));
        assert_eq!(entry.organization_id, Some(Uuid::nil()));
    }
}
