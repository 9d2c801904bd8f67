//! UserOrganization entity - 用户组织关联表
//!
//! 表名: user_organization
//!
//! (user_id, organization_id) is unique, see `db::migrate`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::identity::UserRef;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_organization")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 用户ID (external identity)
    #[sea_orm(column_type = "String(Some(64))")]
    pub user_id: String,

    /// 用户标识 (冗余字段)
    #[sea_orm(column_type = "String(Some(255))")]
    pub user_identifier: String,

    /// 组织ID
    pub organization_id: Uuid,

    /// 是否主要组织
    pub is_primary: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn user(&self) -> UserRef {
        UserRef::new(self.user_id.clone(), self.user_identifier.clone())
    }
}

/// Fields of a membership before insertion
#[derive(Clone, Debug)]
pub struct NewMembership {
    pub user: UserRef,
    pub organization_id: Uuid,
    pub is_primary: bool,
}
