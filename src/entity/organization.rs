//! Organization entity - 组织机构表
//!
//! 表名: biz_organization
//!
//! One row per node of the organization forest. The self reference
//! (`parent_id`) is resolved by id through the store and the tree arena,
//! not through a SeaORM relation.

use std::cmp::Ordering;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::identity::UserRef;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "biz_organization")]
pub struct Model {
    /// Time-ordered UUIDv7, assigned at creation
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// 组织名称
    #[sea_orm(column_type = "String(Some(255))")]
    pub name: String,

    /// 组织描述
    #[sea_orm(column_type = "String(Some(500))", nullable)]
    pub description: Option<String>,

    /// 组织编码 (unique by convention only)
    #[sea_orm(column_type = "String(Some(100))", nullable)]
    pub code: Option<String>,

    /// 是否有效
    pub valid: bool,

    /// 父组织ID (None 表示根组织)
    #[sea_orm(nullable)]
    pub parent_id: Option<Uuid>,

    /// 负责人ID (external identity)
    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub manager_id: Option<String>,

    /// 负责人名称 (冗余字段)
    #[sea_orm(column_type = "String(Some(255))", nullable)]
    pub manager_name: Option<String>,

    /// 联系电话
    #[sea_orm(column_type = "String(Some(255))", nullable)]
    pub phone: Option<String>,

    /// 办公地址
    #[sea_orm(column_type = "String(Some(255))", nullable)]
    pub address: Option<String>,

    /// Sibling order, ascending
    pub sort_number: i32,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// 自引用关系通过 OrganizationTree 或手动查询处理

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn manager(&self) -> Option<UserRef> {
        match (&self.manager_id, &self.manager_name) {
            (Some(id), name) => Some(UserRef::new(id.clone(), name.clone().unwrap_or_default())),
            (None, _) => None,
        }
    }

    pub fn set_manager(&mut self, manager: Option<UserRef>) {
        match manager {
            Some(user) => {
                self.manager_id = Some(user.id);
                self.manager_name = Some(user.identifier);
            }
            None => {
                self.manager_id = None;
                self.manager_name = None;
            }
        }
    }

    /// Length constraints applied to every write
    pub fn validate_attributes(&self) -> Result<(), validator::ValidationErrors> {
        OrganizationAttributes::from(self).validate()
    }

    /// Converts to an active model with every column marked as set
    pub fn into_active_model_set(self) -> ActiveModel {
        use sea_orm::Set;

        ActiveModel {
            id: Set(self.id),
            name: Set(self.name),
            description: Set(self.description),
            code: Set(self.code),
            valid: Set(self.valid),
            parent_id: Set(self.parent_id),
            manager_id: Set(self.manager_id),
            manager_name: Set(self.manager_name),
            phone: Set(self.phone),
            address: Set(self.address),
            sort_number: Set(self.sort_number),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }
}

/// Sibling ordering: `sort_number` ascending, then `name` ascending
pub fn sibling_order(a: &Model, b: &Model) -> Ordering {
    a.sort_number
        .cmp(&b.sort_number)
        .then_with(|| a.name.cmp(&b.name))
}

/// Snapshot of the user-editable text columns
#[derive(Debug, Validate)]
struct OrganizationAttributes {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    name: String,
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    description: Option<String>,
    #[validate(length(max = 100, message = "code must be at most 100 characters"))]
    code: Option<String>,
    #[validate(length(max = 255, message = "phone must be at most 255 characters"))]
    phone: Option<String>,
    #[validate(length(max = 255, message = "address must be at most 255 characters"))]
    address: Option<String>,
}

impl From<&Model> for OrganizationAttributes {
    fn from(model: &Model) -> Self {
        Self {
            name: model.name.trim().to_string(),
            description: model.description.clone(),
            code: model.code.clone(),
            phone: model.phone.clone(),
            address: model.address.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn sample(name: &str, parent_id: Option<Uuid>, sort_number: i32) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::now_v7(),
            name: name.to_string(),
            description: None,
            code: None,
            valid: true,
            parent_id,
            manager_id: None,
            manager_name: None,
            phone: None,
            address: None,
            sort_number,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sibling_order() {
        let a = sample("Beta", None, 0);
        let b = sample("Alpha", None, 0);
        let c = sample("Aardvark", None, 10);
        let mut rows = vec![c.clone(), a.clone(), b.clone()];
        rows.sort_by(sibling_order);
        let names: Vec<_> = rows.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Aardvark"]);
    }

    #[test]
    fn test_validate_attributes() {
        let mut model = sample("Tech", None, 0);
        assert!(model.validate_attributes().is_ok());

        model.name = "   ".to_string();
        assert!(model.validate_attributes().is_err());

        model.name = "x".repeat(256);
        assert!(model.validate_attributes().is_err());

        model.name = "Tech".to_string();
        model.code = Some("c".repeat(101));
        assert!(model.validate_attributes().is_err());
    }

    #[test]
    fn test_manager_round_trip() {
        let mut model = sample("Tech", None, 0);
        assert!(model.manager().is_none());

        model.set_manager(Some(UserRef::new("42", "alice")));
        assert_eq!(model.manager_id.as_deref(), Some("42"));
        assert_eq!(model.manager().map(|m| m.identifier), Some("alice".to_string()));

        model.set_manager(None);
        assert!(model.manager_name.is_none());
    }
}
