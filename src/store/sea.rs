//! SeaORM backed stores (PostgreSQL in production, SQLite in tests)

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::{MembershipStore, OrganizationStore, PendingWrite};
use crate::entity::organization;
use crate::entity::user_organization::{self, NewMembership};
use crate::entity::user_organization_change_log::{self, NewChangeLog};
use crate::error::{AppError, AppResult};

pub struct SeaOrganizationStore {
    db: DatabaseConnection,
}

impl SeaOrganizationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Sibling order
fn ordered(select: Select<organization::Entity>) -> Select<organization::Entity> {
    select
        .order_by_asc(organization::Column::SortNumber)
        .order_by_asc(organization::Column::Name)
}

fn valid() -> Select<organization::Entity> {
    organization::Entity::find().filter(organization::Column::Valid.eq(true))
}

fn children_of(
    select: Select<organization::Entity>,
    parent: Option<Uuid>,
) -> Select<organization::Entity> {
    match parent {
        Some(id) => select.filter(organization::Column::ParentId.eq(id)),
        None => select.filter(organization::Column::ParentId.is_null()),
    }
}

/// Insert or overwrite every column
async fn upsert<C>(conn: &C, model: organization::Model) -> Result<(), sea_orm::DbErr>
where
    C: ConnectionTrait,
{
    use organization::Column;

    organization::Entity::insert(model.into_active_model_set())
        .on_conflict(
            OnConflict::column(Column::Id)
                .update_columns([
                    Column::Name,
                    Column::Description,
                    Column::Code,
                    Column::Valid,
                    Column::ParentId,
                    Column::ManagerId,
                    Column::ManagerName,
                    Column::Phone,
                    Column::Address,
                    Column::SortNumber,
                    Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl OrganizationStore for SeaOrganizationStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<organization::Model>> {
        Ok(organization::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<organization::Model>> {
        Ok(ordered(valid().filter(organization::Column::Code.eq(code)))
            .one(&self.db)
            .await?)
    }

    async fn find_children(&self, parent: Option<Uuid>) -> AppResult<Vec<organization::Model>> {
        Ok(ordered(children_of(valid(), parent)).all(&self.db).await?)
    }

    async fn find_direct_children(&self, id: Uuid) -> AppResult<Vec<organization::Model>> {
        Ok(ordered(children_of(organization::Entity::find(), Some(id)))
            .all(&self.db)
            .await?)
    }

    async fn count_children(&self, parent: Option<Uuid>) -> AppResult<u64> {
        Ok(children_of(valid(), parent).count(&self.db).await?)
    }

    async fn find_by_name_contains(&self, keyword: &str) -> AppResult<Vec<organization::Model>> {
        Ok(ordered(valid().filter(organization::Column::Name.contains(keyword)))
            .all(&self.db)
            .await?)
    }

    async fn find_by_manager(&self, manager_id: &str) -> AppResult<Vec<organization::Model>> {
        Ok(ordered(valid().filter(organization::Column::ManagerId.eq(manager_id)))
            .all(&self.db)
            .await?)
    }

    async fn find_all(&self, include_disabled: bool) -> AppResult<Vec<organization::Model>> {
        let select = if include_disabled {
            organization::Entity::find()
        } else {
            valid()
        };
        Ok(ordered(select).all(&self.db).await?)
    }

    async fn commit(&self, writes: Vec<PendingWrite>) -> AppResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let count = writes.len();
        let txn = self.db.begin().await?;
        for write in writes {
            match write {
                PendingWrite::Save(model) => upsert(&txn, model).await?,
                PendingWrite::Delete(id) => {
                    organization::Entity::delete_by_id(id).exec(&txn).await?;
                }
            }
        }
        txn.commit().await?;

        tracing::debug!("Committed {} organization writes", count);
        Ok(())
    }
}

pub struct SeaMembershipStore {
    db: DatabaseConnection,
}

impl SeaMembershipStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn duplicate_or_db(err: sea_orm::DbErr, user: &str, organization: Uuid) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateMembership {
            user: user.to_string(),
            organization,
        },
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl MembershipStore for SeaMembershipStore {
    async fn insert(&self, membership: NewMembership) -> AppResult<user_organization::Model> {
        let now = Utc::now();
        let active = user_organization::ActiveModel {
            user_id: Set(membership.user.id.clone()),
            user_identifier: Set(membership.user.identifier.clone()),
            organization_id: Set(membership.organization_id),
            is_primary: Set(membership.is_primary),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active.insert(&self.db).await.map_err(|e| {
            duplicate_or_db(e, &membership.user.identifier, membership.organization_id)
        })
    }

    async fn update(
        &self,
        membership: user_organization::Model,
    ) -> AppResult<user_organization::Model> {
        let user = membership.user_identifier.clone();
        let organization_id = membership.organization_id;
        let active = user_organization::ActiveModel {
            id: Set(membership.id),
            user_id: Set(membership.user_id),
            user_identifier: Set(membership.user_identifier),
            organization_id: Set(membership.organization_id),
            is_primary: Set(membership.is_primary),
            created_at: Set(membership.created_at),
            updated_at: Set(Utc::now()),
        };

        active
            .update(&self.db)
            .await
            .map_err(|e| duplicate_or_db(e, &user, organization_id))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        user_organization::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<user_organization::Model>> {
        Ok(user_organization::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_user_and_organization(
        &self,
        user_id: &str,
        organization_id: Uuid,
    ) -> AppResult<Option<user_organization::Model>> {
        Ok(user_organization::Entity::find()
            .filter(user_organization::Column::UserId.eq(user_id))
            .filter(user_organization::Column::OrganizationId.eq(organization_id))
            .one(&self.db)
            .await?)
    }

    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<user_organization::Model>> {
        Ok(user_organization::Entity::find()
            .filter(user_organization::Column::UserId.eq(user_id))
            .order_by_asc(user_organization::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn find_primary_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Option<user_organization::Model>> {
        Ok(user_organization::Entity::find()
            .filter(user_organization::Column::UserId.eq(user_id))
            .filter(user_organization::Column::IsPrimary.eq(true))
            .one(&self.db)
            .await?)
    }

    async fn find_by_organization(
        &self,
        organization_id: Uuid,
    ) -> AppResult<Vec<user_organization::Model>> {
        Ok(user_organization::Entity::find()
            .filter(user_organization::Column::OrganizationId.eq(organization_id))
            .order_by_asc(user_organization::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn count_by_organization(&self, organization_id: Uuid) -> AppResult<u64> {
        Ok(user_organization::Entity::find()
            .filter(user_organization::Column::OrganizationId.eq(organization_id))
            .count(&self.db)
            .await?)
    }

    async fn append_change_log(
        &self,
        entry: NewChangeLog,
    ) -> AppResult<user_organization_change_log::Model> {
        let now = Utc::now();
        let log = user_organization_change_log::ActiveModel {
            user_id: Set(entry.user_id),
            organization_id: Set(entry.organization_id),
            new_organization_id: Set(entry.new_organization_id),
            content: Set(entry.content),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(log.insert(&self.db).await?)
    }

    async fn change_logs_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<user_organization_change_log::Model>> {
        Ok(user_organization_change_log::Entity::find()
            .filter(user_organization_change_log::Column::UserId.eq(user_id))
            .order_by_asc(user_organization_change_log::Column::Id)
            .all(&self.db)
            .await?)
    }
}
