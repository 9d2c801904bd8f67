use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Schema,
};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::entity::{organization, user_organization, user_organization_change_log};

/// Initialize database connection and auto-migrate tables
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let database_url = config.connection_url();

    let mut opt = ConnectOptions::new(&database_url);
    if config.is_sqlite() {
        info!("Connecting to sqlite database: {}", config.name);
        // Every pooled connection to sqlite::memory: would see its own database
        let pool = if config.name == ":memory:" { 1 } else { config.max_connections };
        opt.max_connections(pool).min_connections(1);
    } else {
        info!("Connecting to database: {}:{}/{}", config.host, config.port, config.name);
        opt.max_connections(config.max_connections)
            .min_connections(1)
            .set_schema_search_path("public");
    }
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    info!("Database connection established");

    migrate(&db).await?;

    Ok(db)
}

/// Creates missing tables and indexes; safe to run on every start
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    info!("Running auto-migration for all entities...");

    create_table_if_not_exists(
        db,
        backend,
        schema.create_table_from_entity(organization::Entity),
    )
    .await?;
    create_table_if_not_exists(
        db,
        backend,
        schema.create_table_from_entity(user_organization::Entity),
    )
    .await?;
    create_table_if_not_exists(
        db,
        backend,
        schema.create_table_from_entity(user_organization_change_log::Entity),
    )
    .await?;

    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("idx-biz_organization-parent_id")
            .table(organization::Entity)
            .col(organization::Column::ParentId)
            .to_owned(),
    )
    .await?;
    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("idx-biz_organization-code")
            .table(organization::Entity)
            .col(organization::Column::Code)
            .to_owned(),
    )
    .await?;
    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("user_organization_unique")
            .table(user_organization::Entity)
            .col(user_organization::Column::UserId)
            .col(user_organization::Column::OrganizationId)
            .unique()
            .to_owned(),
    )
    .await?;
    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("idx-user_organization_change_log-user_id")
            .table(user_organization_change_log::Entity)
            .col(user_organization_change_log::Column::UserId)
            .to_owned(),
    )
    .await?;

    info!("Auto-migration completed successfully");
    Ok(())
}

/// Create a table if it doesn't exist
async fn create_table_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: TableCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

async fn create_index_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: IndexCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}
