use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::service::{MembershipService, OrganizationService};
use crate::store::{SeaMembershipStore, SeaOrganizationStore};

pub type Organizations = OrganizationService<SeaOrganizationStore>;
pub type Memberships = MembershipService<SeaOrganizationStore, SeaMembershipStore>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    pub organizations: Organizations,
    pub memberships: Memberships,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires both services to one connection. Deleting organizations
    /// cascades to their memberships.
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let organization_store = Arc::new(SeaOrganizationStore::new(db.clone()));
        let membership_store = Arc::new(SeaMembershipStore::new(db.clone()));
        let memberships = MembershipService::new(organization_store.clone(), membership_store);
        let organizations = OrganizationService::new(organization_store)
            .with_removal_hook(Arc::new(memberships.clone()));

        Self {
            organizations,
            memberships,
            db,
            config: Arc::new(config),
        }
    }
}
