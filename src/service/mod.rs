//! Domain services over the stores

pub mod membership;
pub mod organization;

pub use membership::{MembershipChanges, MembershipService};
pub use organization::{
    NewOrganization, OrganizationService, OrganizationStatistics, RemovalHook, UpdateOrganization,
};
