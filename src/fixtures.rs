//! Demo data
//!
//! Seeds a small company: a headquarters with four departments, three teams
//! under TECH, five branch offices, and two users with memberships.
//! Does nothing when any root organization already exists.

use tracing::info;

use crate::error::AppResult;
use crate::identity::UserRef;
use crate::service::{MembershipService, NewOrganization, OrganizationService};
use crate::store::{MembershipStore, OrganizationStore};

const DEPARTMENTS: [(&str, &str, &str, i32); 4] = [
    ("Technology", "TECH", "Research and development", 0),
    ("Human Resources", "HR", "People and recruiting", 10),
    ("Finance", "FINANCE", "Accounting and budgeting", 20),
    ("Marketing", "MARKETING", "Brand and sales", 30),
];

const TECH_TEAMS: [(&str, &str, i32); 3] = [
    ("Frontend", "FRONTEND", 0),
    ("Backend", "BACKEND", 10),
    ("Quality Assurance", "QA", 20),
];

/// Summary of what [`seed`] inserted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub organizations: usize,
    pub memberships: usize,
}

pub async fn seed<O, M>(
    organizations: &OrganizationService<O>,
    memberships: &MembershipService<O, M>,
) -> AppResult<SeedReport>
where
    O: OrganizationStore,
    M: MembershipStore,
{
    if !organizations.roots().await?.is_empty() {
        info!("Organizations already present, skipping fixtures");
        return Ok(SeedReport::default());
    }

    let mut report = SeedReport::default();
    let admin = UserRef::new("1", "admin");
    let demo = UserRef::new("2", "demo");

    let root = organizations
        .create(NewOrganization {
            description: Some("Company headquarters".to_string()),
            manager: Some(admin.clone()),
            ..NewOrganization::named("Headquarters").with_code("ROOT")
        })
        .await?;
    report.organizations += 1;

    let mut tech_id = root.id;
    let mut hr_id = root.id;
    for (name, code, description, sort) in DEPARTMENTS {
        let department = organizations
            .create(NewOrganization {
                description: Some(description.to_string()),
                ..NewOrganization::named(name)
                    .under(root.id)
                    .with_code(code)
                    .with_sort_number(sort)
            })
            .await?;
        report.organizations += 1;
        match code {
            "TECH" => tech_id = department.id,
            "HR" => hr_id = department.id,
            _ => {}
        }
    }

    for (name, code, sort) in TECH_TEAMS {
        organizations
            .create(
                NewOrganization::named(name)
                    .under(tech_id)
                    .with_code(code)
                    .with_sort_number(sort),
            )
            .await?;
        report.organizations += 1;
    }

    for n in 1..=5 {
        organizations
            .create(NewOrganization {
                phone: Some(format!("010-8888-{n:04}")),
                address: Some(format!("Branch office No. {n}")),
                ..NewOrganization::named(format!("Branch {n}"))
                    .under(root.id)
                    .with_code(format!("BRANCH{n}"))
                    .with_sort_number(100 + n * 10)
            })
            .await?;
        report.organizations += 1;
    }

    memberships.join(&admin, root.id, true).await?;
    memberships.join(&admin, tech_id, false).await?;
    memberships.join(&demo, tech_id, true).await?;
    memberships.join(&demo, hr_id, false).await?;
    report.memberships = 4;

    info!(
        "Seeded {} organizations and {} memberships",
        report.organizations, report.memberships
    );
    Ok(report)
}
