//! Membership handlers

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entity::{user_organization, user_organization_change_log};
use crate::error::AppResult;
use crate::identity::UserRef;
use crate::routes::ApiResponse;
use crate::service::MembershipChanges;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub user: UserRef,
    pub organization_id: Uuid,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMembershipRequest {
    pub id: i64,
    #[serde(flatten)]
    pub changes: MembershipChanges,
}

/// Leave by membership id, or by (userId, organizationId)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: Option<i64>,
    pub user_id: Option<String>,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationQuery {
    pub organization_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyQuery {
    pub user_id: String,
    pub organization_id: Uuid,
}

/// POST /api/membership/join
pub async fn join(
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> AppResult<Json<ApiResponse<user_organization::Model>>> {
    let membership = state
        .memberships
        .join(&req.user, req.organization_id, req.is_primary)
        .await?;
    Ok(Json(ApiResponse::success(membership)))
}

/// POST /api/membership/update
pub async fn update_membership(
    State(state): State<AppState>,
    Json(req): Json<UpdateMembershipRequest>,
) -> AppResult<Json<ApiResponse<user_organization::Model>>> {
    let membership = state.memberships.update(req.id, req.changes).await?;
    Ok(Json(ApiResponse::success(membership)))
}

/// POST /api/membership/leave
pub async fn leave(
    State(state): State<AppState>,
    Json(req): Json<LeaveRequest>,
) -> AppResult<Json<ApiResponse<u64>>> {
    let removed = match (req.id, req.user_id, req.organization_id) {
        (Some(id), _, _) => {
            state.memberships.leave(id).await?;
            1
        }
        (None, Some(user_id), Some(organization_id)) => {
            state
                .memberships
                .remove_by_user_and_organization(&user_id, organization_id)
                .await?
        }
        _ => {
            return Ok(Json(ApiResponse::error(
                "either id or userId and organizationId are required",
            )))
        }
    };
    Ok(Json(ApiResponse::success(removed)))
}

/// GET /api/membership/user?userId=
pub async fn get_by_user(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<ApiResponse<Vec<user_organization::Model>>>> {
    Ok(Json(ApiResponse::success(
        state.memberships.find_by_user(&query.user_id).await?,
    )))
}

/// GET /api/membership/organization?organizationId=
pub async fn get_by_organization(
    State(state): State<AppState>,
    Query(query): Query<OrganizationQuery>,
) -> AppResult<Json<ApiResponse<Vec<user_organization::Model>>>> {
    Ok(Json(ApiResponse::success(
        state
            .memberships
            .find_by_organization(query.organization_id)
            .await?,
    )))
}

/// GET /api/membership/hierarchy?userId=&organizationId=
pub async fn get_in_hierarchy(
    State(state): State<AppState>,
    Query(query): Query<HierarchyQuery>,
) -> AppResult<Json<ApiResponse<Vec<user_organization::Model>>>> {
    Ok(Json(ApiResponse::success(
        state
            .memberships
            .find_in_hierarchy(&query.user_id, query.organization_id)
            .await?,
    )))
}

/// GET /api/membership/logs?userId=
pub async fn get_change_logs(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<ApiResponse<Vec<user_organization_change_log::Model>>>> {
    Ok(Json(ApiResponse::success(
        state.memberships.change_logs(&query.user_id).await?,
    )))
}
