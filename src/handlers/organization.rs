//! Organization handlers
//!
//! Thin JSON wrappers over `OrganizationService`

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::organization;
use crate::error::{AppResult, OptionExt};
use crate::handlers::deserialize_optional_field;
use crate::identity::UserRef;
use crate::routes::ApiResponse;
use crate::service::{NewOrganization, OrganizationStatistics, UpdateOrganization};
use crate::state::AppState;
use crate::tree::TreeNode;

/// Update organization request
///
/// Nullable fields distinguish "absent" (unchanged) from `null` (cleared).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationRequest {
    pub id: Uuid,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_field")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_optional_field")]
    pub code: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_optional_field")]
    pub parent_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_optional_field")]
    pub manager: Option<Option<UserRef>>,
    pub sort_number: Option<i32>,
    pub valid: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_optional_field")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_optional_field")]
    pub address: Option<Option<String>>,
}

impl From<UpdateOrganizationRequest> for UpdateOrganization {
    fn from(req: UpdateOrganizationRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            code: req.code,
            parent_id: req.parent_id,
            manager: req.manager,
            sort_number: req.sort_number,
            valid: req.valid,
            phone: req.phone,
            address: req.address,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub id: Uuid,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub removed: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenQuery {
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubordinatesQuery {
    pub id: Uuid,
    #[serde(default)]
    pub include_disabled: bool,
    /// Whole subtree instead of direct children
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Deserialize)]
pub struct CodeQuery {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    pub keyword: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerQuery {
    pub manager_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LevelQuery {
    pub level: usize,
}

#[derive(Debug, Deserialize)]
pub struct PairQuery {
    pub a: Uuid,
    pub b: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathResponse {
    pub level: usize,
    pub full_path: String,
    pub path: Vec<organization::Model>,
}

/// POST /api/organization/add
pub async fn add_organization(
    State(state): State<AppState>,
    Json(req): Json<NewOrganization>,
) -> AppResult<Json<ApiResponse<organization::Model>>> {
    let created = state.organizations.create(req).await?;
    Ok(Json(ApiResponse::success(created)))
}

/// POST /api/organization/update
pub async fn update_organization(
    State(state): State<AppState>,
    Json(req): Json<UpdateOrganizationRequest>,
) -> AppResult<Json<ApiResponse<organization::Model>>> {
    let id = req.id;
    let updated = state.organizations.update(id, req.into()).await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// POST /api/organization/delete
pub async fn delete_organization(
    State(state): State<AppState>,
    Json(req): Json<DeleteRequest>,
) -> AppResult<Json<ApiResponse<DeleteResponse>>> {
    let removed = state.organizations.delete(req.id, req.force).await?;
    Ok(Json(ApiResponse::success(DeleteResponse { removed })))
}

/// POST /api/organization/move
pub async fn move_organization(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> AppResult<Json<ApiResponse<organization::Model>>> {
    let moved = state.organizations.move_to(req.id, req.parent_id).await?;
    Ok(Json(ApiResponse::success(moved)))
}

/// GET /api/organization/query?id=
pub async fn get_organization(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<ApiResponse<organization::Model>>> {
    let found = state
        .organizations
        .find(query.id)
        .await?
        .ok_or_not_found(format!("Organization {}", query.id))?;
    Ok(Json(ApiResponse::success(found)))
}

/// GET /api/organization/code?code=
pub async fn get_by_code(
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
) -> AppResult<Json<ApiResponse<organization::Model>>> {
    let found = state
        .organizations
        .find_by_code(&query.code)
        .await?
        .ok_or_not_found(format!("Organization with code {}", query.code))?;
    Ok(Json(ApiResponse::success(found)))
}

/// GET /api/organization/tree
pub async fn get_tree(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<TreeNode>>>> {
    Ok(Json(ApiResponse::success(state.organizations.tree().await?)))
}

/// GET /api/organization/roots
pub async fn get_roots(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<organization::Model>>>> {
    Ok(Json(ApiResponse::success(state.organizations.roots().await?)))
}

/// GET /api/organization/children?parentId=
pub async fn get_children(
    State(state): State<AppState>,
    Query(query): Query<ChildrenQuery>,
) -> AppResult<Json<ApiResponse<Vec<organization::Model>>>> {
    let children = state.organizations.children(query.parent_id).await?;
    Ok(Json(ApiResponse::success(children)))
}

/// GET /api/organization/subordinates?id=&recursive=&includeDisabled=
pub async fn get_subordinates(
    State(state): State<AppState>,
    Query(query): Query<SubordinatesQuery>,
) -> AppResult<Json<ApiResponse<Vec<organization::Model>>>> {
    let found = if query.recursive {
        state
            .organizations
            .all_subordinates(query.id, query.include_disabled)
            .await?
    } else {
        state
            .organizations
            .subordinates(query.id, query.include_disabled)
            .await?
    };
    Ok(Json(ApiResponse::success(found)))
}

/// GET /api/organization/path?id=
pub async fn get_path(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<ApiResponse<PathResponse>>> {
    let path = state.organizations.path(query.id).await?;
    let full_path = path
        .iter()
        .map(|m| m.name.as_str())
        .collect::<Vec<_>>()
        .join(crate::tree::PATH_SEPARATOR);

    Ok(Json(ApiResponse::success(PathResponse {
        level: path.len() - 1,
        full_path,
        path,
    })))
}

/// GET /api/organization/statistics?id=
pub async fn get_statistics(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<ApiResponse<OrganizationStatistics>>> {
    let statistics = state.organizations.statistics(query.id).await?;
    Ok(Json(ApiResponse::success(statistics)))
}

/// GET /api/organization/common-ancestor?a=&b=
///
/// `data` is absent when the two organizations live in different trees
pub async fn get_common_ancestor(
    State(state): State<AppState>,
    Query(query): Query<PairQuery>,
) -> AppResult<Json<ApiResponse<organization::Model>>> {
    Ok(Json(
        match state.organizations.common_ancestor(query.a, query.b).await? {
            Some(ancestor) => ApiResponse::success(ancestor),
            None => ApiResponse {
                code: true,
                message: "no common ancestor".to_string(),
                data: None,
            },
        },
    ))
}

/// GET /api/organization/search?keyword=
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> AppResult<Json<ApiResponse<Vec<organization::Model>>>> {
    Ok(Json(ApiResponse::success(
        state.organizations.search(&query.keyword).await?,
    )))
}

/// GET /api/organization/manager?managerId=
pub async fn get_by_manager(
    State(state): State<AppState>,
    Query(query): Query<ManagerQuery>,
) -> AppResult<Json<ApiResponse<Vec<organization::Model>>>> {
    Ok(Json(ApiResponse::success(
        state.organizations.find_by_manager(&query.manager_id).await?,
    )))
}

/// GET /api/organization/level?level=
pub async fn get_by_level(
    State(state): State<AppState>,
    Query(query): Query<LevelQuery>,
) -> AppResult<Json<ApiResponse<Vec<organization::Model>>>> {
    Ok(Json(ApiResponse::success(
        state.organizations.find_by_level(query.level).await?,
    )))
}
