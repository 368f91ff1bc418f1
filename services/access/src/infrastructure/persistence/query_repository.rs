//! RBAC 读侧查询
//!
//! 列表查询用 `QueryBuilder` 组装；同一个谓词构造函数同时服务数据查询与计数查询，
//! 保证分页元数据与过滤结果一致。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use storefront_common::{PagedResult, Pagination, UserId};
use storefront_errors::AppResult;
use uuid::Uuid;

use super::db_metrics::QueryTimer;
use super::error_mapper::map_sqlx_error;
use super::rows::{
    ActiveGrantRow, ResourceSummaryRow, RoleGrantRow, RoleRow, RoleUserRow, UserRoleViewRow,
    priority_from_db,
};
use crate::domain::rbac::views::{
    ActiveGrant, PermissionFilter, PermissionSummary, ResourceRef, ResourceSummary, RoleFilter,
    RoleGrant, RoleRef, RoleSummary, RoleUser, RoleView, SAMPLE_SIZE, UserRoleView,
};
use crate::domain::rbac::{PermissionId, RbacQueryRepository, ResourceId, RoleId};

/// 生效授予的谓词，`ur` 为 user_roles 别名
const ACTIVE_GRANT: &str = "(ur.expires_at IS NULL OR ur.expires_at > NOW())";

/// 把搜索词转换为 ILIKE 子串模式，转义通配符
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_permission_predicates(qb: &mut QueryBuilder<'_, Postgres>, filter: &PermissionFilter) {
    qb.push(" WHERE TRUE");
    if let Some(term) = filter.search_term() {
        qb.push(" AND p.name ILIKE ").push_bind(like_pattern(term));
    }
    if let Some(resource_id) = filter.resource_id {
        qb.push(
            " AND EXISTS (SELECT 1 FROM resource_permissions f \
             WHERE f.permission_id = p.id AND f.resource_id = ",
        )
        .push_bind(resource_id.0)
        .push(")");
    }
}

fn push_role_predicates(qb: &mut QueryBuilder<'_, Postgres>, filter: &RoleFilter) {
    qb.push(" WHERE TRUE");
    if let Some(term) = filter.search_term() {
        qb.push(" AND r.name ILIKE ").push_bind(like_pattern(term));
    }
    if let Some(min) = filter.priority_min {
        qb.push(" AND r.priority >= ").push_bind(min);
    }
    if let Some(max) = filter.priority_max {
        qb.push(" AND r.priority <= ").push_bind(max);
    }
    if let Some(has_users) = filter.has_users {
        qb.push(if has_users { " AND EXISTS" } else { " AND NOT EXISTS" });
        qb.push(" (SELECT 1 FROM user_roles ur WHERE ur.role_id = r.id AND ")
            .push(ACTIVE_GRANT)
            .push(")");
    }
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, pagination: &Pagination) {
    qb.push(" LIMIT ")
        .push_bind(pagination.limit as i64)
        .push(" OFFSET ")
        .push_bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX));
}

#[derive(sqlx::FromRow)]
struct PermissionSummaryRow {
    id: Uuid,
    name: String,
    resource_count: i64,
    role_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PermissionResourceRow {
    permission_id: Uuid,
    id: Uuid,
    name: String,
}

#[derive(sqlx::FromRow)]
struct PermissionRoleRow {
    permission_id: Uuid,
    id: Uuid,
    name: String,
    priority: i32,
}

#[derive(sqlx::FromRow)]
struct RoleSummaryRow {
    id: Uuid,
    name: String,
    priority: i32,
    permission_count: i64,
    resource_count: i64,
    user_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const ROLE_GRANT_COLUMNS: &str = r#"
    rp.role_id, rp.resource_permission_id, b.permission_id, p.name AS permission_name,
    b.resource_id, res.name AS resource_name, rp.granted_at
"#;

const ROLE_GRANT_JOINS: &str = r#"
    FROM role_permissions rp
    JOIN resource_permissions b ON b.id = rp.resource_permission_id
    JOIN permissions p ON p.id = b.permission_id
    JOIN resources res ON res.id = b.resource_id
"#;

/// PostgreSQL 查询仓储
pub struct PostgresRbacQueryRepository {
    pool: PgPool,
}

impl PostgresRbacQueryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn permission_resources(
        &self,
        ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, Vec<ResourceRef>>> {
        let timer = QueryTimer::new("resource_permissions", "list_by_permissions");
        let rows = timer
            .observe(
                sqlx::query_as::<_, PermissionResourceRow>(
                    r#"
                    SELECT b.permission_id, r.id, r.name
                    FROM resource_permissions b
                    JOIN resources r ON r.id = b.resource_id
                    WHERE b.permission_id = ANY($1)
                    ORDER BY r.name
                    "#,
                )
                .bind(ids)
                .fetch_all(&self.pool)
                .await,
            )
            .map_err(map_sqlx_error)?;

        let mut map: HashMap<Uuid, Vec<ResourceRef>> = HashMap::new();
        for row in rows {
            map.entry(row.permission_id).or_default().push(ResourceRef {
                id: ResourceId::from_uuid(row.id),
                name: row.name,
            });
        }
        Ok(map)
    }

    async fn permission_roles(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<RoleRef>>> {
        let timer = QueryTimer::new("role_permissions", "roles_by_permissions");
        let rows = timer
            .observe(
                sqlx::query_as::<_, PermissionRoleRow>(
                    r#"
                    SELECT DISTINCT b.permission_id, ro.id, ro.name, ro.priority
                    FROM role_permissions rp
                    JOIN resource_permissions b ON b.id = rp.resource_permission_id
                    JOIN roles ro ON ro.id = rp.role_id
                    WHERE b.permission_id = ANY($1)
                    ORDER BY ro.priority, ro.name
                    "#,
                )
                .bind(ids)
                .fetch_all(&self.pool)
                .await,
            )
            .map_err(map_sqlx_error)?;

        let mut map: HashMap<Uuid, Vec<RoleRef>> = HashMap::new();
        for row in rows {
            map.entry(row.permission_id).or_default().push(RoleRef {
                id: RoleId::from_uuid(row.id),
                name: row.name,
                priority: priority_from_db(row.priority)?,
            });
        }
        Ok(map)
    }

    async fn sample_grants(&self, role_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<RoleGrant>>> {
        let sql = format!(
            r#"
            SELECT role_id, resource_permission_id, permission_id, permission_name,
                   resource_id, resource_name, granted_at
            FROM (
                SELECT d.*,
                       ROW_NUMBER() OVER (PARTITION BY d.role_id ORDER BY d.permission_name) AS rn
                FROM (
                    -- 每个权限只取一条，按资源名取第一条
                    SELECT DISTINCT ON (rp.role_id, b.permission_id) {columns}
                    {joins}
                    WHERE rp.role_id = ANY($1)
                    ORDER BY rp.role_id, b.permission_id, res.name
                ) d
            ) s
            WHERE rn <= $2
            ORDER BY permission_name
            "#,
            columns = ROLE_GRANT_COLUMNS,
            joins = ROLE_GRANT_JOINS
        );

        let timer = QueryTimer::new("role_permissions", "sample");
        let rows = timer
            .observe(
                sqlx::query_as::<_, RoleGrantRow>(&sql)
                    .bind(role_ids)
                    .bind(SAMPLE_SIZE)
                    .fetch_all(&self.pool)
                    .await,
            )
            .map_err(map_sqlx_error)?;

        let mut map: HashMap<Uuid, Vec<RoleGrant>> = HashMap::new();
        for row in rows {
            map.entry(row.role_id).or_default().push(row.into());
        }
        Ok(map)
    }

    async fn sample_users(&self, role_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<RoleUser>>> {
        let sql = format!(
            r#"
            SELECT role_id, user_id, assigned_at, assigned_by, expires_at
            FROM (
                SELECT ur.role_id, ur.user_id, ur.assigned_at, ur.assigned_by, ur.expires_at,
                       ROW_NUMBER() OVER (PARTITION BY ur.role_id ORDER BY ur.assigned_at DESC) AS rn
                FROM user_roles ur
                WHERE ur.role_id = ANY($1) AND {active}
            ) s
            WHERE rn <= $2
            ORDER BY assigned_at DESC
            "#,
            active = ACTIVE_GRANT
        );

        let timer = QueryTimer::new("user_roles", "sample");
        let rows = timer
            .observe(
                sqlx::query_as::<_, RoleUserRow>(&sql)
                    .bind(role_ids)
                    .bind(SAMPLE_SIZE)
                    .fetch_all(&self.pool)
                    .await,
            )
            .map_err(map_sqlx_error)?;

        let mut map: HashMap<Uuid, Vec<RoleUser>> = HashMap::new();
        for row in rows {
            map.entry(row.role_id).or_default().push(row.into());
        }
        Ok(map)
    }

    async fn resource_summaries(&self, id: Option<&ResourceId>) -> AppResult<Vec<ResourceSummary>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT r.id, r.name, r.created_at, r.updated_at, COUNT(b.id) AS permission_count
            FROM resources r
            LEFT JOIN resource_permissions b ON b.resource_id = r.id
            "#,
        );
        if let Some(id) = id {
            qb.push(" WHERE r.id = ").push_bind(id.0);
        }
        qb.push(" GROUP BY r.id ORDER BY r.name");

        let timer = QueryTimer::new("resources", "list");
        let rows = timer
            .observe(
                qb.build_query_as::<ResourceSummaryRow>()
                    .fetch_all(&self.pool)
                    .await,
            )
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ResourceSummary::from).collect())
    }
}

#[async_trait]
impl RbacQueryRepository for PostgresRbacQueryRepository {
    async fn list_resources(&self) -> AppResult<Vec<ResourceSummary>> {
        self.resource_summaries(None).await
    }

    async fn find_resource(&self, id: &ResourceId) -> AppResult<Option<ResourceSummary>> {
        Ok(self.resource_summaries(Some(id)).await?.into_iter().next())
    }

    async fn list_permissions(
        &self,
        filter: &PermissionFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<PermissionSummary>> {
        let mut data = QueryBuilder::<Postgres>::new(
            r#"
            SELECT p.id, p.name, p.created_at, p.updated_at,
                   (SELECT COUNT(*) FROM resource_permissions b WHERE b.permission_id = p.id) AS resource_count,
                   (SELECT COUNT(DISTINCT rp.role_id)
                      FROM role_permissions rp
                      JOIN resource_permissions b ON b.id = rp.resource_permission_id
                     WHERE b.permission_id = p.id) AS role_count
            FROM permissions p
            "#,
        );
        push_permission_predicates(&mut data, filter);
        data.push(" ORDER BY p.name");
        push_page(&mut data, pagination);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM permissions p");
        push_permission_predicates(&mut count, filter);

        let timer = QueryTimer::new("permissions", "list_paginated");
        let (rows, total) = timer
            .observe(tokio::try_join!(
                data.build_query_as::<PermissionSummaryRow>()
                    .fetch_all(&self.pool),
                count.build_query_scalar::<i64>().fetch_one(&self.pool),
            ))
            .map_err(map_sqlx_error)?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let (mut resources, mut roles) = if ids.is_empty() {
            (HashMap::new(), HashMap::new())
        } else {
            tokio::try_join!(self.permission_resources(&ids), self.permission_roles(&ids))?
        };

        let items = rows
            .into_iter()
            .map(|row| PermissionSummary {
                id: PermissionId::from_uuid(row.id),
                name: row.name,
                resource_count: row.resource_count.max(0) as u64,
                role_count: row.role_count.max(0) as u64,
                resources: resources.remove(&row.id).unwrap_or_default(),
                roles: roles.remove(&row.id).unwrap_or_default(),
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect();

        Ok(PagedResult::new(items, total.max(0) as u64, pagination))
    }

    async fn list_roles(
        &self,
        filter: &RoleFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<RoleSummary>> {
        let mut data = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT r.id, r.name, r.priority, r.created_at, r.updated_at,
                   (SELECT COUNT(DISTINCT b.permission_id)
                      FROM role_permissions rp
                      JOIN resource_permissions b ON b.id = rp.resource_permission_id
                     WHERE rp.role_id = r.id) AS permission_count,
                   (SELECT COUNT(DISTINCT b.resource_id)
                      FROM role_permissions rp
                      JOIN resource_permissions b ON b.id = rp.resource_permission_id
                     WHERE rp.role_id = r.id) AS resource_count,
                   (SELECT COUNT(*) FROM user_roles ur
                     WHERE ur.role_id = r.id AND {active}) AS user_count
            FROM roles r
            "#,
            active = ACTIVE_GRANT
        ));
        push_role_predicates(&mut data, filter);
        data.push(" ORDER BY r.priority ASC, r.name ASC");
        push_page(&mut data, pagination);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM roles r");
        push_role_predicates(&mut count, filter);

        let timer = QueryTimer::new("roles", "list_paginated");
        let (rows, total) = timer
            .observe(tokio::try_join!(
                data.build_query_as::<RoleSummaryRow>().fetch_all(&self.pool),
                count.build_query_scalar::<i64>().fetch_one(&self.pool),
            ))
            .map_err(map_sqlx_error)?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let (mut grants, mut users) = if ids.is_empty() {
            (HashMap::new(), HashMap::new())
        } else {
            tokio::try_join!(self.sample_grants(&ids), self.sample_users(&ids))?
        };

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let priority = priority_from_db(row.priority)?;
            items.push(RoleSummary {
                id: RoleId::from_uuid(row.id),
                name: row.name,
                priority,
                tier: priority.tier(),
                permission_count: row.permission_count.max(0) as u64,
                resource_count: row.resource_count.max(0) as u64,
                user_count: row.user_count.max(0) as u64,
                sample_permissions: grants.remove(&row.id).unwrap_or_default(),
                sample_users: users.remove(&row.id).unwrap_or_default(),
                created_at: row.created_at,
                updated_at: row.updated_at,
            });
        }

        Ok(PagedResult::new(items, total.max(0) as u64, pagination))
    }

    async fn find_role(&self, id: &RoleId) -> AppResult<Option<RoleView>> {
        let timer = QueryTimer::new("roles", "find_by_id");
        let row = timer
            .observe(
                sqlx::query_as::<_, RoleRow>(
                    "SELECT id, name, priority, created_at, updated_at FROM roles WHERE id = $1",
                )
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await,
            )
            .map_err(map_sqlx_error)?;

        row.map(RoleRow::into_view).transpose()
    }

    async fn role_grants(&self, id: &RoleId) -> AppResult<Vec<RoleGrant>> {
        let sql = format!(
            "SELECT {} {} WHERE rp.role_id = $1 ORDER BY p.name, res.name",
            ROLE_GRANT_COLUMNS, ROLE_GRANT_JOINS
        );

        let timer = QueryTimer::new("role_permissions", "list_by_role");
        let rows = timer
            .observe(
                sqlx::query_as::<_, RoleGrantRow>(&sql)
                    .bind(id.0)
                    .fetch_all(&self.pool)
                    .await,
            )
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(RoleGrant::from).collect())
    }

    async fn role_users(&self, id: &RoleId) -> AppResult<Vec<RoleUser>> {
        let sql = format!(
            r#"
            SELECT ur.role_id, ur.user_id, ur.assigned_at, ur.assigned_by, ur.expires_at
            FROM user_roles ur
            WHERE ur.role_id = $1 AND {}
            ORDER BY ur.assigned_at DESC
            "#,
            ACTIVE_GRANT
        );

        let timer = QueryTimer::new("user_roles", "list_by_role");
        let rows = timer
            .observe(
                sqlx::query_as::<_, RoleUserRow>(&sql)
                    .bind(id.0)
                    .fetch_all(&self.pool)
                    .await,
            )
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(RoleUser::from).collect())
    }

    async fn user_roles(&self, user_id: &UserId) -> AppResult<Vec<UserRoleView>> {
        let sql = format!(
            r#"
            SELECT r.id AS role_id, r.name AS role_name, r.priority,
                   ur.assigned_at, ur.assigned_by, ur.expires_at
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1 AND {}
            ORDER BY r.priority ASC, r.name ASC
            "#,
            ACTIVE_GRANT
        );

        let timer = QueryTimer::new("user_roles", "list_by_user");
        let rows = timer
            .observe(
                sqlx::query_as::<_, UserRoleViewRow>(&sql)
                    .bind(user_id.0)
                    .fetch_all(&self.pool)
                    .await,
            )
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(UserRoleViewRow::into_view).collect()
    }

    async fn user_grants(&self, user_id: &UserId) -> AppResult<Vec<ActiveGrant>> {
        let sql = format!(
            r#"
            SELECT DISTINCT res.name AS resource, p.name AS action, ur.expires_at
            FROM user_roles ur
            JOIN role_permissions rp ON rp.role_id = ur.role_id
            JOIN resource_permissions b ON b.id = rp.resource_permission_id
            JOIN permissions p ON p.id = b.permission_id
            JOIN resources res ON res.id = b.resource_id
            WHERE ur.user_id = $1 AND {}
            "#,
            ACTIVE_GRANT
        );

        let timer = QueryTimer::new("user_roles", "grants_by_user");
        let rows = timer
            .observe(
                sqlx::query_as::<_, ActiveGrantRow>(&sql)
                    .bind(user_id.0)
                    .fetch_all(&self.pool)
                    .await,
            )
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ActiveGrant::from).collect())
    }

    async fn next_grant_expiry(&self) -> AppResult<Option<DateTime<Utc>>> {
        let timer = QueryTimer::new("user_roles", "next_expiry");
        timer
            .observe(
                sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
                    "SELECT MIN(expires_at) FROM user_roles WHERE expires_at > NOW()",
                )
                .fetch_one(&self.pool)
                .await,
            )
            .map_err(map_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("man"), "%man%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_role_predicates_shared_by_count() {
        let filter = RoleFilter {
            search: Some("admin".into()),
            priority_min: Some(1),
            priority_max: Some(50),
            has_users: Some(false),
        };
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM roles r");
        push_role_predicates(&mut count, &filter);
        let sql = count.sql();

        assert!(sql.contains("r.name ILIKE $1"));
        assert!(sql.contains("r.priority >= $2"));
        assert!(sql.contains("r.priority <= $3"));
        assert!(sql.contains("NOT EXISTS"));
        assert!(sql.contains("ur.expires_at > NOW()"));
    }

    #[test]
    fn test_permission_predicates() {
        let filter = PermissionFilter {
            search: None,
            resource_id: Some(ResourceId::new()),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM permissions p");
        push_permission_predicates(&mut qb, &filter);
        assert!(qb.sql().contains("f.resource_id = $1"));
        assert!(!qb.sql().contains("ILIKE"));
    }
}
