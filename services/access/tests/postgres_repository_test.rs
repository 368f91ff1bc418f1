//! PostgreSQL 集成测试
//!
//! 需要 `DATABASE_URL` 指向可用的数据库：
//! `cargo test -p storefront-access --test postgres_repository_test -- --ignored`

use chrono::{Duration, Utc};
use sqlx::PgPool;
use storefront_access::api::{
    AssignPermissionsInput, CreateRoleInput, DeleteRoleInput, NameInput, PageInput,
    PermissionListFilters, PermissionResourcesInput, RoleListFilters, UserRoleInput,
};
use storefront_access::domain::rbac::{RbacQueryRepository, RoleId};
use storefront_access::infrastructure::persistence::PostgresRbacQueryRepository;
use storefront_access::{AccessActions, build_actions};
use storefront_common::UserId;
use storefront_config::CacheConfig;

// ============================================================
// 测试辅助函数
// ============================================================

fn setup(pool: &PgPool) -> AccessActions {
    build_actions(pool.clone(), &CacheConfig::default())
}

async fn seed(actions: &AccessActions) -> (String, String, RoleId) {
    let products = actions
        .create_resource(NameInput {
            name: "products".into(),
        })
        .await
        .unwrap()
        .into_data()
        .unwrap()
        .data
        .id
        .to_string();
    let read = actions
        .create_permission(NameInput {
            name: "read".into(),
        })
        .await
        .unwrap()
        .into_data()
        .unwrap()
        .permission
        .id
        .to_string();
    actions
        .assign_resources_to_permission(PermissionResourcesInput {
            permission_id: read.clone(),
            resource_ids: vec![products.clone()],
            assigned_by: None,
        })
        .await
        .unwrap();
    let manager = actions
        .create_role(CreateRoleInput {
            name: "Manager".into(),
            priority: 40,
        })
        .await
        .unwrap()
        .into_data()
        .unwrap()
        .role_id;
    actions
        .assign_permissions_to_role(AssignPermissionsInput {
            role_id: manager.to_string(),
            permission_ids: vec![read.clone()],
            resource_ids: None,
            assigned_by: None,
        })
        .await
        .unwrap();
    (products, read, manager)
}

// ============================================================
// 写入与鉴权
// ============================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_grant_flow_against_postgres(pool: PgPool) {
    let actions = setup(&pool);
    let (_, _, manager) = seed(&actions).await;

    let user = UserId::new();
    let assigned = actions
        .assign_role_to_user(UserRoleInput {
            user_id: user.to_string(),
            role_id: manager.to_string(),
            expires_at: None,
            assigned_by: None,
        })
        .await
        .unwrap();
    assert!(assigned.success);

    assert!(actions.has_permission(Some(&user), "read", "products").await);
    assert!(!actions.has_permission(Some(&user), "write", "products").await);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_duplicate_resource_maps_to_failure(pool: PgPool) {
    let actions = setup(&pool);
    seed(&actions).await;

    let duplicate = actions
        .create_resource(NameInput {
            name: "products".into(),
        })
        .await
        .unwrap();
    assert!(!duplicate.success);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_assign_twice_skips_existing(pool: PgPool) {
    let actions = setup(&pool);
    let (_, read, manager) = seed(&actions).await;

    let again = actions
        .assign_permissions_to_role(AssignPermissionsInput {
            role_id: manager.to_string(),
            permission_ids: vec![read],
            resource_ids: None,
            assigned_by: None,
        })
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(again.assigned_count, 0);
    assert_eq!(again.skipped_count, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_concurrent_identical_assignments_both_succeed(pool: PgPool) {
    let actions = setup(&pool);
    let (products, read, _) = seed(&actions).await;
    let editor = actions
        .create_role(CreateRoleInput {
            name: "Editor".into(),
            priority: 50,
        })
        .await
        .unwrap()
        .into_data()
        .unwrap()
        .role_id;

    let submit = || {
        actions.assign_permissions_to_role(AssignPermissionsInput {
            role_id: editor.to_string(),
            permission_ids: vec![read.clone()],
            resource_ids: Some(vec![products.clone()]),
            assigned_by: None,
        })
    };
    let (first, second) = tokio::join!(submit(), submit());
    let first = first.unwrap().into_data().unwrap();
    let second = second.unwrap().into_data().unwrap();
    assert_eq!(first.assigned_count + second.assigned_count, 1);
    assert_eq!(first.skipped_count + second.skipped_count, 1);

    let grants: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM role_permissions WHERE role_id = $1")
        .bind(editor.0)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(grants, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_delete_role_cascades(pool: PgPool) {
    let actions = setup(&pool);
    let (_, _, manager) = seed(&actions).await;
    actions
        .assign_role_to_user(UserRoleInput {
            user_id: UserId::new().to_string(),
            role_id: manager.to_string(),
            expires_at: Some(Utc::now() + Duration::days(1)),
            assigned_by: None,
        })
        .await
        .unwrap();

    let deleted = actions
        .delete_role(DeleteRoleInput {
            role_id: manager.to_string(),
            deleted_by: None,
        })
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(deleted.impact.users_affected, 1);
    assert_eq!(deleted.impact.permissions_removed, 1);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_roles")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

// ============================================================
// 读侧查询
// ============================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_listings_against_postgres(pool: PgPool) {
    let actions = setup(&pool);
    seed(&actions).await;

    let permissions = actions
        .get_all_permissions_paginated(PageInput {
            page: 1,
            limit: 10,
            search: Some("rea".into()),
            filters: PermissionListFilters::default(),
        })
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(permissions.pagination.total, 1);
    assert_eq!(permissions.permissions[0].resource_count, 1);
    assert_eq!(permissions.permissions[0].role_count, 1);

    let roles = actions
        .get_roles_paginated(PageInput {
            page: 1,
            limit: 10,
            search: None,
            filters: RoleListFilters::default(),
        })
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(roles.roles.len(), 1);
    assert_eq!(roles.roles[0].permission_count, 1);
    assert_eq!(roles.roles[0].sample_permissions.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_expired_grants_are_filtered(pool: PgPool) {
    let actions = setup(&pool);
    let (_, _, manager) = seed(&actions).await;
    let user = UserId::new();

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id, assigned_at, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(user.0)
    .bind(manager.0)
    .bind(Utc::now() - Duration::hours(2))
    .bind(Utc::now() - Duration::hours(1))
    .execute(&pool)
    .await
    .unwrap();

    let queries = PostgresRbacQueryRepository::new(pool.clone());
    assert!(queries.user_grants(&user).await.unwrap().is_empty());
    assert!(queries.user_roles(&user).await.unwrap().is_empty());
    assert_eq!(queries.next_grant_expiry().await.unwrap(), None);
    assert!(!actions.has_permission(Some(&user), "read", "products").await);
}
