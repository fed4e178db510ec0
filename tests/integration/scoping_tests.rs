//! Scoped execution tests
//!
//! Drives the tenancy primitives directly, the same seam background jobs
//! and migrations use: `run_scoped` around real data access, with no HTTP
//! involved.

use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use worklane_tenancy::db::Scoped;
use worklane_tenancy::models::{MemberRole, MembershipStatus, Project, Task};
use worklane_tenancy::tenancy::{
    run_scoped, spawn_scoped, MembershipValidator, TenantContext, TenantResolver,
};
use worklane_tenancy::utils::AppError;
use worklane_tenancy::db::TenantDirectory;

use crate::common::{seed_org, seed_tenant, TestApp};

#[tokio::test]
async fn test_interleaved_units_of_work_stay_isolated() {
    let app = TestApp::new().await;
    let alpha = seed_tenant(&app, "alpha").await;
    let beta = seed_tenant(&app, "beta").await;

    // Two units of work interleave at await points on the same executor:
    // create, suspend, then read back "my own records".
    let unit = |org: worklane_tenancy::models::Organization, name: &'static str| {
        let db = app.state.db.clone();
        run_scoped(TenantContext::new(org), async move {
            let repo = Scoped::<Project>::new(&db);
            let created = repo.create(Project::new(name, None)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            let mine = repo.find_all().await.unwrap();
            (created, mine)
        })
    };

    let ((created_a, mine_a), (created_b, mine_b)) = tokio::join!(
        unit(alpha.org.clone(), "alpha project"),
        unit(beta.org.clone(), "beta project"),
    );

    assert_eq!(created_a.organization_id, alpha.org.id);
    assert_eq!(created_b.organization_id, beta.org.id);

    assert_eq!(mine_a.len(), 1);
    assert_eq!(mine_a[0].name, "alpha project");
    assert_eq!(mine_b.len(), 1);
    assert_eq!(mine_b[0].name, "beta project");
}

#[tokio::test]
async fn test_data_access_outside_scope_fails_closed() {
    let app = TestApp::new().await;
    let alpha = seed_tenant(&app, "alpha").await;

    // Unit of work 1 completes normally.
    run_scoped(TenantContext::new(alpha.org.clone()), async {
        Scoped::<Project>::new(&app.state.db)
            .create(Project::new("scoped work", None))
            .await
            .unwrap();
    })
    .await;

    // Unit of work 2 runs on the same executor with no explicit scoping and
    // must not inherit anything.
    let result = Scoped::<Project>::new(&app.state.db).find_all().await;
    assert!(matches!(result, Err(AppError::NoTenantContext)));
}

#[tokio::test]
async fn test_resolver_fails_closed_on_status() {
    use worklane_tenancy::models::OrgStatus;

    let app = TestApp::new().await;
    let suspended = seed_org(&app, "frozen").await;
    let cancelled = seed_org(&app, "gone").await;

    let directory = TenantDirectory::new(&app.state.db);
    directory
        .set_status(suspended.id, OrgStatus::Suspended)
        .await
        .unwrap();
    directory
        .set_status(cancelled.id, OrgStatus::Cancelled)
        .await
        .unwrap();

    let resolver = TenantResolver::new(&app.state.db);

    assert!(matches!(
        resolver.resolve("nonexistent").await,
        Err(AppError::TenantNotFound(_))
    ));
    assert!(matches!(
        resolver.resolve("frozen").await,
        Err(AppError::TenantSuspended)
    ));
    assert!(matches!(
        resolver.resolve("gone").await,
        Err(AppError::TenantCancelled)
    ));

    // The explicit-id path used by background jobs applies the same checks.
    assert!(matches!(
        resolver.resolve_id(suspended.id).await,
        Err(AppError::TenantSuspended)
    ));
    assert!(matches!(
        resolver.resolve_id(Uuid::new_v4()).await,
        Err(AppError::TenantNotFound(_))
    ));
}

#[tokio::test]
async fn test_resolver_returns_active_snapshot() {
    let app = TestApp::new().await;
    let org = seed_org(&app, "alpha").await;

    let resolver = TenantResolver::new(&app.state.db);
    let resolved = resolver.resolve("alpha").await.unwrap();
    assert_eq!(resolved.id, org.id);
    assert_eq!(resolved.slug, "alpha");

    let by_id = resolver.resolve_id(org.id).await.unwrap();
    assert_eq!(by_id.slug, "alpha");
}

#[tokio::test]
async fn test_membership_validation_matrix() {
    let app = TestApp::new().await;
    let org = seed_org(&app, "alpha").await;
    let directory = TenantDirectory::new(&app.state.db);
    let validator = MembershipValidator::new(&app.state.db);

    let active = Uuid::new_v4();
    let invited = Uuid::new_v4();
    let suspended = Uuid::new_v4();

    directory
        .add_member(org.id, active, MemberRole::Admin, MembershipStatus::Active)
        .await
        .unwrap();
    directory
        .add_member(org.id, invited, MemberRole::Member, MembershipStatus::Invited)
        .await
        .unwrap();
    directory
        .add_member(
            org.id,
            suspended,
            MemberRole::Member,
            MembershipStatus::Suspended,
        )
        .await
        .unwrap();

    assert_eq!(
        validator.validate(active, org.id).await.unwrap(),
        MemberRole::Admin
    );
    assert!(matches!(
        validator.validate(invited, org.id).await,
        Err(AppError::AccessDenied(_))
    ));
    assert!(matches!(
        validator.validate(suspended, org.id).await,
        Err(AppError::AccessDenied(_))
    ));
    assert!(matches!(
        validator.validate(Uuid::new_v4(), org.id).await,
        Err(AppError::AccessDenied(_))
    ));
}

#[tokio::test]
async fn test_spawned_work_inherits_the_unit_of_work_scope() {
    let app = TestApp::new().await;
    let alpha = seed_tenant(&app, "alpha").await;

    let db = app.state.db.clone();
    let handle = run_scoped(TenantContext::new(alpha.org.clone()), async move {
        spawn_scoped(async move {
            Scoped::<Project>::new(&db)
                .create(Project::new("from spawned task", None))
                .await
                .unwrap()
        })
        .unwrap()
    })
    .await;

    let created = handle.await.unwrap();
    assert_eq!(created.organization_id, alpha.org.id);
}

#[tokio::test]
async fn test_organization_deletion_cascades_to_all_dependent_rows() {
    let app = TestApp::new().await;
    let alpha = seed_tenant(&app, "alpha").await;
    let beta = seed_tenant(&app, "beta").await;

    let db = app.state.db.clone();
    run_scoped(TenantContext::new(alpha.org.clone()), async {
        let repo = Scoped::<Project>::new(&db);
        let project = repo.create(Project::new("doomed", None)).await.unwrap();
        Scoped::<Task>::new(&db)
            .create(Task::new(project.id, "doomed task"))
            .await
            .unwrap();
    })
    .await;
    run_scoped(TenantContext::new(beta.org.clone()), async {
        Scoped::<Project>::new(&db)
            .create(Project::new("survivor", None))
            .await
            .unwrap();
    })
    .await;

    let directory = TenantDirectory::new(&app.state.db);
    directory.delete_organization(alpha.org.id).await.unwrap();

    assert!(directory.find_by_id(alpha.org.id).await.unwrap().is_none());
    assert!(directory
        .find_membership(alpha.owner_id, alpha.org.id)
        .await
        .unwrap()
        .is_none());

    // Foreign keys cascade the deletion through every dependent table,
    // which also proves the pragma is in force on pooled connections.
    for table in ["memberships", "projects", "tasks"] {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE organization_id = ?",
            table
        );
        let remaining: i64 = sqlx::query_scalar(&sql)
            .bind(alpha.org.id.to_string())
            .fetch_one(&app.state.db)
            .await
            .unwrap();
        assert_eq!(remaining, 0, "{} rows should be gone", table);
    }

    // The sibling organization is untouched.
    let survivors: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE organization_id = ?")
            .bind(beta.org.id.to_string())
            .fetch_one(&app.state.db)
            .await
            .unwrap();
    assert_eq!(survivors, 1);
}

#[tokio::test]
async fn test_mutation_broadcasts_stay_inside_the_organization() {
    let app = TestApp::new().await;
    let alpha = seed_tenant(&app, "alpha").await;
    let beta = seed_tenant(&app, "beta").await;

    let origin = Uuid::new_v4();
    let mut origin_sub = app.state.broadcast.register_in(alpha.org.id, origin);
    let mut alpha_sub = app.state.broadcast.register_in(alpha.org.id, Uuid::new_v4());
    let mut beta_sub = app.state.broadcast.register_in(beta.org.id, Uuid::new_v4());

    // A mutation through the API publishes under the ambient organization,
    // excluding the originating connection.
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/projects")
        .header("Host", alpha.host())
        .header("Authorization", format!("Bearer {}", alpha.token))
        .header("X-Connection-Id", origin.to_string())
        .header("Content-Type", "application/json")
        .body(axum::body::Body::from(json!({ "name": "Live" }).to_string()))
        .unwrap();
    app.request(request).await.assert_created();

    let event = tokio::time::timeout(Duration::from_millis(200), alpha_sub.recv())
        .await
        .expect("sibling connection in alpha should receive")
        .unwrap();
    assert_eq!(event.event, "project.created");
    assert_eq!(event.organization_id, alpha.org.id);

    // Neither the originator nor the other organization hears anything.
    assert!(
        tokio::time::timeout(Duration::from_millis(50), origin_sub.recv())
            .await
            .is_err()
    );
    assert!(
        tokio::time::timeout(Duration::from_millis(50), beta_sub.recv())
            .await
            .is_err()
    );
}
