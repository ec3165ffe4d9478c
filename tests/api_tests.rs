//! End-to-end tests against Postgres. They run only when `TEST_DATABASE_URL`
//! points at a scratch database.

use actix_web::{http::StatusCode, test};
use chrono::{Duration, Utc};
use creatorbase::database::{
    models::{
        Action, AttendanceInput, AttendanceStatus, AuditAction, AuditLogFilter, ContentInput,
        ContentKind, ContentStatus, Module, Permission,
    },
    repositories::{AttendanceRepository, AuditLogRepository, ContentRepository, RoleRepository},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use serial_test::serial;
use uuid::Uuid;

mod common;

use common::{
    bearer, employee_body, init_app, seed_role, seed_user, skip_without_database, state_for,
};

/// Calls the app and returns the status with the decoded JSON body.
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let bytes = test::read_body(resp).await;
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }};
}

#[actix_web::test]
#[serial]
async fn test_register_login_and_me() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));

    let email = format!("{}@Creatorbase.Test", Uuid::new_v4().simple());
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "email": email,
            "password": common::TEST_PASSWORD,
            "name": "Grace Hopper",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["role"], "employee");
    assert_eq!(body["data"]["user"]["email"], email.to_lowercase());
    assert!(body["data"]["user"].get("passwordHash").is_none());

    // duplicate registration
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "email": email.to_lowercase(),
            "password": common::TEST_PASSWORD,
            "name": "Grace Again",
        }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CONFLICT
    );

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": email, "password": "wrong-password" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": email, "password": common::TEST_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    let user_id: Uuid = body["data"]["user"]["id"].as_str().unwrap().parse().unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["isSuperAdmin"], false);
    let modules: Vec<&str> = body["data"]["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["module"].as_str())
        .collect();
    assert!(modules.contains(&"leave"));
    assert!(!modules.contains(&"payroll"));

    // both the failed and the successful login were recorded
    let audit = AuditLogRepository::new(pool.clone());
    let failed = audit
        .count(&AuditLogFilter {
            action: Some(AuditAction::LoginFailed),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(failed >= 1);
    let logins = audit
        .count(&AuditLogFilter {
            user_id: Some(user_id),
            action: Some(AuditAction::Login),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(logins, 1);
}

#[actix_web::test]
#[serial]
async fn test_employee_role_is_denied_admin_modules() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (_, token) = seed_user(&pool, Some("employee")).await;

    for uri in [
        "/api/v1/employees",
        "/api/v1/payroll",
        "/api/v1/finance/transactions",
        "/api/v1/audit-logs",
        "/api/v1/analytics/overview",
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "GET {uri}");
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/projects")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
#[serial]
async fn test_user_without_role_has_no_access() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (_, token) = seed_user(&pool, None).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/projects")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    // the module catalogue only needs a valid session
    let req = test::TestRequest::get()
        .uri("/api/v1/roles/modules")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
#[serial]
async fn test_permission_override_revokes_module() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (admin, admin_token) = seed_user(&pool, Some("super_admin")).await;
    let (user, user_token) = seed_user(&pool, Some("employee")).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/users/{}/permissions", user.id))
        .insert_header(bearer(&admin_token))
        .set_json(json!({
            "permissions": [{ "module": "projects", "actions": [] }]
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/v1/projects")
        .insert_header(bearer(&user_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/users/{}/permissions", user.id))
        .insert_header(bearer(&admin_token))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["success"], true);

    let entries = AuditLogRepository::new(pool.clone())
        .list(
            &AuditLogFilter {
                entity_id: Some(user.id),
                action: Some(AuditAction::PermissionsChanged),
                ..Default::default()
            },
            10,
            0,
        )
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_id, Some(admin.id));
}

#[actix_web::test]
#[serial]
async fn test_audit_log_is_written_with_mutation_and_is_append_only() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (_, token) = seed_user(&pool, Some("admin")).await;

    let code = format!("EMP-{}", &Uuid::new_v4().simple().to_string()[..8]);
    let req = test::TestRequest::post()
        .uri("/api/v1/employees")
        .insert_header(bearer(&token))
        .insert_header(("User-Agent", "api-tests"))
        .set_json(json!({
            "employeeCode": code,
            "firstName": "Katherine",
            "lastName": "Johnson",
            "email": format!("{}@creatorbase.test", code.to_lowercase()),
            "dateOfJoining": "2026-01-05",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let employee_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/audit-logs?entityId={employee_id}"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["total"], 1);
    let entry = &body["data"]["items"][0];
    assert_eq!(entry["module"], Module::Employees.as_str());
    assert_eq!(entry["action"], "created");
    assert_eq!(entry["userAgent"], "api-tests");

    let entry_id: Uuid = entry["id"].as_str().unwrap().parse().unwrap();
    let update = sqlx::query("UPDATE audit_logs SET description = 'edited' WHERE id = $1")
        .bind(entry_id)
        .execute(&pool)
        .await;
    assert!(update.is_err());
    let delete = sqlx::query("DELETE FROM audit_logs WHERE id = $1")
        .bind(entry_id)
        .execute(&pool)
        .await;
    assert!(delete.is_err());
}

#[actix_web::test]
#[serial]
async fn test_leave_request_review_flow() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (hr, hr_token) = seed_user(&pool, Some("hr_manager")).await;
    let (worker, worker_token) = seed_user(&pool, Some("employee")).await;

    // employee records for both users
    for user in [&hr, &worker] {
        let code = format!("EMP-{}", &Uuid::new_v4().simple().to_string()[..8]);
        let req = test::TestRequest::post()
            .uri("/api/v1/employees")
            .insert_header(bearer(&hr_token))
            .set_json(json!({
                "userId": user.id,
                "employeeCode": code,
                "firstName": "Test",
                "lastName": "Person",
                "email": user.email,
                "dateOfJoining": "2025-06-01",
            }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );
    }

    let start = (Utc::now() + Duration::days(14)).date_naive();
    let end = start + Duration::days(2);
    let req = test::TestRequest::post()
        .uri("/api/v1/leaves")
        .insert_header(bearer(&worker_token))
        .set_json(json!({
            "leaveType": "annual",
            "startDate": start,
            "endDate": end,
            "reason": "Family trip",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let leave_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "pending");

    // the requester cannot approve their own leave
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/leaves/{leave_id}/approve"))
        .insert_header(bearer(&worker_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/leaves/{leave_id}/approve"))
        .insert_header(bearer(&hr_token))
        .set_json(json!({ "note": "Enjoy" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "approved");

    // reviewing twice is rejected
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/leaves/{leave_id}/reject"))
        .insert_header(bearer(&hr_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::get()
        .uri("/api/v1/leaves/me")
        .insert_header(bearer(&worker_token))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
#[serial]
async fn test_super_admin_role_cannot_be_deleted() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (_, token) = seed_user(&pool, Some("super_admin")).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/roles")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let super_admin_id = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|role| role["name"] == "super_admin")
        .and_then(|role| role["id"].as_str())
        .unwrap()
        .to_string();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/roles/{super_admin_id}"))
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[actix_web::test]
#[serial]
async fn test_system_role_keeps_its_name_but_permissions_are_editable() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (_, token) = seed_user(&pool, Some("super_admin")).await;

    let role = RoleRepository::new(pool.clone())
        .find_by_name("content_manager")
        .await
        .unwrap()
        .unwrap();
    let uri = format!("/api/v1/roles/{}", role.id);

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&token))
            .set_json(json!({
                "name": "content_lead",
                "permissions": role.permissions,
            }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&token))
            .set_json(json!({
                "name": "content_manager",
                "description": role.description,
                "permissions": role.permissions,
            }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "content_manager");
    assert_eq!(body["data"]["isSystem"], true);
}

#[actix_web::test]
#[serial]
async fn test_role_in_use_cannot_be_deleted() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (_, token) = seed_user(&pool, Some("super_admin")).await;

    let name = seed_role(&pool, vec![Permission::new(Module::Projects, &[Action::Read])]).await;
    let (holder, _) = seed_user(&pool, Some(name.as_str())).await;
    let role_id = holder.role_id.unwrap();

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/api/v1/roles/{role_id}"))
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::CONFLICT);

    let employee_role = RoleRepository::new(pool.clone())
        .find_by_name("employee")
        .await
        .unwrap()
        .unwrap();
    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/v1/users/{}/role", holder.id))
            .insert_header(bearer(&token))
            .set_json(json!({ "roleId": employee_role.id }))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/api/v1/roles/{role_id}"))
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
#[serial]
async fn test_role_update_applies_on_next_request() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (_, admin_token) = seed_user(&pool, Some("super_admin")).await;

    let name = seed_role(&pool, vec![Permission::new(Module::Projects, &[Action::Read])]).await;
    let (user, token) = seed_user(&pool, Some(name.as_str())).await;

    // first request loads the role into the cache
    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/projects")
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/v1/roles/{}", user.role_id.unwrap()))
            .insert_header(bearer(&admin_token))
            .set_json(json!({
                "name": name,
                "permissions": [{ "module": "tasks", "actions": ["read"] }],
            }))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/projects")
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/tasks")
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
#[serial]
async fn test_deactivated_user_is_forbidden() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (_, admin_token) = seed_user(&pool, Some("admin")).await;
    let (user, token) = seed_user(&pool, Some("employee")).await;

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/projects")
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/v1/users/{}", user.id))
            .insert_header(bearer(&admin_token))
            .set_json(json!({
                "name": user.name,
                "email": user.email,
                "isActive": false,
            }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isActive"], false);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/projects")
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
#[serial]
async fn test_paying_payroll_requires_approve_permission() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (_, admin_token) = seed_user(&pool, Some("admin")).await;
    let clerk_role = seed_role(
        &pool,
        vec![Permission::new(
            Module::Payroll,
            &[Action::Create, Action::Read, Action::Update],
        )],
    )
    .await;
    let (_, clerk_token) = seed_user(&pool, Some(clerk_role.as_str())).await;

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/employees")
            .insert_header(bearer(&admin_token))
            .set_json(employee_body(None))
    );
    assert_eq!(status, StatusCode::CREATED);
    let employee_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/payroll")
            .insert_header(bearer(&clerk_token))
            .set_json(json!({
                "employeeId": employee_id,
                "periodStart": "2026-09-01",
                "periodEnd": "2026-09-30",
                "basicSalary": "5000.00",
                "allowances": "250.00",
                "deductions": "400.00",
                "netSalary": "4850.00",
            }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "draft");
    let payroll_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();
    let status_uri = format!("/api/v1/payroll/{payroll_id}/status");

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&status_uri)
            .insert_header(bearer(&clerk_token))
            .set_json(json!({ "status": "processed" }))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&status_uri)
            .insert_header(bearer(&clerk_token))
            .set_json(json!({ "status": "paid" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&status_uri)
            .insert_header(bearer(&admin_token))
            .set_json(json!({ "status": "paid" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "paid");
    assert!(body["data"]["paidAt"].is_string());

    let approvals = AuditLogRepository::new(pool.clone())
        .count(&AuditLogFilter {
            entity_id: Some(payroll_id),
            action: Some(AuditAction::Approved),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(approvals, 1);
}

#[actix_web::test]
#[serial]
async fn test_publishing_content_requires_approve_permission() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (_, manager_token) = seed_user(&pool, Some("content_manager")).await;
    let editor_role = seed_role(
        &pool,
        vec![Permission::new(
            Module::Content,
            &[Action::Create, Action::Read, Action::Update],
        )],
    )
    .await;
    let (_, editor_token) = seed_user(&pool, Some(editor_role.as_str())).await;

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/content")
            .insert_header(bearer(&editor_token))
            .set_json(json!({
                "title": "Launch notes",
                "kind": "article",
                "body": "Everything that shipped this month.",
            }))
    );
    assert_eq!(status, StatusCode::CREATED);
    let content_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();
    let uri = format!("/api/v1/content/{content_id}");
    let status_uri = format!("{uri}/status");

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&status_uri)
            .insert_header(bearer(&editor_token))
            .set_json(json!({ "status": "review" }))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&status_uri)
            .insert_header(bearer(&editor_token))
            .set_json(json!({ "status": "published" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&status_uri)
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "status": "published" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["publishedAt"].is_string());

    // live content is frozen for editors without approve
    let edit = json!({ "title": "Launch notes (edited)", "kind": "article", "body": "Edited." });
    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&editor_token))
            .set_json(edit.clone())
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&manager_token))
            .set_json(edit)
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Launch notes (edited)");

    // an edit checked against a stale status does not land
    let mut tx = pool.begin().await.unwrap();
    let stale = ContentRepository::new(pool.clone())
        .update_content(
            &mut tx,
            content_id,
            ContentStatus::Draft,
            ContentInput {
                title: "Sneaky".to_string(),
                kind: ContentKind::Article,
                body: Some("Changed after publish".to_string()),
                url: None,
                tags: Vec::new(),
            },
        )
        .await
        .unwrap();
    tx.rollback().await.unwrap();
    assert!(stale.is_none());
}

#[actix_web::test]
#[serial]
async fn test_assignee_moves_own_task_until_done() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (_, manager_token) = seed_user(&pool, Some("project_manager")).await;
    let (assignee, assignee_token) = seed_user(&pool, Some("employee")).await;
    let (_, outsider_token) = seed_user(&pool, Some("employee")).await;

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/projects")
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "name": "Spring launch" }))
    );
    assert_eq!(status, StatusCode::CREATED);
    let project_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/tasks")
            .insert_header(bearer(&manager_token))
            .set_json(json!({
                "projectId": project_id,
                "title": "Record teaser",
                "assigneeId": assignee.id,
            }))
    );
    assert_eq!(status, StatusCode::CREATED);
    let status_uri = format!(
        "/api/v1/tasks/{}/status",
        body["data"]["id"].as_str().unwrap()
    );

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&status_uri)
            .insert_header(bearer(&outsider_token))
            .set_json(json!({ "status": "in_progress" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    for next in ["in_progress", "done"] {
        let (status, body) = send!(
            app,
            test::TestRequest::put()
                .uri(&status_uri)
                .insert_header(bearer(&assignee_token))
                .set_json(json!({ "status": next }))
        );
        assert_eq!(status, StatusCode::OK, "assignee moves task to {next}");
        assert_eq!(body["data"]["status"], next);
    }

    // reopening a finished task needs tasks:update
    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&status_uri)
            .insert_header(bearer(&assignee_token))
            .set_json(json!({ "status": "todo" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&status_uri)
            .insert_header(bearer(&manager_token))
            .set_json(json!({ "status": "todo" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "todo");
}

#[actix_web::test]
#[serial]
async fn test_approver_cannot_review_own_leave() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (hr, hr_token) = seed_user(&pool, Some("hr_manager")).await;
    let (_, other_hr_token) = seed_user(&pool, Some("hr_manager")).await;

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/employees")
            .insert_header(bearer(&hr_token))
            .set_json(employee_body(Some(hr.id)))
    );
    assert_eq!(status, StatusCode::CREATED);

    let start = (Utc::now() + Duration::days(30)).date_naive();
    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/leaves")
            .insert_header(bearer(&hr_token))
            .set_json(json!({
                "leaveType": "annual",
                "startDate": start,
                "endDate": start + Duration::days(1),
                "reason": "Conference",
            }))
    );
    assert_eq!(status, StatusCode::CREATED);
    let approve_uri = format!(
        "/api/v1/leaves/{}/approve",
        body["data"]["id"].as_str().unwrap()
    );

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&approve_uri)
            .insert_header(bearer(&hr_token))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Forbidden: You cannot review your own leave request"
    );

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&approve_uri)
            .insert_header(bearer(&other_hr_token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");
}

#[actix_web::test]
#[serial]
async fn test_check_out_closes_shift_started_yesterday() {
    common::setup_test_env();
    let pool = skip_without_database!();
    let app = init_app!(state_for(&pool));
    let (_, hr_token) = seed_user(&pool, Some("hr_manager")).await;
    let (worker, worker_token) = seed_user(&pool, Some("employee")).await;

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/employees")
            .insert_header(bearer(&hr_token))
            .set_json(employee_body(Some(worker.id)))
    );
    assert_eq!(status, StatusCode::CREATED);
    let employee_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/attendance/check-out")
            .insert_header(bearer(&worker_token))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // night shift checked in before midnight
    let check_in = Utc::now() - Duration::days(1);
    let mut tx = pool.begin().await.unwrap();
    let open = AttendanceRepository::new(pool.clone())
        .create_attendance(
            &mut tx,
            AttendanceInput {
                employee_id,
                date: check_in.date_naive(),
                check_in: Some(check_in),
                check_out: None,
                status: AttendanceStatus::Present,
                notes: None,
            },
        )
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/attendance/check-out")
            .insert_header(bearer(&worker_token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], open.id.to_string());
    assert!(body["data"]["checkOut"].is_string());

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/attendance/check-out")
            .insert_header(bearer(&worker_token))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
