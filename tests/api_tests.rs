//! API integration tests

use async_trait::async_trait;
use axum::{body::Body, Router};
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use leavedesk::audit::AuditSink;
use leavedesk::error::{AppError, Result};
use leavedesk::models::{AuditAction, AuditEvent, LeaveStatus, TransitionEvent};
use leavedesk::notify::NotificationDispatcher;
use leavedesk::{create_router, db, AppState};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

#[derive(Default)]
struct RecordingAudit {
    events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, event: AuditEvent) {
        self.events.lock().await.push(event);
    }
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<TransitionEvent>>,
    fail: bool,
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn dispatch(&self, event: &TransitionEvent) -> Result<()> {
        self.events.lock().await.push(event.clone());
        if self.fail {
            return Err(AppError::Notification("relay unavailable".to_string()));
        }
        Ok(())
    }
}

struct TestApp {
    app: Router,
    pool: SqlitePool,
    audit: Arc<RecordingAudit>,
    notifier: Arc<RecordingNotifier>,
    manager: i64,
    employee: i64,
    delegate: i64,
    hr: i64,
    outsider: i64,
    request: i64,
}

async fn insert_user(pool: &SqlitePool, name: &str, manager_id: Option<i64>, is_hr: bool) -> i64 {
    sqlx::query(
        "INSERT INTO users (firstname, lastname, email, manager_id, is_hr) VALUES (?, 'Test', ?, ?, ?)",
    )
    .bind(name)
    .bind(format!("{}@example.com", name.to_lowercase()))
    .bind(manager_id)
    .bind(is_hr)
    .execute(pool)
    .await
    .expect("Failed to insert user")
    .last_insert_rowid()
}

async fn insert_leave(pool: &SqlitePool, employee_id: i64, status: i64, start: &str) -> i64 {
    sqlx::query(
        "INSERT INTO leaves (employee_id, status, start_date, end_date, duration, leave_type) VALUES (?, ?, ?, ?, 1, 'paid leave')",
    )
    .bind(employee_id)
    .bind(status)
    .bind(start)
    .bind(start)
    .execute(pool)
    .await
    .expect("Failed to insert leave")
    .last_insert_rowid()
}

async fn setup_app_with(notifier: RecordingNotifier) -> TestApp {
    let pool = db::init_pool("sqlite::memory:", 1)
        .await
        .expect("Failed to create in-memory database");
    db::run_migrations(&pool).await.expect("Failed to migrate");

    let manager = insert_user(&pool, "Maria", None, false).await;
    let employee = insert_user(&pool, "Erik", Some(manager), false).await;
    let delegate = insert_user(&pool, "Dora", None, false).await;
    let hr = insert_user(&pool, "Hanna", None, true).await;
    let outsider = insert_user(&pool, "Xavier", None, false).await;
    let request = insert_leave(&pool, employee, 2, "2024-07-01").await;

    sqlx::query("INSERT INTO delegations (manager_id, delegate_id) VALUES (?, ?)")
        .bind(manager)
        .bind(delegate)
        .execute(&pool)
        .await
        .unwrap();

    let audit = Arc::new(RecordingAudit::default());
    let notifier = Arc::new(notifier);
    let state = AppState::with_collaborators(pool.clone(), audit.clone(), notifier.clone());

    TestApp {
        app: create_router(state),
        pool,
        audit,
        notifier,
        manager,
        employee,
        delegate,
        hr,
        outsider,
        request,
    }
}

async fn setup_app() -> TestApp {
    setup_app_with(RecordingNotifier::default()).await
}

fn post(uri: &str, actor: i64) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-actor-id", actor.to_string())
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str, actor: i64) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-actor-id", actor.to_string())
        .body(Body::empty())
        .unwrap()
}

fn form(uri: &str, actor: i64, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-actor-id", actor.to_string())
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

async fn body_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn status_of(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, body_string(response.into_body()).await)
}

#[tokio::test]
async fn test_health_endpoint() {
    let t = setup_app().await;
    let response = t
        .app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "ok");
}

#[tokio::test]
async fn test_delegate_accepts_request() {
    let t = setup_app().await;

    let (status, body) = status_of(
        &t.app,
        post(&format!("/requests/{}/accept", t.request), t.delegate),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let event: TransitionEvent = serde_json::from_str(&body).unwrap();
    assert_eq!(event.request_id, t.request);
    assert_eq!(event.status, LeaveStatus::Accepted);
    assert_eq!(event.actor_id, t.delegate);

    let dispatched = t.notifier.events.lock().await;
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].actor_id, t.delegate);

    let status: i64 = sqlx::query_scalar("SELECT status FROM leaves WHERE id = ?")
        .bind(t.request)
        .fetch_one(&t.pool)
        .await
        .unwrap();
    assert_eq!(status, 3);
}

#[tokio::test]
async fn test_second_accept_is_conflict() {
    let t = setup_app().await;
    let uri = format!("/requests/{}/accept", t.request);

    let (first, _) = status_of(&t.app, post(&uri, t.delegate)).await;
    assert_eq!(first, StatusCode::OK);

    let (second, _) = status_of(&t.app, post(&uri, t.delegate)).await;
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(t.notifier.events.lock().await.len(), 1);
}

#[tokio::test]
async fn test_outsider_reject_is_forbidden_and_audited() {
    let t = setup_app().await;

    let (status, _) = status_of(
        &t.app,
        post(&format!("/requests/{}/reject", t.request), t.outsider),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let audit = t.audit.events.lock().await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].actor_id, t.outsider);
    assert_eq!(audit[0].target_id, t.request);
    assert_eq!(audit[0].action, AuditAction::Reject);
    assert!(t.notifier.events.lock().await.is_empty());
}

#[tokio::test]
async fn test_hr_rejects_request() {
    let t = setup_app().await;
    let (status, body) = status_of(
        &t.app,
        post(&format!("/requests/{}/reject", t.request), t.hr),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let event: TransitionEvent = serde_json::from_str(&body).unwrap();
    assert_eq!(event.status, LeaveStatus::Rejected);
}

#[tokio::test]
async fn test_missing_request_is_not_found() {
    let t = setup_app().await;
    let (status, _) = status_of(&t.app, post("/requests/9999/accept", t.manager)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_actor_is_unauthorized() {
    let t = setup_app().await;
    let response = t
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/requests/{}/accept", t.request))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_notification_failure_keeps_transition() {
    let t = setup_app_with(RecordingNotifier {
        fail: true,
        ..Default::default()
    })
    .await;

    let (status, _) = status_of(
        &t.app,
        post(&format!("/requests/{}/accept", t.request), t.manager),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t.notifier.events.lock().await.len(), 1);
}

#[tokio::test]
async fn test_list_requests_includes_delegated_teams() {
    let t = setup_app().await;
    let decided = insert_leave(&t.pool, t.employee, 3, "2024-05-01").await;

    // Dora's own collaborator
    let own = insert_user(&t.pool, "Otto", Some(t.delegate), false).await;
    let own_request = insert_leave(&t.pool, own, 2, "2024-09-01").await;

    let (status, body) = status_of(&t.app, get("/requests", t.delegate)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let ids: Vec<i64> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![own_request, t.request]);

    let (_, body) = status_of(&t.app, get("/requests?filter=all", t.delegate)).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let ids: Vec<i64> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![own_request, t.request, decided]);

    let (_, body) = status_of(&t.app, get("/requests", t.outsider)).await;
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn test_list_collaborators() {
    let t = setup_app().await;
    let (status, body) = status_of(&t.app, get("/collaborators", t.manager)).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], t.employee);
}

#[tokio::test]
async fn test_add_delegation_is_idempotent() {
    let t = setup_app().await;
    let body = format!("manager_id={}&delegate_id={}", t.manager, t.outsider);

    let (status, first) = status_of(&t.app, form("/delegations", t.manager, body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = status_of(&t.app, form("/delegations", t.manager, body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
    assert!(first.parse::<i64>().is_ok());

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM delegations WHERE manager_id = ? AND delegate_id = ?",
    )
    .bind(t.manager)
    .bind(t.outsider)
    .fetch_one(&t.pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_add_delegation_by_hr() {
    let t = setup_app().await;
    let body = format!("manager_id={}&delegate_id={}", t.manager, t.outsider);
    let (status, _) = status_of(&t.app, form("/delegations", t.hr, body)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_add_delegation_missing_field() {
    let t = setup_app().await;
    let body = format!("manager_id={}", t.manager);
    let (status, _) = status_of(&t.app, form("/delegations", t.manager, body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_add_self_delegation() {
    let t = setup_app().await;
    let body = format!("manager_id={}&delegate_id={}", t.manager, t.manager);
    let (status, _) = status_of(&t.app, form("/delegations", t.manager, body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_add_delegation_unknown_delegate() {
    let t = setup_app().await;
    let body = format!("manager_id={}&delegate_id=9999", t.manager);
    let (status, message) = status_of(&t.app, form("/delegations", t.manager, body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(message.contains("9999"));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM delegations")
        .fetch_one(&t.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_delegate_cannot_add_delegation_for_manager() {
    let t = setup_app().await;
    let body = format!("manager_id={}&delegate_id={}", t.manager, t.outsider);
    let (status, _) = status_of(&t.app, form("/delegations", t.delegate, body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let audit = t.audit.events.lock().await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::AddDelegation);
    assert_eq!(audit[0].target_id, t.manager);
}

#[tokio::test]
async fn test_delete_delegation() {
    let t = setup_app().await;
    let id: i64 = sqlx::query_scalar("SELECT id FROM delegations WHERE manager_id = ?")
        .bind(t.manager)
        .fetch_one(&t.pool)
        .await
        .unwrap();
    let body = format!("manager_id={}&delegation_id={}", t.manager, id);

    let (status, removed) =
        status_of(&t.app, form("/delegations/delete", t.manager, body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed, id.to_string());

    let (status, again) = status_of(&t.app, form("/delegations/delete", t.manager, body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, "null");

    // The former delegate has lost approval rights
    let (status, _) = status_of(
        &t.app,
        post(&format!("/requests/{}/accept", t.request), t.delegate),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_delegation_of_other_manager_is_noop() {
    let t = setup_app().await;
    let id: i64 = sqlx::query_scalar("SELECT id FROM delegations WHERE manager_id = ?")
        .bind(t.manager)
        .fetch_one(&t.pool)
        .await
        .unwrap();

    // Outsider manages their own delegations but names Maria's row
    let body = format!("manager_id={}&delegation_id={}", t.outsider, id);
    let (status, removed) = status_of(&t.app, form("/delegations/delete", t.outsider, body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed, "null");

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM delegations")
        .fetch_one(&t.pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}

#[tokio::test]
async fn test_delete_delegation_forbidden_and_missing_field() {
    let t = setup_app().await;
    let body = format!("manager_id={}&delegation_id=1", t.manager);
    let (status, _) = status_of(&t.app, form("/delegations/delete", t.outsider, body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let body = format!("manager_id={}", t.manager);
    let (status, _) = status_of(&t.app, form("/delegations/delete", t.manager, body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_delegations() {
    let t = setup_app().await;
    let (status, body) = status_of(&t.app, get(&format!("/delegations/{}", t.manager), t.manager)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["delegate_id"], t.delegate);

    let (status, _) = status_of(&t.app, get(&format!("/delegations/{}", t.manager), t.outsider)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_leave_on_behalf() {
    let t = setup_app().await;
    let body = serde_json::json!({
        "start_date": "2024-10-07",
        "end_date": "2024-10-08",
        "start_date_type": "Morning",
        "end_date_type": "Afternoon",
        "duration": 2.0,
        "leave_type": "paid leave",
        "cause": null,
        "status": "accepted"
    });
    let request = |actor: i64| {
        Request::builder()
            .method("POST")
            .uri(format!("/collaborators/{}/leaves", t.employee))
            .header("x-actor-id", actor.to_string())
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let (status, created) = status_of(&t.app, request(t.manager)).await;
    assert_eq!(status, StatusCode::CREATED);
    let json: serde_json::Value = serde_json::from_str(&created).unwrap();
    assert_eq!(json["employee_id"], t.employee);
    assert_eq!(json["status"], "accepted");

    // Delegation grants approval, not leave creation
    let (status, _) = status_of(&t.app, request(t.delegate)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        t.audit.events.lock().await[0].action,
        AuditAction::CreateLeave
    );
    assert!(t.notifier.events.lock().await.is_empty());
}
