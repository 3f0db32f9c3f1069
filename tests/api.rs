use axum::http::StatusCode;
use axum::body::Body;
use http_body_util::BodyExt;
use tower::ServiceExt;
use serde_json::{json, Value};
use cyberhunt::db::Database;
use cyberhunt::api::{build_router, AppState};
use cyberhunt::workflow::{EventBus, WorkflowService, WorkflowSettings};

fn create_test_state() -> AppState {
    create_state_with_token(None)
}

fn create_state_with_token(token: Option<&str>) -> AppState {
    let db = Database::in_memory().unwrap();
    let workflow = WorkflowService::new(db, EventBus::new(64), WorkflowSettings::default());
    AppState::new(workflow, token.map(str::to_string))
}

fn app(state: &AppState) -> axum::Router {
    build_router(state.clone())
}

fn make_request(method: &str, uri: &str, body: Option<Value>) -> axum::http::Request<Body> {
    let builder = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-actor-id", "admin-1");

    match body {
        Some(b) => builder.body(Body::from(serde_json::to_string(&b).unwrap())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_json(response: axum::http::Response<Body>) -> Value {
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        panic!("Empty response body. Status: {}, Headers: {:?}", parts.status, parts.headers);
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("JSON parse error: {}. Body: {:?}", e, String::from_utf8_lossy(&bytes)))
}

async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let response = app(state).oneshot(make_request(method, uri, body)).await.unwrap();
    let status = response.status();
    (status, response_json(response).await)
}

fn submission(id: &str) -> Value {
    json!({
        "id": id,
        "title": "IDOR on invoice download",
        "description": "Invoices of other tenants are readable",
        "type": "idor",
        "severity": "high",
        "programId": "prog-1",
        "reporterId": "researcher-7"
    })
}

async fn create_review(state: &AppState, submission_id: &str) -> String {
    let (status, body) = send(state, "POST", "/api/reviews", Some(json!({
        "submission": submission(submission_id)
    }))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

async fn create_reviewer(state: &AppState, user: &str, max: u32) -> String {
    let (status, body) = send(state, "POST", "/api/reviewers", Some(json!({
        "userId": user,
        "username": user,
        "specializations": ["idor"],
        "maxAssignments": max
    }))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = create_test_state();
    let req = make_request("GET", "/api/health", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "cyberhunt");
}

#[tokio::test]
async fn test_create_and_get_review() {
    let state = create_test_state();
    let id = create_review(&state, "sub-1").await;

    let (status, body) = send(&state, "GET", &format!("/api/reviews/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["priority"], "high");
    assert_eq!(body["submissionId"], "sub-1");
    assert_eq!(body["audience"], "moderation");
    assert!(body["decision"].is_null());
}

#[tokio::test]
async fn test_get_review_not_found() {
    let state = create_test_state();
    let (status, body) = send(&state, "GET", "/api/reviews/nonexistent-id", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NotFoundError");
    assert!(body["error"].as_str().unwrap().contains("nonexistent-id"));
}

#[tokio::test]
async fn test_duplicate_review_conflict() {
    let state = create_test_state();
    create_review(&state, "sub-1").await;
    let (status, body) = send(&state, "POST", "/api/reviews", Some(json!({
        "submission": submission("sub-1")
    }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DuplicateReviewError");
}

#[tokio::test]
async fn test_unknown_fields_rejected() {
    let state = create_test_state();
    let id = create_review(&state, "sub-1").await;
    let (status, body) = send(&state, "PATCH", &format!("/api/reviews/{}", id), Some(json!({
        "priority": "low",
        "sneaky": true
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ValidationError");
}

#[tokio::test]
async fn test_missing_actor_header() {
    let state = create_test_state();
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/reviews")
        .header("content-type", "application/json")
        .body(Body::from(json!({"submission": submission("sub-1")}).to_string()))
        .unwrap();
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_full_review_lifecycle() {
    let state = create_test_state();
    let reviewer_id = create_reviewer(&state, "analyst-1", 2).await;
    let review_id = create_review(&state, "sub-1").await;
    let mut events = state.workflow.events().subscribe();

    let (status, body) = send(&state, "POST", &format!("/api/reviews/{}/assign", review_id), Some(json!({
        "reviewerId": reviewer_id
    }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "assigned");
    assert_eq!(body["assignedBy"], "admin-1");

    let (status, body) = send(&state, "PATCH", &format!("/api/reviews/{}", review_id), Some(json!({
        "status": "in_review"
    }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["reviewStarted"].is_string());

    let (status, body) = send(&state, "POST", &format!("/api/reviews/{}/finalize", review_id), Some(json!({
        "decision": "accept",
        "decisionReason": "Confirmed cross-tenant access",
        "actualReward": 5000
    }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "approved");
    assert_eq!(body["decision"], "accept");
    assert_eq!(body["actualReward"], 5000);

    let mut rewards = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let cyberhunt::workflow::WorkflowEvent::RewardIssued { amount, .. } = event {
            rewards.push(amount);
        }
    }
    assert_eq!(rewards, vec![5000]);

    let (status, body) = send(&state, "GET", &format!("/api/reviewers/{}", reviewer_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentAssignments"], 0);

    let (status, body) = send(&state, "GET", &format!("/api/reviews/{}/audit", review_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["created", "assigned", "updated", "finalized"]);
}

#[tokio::test]
async fn test_patch_pending_to_approved_is_conflict() {
    let state = create_test_state();
    let id = create_review(&state, "sub-1").await;
    let (status, body) = send(&state, "PATCH", &format!("/api/reviews/{}", id), Some(json!({
        "status": "approved",
        "decision": "accept",
        "decisionReason": "looks fine",
        "actualReward": 100
    }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "InvalidTransitionError");
}

#[tokio::test]
async fn test_finalize_accept_without_reward_is_unprocessable() {
    let state = create_test_state();
    let reviewer_id = create_reviewer(&state, "analyst-1", 2).await;
    let id = create_review(&state, "sub-1").await;
    send(&state, "POST", &format!("/api/reviews/{}/assign", id), Some(json!({"reviewerId": reviewer_id}))).await;
    send(&state, "PATCH", &format!("/api/reviews/{}", id), Some(json!({"status": "in_review"}))).await;

    let (status, body) = send(&state, "POST", &format!("/api/reviews/{}/finalize", id), Some(json!({
        "decision": "accept",
        "decisionReason": "valid"
    }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "InvariantViolationError");
}

#[tokio::test]
async fn test_capacity_exceeded_then_unassign() {
    let state = create_test_state();
    let reviewer_id = create_reviewer(&state, "analyst-1", 2).await;
    let first = create_review(&state, "sub-1").await;
    let second = create_review(&state, "sub-2").await;
    let third = create_review(&state, "sub-3").await;

    for id in [&first, &second] {
        let (status, _) = send(&state, "POST", &format!("/api/reviews/{}/assign", id), Some(json!({"reviewerId": reviewer_id}))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&state, "POST", &format!("/api/reviews/{}/assign", third), Some(json!({"reviewerId": reviewer_id}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CapacityExceededError");

    let (status, body) = send(&state, "POST", &format!("/api/reviews/{}/unassign", first), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert!(body["reviewerId"].is_null());

    let (status, _) = send(&state, "POST", &format!("/api/reviews/{}/assign", third), Some(json!({"reviewerId": reviewer_id}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_auto_assign_endpoint() {
    let state = create_test_state();
    let reviewer_id = create_reviewer(&state, "analyst-1", 3).await;
    let id = create_review(&state, "sub-1").await;

    let (status, body) = send(&state, "POST", &format!("/api/reviews/{}/auto-assign", id), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["reviewerId"], reviewer_id);
}

#[tokio::test]
async fn test_comments_flow() {
    let state = create_test_state();
    let id = create_review(&state, "sub-1").await;

    let (status, internal) = send(&state, "POST", &format!("/api/reviews/{}/comments", id), Some(json!({
        "content": "  Reproduced on staging  ",
        "commentType": "internal",
        "mentions": ["analyst-2"]
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(internal["content"], "Reproduced on staging");

    let (status, _) = send(&state, "POST", &format!("/api/reviews/{}/comments", id), Some(json!({
        "content": "Thanks, we are looking into it",
        "commentType": "public"
    }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, all) = send(&state, "GET", &format!("/api/reviews/{}/comments", id), None).await;
    assert_eq!(all["total"], 2);
    assert_eq!(all["comments"][0]["content"], "Reproduced on staging");

    let (_, public) = send(&state, "GET", &format!("/api/reviews/{}/comments?includeInternal=false", id), None).await;
    assert_eq!(public["total"], 1);

    let comment_id = internal["id"].as_str().unwrap();
    let (status, body) = send(&state, "POST", &format!("/api/comments/{}/resolve", comment_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isResolved"], true);
    assert_eq!(body["resolvedBy"], "admin-1");

    let (status, body) = send(&state, "POST", &format!("/api/comments/{}/resolve", comment_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "AlreadyResolvedError");

    let (status, _) = send(&state, "POST", &format!("/api/reviews/{}/comments", id), Some(json!({
        "content": "   "
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_reviews_with_filters() {
    let state = create_test_state();
    create_review(&state, "sub-1").await;
    create_review(&state, "sub-2").await;

    let (status, body) = send(&state, "GET", "/api/reviews?status=pending&limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reviews"].as_array().unwrap().len(), 1);
    assert_eq!(body["total"], 2);
    assert_eq!(body["limit"], 1);

    let (status, body) = send(&state, "GET", "/api/reviews?limit=18446744073709551615", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reviews"].as_array().unwrap().len(), 2);
    assert_eq!(body["limit"], 500);

    let (_, body) = send(&state, "GET", "/api/reviews?search=INVOICE", None).await;
    assert_eq!(body["total"], 2);

    let (status, body) = send(&state, "GET", "/api/reviews?status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ValidationError");
}

#[tokio::test]
async fn test_stats_endpoint() {
    let state = create_test_state();
    create_review(&state, "sub-1").await;

    let (status, body) = send(&state, "GET", "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reviews"]["total"], 1);
    assert_eq!(body["reviews"]["byStatus"]["pending"], 1);
    assert_eq!(body["eventsPublished"]["reviewCreated"], 1);
}

#[tokio::test]
async fn test_reviewer_management() {
    let state = create_test_state();
    let reviewer_id = create_reviewer(&state, "analyst-1", 2).await;
    let review_id = create_review(&state, "sub-1").await;
    send(&state, "POST", &format!("/api/reviews/{}/assign", review_id), Some(json!({"reviewerId": reviewer_id}))).await;

    let (status, body) = send(&state, "PATCH", &format!("/api/reviewers/{}", reviewer_id), Some(json!({
        "maxAssignments": 0
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = send(&state, "POST", &format!("/api/reviewers/{}/deactivate", reviewer_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isActive"], false);
    assert_eq!(body["currentAssignments"], 0);

    let (_, review) = send(&state, "GET", &format!("/api/reviews/{}", review_id), None).await;
    assert_eq!(review["status"], "pending");

    let (_, list) = send(&state, "GET", "/api/reviewers?activeOnly=true", None).await;
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn test_triage_intake_flow() {
    let state = create_test_state();
    let (status, service) = send(&state, "POST", "/api/services", Some(json!({
        "companyId": "acme",
        "serviceName": "Managed triage",
        "serviceType": "managed_triage",
        "pricingModel": "per_report",
        "pricePerReport": 2500,
        "triageLevel": "premium",
        "maxReportsPerMonth": 1,
        "responseTimeHours": 24
    }))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", service);
    let service_id = service["id"].as_str().unwrap();

    let (status, sub) = send(&state, "POST", "/api/subscriptions", Some(json!({
        "companyId": "acme",
        "serviceId": service_id
    }))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", sub);
    let sub_id = sub["id"].as_str().unwrap();

    let (status, review) = send(&state, "POST", &format!("/api/subscriptions/{}/intake", sub_id), Some(submission("sub-1"))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", review);
    assert_eq!(review["audience"], "triage");
    assert_eq!(review["serviceId"], service_id);

    let (status, body) = send(&state, "POST", &format!("/api/subscriptions/{}/intake", sub_id), Some(submission("sub-2"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "QuotaExceededError");

    let (_, sub) = send(&state, "GET", &format!("/api/subscriptions/{}", sub_id), None).await;
    assert_eq!(sub["reportsProcessed"], 1);
    assert_eq!(sub["totalCost"], 2500);

    let (_, services) = send(&state, "GET", "/api/services?companyId=acme", None).await;
    assert_eq!(services["total"], 1);
}

#[tokio::test]
async fn test_api_token_required_when_configured() {
    let state = create_state_with_token(Some("s3cret"));

    let (status, body) = send(&state, "GET", "/api/reviews", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UnauthorizedError");

    let req = axum::http::Request::builder()
        .method("GET")
        .uri("/api/reviews")
        .header("authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = send(&state, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_triage_setup_requires_actor() {
    let state = create_test_state();
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/services")
        .header("content-type", "application/json")
        .body(Body::from(json!({
            "companyId": "acme",
            "serviceName": "Managed triage",
            "serviceType": "managed_triage",
            "pricingModel": "monthly",
            "monthlyPrice": 90000,
            "triageLevel": "standard",
            "responseTimeHours": 48
        }).to_string()))
        .unwrap();
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, services) = send(&state, "GET", "/api/services", None).await;
    assert_eq!(services["total"], 0);
}

#[tokio::test]
async fn test_oversized_response_time_rejected() {
    let state = create_test_state();
    let (status, body) = send(&state, "POST", "/api/services", Some(json!({
        "companyId": "acme",
        "serviceName": "Managed triage",
        "serviceType": "managed_triage",
        "pricingModel": "per_report",
        "pricePerReport": 2500,
        "triageLevel": "standard",
        "responseTimeHours": 4294967295u32
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ValidationError");

    let (status, _) = send(&state, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
}
