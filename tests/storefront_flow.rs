use axum::{extract::Path, routing::get, routing::post, Json, Router};
use canopy::{
    config::{BackendUrlVars, Config, Environment, SquareConfig},
    reports::client::ReportSummary,
    session::Storage,
    AppState,
};
use reqwest::StatusCode;
use serde_json::json;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

fn report_body(report_date: &str) -> serde_json::Value {
    json!({
        "report_id": "r1",
        "report_date": report_date,
        "total_amount": 150.0,
        "total_transactions": 5,
        "average_transaction": 30.0,
        "successful_payments": 5,
        "failed_payments": 0,
        "transactions": [{
            "transaction_id": "txn_1",
            "order_id": "ord_1",
            "amount": 20.0,
            "status": "completed",
            "user_email": "buyer@example.com",
            "created_at": "2024-01-15T10:30:00Z",
            "pickup_code": "PU-7"
        }],
        "generated_at": "2024-01-15T23:59:00Z",
        "generated_by": "admin@canopy.example"
    })
}

fn mock_backend() -> Router {
    Router::new()
        .route(
            "/api/payments/apple-pay",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["amount"], 2000);
                assert_eq!(body["currency"], "USD");
                Json(json!({"payment_id": "pay_9", "payment_code": "PU-42"}))
            }),
        )
        .route(
            "/api/admin/reports",
            get(|| async {
                Json(json!({"reports": [{
                    "report_id": "r1",
                    "report_date": "2024-01-15",
                    "total_amount": 150.0,
                    "total_transactions": 5
                }]}))
            }),
        )
        .route(
            "/api/admin/reports/quick-stats/today",
            get(|| async {
                Json(json!({
                    "total_square_sales": 321.5,
                    "total_transactions": 12,
                    "average_transaction": 26.79
                }))
            }),
        )
        .route(
            "/api/admin/reports/generate",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["report_type"], "square_sales");
                Json(report_body(body["report_date"].as_str().unwrap()))
            }),
        )
        .route(
            "/api/admin/reports/{id}",
            get(|Path(id): Path<String>| async move {
                let mut report = report_body("2024-01-15");
                report["report_id"] = json!(id);
                Json(report)
            }),
        )
}

fn app_state(backend_url: &str) -> AppState {
    AppState::new(Config {
        port: 0,
        environment: Environment::Development,
        backend: BackendUrlVars {
            canopy_api_url: Some(backend_url.to_string()),
            api_url: None,
        },
        square: SquareConfig {
            application_id: Some("sq-app".to_string()),
            location_id: Some("sq-loc".to_string()),
        },
    })
}

fn seed_cart(state: &AppState) {
    state.storage.set(
        "cart",
        r#"[{"id":1,"name":"Blue Dream 3.5g","price":10.00,"quantity":2}]"#,
    );
}

#[tokio::test]
async fn checkout_page_shows_order_summary_and_sdk_script() {
    let backend = spawn(mock_backend()).await;
    let state = app_state(&backend);
    seed_cart(&state);
    let base = spawn(canopy::router(state)).await;

    let page = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    let body = page.text().await.unwrap();
    assert!(body.contains("Blue Dream 3.5g"));
    assert!(body.contains("$20.00"));
    assert!(body.contains("web.squarecdn.com/v1/square.js"));
    // Anonymous visitor gets the marketing preview.
    assert!(body.contains("Join the Canopy Club"));
}

#[tokio::test]
async fn checkout_page_degrades_without_square_credentials() {
    let backend = spawn(mock_backend()).await;
    let mut state = app_state(&backend);
    state.config.square = SquareConfig::default();
    seed_cart(&state);
    let base = spawn(canopy::router(state)).await;

    let body = reqwest::get(format!("{base}/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Apple Pay is not available"));
    assert!(body.contains("$20.00"));
}

#[tokio::test]
async fn paying_with_a_token_reports_success_and_pickup_code() {
    let backend = spawn(mock_backend()).await;
    let state = app_state(&backend);
    seed_cart(&state);
    let base = spawn(canopy::router(state)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/checkout/pay"))
        .json(&json!({"token": "cnon:ok"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Payment complete"));
    assert!(body.contains("$20.00"));
    assert!(body.contains("PU-42"));
}

#[tokio::test]
async fn paying_with_an_empty_cart_is_rejected() {
    let backend = spawn(mock_backend()).await;
    let state = app_state(&backend);
    let base = spawn(canopy::router(state)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/checkout/pay"))
        .json(&json!({"token": "cnon:ok"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generating_a_report_echoes_the_date_and_totals() {
    let backend = spawn(mock_backend()).await;
    let state = app_state(&backend);
    let base = spawn(canopy::router(state)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/admin/reports/generate"))
        .form(&[("report_date", "2024-01-15")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("hx-trigger")
            .and_then(|v| v.to_str().ok()),
        Some("reports-refreshed")
    );
    let body = response.text().await.unwrap();
    assert!(body.contains("2024-01-15"));
    assert!(body.contains("$150.00"));
    assert!(body.contains("5 transactions"));
}

#[tokio::test]
async fn generating_without_a_date_is_a_blocking_alert() {
    let backend = spawn(mock_backend()).await;
    let state = app_state(&backend);
    let base = spawn(canopy::router(state)).await;

    let body = reqwest::Client::new()
        .post(format!("{base}/admin/reports/generate"))
        .form(&[("report_date", "")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Please select a report date"));
}

#[tokio::test]
async fn export_downloads_csv_with_the_report_filename() {
    let backend = spawn(mock_backend()).await;
    let state = app_state(&backend);
    let base = spawn(canopy::router(state)).await;

    let response = reqwest::get(format!("{base}/admin/reports/r1/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/csv")
    );
    assert_eq!(
        response
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok()),
        Some("attachment; filename=\"square-sales-report-2024-01-15.csv\"")
    );
    let body = response.text().await.unwrap();
    assert!(body.starts_with("Square Sales Report,2024-01-15"));
    assert!(body.contains("buyer@example.com"));
}

#[tokio::test]
async fn view_failure_shows_a_generic_message_not_backend_detail() {
    let backend = spawn(Router::new().route(
        "/api/admin/reports/{id}",
        get(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "pg: connection pool exhausted on shard 3"})),
            )
        }),
    ))
    .await;
    let state = app_state(&backend);
    let base = spawn(canopy::router(state)).await;

    let body = reqwest::get(format!("{base}/admin/reports/r9"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Failed to load report"));
    assert!(!body.contains("connection pool exhausted"));
}

#[tokio::test]
async fn failed_list_refresh_keeps_the_previous_list() {
    // Backend that is not listening: every fetch fails.
    let state = app_state("http://127.0.0.1:1");
    state
        .dashboard
        .lock()
        .unwrap()
        .apply_summaries(vec![ReportSummary {
            report_id: "kept".to_string(),
            report_date: "2024-01-10".to_string(),
            total_amount: 42.into(),
            total_transactions: 2,
        }]);
    let base = spawn(canopy::router(state)).await;

    let body = reqwest::get(format!("{base}/admin/reports/recent"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("2024-01-10"));
}

#[tokio::test]
async fn zero_transaction_report_renders_placeholder() {
    let backend = spawn(
        Router::new().route(
            "/api/admin/reports/{id}",
            get(|| async {
                Json(json!({
                    "report_id": "empty",
                    "report_date": "2024-02-01",
                    "total_amount": 0.0,
                    "total_transactions": 0,
                    "average_transaction": 0.0,
                    "successful_payments": 0,
                    "failed_payments": 0,
                    "transactions": []
                }))
            }),
        ),
    )
    .await;
    let state = app_state(&backend);
    let base = spawn(canopy::router(state)).await;

    let body = reqwest::get(format!("{base}/admin/reports/empty"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("No transactions found for this date"));
}
