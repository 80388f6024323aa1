//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use tally_core::models::NewTransaction;
use tally_core::test_utils::{FailingRead, StaticLedger, TxBuilder};
use tally_core::{
    CashFlowProfile, CategoryBreakdownEntry, Direction, TrendDirection, TrendPoint,
    WorkspaceMetadata, WorkspaceOverview, WorkspaceSettings,
};
use tower::ServiceExt;

fn sample_ledger() -> StaticLedger {
    StaticLedger::new(vec![
        TxBuilder::income(dec!(3000)).category("Salary").on(2024, 1, 1).build(),
        TxBuilder::expense(dec!(1200)).category("Rent").on(2024, 1, 3).build(),
        TxBuilder::income(dec!(3000)).category("Salary").on(2024, 2, 1).build(),
        TxBuilder::expense(dec!(1200)).category("Rent").on(2024, 2, 3).build(),
        TxBuilder::expense(dec!(300)).category("Groceries").on(2024, 2, 10).build(),
        TxBuilder::income(dec!(3300)).category("Salary").on(2024, 3, 1).build(),
        TxBuilder::expense(dec!(1200)).category("Rent").on(2024, 3, 3).build(),
        TxBuilder::expense(dec!(450)).category("Groceries").on(2024, 3, 9).build(),
        TxBuilder::expense(dec!(50)).category("Dining").on(2024, 3, 12).build(),
    ])
    .with_metadata(WorkspaceMetadata {
        active_accounts: 1,
        active_budgets: 0,
        active_goals: 0,
        opening_balance: dec!(1000),
    })
}

fn app_with(ledger: StaticLedger) -> Router {
    create_router(
        Arc::new(ledger),
        AnalyticsConfig::default(),
        ServerConfig::default(),
    )
}

fn setup_test_app() -> Router {
    app_with(sample_ledger())
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn get_body_json(response: Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ========== Health ==========

#[tokio::test]
async fn test_health_sets_security_headers() {
    let response = get(setup_test_app(), "/api/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("cache-control").unwrap(), "no-store");

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
}

// ========== Overview ==========

#[tokio::test]
async fn test_overview() {
    let response = get(setup_test_app(), "/api/workspaces/1/overview?as_of=2024-03-20").await;
    assert_eq!(response.status(), StatusCode::OK);

    let overview: WorkspaceOverview =
        serde_json::from_value(get_body_json(response).await).unwrap();
    assert_eq!(overview.workspace_id, 1);
    assert_eq!(overview.net_worth, dec!(5900));
    assert_eq!(overview.current_period.period_key, "2024-03");
    assert_eq!(overview.top_spending[0].category, "Rent");
    assert_eq!(overview.cash_flow.unwrap().predictions.len(), 3);
}

#[tokio::test]
async fn test_overview_rejects_bad_as_of() {
    let response = get(setup_test_app(), "/api/workspaces/1/overview?as_of=March").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("as_of"));
}

#[tokio::test]
async fn test_non_numeric_workspace_id() {
    let response = get(setup_test_app(), "/api/workspaces/abc/overview").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Breakdowns ==========

#[tokio::test]
async fn test_spending_analysis_custom_range() {
    let response = get(
        setup_test_app(),
        "/api/workspaces/1/analytics/spending?from=2024-03-01&to=2024-03-31&compare=true",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let entries: Vec<CategoryBreakdownEntry> =
        serde_json::from_value(get_body_json(response).await).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.category.as_str()).collect();
    assert_eq!(names, vec!["Rent", "Groceries", "Dining"]);
    assert_eq!(entries[0].percentage, dec!(70.59));
    assert_eq!(entries[1].change_from_previous, Some(dec!(150)));
}

#[tokio::test]
async fn test_spending_analysis_preset() {
    let response = get(
        setup_test_app(),
        "/api/workspaces/1/analytics/spending?period=last-month&as_of=2024-03-20",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let entries: Vec<CategoryBreakdownEntry> =
        serde_json::from_value(get_body_json(response).await).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.change_from_previous.is_none()));
}

#[tokio::test]
async fn test_income_analysis() {
    let response = get(
        setup_test_app(),
        "/api/workspaces/1/analytics/income?from=2024-01-01&to=2024-03-31",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let entries: Vec<CategoryBreakdownEntry> =
        serde_json::from_value(get_body_json(response).await).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount, dec!(9300));
    assert_eq!(entries[0].percentage, dec!(100));
}

#[tokio::test]
async fn test_breakdown_rejects_bad_ranges() {
    for uri in [
        "/api/workspaces/1/analytics/spending?from=2024-03-31&to=2024-03-01",
        "/api/workspaces/1/analytics/spending?from=2024-03-01",
        "/api/workspaces/1/analytics/income?from=2024-03-01&to=soon",
        "/api/workspaces/1/analytics/income?period=fortnight",
    ] {
        let response = get(setup_test_app(), uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

// ========== Trends ==========

#[tokio::test]
async fn test_trends() {
    let response = get(
        setup_test_app(),
        "/api/workspaces/1/analytics/trends?count=3&as_of=2024-03-20",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert!(json[0].get("category_breakdown").is_none());

    let points: Vec<TrendPoint> = serde_json::from_value(json).unwrap();
    let periods: Vec<&str> = points.iter().map(|p| p.period.as_str()).collect();
    assert_eq!(periods, vec!["2024-01", "2024-02", "2024-03"]);
    let balances: Vec<_> = points.iter().map(|p| p.balance).collect();
    assert_eq!(balances, vec![dec!(2800), dec!(4300), dec!(5900)]);
    assert_eq!(points[0].growth_rate, None);
}

#[tokio::test]
async fn test_detailed_trends_embed_breakdowns() {
    let response = get(
        setup_test_app(),
        "/api/workspaces/1/analytics/trends?granularity=quarter&count=1&detailed=true&as_of=2024-03-20",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let points: Vec<TrendPoint> = serde_json::from_value(get_body_json(response).await).unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].period, "2024-Q1");
    let breakdown = points[0].category_breakdown.as_ref().unwrap();
    assert_eq!(breakdown[0].category, "Rent");
    assert_eq!(breakdown[0].amount, dec!(3600));
}

#[tokio::test]
async fn test_trends_reject_bad_parameters() {
    for uri in [
        "/api/workspaces/1/analytics/trends?granularity=week",
        "/api/workspaces/1/analytics/trends?count=500",
    ] {
        let response = get(setup_test_app(), uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_dates_at_calendar_edges_are_bad_requests() {
    for uri in [
        "/api/workspaces/1/overview?as_of=%2B262142-12-31",
        "/api/workspaces/1/analytics/trends?as_of=%2B262142-12-31",
        "/api/workspaces/1/analytics/cash-flow?as_of=%2B262142-12-31",
        "/api/workspaces/1/analytics/spending?from=%2B262142-12-31&to=%2B262142-12-31",
    ] {
        let response = get(setup_test_app(), uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

// ========== Cash Flow ==========

#[tokio::test]
async fn test_cash_flow() {
    let response = get(
        setup_test_app(),
        "/api/workspaces/1/analytics/cash-flow?horizon=6&as_of=2024-03-20",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let profile: CashFlowProfile = serde_json::from_value(get_body_json(response).await).unwrap();
    assert_eq!(profile.predictions.len(), 6);
    assert_eq!(profile.predictions[0].period, "2024-04");
    assert!(profile
        .predictions
        .windows(2)
        .all(|w| w[1].confidence <= w[0].confidence));
}

#[tokio::test]
async fn test_cash_flow_uses_default_horizon() {
    let response = get(
        setup_test_app(),
        "/api/workspaces/1/analytics/cash-flow?as_of=2024-03-20",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let profile: CashFlowProfile = serde_json::from_value(get_body_json(response).await).unwrap();
    assert_eq!(profile.predictions.len(), 3);
}

#[tokio::test]
async fn test_cash_flow_rejects_long_horizon() {
    let response = get(
        setup_test_app(),
        "/api/workspaces/1/analytics/cash-flow?horizon=99",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_flat_history_is_stable() {
    // a full year of identical months
    let ledger = StaticLedger::new(
        (7..=18)
            .map(|m| {
                let (year, month) = if m > 12 { (2024, m - 12) } else { (2023, m) };
                TxBuilder::income(dec!(100)).on(year, month, 5).build()
            })
            .collect(),
    );
    let response = get(
        app_with(ledger),
        "/api/workspaces/1/analytics/cash-flow?as_of=2024-06-30",
    )
    .await;

    let profile: CashFlowProfile = serde_json::from_value(get_body_json(response).await).unwrap();
    assert_eq!(profile.trend_direction, TrendDirection::Stable);
}

// ========== Failure Mapping ==========

#[tokio::test]
async fn test_ledger_failure_is_unavailable() {
    for read in [FailingRead::Transactions, FailingRead::Settings] {
        let app = app_with(sample_ledger().failing(read));
        let response = get(app, "/api/workspaces/1/analytics/spending").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = get_body_json(response).await;
        assert_eq!(json["error"], UNAVAILABLE_MESSAGE);
    }
}

#[tokio::test]
async fn test_overview_fails_whole_on_metadata_error() {
    let app = app_with(sample_ledger().failing(FailingRead::Metadata));
    let response = get(app, "/api/workspaces/1/overview?as_of=2024-03-20").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], UNAVAILABLE_MESSAGE);
    assert!(json.get("net_worth").is_none());
}

// ========== SQLite-backed ==========

fn setup_db_app() -> (Router, i64) {
    let db = Database::in_memory().unwrap();
    let settings = WorkspaceSettings::default();
    let ws = db.create_workspace("household", &settings).unwrap();
    let account = db.create_account(ws, "checking", dec!(250)).unwrap();

    for (day, amount, direction, category) in [
        (2, dec!(2000), Direction::Income, "Salary"),
        (4, dec!(800), Direction::Expense, "Rent"),
        (9, dec!(120.50), Direction::Expense, "Groceries"),
    ] {
        db.insert_transaction(
            ws,
            &NewTransaction {
                account_id: account,
                amount,
                direction,
                category: Some(category.to_string()),
                description: None,
                occurred_at: Utc.with_ymd_and_hms(2024, 5, day, 15, 0, 0).unwrap(),
                import_hash: format!("fixture-{}", day),
            },
        )
        .unwrap();
    }

    let app = create_router(
        Arc::new(db),
        AnalyticsConfig::default(),
        ServerConfig::default(),
    );
    (app, ws)
}

#[tokio::test]
async fn test_overview_from_store() {
    let (app, ws) = setup_db_app();
    let uri = format!("/api/workspaces/{}/overview?as_of=2024-05-31", ws);
    let response = get(app, &uri).await;
    assert_eq!(response.status(), StatusCode::OK);

    let overview: WorkspaceOverview =
        serde_json::from_value(get_body_json(response).await).unwrap();
    assert_eq!(overview.net_worth, dec!(1329.50));
    assert_eq!(overview.transaction_count, 3);
    assert_eq!(overview.active_accounts, 1);
    assert_eq!(overview.current_period.expenses, dec!(920.50));
}

#[tokio::test]
async fn test_unknown_workspace_is_not_found() {
    let (app, _) = setup_db_app();
    let response = get(app, "/api/workspaces/999/analytics/trends").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let config = ServerConfig {
        allowed_origins: vec!["http://localhost:5173".to_string()],
    };
    let app = create_router(Arc::new(sample_ledger()), AnalyticsConfig::default(), config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .header("origin", "http://localhost:5173")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://localhost:5173"
    );
}
