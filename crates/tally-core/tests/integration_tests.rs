//! Integration tests for tally-core
//!
//! These tests exercise the full import → store → analytics workflow.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_core::{
    analytics::{bucketize, summarize},
    db::Database,
    import::import_csv,
    models::{parse_utc_offset, DateRange, Granularity, TrendDirection, WorkspaceSettings},
    AnalyticsConfig, AnalyticsService, Error, LedgerQuery, LedgerSource,
};

use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Six months of a steady household ledger with rising income
fn household_csv() -> &'static str {
    r#"date,amount,direction,category,description
2024-01-01,3000,income,Salary,Payroll
2024-01-02,1200,expense,Rent,Rent
2024-01-10,310.40,expense,Groceries,Market
2024-02-01,3100,income,Salary,Payroll
2024-02-02,1200,expense,Rent,Rent
2024-02-11,295.10,expense,Groceries,Market
2024-02-20,500,transfer,Savings,To savings
2024-03-01,3200,income,Salary,Payroll
2024-03-02,1200,expense,Rent,Rent
2024-03-09,330.00,expense,Groceries,Market
2024-04-01,3400,income,Salary,Payroll
2024-04-02,1200,expense,Rent,Rent
2024-04-12,280.75,expense,Groceries,Market
2024-05-01,3600,income,Salary,Payroll
2024-05-02,1200,expense,Rent,Rent
2024-05-14,305.00,expense,Groceries,Market
2024-05-20,80,expense,,Unlabelled
2024-06-01,3800,income,Salary,Payroll
2024-06-02,1200,expense,Rent,Rent
2024-06-09,299.99,expense,Groceries,Market
"#
}

fn seeded() -> (Database, i64) {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let ws_id = db
        .create_workspace("Household", &WorkspaceSettings::default())
        .unwrap();
    let account = db.create_account(ws_id, "Checking", dec!(500)).unwrap();
    db.create_budget(ws_id, "Groceries", dec!(350), Granularity::Month)
        .unwrap();
    let ws = db.get_workspace(ws_id).unwrap().unwrap();

    let summary = import_csv(&db, &ws, account, household_csv().as_bytes()).unwrap();
    assert_eq!(summary.imported, 20);
    assert!(summary.skipped.is_empty());

    (db, ws_id)
}

// =============================================================================
// Overview
// =============================================================================

#[tokio::test]
async fn test_overview_end_to_end() {
    let (db, ws) = seeded();
    let config = AnalyticsConfig::default();
    let service = AnalyticsService::new(&db, &config);

    let overview = service.overview(ws, date(2024, 6, 30)).await.unwrap();

    assert_eq!(overview.currency, "USD");
    assert_eq!(overview.active_accounts, 1);
    assert_eq!(overview.active_budgets, 1);
    assert_eq!(overview.active_goals, 0);
    assert_eq!(overview.transaction_count, 20);
    assert_eq!(overview.current_period.period_key, "2024-06");
    assert_eq!(overview.current_period.net, dec!(2300.01));
    assert_eq!(overview.previous_period.net, dec!(2015.00));

    // opening 500 + sum of monthly nets
    let expected = dec!(500)
        + dec!(1489.60)
        + dec!(1604.90)
        + dec!(1670.00)
        + dec!(1919.25)
        + dec!(2015.00)
        + dec!(2300.01);
    assert_eq!(overview.net_worth, expected);

    assert_eq!(overview.top_spending[0].category, "Rent");
    let cash_flow = overview.cash_flow.unwrap();
    assert_eq!(cash_flow.predictions.len(), 3);
}

#[tokio::test]
async fn test_unknown_workspace_is_not_found() {
    let (db, _) = seeded();
    let config = AnalyticsConfig::default();
    let service = AnalyticsService::new(&db, &config);

    let err = service.overview(999, date(2024, 6, 30)).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

// =============================================================================
// Breakdowns
// =============================================================================

#[tokio::test]
async fn test_spending_breakdown_percentages() {
    let (db, ws) = seeded();
    let config = AnalyticsConfig::default();
    let service = AnalyticsService::new(&db, &config);

    let h1 = DateRange::new(date(2024, 1, 1), date(2024, 6, 30)).unwrap();
    let entries = service.spending_analysis(ws, h1, false).await.unwrap();

    let names: Vec<&str> = entries.iter().map(|e| e.category.as_str()).collect();
    assert_eq!(names, vec!["Rent", "Groceries", "uncategorized"]);

    let sum: Decimal = entries.iter().map(|e| e.percentage).sum();
    assert!((sum - dec!(100)).abs() <= dec!(0.1));
    assert_eq!(entries[1].transaction_count, 6);
}

#[tokio::test]
async fn test_empty_range_has_no_entries() {
    let (db, ws) = seeded();
    let config = AnalyticsConfig::default();
    let service = AnalyticsService::new(&db, &config);

    let range = DateRange::new(date(2023, 1, 1), date(2023, 3, 31)).unwrap();
    assert!(service.spending_analysis(ws, range, true).await.unwrap().is_empty());
    assert!(service.income_analysis(ws, range, false).await.unwrap().is_empty());
}

// =============================================================================
// Trends and cash flow
// =============================================================================

#[tokio::test]
async fn test_trend_series() {
    let (db, ws) = seeded();
    let config = AnalyticsConfig::default();
    let service = AnalyticsService::new(&db, &config);

    let points = service
        .trends(ws, Granularity::Month, 6, false, date(2024, 6, 30))
        .await
        .unwrap();
    assert_eq!(points.len(), 6);
    assert_eq!(points[0].period, "2024-01");
    assert_eq!(points[0].balance, dec!(1989.60));
    assert_eq!(points[0].growth_rate, None);
    assert!(points[1..].iter().all(|p| p.growth_rate.is_some()));

    let quarters = service
        .trends(ws, Granularity::Quarter, 2, false, date(2024, 6, 30))
        .await
        .unwrap();
    assert_eq!(quarters.len(), 2);
    assert_eq!(quarters[1].balance, points[5].balance);
}

#[tokio::test]
async fn test_cash_flow_rising_income() {
    let (db, ws) = seeded();
    let config = AnalyticsConfig {
        cash_flow_history_months: 6,
        ..AnalyticsConfig::default()
    };
    let service = AnalyticsService::new(&db, &config);

    let profile = service.cash_flow(ws, 6, date(2024, 6, 30)).await.unwrap();
    assert_eq!(profile.trend_direction, TrendDirection::Up);
    assert!(profile.volatility_score > Decimal::ZERO);
    assert!(profile.volatility_score < Decimal::ONE);
    assert_eq!(profile.predictions.len(), 6);
    assert!(profile
        .predictions
        .windows(2)
        .all(|w| w[1].confidence <= w[0].confidence));
    assert_eq!(profile.predictions[0].period, "2024-07");
}

// =============================================================================
// Storage boundary
// =============================================================================

#[tokio::test]
async fn test_bucketing_from_store_is_a_refinement() {
    let (db, ws) = seeded();
    let range = DateRange::new(date(2024, 1, 1), date(2024, 6, 30)).unwrap();
    let txs = db
        .list_transactions(ws, LedgerQuery::covering(range).unwrap())
        .await
        .unwrap();

    let offset = parse_utc_offset("UTC").unwrap();
    let wide = summarize(&txs, range, offset).unwrap();
    for granularity in [Granularity::Month, Granularity::Quarter, Granularity::Year] {
        let net: Decimal = bucketize(&txs, granularity, range, offset)
            .unwrap()
            .iter()
            .map(|b| b.net)
            .sum();
        assert_eq!(net, wide.net);
    }
}

#[tokio::test]
async fn test_workspace_timezone_shifts_buckets() {
    let db = Database::in_memory().unwrap();
    let settings = WorkspaceSettings {
        currency: "NZD".into(),
        timezone: parse_utc_offset("+13:00").unwrap(),
    };
    let ws_id = db.create_workspace("Auckland", &settings).unwrap();
    let account = db.create_account(ws_id, "Everyday", Decimal::ZERO).unwrap();
    let ws = db.get_workspace(ws_id).unwrap().unwrap();

    // 2024-01-31T12:00Z is already February 1st in Auckland
    let csv = "date,amount,category\n2024-01-31T12:00:00Z,-50,Taxi\n";
    import_csv(&db, &ws, account, csv.as_bytes()).unwrap();

    let config = AnalyticsConfig::default();
    let service = AnalyticsService::new(&db, &config);
    let points = service
        .trends(ws_id, Granularity::Month, 2, false, date(2024, 2, 29))
        .await
        .unwrap();
    assert_eq!(points[0].expenses, Decimal::ZERO);
    assert_eq!(points[1].expenses, dec!(50));
}
