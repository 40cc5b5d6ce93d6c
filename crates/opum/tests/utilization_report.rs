//! Utilization export built from a JSON request body, as the report route
//! receives it.

use opum::report::{ReportError, Standing, UtilizationReport};

#[test]
fn quarterly_export_totals_hours_before_rating() {
    let request = serde_json::json!({
        "periods": ["Q1", "Q2"],
        "rows": [
            {
                "serial": "12345",
                "full_name": "Jane Doe",
                "project": "Payroll",
                "hours": [
                    { "period": "Q1", "available_hours": 480, "utilized_hours": 500 },
                    { "period": "Q2", "available_hours": 480, "utilized_hours": 470 }
                ]
            },
            {
                "serial": "67890",
                "full_name": "John Roe",
                "project": "Benefits",
                "hours": [
                    { "period": "Q1", "available_hours": 480, "utilized_hours": 300 },
                    { "period": "Q2", "available_hours": 0, "utilized_hours": 0 }
                ]
            }
        ]
    });
    let report: UtilizationReport = serde_json::from_value(request).expect("request parses");

    let csv = report.to_csv().expect("renders");
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines[0], "Serial,Name,Project,Q1,Q2,YTD,Standing");
    // 970 / 960
    assert_eq!(lines[1], "12345,Jane Doe,Payroll,104%,97%,101%,on-target");
    assert_eq!(lines[2], "67890,John Roe,Benefits,62%,0%,31%,below-target");
    // Q1 800/960, Q2 470/480, overall 1270/1440
    assert_eq!(lines[3], "TOTAL,,,83%,97%,88%,below-target");
}

#[test]
fn standing_labels_are_stable() {
    assert_eq!(Standing::from_percentage(100).label(), "on-target");
    assert_eq!(Standing::from_percentage(97).label(), "near-target");
    assert_eq!(Standing::from_percentage(42).label(), "below-target");
}

#[test]
fn rows_may_only_use_declared_periods() {
    let request = serde_json::json!({
        "periods": ["Q1"],
        "rows": [{
            "serial": "12345",
            "full_name": "Jane Doe",
            "project": "Payroll",
            "hours": [{ "period": "Q3", "available_hours": 1, "utilized_hours": 1 }]
        }]
    });
    let report: UtilizationReport = serde_json::from_value(request).expect("request parses");

    let err = report.to_csv().expect_err("undeclared period");
    assert!(err.is_input());
    assert!(matches!(err, ReportError::UnknownPeriod { .. }));
}
