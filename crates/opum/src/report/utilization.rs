use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const TOTAL_LABEL: &str = "TOTAL";

/// Hours an employee had available and actually booked in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodHours {
    pub period: String,
    pub available_hours: u32,
    pub utilized_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilizationRow {
    pub serial: String,
    pub full_name: String,
    pub project: String,
    #[serde(default)]
    pub hours: Vec<PeriodHours>,
}

/// Standing of a year-to-date utilization percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Standing {
    OnTarget,
    NearTarget,
    BelowTarget,
}

impl Standing {
    pub fn from_percentage(ytd: u32) -> Self {
        if ytd >= 100 {
            Standing::OnTarget
        } else if ytd > 95 {
            Standing::NearTarget
        } else {
            Standing::BelowTarget
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Standing::OnTarget => "on-target",
            Standing::NearTarget => "near-target",
            Standing::BelowTarget => "below-target",
        }
    }
}

/// Whole-number utilization, truncated. Zero available hours yields zero.
pub fn percentage(utilized: u64, available: u64) -> u32 {
    if available == 0 {
        return 0;
    }
    let pct = utilized.saturating_mul(100) / available;
    u32::try_from(pct).unwrap_or(u32::MAX)
}

pub fn format_percentage(value: u32) -> String {
    format!("{value}%")
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report needs at least one period")]
    NoPeriods,
    #[error("employee {serial} has hours for unknown period {period}")]
    UnknownPeriod { serial: String, period: String },
    #[error("report could not be written: {0}")]
    Csv(#[from] csv::Error),
    #[error("report buffer could not be flushed: {0}")]
    Flush(String),
    #[error("report is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

impl ReportError {
    /// True when the request itself was malformed.
    pub fn is_input(&self) -> bool {
        matches!(self, ReportError::NoPeriods | ReportError::UnknownPeriod { .. })
    }
}

/// Utilization of a set of employees over ordered reporting periods.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UtilizationReport {
    pub periods: Vec<String>,
    pub rows: Vec<UtilizationRow>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    available: u64,
    utilized: u64,
}

impl Totals {
    fn add(&mut self, hours: &PeriodHours) {
        self.available += u64::from(hours.available_hours);
        self.utilized += u64::from(hours.utilized_hours);
    }

    fn percentage(self) -> u32 {
        percentage(self.utilized, self.available)
    }
}

impl UtilizationReport {
    pub fn new(periods: Vec<String>) -> Self {
        Self {
            periods,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: UtilizationRow) {
        self.rows.push(row);
    }

    /// Renders the report as CSV: header, one line per employee and a grand
    /// total line whose percentages come from summed hours.
    pub fn to_csv(&self) -> Result<String, ReportError> {
        if self.periods.is_empty() {
            return Err(ReportError::NoPeriods);
        }

        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = vec!["Serial", "Name", "Project"];
        header.extend(self.periods.iter().map(String::as_str));
        header.extend(["YTD", "Standing"]);
        writer.write_record(&header)?;

        let mut grand_by_period: HashMap<&str, Totals> = HashMap::new();
        let mut grand = Totals::default();

        for row in &self.rows {
            let mut by_period: HashMap<&str, Totals> = HashMap::new();
            let mut ytd = Totals::default();
            for hours in &row.hours {
                if !self.periods.contains(&hours.period) {
                    return Err(ReportError::UnknownPeriod {
                        serial: row.serial.clone(),
                        period: hours.period.clone(),
                    });
                }
                by_period.entry(hours.period.as_str()).or_default().add(hours);
                grand_by_period.entry(hours.period.as_str()).or_default().add(hours);
                ytd.add(hours);
                grand.add(hours);
            }

            let mut record = vec![row.serial.clone(), row.full_name.clone(), row.project.clone()];
            record.extend(self.periods.iter().map(|period| {
                by_period
                    .get(period.as_str())
                    .map(|totals| format_percentage(totals.percentage()))
                    .unwrap_or_default()
            }));
            let ytd_pct = ytd.percentage();
            record.push(format_percentage(ytd_pct));
            record.push(Standing::from_percentage(ytd_pct).label().to_string());
            writer.write_record(&record)?;
        }

        let mut total = vec![TOTAL_LABEL.to_string(), String::new(), String::new()];
        total.extend(self.periods.iter().map(|period| {
            let totals = grand_by_period
                .get(period.as_str())
                .copied()
                .unwrap_or_default();
            format_percentage(totals.percentage())
        }));
        let grand_pct = grand.percentage();
        total.push(format_percentage(grand_pct));
        total.push(Standing::from_percentage(grand_pct).label().to_string());
        writer.write_record(&total)?;

        let bytes = writer
            .into_inner()
            .map_err(|err| ReportError::Flush(err.to_string()))?;
        Ok(String::from_utf8(bytes)?)
    }
}
