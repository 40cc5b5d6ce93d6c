use clap::Args;
use opum::config::DEFAULT_DATE_FORMAT;
use opum::error::AppError;
use opum::upload::response::invalid_csv_message;
use opum::upload::validation::rules::{check_integrity, check_offline};
use opum::upload::{parse_rows, ValidationError, DEFAULT_DELIMITER};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    /// Roster CSV to check
    pub(crate) path: PathBuf,
    /// chrono format of the roll-in and roll-off dates
    #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
    pub(crate) date_format: String,
}

/// Outcome of the offline rules for one roster line.
#[derive(Debug)]
pub(crate) struct RowVerdict {
    pub(crate) line: usize,
    pub(crate) serial: String,
    pub(crate) outcome: Result<(), ValidationError>,
}

/// Runs every rule that needs no directory or store. Unlike an upload, all
/// rows are checked so the whole file can be fixed in one pass.
pub(crate) fn check_roster(raw: &str, date_format: &str) -> Vec<RowVerdict> {
    parse_rows(raw, DEFAULT_DELIMITER)
        .iter()
        .map(|row| RowVerdict {
            line: row.line,
            serial: row.key().to_string(),
            outcome: check_integrity(row)
                .and_then(|employee| check_offline(&employee, date_format)),
        })
        .collect()
}

pub(crate) fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.path)?;
    let verdicts = check_roster(&raw, &args.date_format);

    println!("Roster check: {}", args.path.display());
    if verdicts.is_empty() {
        println!("  no employee rows found");
        return Ok(());
    }

    let mut rejected = 0;
    for verdict in &verdicts {
        match &verdict.outcome {
            Ok(()) => println!("  line {:>4}  {:<10}  ok", verdict.line, verdict.serial),
            Err(err) => {
                rejected += 1;
                println!(
                    "  line {:>4}  {:<10}  {}",
                    verdict.line, verdict.serial, err.reason
                );
                if err.employee.is_some() {
                    let detail = invalid_csv_message(err.employee.as_ref(), err.reason);
                    for text in detail.lines().filter(|text| !text.is_empty()) {
                        println!("              {text}");
                    }
                }
            }
        }
    }

    println!(
        "\n{} row(s) checked, {} rejected. Directory checks are not run offline.",
        verdicts.len(),
        rejected
    );
    Ok(())
}
