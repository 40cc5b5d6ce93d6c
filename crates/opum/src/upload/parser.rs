use tracing::{debug, warn};

use super::domain::{ParsedRows, UploadRow, ROSTER_FIELD_COUNT};

pub const DEFAULT_DELIMITER: u8 = b',';
const SEPARATOR_MARKER: &str = "----";

/// Splits an uploaded roster into data rows.
///
/// The header block runs up to the first blank line and includes the line
/// right after it. Without any blank line only the first line is header.
/// Blank lines and `----` separators are skipped. Field count and content are
/// left to validation.
pub fn parse_rows(raw: &str, delimiter: u8) -> ParsedRows {
    let lines: Vec<(usize, &str)> = raw
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .collect();

    let blank = lines.iter().position(|(_, line)| is_blank(line));
    let body_start = match blank {
        Some(blank) => blank + 2,
        None => 1,
    };

    let discarded = body_start.min(lines.len());
    debug!(lines = discarded, "roster header skipped");
    let suspicious = row_like_preamble(&lines[..blank.unwrap_or(0)], delimiter);
    if suspicious > 0 {
        warn!(
            lines = suspicious,
            "roster header block holds lines shaped like employee rows; they were not imported"
        );
    }

    let mut rows = ParsedRows::default();
    for &(line, text) in lines.iter().skip(body_start) {
        if is_blank(text) || text.trim_start().starts_with(SEPARATOR_MARKER) {
            continue;
        }
        rows.push(UploadRow {
            line,
            fields: split_fields(text, delimiter),
        });
    }

    rows
}

/// Counts preamble lines, past the first, that split into a full roster row.
fn row_like_preamble(preamble: &[(usize, &str)], delimiter: u8) -> usize {
    preamble
        .iter()
        .skip(1)
        .filter(|(_, text)| split_fields(text, delimiter).len() >= ROSTER_FIELD_COUNT)
        .count()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn split_fields(line: &str, delimiter: u8) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(str::to_string).collect(),
        Some(Err(err)) => {
            warn!(%err, "unreadable roster line, splitting without quoting rules");
            line.split(char::from(delimiter))
                .map(|field| field.trim().to_string())
                .collect()
        }
        None => Vec::new(),
    }
}
