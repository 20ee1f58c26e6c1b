//! Occupancy and collections figures derived from parsed reports
use crate::layout::coerce::clean_numeric;
use crate::layout::coerce::Value;
use crate::layout::table::ExtractedTable;
use crate::reports::box_score::AVAILABILITY;
use crate::reports::ParsedReport;
use crate::reports::ReportKind;
use chrono::Duration;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

/// Projected occupancy below this percentage raises an alert
const ALERT_BELOW: f64 = 90.0;
/// Projected occupancy above this percentage is healthy
const GOOD_ABOVE: f64 = 95.0;

/// Unit counts from a box score's availability section
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BoxScoreMetrics {
    pub total_units: i64,
    pub occupied_units: i64,
    pub vacant_rented: i64,
    pub vacant_unrented: i64,
    pub notice_rented: i64,
    pub notice_unrented: i64,
    pub model: i64,
    pub down: i64,
    pub percent_occupied: f64,
    pub percent_leased: f64,
}

/// Move-ins and move-outs scheduled in one week
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MoveSchedule {
    pub move_ins: i64,
    pub move_outs: i64,
}

/// Unit counts from the status groups of a unit availability report
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UnitCounts {
    pub notice_units: i64,
    pub under_eviction: i64,
    pub pre_leased: i64,
    pub vacant_rentable: i64,
    pub leased_vacant: i64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OccupancyStatus {
    Alert,
    Watch,
    Good,
    /// The property has no units on record
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Projection {
    pub projected_occupied: i64,
    /// Capped at 100
    pub percent: f64,
    pub status: OccupancyStatus,
}

/// Numeric view of a coerced value, reading text columns the way numeric columns are cleaned.
fn numeric(value: &Value) -> Option<f64> {
    value.as_f64().or_else(|| {
        value.as_text()
            .and_then(|text| clean_numeric(text).parse::<f64>().ok())
            .filter(|number| number.is_finite())
    })
}

/// Report total for `column`: the summary row when present, the column sum otherwise.
fn total(table: &ExtractedTable, column: &str) -> Option<f64> {
    table.column_index(column)?;
    if table.summary().is_some() {
        return table.summary_value(column).map(|value| numeric(value).unwrap_or_default());
    }
    Some(table.column_values(column).into_iter().filter_map(numeric).sum())
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Unit counts of a box score
///
/// # Arguments
/// * `report` - A parsed box score summary
///
/// # Returns
/// * `BoxScoreMetrics` - zeroes when the report has no availability section.
///   Percentages come from the sheet's `% Occ` and `% Leased` totals when it has them.
pub fn box_score_metrics(report: &ParsedReport) -> BoxScoreMetrics {
    let mut metrics = BoxScoreMetrics::default();
    if report.kind() != ReportKind::BoxScore {
        return metrics;
    }
    let Some(table) = report.section(AVAILABILITY) else {
        return metrics;
    };

    let count = |column: &str| total(table, column).unwrap_or_default().round() as i64;
    metrics.total_units = count("Units");
    metrics.vacant_rented = count("Vacant Rented");
    metrics.vacant_unrented = count("Vacant Unrented");
    metrics.notice_rented = count("Notice Rented");
    metrics.notice_unrented = count("Notice Unrented");
    metrics.model = count("Model");
    metrics.down = count("Down");
    metrics.occupied_units = metrics.total_units - metrics.vacant_rented - metrics.vacant_unrented;

    let sheet_percent = |column: &str| table.summary().and(total(table, column));
    metrics.percent_occupied = sheet_percent("% Occ")
        .unwrap_or_else(|| percentage(metrics.occupied_units, metrics.total_units));
    metrics.percent_leased = sheet_percent("% Leased").unwrap_or_else(|| {
        let leased = metrics.total_units - metrics.vacant_unrented - metrics.notice_unrented;
        percentage(leased, metrics.total_units)
    });
    debug!(source = report.source_path(), total = metrics.total_units, occupied = metrics.occupied_units, "Box score metrics");
    metrics
}

/// Counts units moving in and out during the seven days starting at `week_start`
///
/// Reads the `Move In` and `Move Out` columns of every section of a unit
/// availability report.
pub fn move_schedule(report: &ParsedReport, week_start: NaiveDate) -> MoveSchedule {
    let week_end = week_start + Duration::days(6);
    let in_week = |value: &Value| value.as_date().is_some_and(|date| date >= week_start && date <= week_end);
    let count = |table: &ExtractedTable, column: &str| {
        if table.column_index(column).is_none() {
            return 0;
        }
        table.column_values(column).into_iter().filter(|value| in_week(value)).count() as i64
    };

    report.sections().iter().fold(MoveSchedule::default(), |schedule, section| MoveSchedule {
        move_ins: schedule.move_ins + count(&section.table, "Move In"),
        move_outs: schedule.move_outs + count(&section.table, "Move Out"),
    })
}

/// Classifies the status groups of a unit availability report
pub fn unit_counts(report: &ParsedReport) -> UnitCounts {
    let mut counts = UnitCounts::default();
    for section in report.sections() {
        let name = section.name.to_lowercase();
        let table = &section.table;
        let units = table.len() as i64;
        if name.contains("notice") {
            let evictions = if table.column_index("Status").is_some() {
                table.column_values("Status").iter()
                    .filter(|value| value.to_string().to_lowercase().contains("eviction"))
                    .count() as i64
            } else {
                0
            };
            counts.under_eviction += evictions;
            counts.notice_units += units - evictions;
        } else if name.contains("vacant rented") {
            counts.leased_vacant += units;
            counts.pre_leased += units;
        } else if name.contains("vacant unrented") {
            counts.vacant_rentable += units;
        }
    }
    counts
}

/// Unit counts taken from the box score instead of unit availability groups
pub fn unit_counts_from_box_score(metrics: &BoxScoreMetrics, evictions: i64) -> UnitCounts {
    UnitCounts {
        notice_units: notice_units(metrics, evictions),
        under_eviction: evictions,
        pre_leased: metrics.notice_rented,
        vacant_rentable: metrics.vacant_unrented,
        leased_vacant: metrics.vacant_rented,
    }
}

/// Share of charges already collected, in percent
///
/// # Arguments
/// * `report` - A parsed delinquency summary
///
/// # Returns
/// * `f64` - `(charges - owed) / charges * 100` clamped to 0..=100, or 0 without charges
pub fn collections_rate(report: &ParsedReport) -> f64 {
    let Some(table) = report.table() else {
        return 0.0;
    };
    let sum = |keywords: &[&str]| {
        table.find_column(keywords)
            .map(|index| table.rows().iter().filter_map(|row| numeric(&row[index])).sum::<f64>())
            .unwrap_or_default()
    };
    let charges = sum(&["total", "charges"]);
    let owed = sum(&["owed"]);
    if charges <= 0.0 {
        return 0.0;
    }
    ((charges - owed) / charges * 100.0).clamp(0.0, 100.0)
}

/// Units on notice net of evictions, never negative
pub fn notice_units(metrics: &BoxScoreMetrics, evictions: i64) -> i64 {
    (metrics.notice_rented + metrics.notice_unrented - evictions).max(0)
}

/// Units still to lease, never negative
pub fn net_to_rent(counts: &UnitCounts) -> i64 {
    (counts.vacant_rentable - counts.leased_vacant + counts.notice_units - counts.pre_leased).max(0)
}

/// Occupancy after this week's moves
///
/// # Arguments
/// * `metrics` - Current box score figures
/// * `moves` - Scheduled move-ins and move-outs
pub fn projection(metrics: &BoxScoreMetrics, moves: &MoveSchedule) -> Projection {
    let projected_occupied = metrics.occupied_units + moves.move_ins - moves.move_outs;
    if metrics.total_units == 0 {
        return Projection { projected_occupied, percent: 0.0, status: OccupancyStatus::Unknown };
    }
    let percent = (projected_occupied as f64 / metrics.total_units as f64).min(1.0) * 100.0;
    let status = if percent < ALERT_BELOW {
        OccupancyStatus::Alert
    } else if percent > GOOD_ABOVE {
        OccupancyStatus::Good
    } else {
        OccupancyStatus::Watch
    };
    Projection { projected_occupied, percent, status }
}
