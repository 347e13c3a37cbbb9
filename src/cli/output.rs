// Output formatting utilities

use crate::models::{Pipeline, Plan, Stage, StageRequirement};
use crate::repo::SavedPlan;
use chrono::{Local, TimeZone};
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";

const ANSI_FG_GREEN: &str = "\x1b[32m";
const ANSI_FG_YELLOW: &str = "\x1b[33m";
const ANSI_FG_CYAN: &str = "\x1b[36m";
const ANSI_FG_BRIGHT_BLACK: &str = "\x1b[90m";

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    // Try terminal_size crate first (most reliable, works after resize)
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    // Fallback to COLUMNS environment variable (set by most shells)
    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

/// Apply bold formatting if in TTY mode
fn bold_if_tty(text: &str, tty: bool) -> String {
    if tty {
        format!("{}{}{}", ANSI_BOLD, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Apply a foreground color if in TTY mode
fn color_if_tty(text: &str, color: &str, tty: bool) -> String {
    if tty {
        format!("{}{}{}", color, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Truncate a string to fit a column, appending an ellipsis
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else if max <= 1 {
        "…".to_string()
    } else {
        let cut: String = text.chars().take(max - 1).collect();
        format!("{}…", cut)
    }
}

fn format_ts(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        _ => "-".to_string(),
    }
}

fn format_rate(rate: f64) -> String {
    if (rate - rate.round()).abs() < f64::EPSILON {
        format!("{:.0}%", rate)
    } else {
        format!("{:.1}%", rate)
    }
}

/// Render a computed plan as a table
///
/// Chain stages show the required entrant count (and needed-by date when
/// scheduled); special stages are listed below the chain with no counts.
pub fn format_plan_table(plan: &Plan) -> String {
    let tty = is_tty();
    let mut out = String::new();

    let header = format!(
        "{:<22} {:>7} {:>5} {:>10} {:>12}  {}",
        "Stage", "Conv", "TAT", "Required", "Needed by", "Status"
    );
    out.push_str(&bold_if_tty(&header, tty));
    out.push('\n');

    let terminal_idx = plan
        .stages
        .iter()
        .rposition(|s| !s.is_special);

    for (idx, stage) in plan.stages.iter().enumerate() {
        let required = stage
            .required_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        let needed_by = stage
            .needed_by
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let status = stage.maps_to_status.as_deref().unwrap_or("");
        let rate = if stage.is_special {
            "-".to_string()
        } else {
            format_rate(stage.conversion_rate)
        };
        let tat = if stage.is_special {
            "-".to_string()
        } else {
            format!("{}d", stage.tat_days)
        };

        let line = format!(
            "{:<22} {:>7} {:>5} {:>10} {:>12}  {}",
            truncate(&stage.stage_name, 22),
            rate,
            tat,
            required,
            needed_by,
            status
        );

        let line = if stage.is_special {
            color_if_tty(&line, ANSI_FG_BRIGHT_BLACK, tty)
        } else if Some(idx) == terminal_idx {
            color_if_tty(&line, ANSI_FG_GREEN, tty)
        } else {
            line
        };
        out.push_str(&line);
        out.push('\n');
    }

    if let Some(entry) = plan.entry_count() {
        out.push('\n');
        let summary = format!(
            "{} candidates entering the funnel for {} hires",
            entry, plan.target_count
        );
        out.push_str(&color_if_tty(&summary, ANSI_FG_CYAN, tty));
        out.push('\n');
    }

    out
}

/// Render forward requirements as a table
pub fn format_requirements_table(rows: &[StageRequirement]) -> String {
    let tty = is_tty();
    let mut out = String::new();

    let header = format!(
        "{:<22} {:>7} {:>5} {:>10} {:>12}",
        "Stage", "Conv", "TAT", "Required", "Milestone"
    );
    out.push_str(&bold_if_tty(&header, tty));
    out.push('\n');

    for row in rows {
        let milestone = row
            .milestone_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<22} {:>7} {:>5} {:>10} {:>12}\n",
            truncate(&row.stage_name, 22),
            format_rate(row.conversion_rate),
            format!("{}d", row.tat_days),
            row.required_candidates,
            milestone
        ));
    }

    out
}

/// Render the pipeline list as a table
pub fn format_pipeline_list_table(pipelines: &[Pipeline], stage_counts: &[usize]) -> String {
    let tty = is_tty();
    let width = get_terminal_width();
    let mut out = String::new();

    let header = format!(
        "{:<24} {:<16} {:>6} {:<9} {}",
        "Name", "Client", "Stages", "Status", "Description"
    );
    out.push_str(&bold_if_tty(&header, tty));
    out.push('\n');

    // Fixed columns take 60 chars; description gets the rest
    let desc_width = width.saturating_sub(60).max(10);

    for (pipeline, count) in pipelines.iter().zip(stage_counts) {
        let status = pipeline.status.as_str();
        let line = format!(
            "{:<24} {:<16} {:>6} {:<9} {}",
            truncate(&pipeline.name, 24),
            truncate(pipeline.client.as_deref().unwrap_or("-"), 16),
            count,
            status,
            truncate(pipeline.description.as_deref().unwrap_or(""), desc_width)
        );
        let line = if status == "inactive" {
            color_if_tty(&line, ANSI_FG_BRIGHT_BLACK, tty)
        } else {
            line
        };
        out.push_str(&line);
        out.push('\n');
    }

    out
}

/// Render a pipeline's stage configuration as a table
pub fn format_stage_table(stages: &[Stage]) -> String {
    let tty = is_tty();
    let mut out = String::new();

    let header = format!(
        "{:<6} {:<22} {:>7} {:>5}  {}",
        "Order", "Stage", "Conv", "TAT", "Status"
    );
    out.push_str(&bold_if_tty(&header, tty));
    out.push('\n');

    for stage in stages {
        let order = if stage.is_special {
            "-".to_string()
        } else {
            stage.stage_order.to_string()
        };
        let rate = if stage.is_special {
            "-".to_string()
        } else {
            format_rate(stage.conversion_rate)
        };
        let tat = if stage.is_special {
            "-".to_string()
        } else {
            format!("{}d", stage.tat_days)
        };
        let line = format!(
            "{:<6} {:<22} {:>7} {:>5}  {}",
            order,
            truncate(&stage.name, 22),
            rate,
            tat,
            stage.maps_to_status.as_deref().unwrap_or("")
        );
        let line = if stage.is_special {
            color_if_tty(&line, ANSI_FG_YELLOW, tty)
        } else {
            line
        };
        out.push_str(&line);
        out.push('\n');
    }

    out
}

/// Render saved plan headers as a table
pub fn format_saved_plans_table(plans: &[SavedPlan]) -> String {
    let tty = is_tty();
    let mut out = String::new();

    let header = format!(
        "{:<6} {:>8} {:>12}  {}",
        "ID", "Target", "By", "Computed"
    );
    out.push_str(&bold_if_tty(&header, tty));
    out.push('\n');

    for plan in plans {
        out.push_str(&format!(
            "{:<6} {:>8} {:>12}  {}\n",
            plan.id,
            plan.target_count,
            plan.target_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            format_ts(plan.created_ts)
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stage::standard_template;
    use crate::models::PlanRequest;
    use crate::plan::compute;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly-10", 10), "exactly-10");
        assert_eq!(truncate("much too long for this", 10), "much too …");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(50.0), "50%");
        assert_eq!(format_rate(100.0), "100%");
        assert_eq!(format_rate(62.5), "62.5%");
    }

    #[test]
    fn test_plan_table_contains_counts_and_summary() {
        let plan = compute(&PlanRequest::new(standard_template(), 4)).unwrap();
        let table = format_plan_table(&plan);

        assert!(table.contains("Sourcing"));
        assert!(table.contains("28"));
        assert!(table.contains("On Boarded"));
        assert!(table.contains("28 candidates entering the funnel for 4 hires"));
        // Special stages render without counts
        assert!(table.contains("Dropped"));
    }

    #[test]
    fn test_stage_table_marks_specials() {
        let table = format_stage_table(&standard_template());
        assert!(table.contains("Sourcing"));
        assert!(table.contains("On Hold"));
        // Special stages carry no order/rate columns
        let dropped_line = table.lines().find(|l| l.contains("Dropped")).unwrap();
        assert!(dropped_line.trim_start().starts_with('-'));
    }
}
