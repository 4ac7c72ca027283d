//! Milestone plans, the month calendar, and design-input text.
//!
//! Plans are imported from spreadsheet exports (CSV rows of `date,milestone`)
//! or added by hand. The design-input note is free text that imported text
//! files are appended to.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::subproject::SubProject;
use crate::task::new_id;

/// Header and sample rows offered as an import template.
pub const PLAN_CSV_TEMPLATE: &str =
    "Date,Milestone\n2024-06-01,Preliminary Design\n2024-07-01,Construction Drawings\n";

/// Skeleton offered as a design-input template.
pub const DESIGN_INPUT_TEMPLATE: &str =
    "Design Input Template\n\n1. Outdoor Parameters:\n2. Indoor Parameters:\n3. Special Requirements:\n";

/// A dated milestone on the sub-project calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignPlan {
    pub id: String,
    pub name: String,
    /// `YYYY-MM-DD` when imported from a well-formed sheet; kept verbatim otherwise.
    pub date: String,
}

impl DesignPlan {
    pub fn new(name: &str, date: &str) -> Self {
        DesignPlan {
            id: new_id("p"),
            name: name.to_string(),
            date: date.trim().to_string(),
        }
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

/// Convert a spreadsheet serial day number to a date.
///
/// Serial 25569 is 1970-01-01; fractional parts (time of day) round to the
/// nearest day. Serials outside the supported date range give `None`.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    let offset = (serial - 25569.0).round() as i64;
    epoch.checked_add_signed(Duration::try_days(offset)?)
}

/// Parse plan rows from CSV text. The first row is a header and is skipped;
/// rows with fewer than two fields or an empty date or name are ignored.
pub fn parse_plan_csv(content: &str) -> Vec<DesignPlan> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields = parse_csv_line(line);
            if fields.len() < 2 {
                return None;
            }
            let raw_date = fields[0].trim();
            let name = fields[1].trim();
            if raw_date.is_empty() || name.is_empty() {
                return None;
            }
            let date = match raw_date.parse::<f64>() {
                Ok(serial) => serial_to_date(serial)?.format("%Y-%m-%d").to_string(),
                Err(_) => raw_date.to_string(),
            };
            Some(DesignPlan::new(name, &date))
        })
        .collect()
}

/// Simple CSV line parser that handles quoted fields.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Escaped quote
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                fields.push(current_field);
                current_field = String::new();
            }
            _ => current_field.push(ch),
        }
    }

    fields.push(current_field);
    fields
}

/// Plans on or after `today`, earliest first. Plans with unparseable dates are skipped.
pub fn upcoming(plans: &[DesignPlan], today: NaiveDate, limit: usize) -> Vec<&DesignPlan> {
    let mut dated: Vec<(NaiveDate, &DesignPlan)> = plans
        .iter()
        .filter_map(|p| p.parsed_date().map(|d| (d, p)))
        .filter(|(d, _)| *d >= today)
        .collect();
    dated.sort_by_key(|(d, _)| *d);
    dated.into_iter().take(limit).map(|(_, p)| p).collect()
}

pub fn plans_on(plans: &[DesignPlan], date: NaiveDate) -> Vec<&DesignPlan> {
    plans.iter().filter(|p| p.parsed_date() == Some(date)).collect()
}

/// Weeks of a month, Sunday first. Days outside the month are `None`.
pub fn month_weeks(year: i32, month: u32) -> Option<Vec<[Option<NaiveDate>; 7]>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let lead = first.weekday().num_days_from_sunday() as usize;

    let mut weeks = Vec::new();
    let mut week: [Option<NaiveDate>; 7] = [None; 7];
    let mut slot = lead;
    let mut day = first;
    while day.month() == month {
        week[slot] = Some(day);
        slot += 1;
        if slot == 7 {
            weeks.push(week);
            week = [None; 7];
            slot = 0;
        }
        day = match day.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }
    if slot > 0 {
        weeks.push(week);
    }
    Some(weeks)
}

/// Append plans to a sub-project.
pub fn add_plans(sp: &SubProject, plans: Vec<DesignPlan>) -> SubProject {
    let mut next = sp.clone();
    next.plans.extend(plans);
    next
}

pub fn remove_plan(sp: &SubProject, plan_id: &str) -> SubProject {
    let mut next = sp.clone();
    next.plans.retain(|p| p.id != plan_id);
    next
}

/// Append an imported file to the design-input note.
///
/// Text files contribute their content; other files leave a notice so the
/// designer can transcribe the relevant inputs by hand.
pub fn append_design_input(sp: &SubProject, file_name: &str, content: Option<&str>) -> SubProject {
    let addition = match content {
        Some(text) if file_name.to_lowercase().ends_with(".txt") => text.to_string(),
        _ => format!(
            "[Imported file: {}]\nSummarise the key design inputs from this file here...",
            file_name
        ),
    };
    let mut next = sp.clone();
    next.design_input_content = format!("{}\n\n{}", next.design_input_content, addition);
    next
}
