use attendance_core::time::{format_duration, TIMESTAMP_FORMAT};
use attendance_core::DayRecord;
use chrono::NaiveDateTime;
use tabled::settings::object::Rows;
use tabled::settings::{Color, Modify, Style};
use tabled::{Table, Tabled};

// Helper struct for Table Row
#[derive(Tabled)]
struct LedgerRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Time In")]
    time_in: String,
    #[tabled(rename = "Time Out")]
    time_out: String,
    #[tabled(rename = "Check-ins")]
    checkins: u32,
    #[tabled(rename = "Time Today")]
    total: String,
}

pub fn show_days(days: &[DayRecord]) {
    if days.is_empty() {
        println!("No attendance recorded.");
        return;
    }

    let mut rows = Vec::new();
    for day in days {
        let day_header = format!(
            "{} ({})\n{}",
            day.day,
            day.day.date().format("%a"),
            format_duration(day.total_time())
        );

        for (i, (name, today)) in day.members.iter().enumerate() {
            // Date column: Only show on first row of the day group
            let date_col = if i == 0 { day_header.clone() } else { String::new() };

            rows.push(LedgerRow {
                date: date_col,
                name: name.clone(),
                time_in: stamp(today.time_in),
                time_out: stamp(today.time_out),
                checkins: today.checkins,
                total: format_duration(today.total_time()),
            });
        }
    }

    let mut table = Table::new(rows);
    table
        .with(Style::modern())
        .with(Modify::new(Rows::first()).with(Color::FG_CYAN));

    println!("{}", table);
}

fn stamp(at: Option<NaiveDateTime>) -> String {
    at.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}
