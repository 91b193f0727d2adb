use crate::core::report::{AttendanceSource, HoursBucket, Report};
use crate::utils::colors::{CYAN, RESET, YELLOW, color_for_percent};
use crate::utils::formatting::{describe_inside, describe_percent, hours2readable};
use crate::utils::table::Table;
use std::fmt::Write;

fn paint(s: &str, color: &str, enabled: bool) -> String {
    if enabled {
        format!("{color}{s}{RESET}")
    } else {
        s.to_string()
    }
}

fn distance(d: Option<u32>) -> String {
    d.map(|v| format!("{v} m")).unwrap_or_else(|| "--".to_string())
}

fn buckets_table(title: &str, buckets: &[HoursBucket]) -> String {
    let mut t = Table::with_headers(&[title, "Hours"]);
    for b in buckets {
        t.add_row(vec![b.name.clone(), hours2readable(b.hours)]);
    }
    t.render()
}

/// Human-readable report; `color` adds ANSI colors to headings and percentages.
pub fn render_report(report: &Report, color: bool) -> String {
    let mut out = String::new();
    let heading = |s: &str| paint(s, CYAN, color);

    let _ = writeln!(out, "{}", heading(&format!("Report for business {}", report.business_id)));
    let _ = writeln!(
        out,
        "Range: {} → {}{}",
        report.range.start.format("%Y-%m-%d"),
        (report.range.end - chrono::Duration::days(1)).format("%Y-%m-%d"),
        if report.range.fell_back {
            paint(" (invalid custom range, showing last 7 days)", YELLOW, color)
        } else {
            String::new()
        }
    );
    let _ = writeln!(out, "Total hours:     {}", hours2readable(report.total_hours));
    let _ = writeln!(out, "This week:       {}", hours2readable(report.week_hours));
    let _ = writeln!(out, "Active sites:    {}", report.active_sites);
    if report.attendance_source == AttendanceSource::ShiftRows {
        let _ = writeln!(
            out,
            "{}",
            paint("Attendance derived from shift rows (audit stream unavailable)", YELLOW, color)
        );
    }
    out.push('\n');

    let _ = writeln!(out, "{}", heading("Top projects"));
    out.push_str(&buckets_table("Project", &report.top_projects));
    out.push('\n');
    let _ = writeln!(out, "{}", heading("Top workers"));
    out.push_str(&buckets_table("Worker", &report.top_workers));
    out.push('\n');

    let _ = writeln!(out, "{}", heading("Attendance"));
    if report.attendance.is_empty() {
        out.push_str("No shifts in range.\n");
    } else {
        let mut t = Table::with_headers(&[
            "Worker", "Project", "Clock in", "In", "Clock out", "Out", "Hours", "Source",
        ]);
        for r in &report.attendance {
            t.add_row(vec![
                r.employee_name.clone(),
                r.project_name.clone(),
                r.clock_in.format("%Y-%m-%d %H:%M").to_string(),
                format!("{} {}", describe_inside(r.clock_in_inside), distance(r.clock_in_distance_m)),
                r.clock_out
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "open".to_string()),
                format!("{} {}", describe_inside(r.clock_out_inside), distance(r.clock_out_distance_m)),
                hours2readable(r.hours),
                match r.source {
                    AttendanceSource::AuditStream => "audit",
                    AttendanceSource::ShiftRows => "shift",
                }
                .to_string(),
            ]);
        }
        out.push_str(&t.render());
    }
    out.push('\n');

    let _ = writeln!(out, "{}", heading("Geofence compliance"));
    if report.compliance.is_empty() {
        out.push_str("No punches in range.\n");
    } else {
        let mut t = Table::with_headers(&["Project", "Inside", "Total", "Exits", "Inside %"]);
        for c in &report.compliance {
            t.add_row(vec![
                c.project_name.clone(),
                c.punches_inside.to_string(),
                c.punches_total.to_string(),
                c.exit_events.to_string(),
                describe_percent(c.percent_inside),
            ]);
        }
        let rendered = t.render();
        if color {
            // Color whole lines by compliance; header line stays plain.
            let mut lines = rendered.lines();
            if let Some(h) = lines.next() {
                let _ = writeln!(out, "{h}");
            }
            for (line, c) in lines.zip(&report.compliance) {
                let _ = writeln!(out, "{}{line}{RESET}", color_for_percent(c.percent_inside));
            }
        } else {
            out.push_str(&rendered);
        }
    }

    out
}
