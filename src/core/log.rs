use crate::db::log::load_log;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::utils::colors::{CYAN, GREEN, MAGENTA, RESET, YELLOW};

const OP_TARGET_MAX: usize = 60;

fn color_for_operation(op: &str) -> &'static str {
    match op {
        "init" | "seed" => GREEN,
        "backfill" => YELLOW,
        "migration_applied" => MAGENTA,
        _ => CYAN,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

pub struct LogLogic;

impl LogLogic {
    pub fn print_log(pool: &mut DbPool) -> AppResult<()> {
        let rows = load_log(&pool.conn)?;
        if rows.is_empty() {
            println!("📜 Internal log is empty.");
            return Ok(());
        }

        let entries: Vec<(i64, String, String, String, String)> = rows
            .into_iter()
            .map(|r| {
                let date = chrono::DateTime::parse_from_rfc3339(&r.date)
                    .map(|dt| dt.format("%FT%T%:z").to_string())
                    .unwrap_or(r.date);
                let op_target = if r.target.is_empty() {
                    r.operation.clone()
                } else {
                    truncate(&format!("{} ({})", r.operation, r.target), OP_TARGET_MAX)
                };
                (r.id, date, r.operation, op_target, r.message)
            })
            .collect();

        let id_w = entries.iter().map(|e| e.0.to_string().len()).max().unwrap_or(1);
        let date_w = entries.iter().map(|e| e.1.len()).max().unwrap_or(10);
        let op_w = entries
            .iter()
            .map(|e| e.3.chars().count())
            .max()
            .unwrap_or(10)
            .min(OP_TARGET_MAX);

        println!("📜 Internal log:\n");

        for (id, date, operation, op_target, message) in entries {
            // Only the operation word is colored; padding is computed on the plain text.
            let padding = " ".repeat(op_w.saturating_sub(op_target.chars().count()));
            let colored = match op_target.split_once(' ') {
                Some((op, rest)) => format!("{}{op}{RESET} {rest}", color_for_operation(&operation)),
                None => format!("{}{op_target}{RESET}", color_for_operation(&operation)),
            };

            println!("{id:>id_w$}: {date:<date_w$} | {colored}{padding} => {message}");
        }

        Ok(())
    }
}
