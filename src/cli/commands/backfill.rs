use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::backfill::{BackfillOptions, BackfillReport, SynthesisParams, run_backfill};
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{error, field, header, info, success};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn print_report(report: &BackfillReport) {
    header(format!("Backfill {}", report.business_id));
    field("mode", if report.dry_run { "dry run" } else { "apply" });
    field("shifts scanned", report.scanned);
    field("had events", report.skipped_existing);
    field("no coordinates", report.skipped_no_coords);
    field("cap zero", report.skipped_cap_zero);
    field("generated", report.generated);
    field("inserted", report.inserted);
    field("batches", report.batches);
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Backfill {
        business,
        days,
        max_events,
        dry_run,
        overwrite,
        seed,
        exit_probability,
        reenter_probability,
    } = cmd
    else {
        return Ok(());
    };

    let opts = BackfillOptions {
        lookback_days: *days,
        dry_run: *dry_run,
        overwrite: *overwrite,
        batch_size: cfg.backfill.batch_size,
        params: SynthesisParams {
            cap: *max_events,
            exit_probability: *exit_probability,
            reenter_probability: *reenter_probability,
        },
        ..BackfillOptions::new(business.as_str())
    };
    opts.validate()?;

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(*s),
        None => StdRng::from_os_rng(),
    };

    let mut pool = DbPool::open_migrated(&cfg.database)?;

    match run_backfill(&mut pool.conn, &opts, &mut rng, Utc::now()) {
        Ok(report) => {
            print_report(&report);
            if report.dry_run {
                info("Dry run: nothing written (pass --dry-run false to apply)");
            } else {
                success(format!("{} events inserted", report.inserted));
            }
            Ok(())
        }
        Err(AppError::BackfillAborted { report, reason }) => {
            error("Backfill aborted; earlier batches stay committed");
            print_report(&report);
            Err(AppError::BackfillAborted { report, reason })
        }
        Err(e) => Err(e),
    }
}
