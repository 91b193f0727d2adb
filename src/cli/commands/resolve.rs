use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::site_resolver::{SiteMatch, SiteSelection, resolve_for_actor};
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::models::Coordinate;
use crate::ui::messages::{info, success, warning};
use crate::utils::colors::{GREY, RESET};

fn describe(m: &SiteMatch) -> String {
    format!(
        "{} {}({}, {:.0} m, radius {:.0} m){}",
        m.site.display_name(),
        GREY,
        m.site.id,
        m.distance_m,
        m.site.effective_radius(),
        RESET
    )
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Resolve { who, lat, lng } = cmd {
        let actor = who.to_actor(None);
        let pool = DbPool::open_migrated(&cfg.database)?;

        match resolve_for_actor(&pool.conn, &actor, Coordinate::new(*lat, *lng))? {
            SiteSelection::None => {
                info("No job site in range: pick one manually");
            }
            SiteSelection::Single { chosen } => {
                success(format!("At {}", describe(&chosen)));
            }
            SiteSelection::Ambiguous {
                chosen,
                alternatives,
            } => {
                warning(format!(
                    "Overlapping sites; closest is {}",
                    describe(&chosen)
                ));
                for alt in &alternatives {
                    println!("   also in range: {}", describe(alt));
                }
            }
        }
    }

    Ok(())
}
