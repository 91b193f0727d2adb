//! Pick the job site(s) a device is currently standing in.

use crate::core::auth::accessible_businesses;
use crate::core::geo::{distance_meters, is_inside};
use crate::db::sites::{load_active_sites_for, load_all_active_sites};
use crate::errors::AppResult;
use crate::models::{Actor, Coordinate, Site};
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteMatch {
    pub site: Site,
    pub distance_m: f64,
}

/// Every site whose geofence contains `position`, closest first.
/// Sites without coordinates are skipped.
pub fn resolve_sites(position: Coordinate, candidates: &[Site]) -> Vec<SiteMatch> {
    let mut matches: Vec<SiteMatch> = candidates
        .iter()
        .filter_map(|site| {
            let center = site.center()?;
            let d = distance_meters(position, center);
            is_inside(d, site.effective_radius()).then(|| SiteMatch {
                site: site.clone(),
                distance_m: d,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        a.distance_m
            .total_cmp(&b.distance_m)
            .then_with(|| a.site.id.cmp(&b.site.id))
    });
    matches
}

/// Selection policy for callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "selection", rename_all = "snake_case")]
pub enum SiteSelection {
    /// Nothing in range: the user has to pick manually.
    None,
    Single { chosen: SiteMatch },
    /// Overlapping sites: the closest is chosen but the caller must flag it.
    Ambiguous {
        chosen: SiteMatch,
        alternatives: Vec<SiteMatch>,
    },
}

impl SiteSelection {
    pub fn chosen(&self) -> Option<&SiteMatch> {
        match self {
            SiteSelection::None => None,
            SiteSelection::Single { chosen } | SiteSelection::Ambiguous { chosen, .. } => {
                Some(chosen)
            }
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, SiteSelection::Ambiguous { .. })
    }
}

pub fn select_site(mut matches: Vec<SiteMatch>) -> SiteSelection {
    match matches.len() {
        0 => SiteSelection::None,
        1 => SiteSelection::Single {
            chosen: matches.remove(0),
        },
        _ => {
            let chosen = matches.remove(0);
            SiteSelection::Ambiguous {
                chosen,
                alternatives: matches,
            }
        }
    }
}

/// Resolve against every active site the actor can reach: all of them for
/// admins, otherwise those of businesses with an active membership.
pub fn resolve_for_actor(conn: &Connection, actor: &Actor, position: Coordinate) -> AppResult<SiteSelection> {
    let candidates = match accessible_businesses(conn, actor)? {
        None => load_all_active_sites(conn)?,
        Some(ids) => load_active_sites_for(conn, &ids)?,
    };

    let selection = select_site(resolve_sites(position, &candidates));
    tracing::debug!(
        candidates = candidates.len(),
        ambiguous = selection.is_ambiguous(),
        "site resolution"
    );
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::offset;

    fn origin() -> Coordinate {
        Coordinate::new(45.0, 9.0)
    }

    fn site_at(id: &str, center: Option<Coordinate>, radius_m: f64) -> Site {
        Site {
            id: id.into(),
            business_id: "b1".into(),
            name: id.to_uppercase(),
            lat: center.map(|c| c.lat),
            lng: center.map(|c| c.lng),
            radius_m: Some(radius_m),
            active: true,
        }
    }

    #[test]
    fn nothing_in_range_selects_nothing() {
        let far = site_at("far", Some(offset(origin(), 2_000.0, 0.0)), 300.0);
        let matches = resolve_sites(origin(), &[far]);
        assert!(matches.is_empty());
        assert_eq!(select_site(matches), SiteSelection::None);
    }

    #[test]
    fn single_match_is_auto_selected() {
        let near = site_at("near", Some(offset(origin(), 120.0, 1.0)), 300.0);
        let far = site_at("far", Some(offset(origin(), 2_000.0, 0.0)), 300.0);

        let selection = select_site(resolve_sites(origin(), &[far, near]));
        assert!(!selection.is_ambiguous());
        let SiteSelection::Single { chosen } = selection else {
            panic!("expected a single match");
        };
        assert_eq!(chosen.site.id, "near");
        assert!((chosen.distance_m - 120.0).abs() < 1.0);
    }

    #[test]
    fn overlapping_sites_pick_the_closest_and_flag_it() {
        let wide = site_at("wide", Some(offset(origin(), 250.0, 2.0)), 400.0);
        let tight = site_at("tight", Some(offset(origin(), 40.0, 0.5)), 100.0);
        let unmapped = site_at("unmapped", None, 300.0);

        let matches = resolve_sites(origin(), &[wide, unmapped, tight]);
        let ids: Vec<&str> = matches.iter().map(|m| m.site.id.as_str()).collect();
        assert_eq!(ids, vec!["tight", "wide"]);
        assert!(matches[0].distance_m <= matches[1].distance_m);

        let selection = select_site(matches);
        assert!(selection.is_ambiguous());
        assert_eq!(selection.chosen().map(|m| m.site.id.as_str()), Some("tight"));
        let SiteSelection::Ambiguous { alternatives, .. } = selection else {
            panic!("expected an ambiguous match");
        };
        assert_eq!(alternatives.len(), 1);
        assert_eq!(alternatives[0].site.id, "wide");
    }

    #[test]
    fn sites_without_coordinates_are_skipped() {
        let unmapped = site_at("unmapped", None, 300.0);
        assert!(resolve_sites(origin(), &[unmapped]).is_empty());
    }
}
