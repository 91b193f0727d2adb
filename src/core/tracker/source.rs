//! Device position providers.

use crate::errors::{AppError, AppResult};
use crate::models::Coordinate;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

#[async_trait]
pub trait PositionSource: Send {
    /// One position reading. Errors mean denial or failure; the tick is skipped.
    async fn current_position(&mut self) -> AppResult<Coordinate>;

    /// No more readings will ever come (ends the tracking session).
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Replays a recorded track: one reading per tick.
///
/// File format: one `lat,lng` per line; `-` is a failed reading; blank lines
/// and `#` comments are ignored.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    readings: VecDeque<Option<Coordinate>>,
}

impl ReplaySource {
    pub fn from_readings(readings: impl IntoIterator<Item = Option<Coordinate>>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
        }
    }

    pub fn parse(text: &str) -> AppResult<Self> {
        let mut readings = VecDeque::new();

        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line == "-" {
                readings.push_back(None);
                continue;
            }

            let bad = || AppError::Validation {
                field: "replay",
                reason: format!("line {}: expected 'lat,lng', got '{line}'", n + 1),
            };
            let (lat, lng) = line.split_once(',').ok_or_else(bad)?;
            let lat: f64 = lat.trim().parse().map_err(|_| bad())?;
            let lng: f64 = lng.trim().parse().map_err(|_| bad())?;
            readings.push_back(Some(Coordinate::new(lat, lng)));
        }

        Ok(Self { readings })
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

#[async_trait]
impl PositionSource for ReplaySource {
    async fn current_position(&mut self) -> AppResult<Coordinate> {
        match self.readings.pop_front() {
            Some(Some(c)) => Ok(c),
            Some(None) => Err(AppError::Transport("position unavailable".to_string())),
            None => Err(AppError::Transport("replay exhausted".to_string())),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.readings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_points_gaps_and_comments() {
        let src = ReplaySource::parse("# walk-in\n39.0,-105.0\n\n-\n 39.001 , -105.0 \n").unwrap();
        assert_eq!(src.remaining(), 3);
    }

    #[test]
    fn rejects_garbage_lines() {
        let err = ReplaySource::parse("39.0;-105.0").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
