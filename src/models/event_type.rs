use serde::{Deserialize, Serialize};
use std::fmt;

/// Geofence boundary crossing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceEventType {
    Enter,
    Exit,
}

impl GeofenceEventType {
    /// The transition that leads into the given presence state.
    pub fn for_inside(inside: bool) -> Self {
        if inside { Self::Enter } else { Self::Exit }
    }

    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            GeofenceEventType::Enter => "enter",
            GeofenceEventType::Exit => "exit",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "enter" => Some(GeofenceEventType::Enter),
            "exit" => Some(GeofenceEventType::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for GeofenceEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

/// Audit-stream event attached to a time entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShiftEventType {
    ClockIn,
    ClockOut,
    ManagerClockOut,
    Edit,
}

impl ShiftEventType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShiftEventType::ClockIn => "clock_in",
            ShiftEventType::ClockOut => "clock_out",
            ShiftEventType::ManagerClockOut => "manager_clock_out",
            ShiftEventType::Edit => "edit",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "clock_in" => Some(ShiftEventType::ClockIn),
            "clock_out" => Some(ShiftEventType::ClockOut),
            "manager_clock_out" => Some(ShiftEventType::ManagerClockOut),
            "edit" => Some(ShiftEventType::Edit),
            _ => None,
        }
    }

    /// Both a worker's own clock-out and a manager closing the shift end it.
    pub fn closes_shift(&self) -> bool {
        matches!(
            self,
            ShiftEventType::ClockOut | ShiftEventType::ManagerClockOut
        )
    }
}

impl fmt::Display for ShiftEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

/// Origin tag carried by every recorded event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    #[default]
    Mobile,
    Web,
    System,
}

impl EventSource {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EventSource::Mobile => "mobile",
            EventSource::Web => "web",
            EventSource::System => "system",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "mobile" => Some(EventSource::Mobile),
            "web" => Some(EventSource::Web),
            "system" => Some(EventSource::System),
            _ => None,
        }
    }
}
