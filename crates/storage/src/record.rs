//! Log record format

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column names, in order
pub const LOG_HEADER: [&str; 4] = ["Time", "EAR", "Score", "Alert"];

/// Local time, second precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Alert column value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertFlag {
    Yes,
    No,
}

impl From<bool> for AlertFlag {
    fn from(alert: bool) -> Self {
        if alert {
            AlertFlag::Yes
        } else {
            AlertFlag::No
        }
    }
}

impl fmt::Display for AlertFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertFlag::Yes => "Yes",
            AlertFlag::No => "No",
        })
    }
}

impl FromStr for AlertFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(AlertFlag::Yes),
            "No" => Ok(AlertFlag::No),
            other => Err(format!("alert must be Yes or No, got {:?}", other)),
        }
    }
}

/// One logged frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    /// Mean EAR rounded to 3 decimals
    pub ear: f64,
    pub score: u32,
    pub alert: AlertFlag,
}

impl LogRecord {
    /// Build a record, truncating the time to seconds and rounding the EAR
    pub fn new(timestamp: NaiveDateTime, ear: f64, score: u32, alert: bool) -> Self {
        Self {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            ear: round_ear(ear),
            score,
            alert: alert.into(),
        }
    }

    /// Build a record stamped with the current local time
    pub fn now(ear: f64, score: u32, alert: bool) -> Self {
        Self::new(Local::now().naive_local(), ear, score, alert)
    }

    /// EAR is written in its shortest exact form, keeping `.0` on whole
    /// values (`0.0`, `1.0`)
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{:?},{},{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.ear,
            self.score,
            self.alert
        )
    }

    pub fn parse_csv_row(line: &str) -> Result<Self, String> {
        let fields: Vec<&str> = line.split(',').collect();
        let [time, ear, score, alert] = fields.as_slice() else {
            return Err(format!(
                "expected {} fields, got {}",
                LOG_HEADER.len(),
                fields.len()
            ));
        };

        Ok(Self {
            timestamp: NaiveDateTime::parse_from_str(time, TIMESTAMP_FORMAT)
                .map_err(|e| format!("bad time {:?}: {}", time, e))?,
            ear: ear.parse().map_err(|e| format!("bad EAR {:?}: {}", ear, e))?,
            score: score.parse().map_err(|e| format!("bad score {:?}: {}", score, e))?,
            alert: alert.parse()?,
        })
    }
}

/// Round to 3 decimals on the exact binary value, so 0.1235 (stored just
/// below the tie) rounds down
fn round_ear(ear: f64) -> f64 {
    format!("{:.3}", ear).parse().unwrap_or(ear)
}
