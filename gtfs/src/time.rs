use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Seconds since the start of a service day. GTFS lets trips run past midnight, so `25:10:00` is
/// a valid time on the same service day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Time(u32);

impl Time {
    pub fn hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self(hours * 3600 + minutes * 60 + seconds)
    }

    /// Parses `H:MM:SS` or `HH:MM:SS`. Hours may exceed 23.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.trim().split(':').collect();
        if parts.len() != 3 {
            bail!("Time {raw:?} isn't HH:MM:SS");
        }
        let mut values = [0; 3];
        for (value, part) in values.iter_mut().zip(parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                bail!("Time {raw:?} has a bad component {part:?}");
            }
            *value = part.parse::<u32>()?;
        }
        let [hours, minutes, seconds] = values;
        if minutes >= 60 || seconds >= 60 {
            bail!("Time {raw:?} has minutes or seconds out of range");
        }
        hours
            .checked_mul(3600)
            .and_then(|secs| secs.checked_add(minutes * 60 + seconds))
            .map(Self)
            .ok_or_else(|| anyhow!("Time {raw:?} is too far past midnight"))
    }

    pub fn seconds(self) -> u32 {
        self.0
    }

    pub fn abs_diff(self, other: Time) -> u32 {
        self.0.abs_diff(other.0)
    }

    /// Like the `Display` impl, but without seconds.
    pub fn hh_mm(self) -> String {
        format!("{:02}:{:02}", self.0 / 3600, (self.0 % 3600) / 60)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0 / 3600,
            (self.0 % 3600) / 60,
            self.0 % 60
        )
    }
}

impl From<Time> for String {
    fn from(t: Time) -> String {
        t.to_string()
    }
}

impl TryFrom<String> for Time {
    type Error = anyhow::Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}
