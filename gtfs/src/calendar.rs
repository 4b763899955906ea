use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer};

use super::ServiceID;

#[derive(Default)]
pub struct Calendar {
    pub services: BTreeMap<ServiceID, Service>,
}

pub struct Service {
    pub service_id: ServiceID,
    pub days_of_week: DaysOfWeek,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    pub extra_days: BTreeSet<NaiveDate>,
    pub removed_days: BTreeSet<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DaysOfWeek {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

#[derive(Clone, Debug)]
pub enum DateFilter {
    None,
    SingleDay(NaiveDate),
    Daily(DaysOfWeek),
}

impl Calendar {
    pub fn services_matching_dates(&self, filter: &DateFilter) -> BTreeSet<&ServiceID> {
        let mut result = BTreeSet::new();
        for service in self.services.values() {
            if service.matches_date(filter) {
                result.insert(&service.service_id);
            }
        }
        result
    }

    /// Feeds without calendar.txt or calendar_dates.txt can't be filtered by date, so everything
    /// matches. With no filter, even services missing from the calendar match.
    pub fn service_matches(&self, service_id: &ServiceID, filter: &DateFilter) -> bool {
        if self.services.is_empty() || matches!(filter, DateFilter::None) {
            return true;
        }
        self.services
            .get(service_id)
            .map(|s| s.matches_date(filter))
            .unwrap_or(false)
    }
}

impl Service {
    pub fn matches_date(&self, filter: &DateFilter) -> bool {
        match filter {
            DateFilter::None => true,
            DateFilter::SingleDay(day) => {
                if self.extra_days.contains(day) {
                    return true;
                }
                if self.removed_days.contains(day) {
                    return false;
                }
                if day < &self.start_date || day > &self.end_date {
                    return false;
                }
                self.days_of_week.includes(day)
            }
            DateFilter::Daily(days_of_week) => self.days_of_week.overlaps(days_of_week),
        }
    }
}

impl DaysOfWeek {
    pub fn all() -> Self {
        Self {
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: true,
            sunday: true,
        }
    }

    pub fn none() -> Self {
        Self {
            monday: false,
            tuesday: false,
            wednesday: false,
            thursday: false,
            friday: false,
            saturday: false,
            sunday: false,
        }
    }

    /// A comma-separated list of `weekdays`, `weekends`, `all`, or day names like `mon` and
    /// `saturday`.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut days = Self::none();
        for part in raw.split(',') {
            match part.trim().to_lowercase().as_str() {
                "all" => days = Self::all(),
                "weekdays" => {
                    days.monday = true;
                    days.tuesday = true;
                    days.wednesday = true;
                    days.thursday = true;
                    days.friday = true;
                }
                "weekends" => {
                    days.saturday = true;
                    days.sunday = true;
                }
                "mon" | "monday" => days.monday = true,
                "tue" | "tuesday" => days.tuesday = true,
                "wed" | "wednesday" => days.wednesday = true,
                "thu" | "thursday" => days.thursday = true,
                "fri" | "friday" => days.friday = true,
                "sat" | "saturday" => days.saturday = true,
                "sun" | "sunday" => days.sunday = true,
                x => bail!("Unknown day {x:?} in {raw:?}"),
            }
        }
        Ok(days)
    }

    pub fn describe(&self) -> String {
        let weekdays = [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
        ]
        .into_iter()
        .filter(|x| *x)
        .count();
        let weekends = [self.saturday, self.sunday]
            .into_iter()
            .filter(|x| *x)
            .count();
        if weekdays + weekends == 7 {
            return "every day".to_string();
        }
        if weekdays == 5 && weekends == 0 {
            return "weekdays".to_string();
        }
        if weekdays == 0 && weekends == 2 {
            return "weekends".to_string();
        }
        if weekdays == 0 && weekends == 0 {
            return "specific dates".to_string();
        }
        let mut result = String::new();
        for (day, operates) in [
            ("M", self.monday),
            ("T", self.tuesday),
            ("W", self.wednesday),
            ("Th", self.thursday),
            ("F", self.friday),
            ("Sat", self.saturday),
            ("Sun", self.sunday),
        ] {
            if operates {
                result.push_str(day);
            }
        }
        result
    }

    pub fn overlaps(&self, other: &DaysOfWeek) -> bool {
        (self.monday && other.monday)
            || (self.tuesday && other.tuesday)
            || (self.wednesday && other.wednesday)
            || (self.thursday && other.thursday)
            || (self.friday && other.friday)
            || (self.saturday && other.saturday)
            || (self.sunday && other.sunday)
    }

    pub fn includes(&self, day: &NaiveDate) -> bool {
        match day.weekday() {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }
}

pub fn load<R: std::io::Read>(reader: R) -> Result<Calendar> {
    let mut calendar = Calendar::default();
    for rec in super::csv_reader(reader).deserialize() {
        let rec: Record = rec?;
        if calendar.services.contains_key(&rec.service_id) {
            bail!("Duplicate {:?}", rec.service_id);
        }
        calendar.services.insert(
            rec.service_id.clone(),
            Service {
                service_id: rec.service_id,
                days_of_week: DaysOfWeek {
                    monday: rec.monday,
                    tuesday: rec.tuesday,
                    wednesday: rec.wednesday,
                    thursday: rec.thursday,
                    friday: rec.friday,
                    saturday: rec.saturday,
                    sunday: rec.sunday,
                },
                start_date: parse_date(&rec.start_date)?,
                end_date: parse_date(&rec.end_date)?,

                extra_days: BTreeSet::new(),
                removed_days: BTreeSet::new(),
            },
        );
    }
    Ok(calendar)
}

/// Some feeds only use calendar_dates.txt. A service that only appears there runs on exactly the
/// added dates.
pub fn load_exceptions<R: std::io::Read>(calendar: &mut Calendar, reader: R) -> Result<()> {
    for rec in super::csv_reader(reader).deserialize() {
        let rec: DateRecord = rec?;
        let date = parse_date(&rec.date)?;
        let service = calendar
            .services
            .entry(rec.service_id.clone())
            .or_insert_with(|| Service {
                service_id: rec.service_id.clone(),
                days_of_week: DaysOfWeek::none(),
                start_date: date,
                end_date: date,
                extra_days: BTreeSet::new(),
                removed_days: BTreeSet::new(),
            });
        if rec.exception_type == 1 {
            service.extra_days.insert(date);
        } else if rec.exception_type == 2 {
            service.removed_days.insert(date);
        } else {
            bail!("Unknown exception_type {}", rec.exception_type);
        }
    }
    Ok(())
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|err| anyhow!("Bad date {raw:?}: {err}"))
}

#[derive(Deserialize)]
struct Record {
    service_id: ServiceID,
    #[serde(deserialize_with = "parse_bool")]
    monday: bool,
    #[serde(deserialize_with = "parse_bool")]
    tuesday: bool,
    #[serde(deserialize_with = "parse_bool")]
    wednesday: bool,
    #[serde(deserialize_with = "parse_bool")]
    thursday: bool,
    #[serde(deserialize_with = "parse_bool")]
    friday: bool,
    #[serde(deserialize_with = "parse_bool")]
    saturday: bool,
    #[serde(deserialize_with = "parse_bool")]
    sunday: bool,
    start_date: String,
    end_date: String,
}

fn parse_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let n = <u8>::deserialize(d)?;
    if n == 1 {
        return Ok(true);
    }
    if n == 0 {
        return Ok(false);
    }
    Err(serde::de::Error::custom(format!("Unknown bool value {n}")))
}

#[derive(Deserialize)]
struct DateRecord {
    service_id: ServiceID,
    date: String,
    exception_type: u8,
}
