//! Train search and schedule checks.

use serde::Deserialize;
use serde_json::{Map, Value};
use serde_yaml::Mapping;
use std::collections::BTreeSet;

use super::args::{self, optional_scalar, scalar, scalar_list, scalar_rows};
use super::{Check, CheckEnv, CheckError};
use crate::site::{extract_table, SearchQuery, Site, SiteError};
use crate::tasks::CatalogError;

/// Fields a search result object may carry. Anything else fails the check.
pub const ALLOWED_SEARCH_KEYS: &[&str] = &[
    "number",
    "name",
    "from_station_code",
    "from_station_name",
    "to_station_code",
    "to_station_name",
    "departure",
    "arrival",
    "duration_h",
    "duration_m",
];

/// Passes when the search API returns exactly the expected train numbers and
/// no result carries fields outside [`ALLOWED_SEARCH_KEYS`].
#[derive(Debug)]
pub struct SearchTrains {
    query: SearchQuery,
    expected_trains: BTreeSet<String>,
    title: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchTrainsArgs {
    #[serde(deserialize_with = "scalar")]
    from_station_code: String,
    #[serde(deserialize_with = "scalar")]
    to_station_code: String,
    #[serde(default, deserialize_with = "optional_scalar")]
    ticket_class: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    departure_time: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    arrival_time: Option<String>,
    #[serde(deserialize_with = "scalar_list")]
    expected_trains: Vec<String>,
}

impl SearchTrains {
    pub const KIND: &'static str = "check_search_trains";

    pub fn new<I, S>(query: SearchQuery, expected_trains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut title = format!(
            "Check search trains: {} -> {}",
            query.from_station_code, query.to_station_code
        );
        let filters: Vec<String> = [
            ("class", &query.ticket_class),
            ("departure", &query.departure_time),
            ("arrival", &query.arrival_time),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_ref().map(|v| format!("{label}={v}")))
        .collect();
        if !filters.is_empty() {
            title.push_str(&format!(" ({})", filters.join(", ")));
        }

        Self {
            query,
            expected_trains: expected_trains.into_iter().map(Into::into).collect(),
            title,
        }
    }

    pub(crate) fn from_args(args: Mapping, _env: &CheckEnv) -> Result<Box<dyn Check>, CatalogError> {
        let parsed: SearchTrainsArgs = args::parse(Self::KIND, args)?;
        let query = SearchQuery {
            from_station_code: parsed.from_station_code,
            to_station_code: parsed.to_station_code,
            ticket_class: parsed.ticket_class,
            departure_time: parsed.departure_time,
            arrival_time: parsed.arrival_time,
        };
        Ok(Box::new(Self::new(query, parsed.expected_trains)))
    }
}

impl Check for SearchTrains {
    fn title(&self) -> &str {
        &self.title
    }

    fn run(&self, site: &Site) -> Result<(), CheckError> {
        let results = site.search_trains(&self.query)?;

        let numbers = results
            .iter()
            .map(train_number)
            .collect::<Result<BTreeSet<String>, SiteError>>()?;
        if numbers != self.expected_trains {
            return Err(CheckError::Failed(format!(
                "Searching trains from {} to {},\nexpected trains: {},\nbut found: {}",
                self.query.from_station_code,
                self.query.to_station_code,
                join(self.expected_trains.iter()),
                join(numbers.iter())
            )));
        }

        let unexpected: Vec<String> = results
            .iter()
            .flat_map(|train| {
                train
                    .keys()
                    .filter(|key| !ALLOWED_SEARCH_KEYS.contains(&key.as_str()))
                    .map(|key| format!("{key} (train {})", display_number(train)))
                    .collect::<Vec<_>>()
            })
            .collect();
        if !unexpected.is_empty() {
            return Err(CheckError::Failed(format!(
                "Search results contain unexpected fields: {}.\nAllowed fields are: {}",
                unexpected.join(", "),
                ALLOWED_SEARCH_KEYS.join(", ")
            )));
        }

        Ok(())
    }
}

fn train_number(train: &Map<String, Value>) -> Result<String, SiteError> {
    match train.get("number") {
        Some(Value::String(number)) => Ok(number.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        _ => Err(SiteError::Parse(format!(
            "search result without a `number` field: {}",
            Value::Object(train.clone())
        ))),
    }
}

fn display_number(train: &Map<String, Value>) -> String {
    train_number(train).unwrap_or_else(|_| "?".to_string())
}

fn join<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let items: Vec<&str> = items.map(String::as_str).collect();
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(" ")
    }
}

/// Passes when every expected row appears in the train's schedule table.
#[derive(Debug)]
pub struct TrainSchedule {
    train_number: String,
    expected_rows: Vec<Vec<String>>,
    title: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TrainScheduleArgs {
    #[serde(deserialize_with = "scalar")]
    train_number: String,
    #[serde(deserialize_with = "scalar_rows")]
    expected_rows: Vec<Vec<String>>,
}

impl TrainSchedule {
    pub const KIND: &'static str = "check_train_schedule";

    pub fn new(train_number: impl Into<String>, expected_rows: Vec<Vec<String>>) -> Self {
        let train_number = train_number.into();
        Self {
            title: format!("Check schedule of train {train_number}"),
            train_number,
            expected_rows,
        }
    }

    pub(crate) fn from_args(args: Mapping, _env: &CheckEnv) -> Result<Box<dyn Check>, CatalogError> {
        let parsed: TrainScheduleArgs = args::parse(Self::KIND, args)?;
        if parsed.expected_rows.is_empty() {
            return Err(CatalogError::InvalidArgs {
                kind: Self::KIND.to_string(),
                reason: "expected_rows cannot be empty".to_string(),
            });
        }
        Ok(Box::new(Self::new(parsed.train_number, parsed.expected_rows)))
    }
}

impl Check for TrainSchedule {
    fn title(&self) -> &str {
        &self.title
    }

    fn run(&self, site: &Site) -> Result<(), CheckError> {
        let path = format!("/trains/{}", self.train_number);
        let page = site.get(&path, &[])?;
        if !page.is_success() {
            return Err(CheckError::Failed(format!(
                "Page {path} returned HTTP {}",
                page.status
            )));
        }

        let table = extract_table(&page.body)?;
        let missing: Vec<String> = self
            .expected_rows
            .iter()
            .filter(|expected| !table.contains(expected))
            .map(|row| format!("  | {} |", row.join(" | ")))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CheckError::Failed(format!(
                "Schedule of train {} is missing rows:\n{}",
                self.train_number,
                missing.join("\n")
            )))
        }
    }
}
