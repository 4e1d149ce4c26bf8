//! Station autocomplete check.

use serde::Deserialize;
use serde_yaml::Mapping;
use std::collections::BTreeSet;

use super::args::{self, scalar, scalar_list};
use super::{Check, CheckEnv, CheckError};
use crate::site::Site;
use crate::tasks::CatalogError;

/// Passes when the suggested station codes for `q` are exactly the expected set.
#[derive(Debug)]
pub struct Autocomplete {
    q: String,
    expected_stations: BTreeSet<String>,
    title: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AutocompleteArgs {
    #[serde(deserialize_with = "scalar")]
    q: String,
    #[serde(deserialize_with = "scalar_list")]
    expected_stations: Vec<String>,
}

impl Autocomplete {
    pub const KIND: &'static str = "check_autocomplete";

    pub fn new<I, S>(q: impl Into<String>, expected_stations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let q = q.into();
        Self {
            title: format!("Check autocomplete for input: {q}"),
            q,
            expected_stations: expected_stations.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn from_args(args: Mapping, _env: &CheckEnv) -> Result<Box<dyn Check>, CatalogError> {
        let parsed: AutocompleteArgs = args::parse(Self::KIND, args)?;
        Ok(Box::new(Self::new(parsed.q, parsed.expected_stations)))
    }
}

impl Check for Autocomplete {
    fn title(&self) -> &str {
        &self.title
    }

    fn run(&self, site: &Site) -> Result<(), CheckError> {
        let stations = site.station_autocomplete(&self.q)?;
        if stations == self.expected_stations {
            return Ok(());
        }

        Err(CheckError::Failed(format!(
            "For input {},\nexpected the output to include stations: {},\nbut found: {}",
            self.q,
            join(&self.expected_stations),
            join(&stations)
        )))
    }
}

fn join(codes: &BTreeSet<String>) -> String {
    if codes.is_empty() {
        "(none)".to_string()
    } else {
        codes.iter().cloned().collect::<Vec<_>>().join(" ")
    }
}
