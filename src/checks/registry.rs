//! Lookup table from declarative check kind names to constructors.

use serde_yaml::Mapping;
use std::collections::BTreeMap;

use super::{
    Autocomplete, BookingConfirmationEmail, BookingSideEffect, Check, CheckEnv, FeatureFlag,
    NotImplemented, SearchTrains, TrainSchedule, TripListing, WebpageContent,
};
use crate::tasks::CatalogError;

/// Builds a check from its keyword arguments, validating them up front.
pub type Constructor = fn(Mapping, &CheckEnv) -> Result<Box<dyn Check>, CatalogError>;

/// Immutable mapping of check kind to constructor.
///
/// Built once at startup and handed to the catalog loader; kinds are resolved
/// while loading, never while checks run.
#[derive(Clone, Default)]
pub struct CheckRegistry {
    constructors: BTreeMap<&'static str, Constructor>,
}

impl std::fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.constructors.keys()).finish()
    }
}

impl CheckRegistry {
    /// Registry holding every check kind the harness ships with.
    pub fn builtin() -> Self {
        Self::default()
            .with(NotImplemented::KIND, NotImplemented::from_args)
            .with(FeatureFlag::KIND, FeatureFlag::from_args)
            .with(WebpageContent::KIND, WebpageContent::from_args)
            .with(Autocomplete::KIND, Autocomplete::from_args)
            .with(SearchTrains::KIND, SearchTrains::from_args)
            .with(TrainSchedule::KIND, TrainSchedule::from_args)
            .with(BookingSideEffect::KIND, BookingSideEffect::from_args)
            .with(BookingConfirmationEmail::KIND, BookingConfirmationEmail::from_args)
            .with(TripListing::KIND, TripListing::from_args)
    }

    /// Add (or replace) the constructor for `kind`.
    pub fn with(mut self, kind: &'static str, constructor: Constructor) -> Self {
        self.constructors.insert(kind, constructor);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.constructors.keys().copied()
    }

    /// Construct a check of `kind` from `args`.
    pub fn build(
        &self,
        kind: &str,
        args: Mapping,
        env: &CheckEnv,
    ) -> Result<Box<dyn Check>, CatalogError> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| CatalogError::UnknownKind(kind.to_string()))?;
        constructor(args, env)
    }
}
