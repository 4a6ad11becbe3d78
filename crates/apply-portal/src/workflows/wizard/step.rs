use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::store::StateMap;
use super::WizardError;

/// Where a step sends the user next. `Exit` leaves the wizard entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "step")]
pub enum StepTarget<S> {
    Step(S),
    Exit,
}

impl<S> StepTarget<S> {
    pub fn step(self) -> Option<S> {
        match self {
            StepTarget::Step(step) => Some(step),
            StepTarget::Exit => None,
        }
    }
}

/// Field-keyed validation messages, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Records `message` against `field` when the value is missing or blank.
    pub fn require<T: Presence + ?Sized>(&mut self, field: &str, value: &T, message: &str) {
        if !value.is_present() {
            self.add(field, message);
        }
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }
}

/// Blank-aware presence check used by step validations.
pub trait Presence {
    fn is_present(&self) -> bool;
}

impl Presence for str {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Presence for String {
    fn is_present(&self) -> bool {
        self.as_str().is_present()
    }
}

impl<T: Presence> Presence for Option<T> {
    fn is_present(&self) -> bool {
        self.as_ref().map(Presence::is_present).unwrap_or(false)
    }
}

impl<T: Presence> Presence for Vec<T> {
    fn is_present(&self) -> bool {
        self.iter().any(Presence::is_present)
    }
}

impl Presence for u64 {
    fn is_present(&self) -> bool {
        true
    }
}

/// One page of a wizard. Implemented by a per-wizard step enum.
pub trait Step: Copy + Eq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Attributes;
    type Context;

    /// Stable snake_case name, also used for routing and logs.
    fn name(&self) -> &'static str;

    /// Request parameters this step may write. Everything else is dropped.
    fn permitted_params(&self) -> &'static [&'static str];

    fn validate(
        &self,
        attributes: &Self::Attributes,
        context: &Self::Context,
    ) -> Result<ValidationErrors, WizardError>;

    fn next_step(
        &self,
        attributes: &Self::Attributes,
        context: &Self::Context,
    ) -> Result<StepTarget<Self>, WizardError>;

    fn previous_step(
        &self,
        attributes: &Self::Attributes,
        context: &Self::Context,
    ) -> Result<StepTarget<Self>, WizardError>;

    /// Target once this step has been submitted. Follows the regular path
    /// unless the step sends the user back to a check page.
    fn next_after_submit(
        &self,
        attributes: &Self::Attributes,
        context: &Self::Context,
    ) -> Result<StepTarget<Self>, WizardError> {
        self.next_step(attributes, context)
    }

    fn completed(
        &self,
        _attributes: &Self::Attributes,
        _context: &Self::Context,
    ) -> Result<bool, WizardError> {
        Ok(false)
    }

    /// Writes one permitted parameter into the serialized attribute map.
    fn assign(&self, attributes: &mut StateMap, name: &str, value: Value) {
        attributes.insert(name.to_string(), value);
    }
}
