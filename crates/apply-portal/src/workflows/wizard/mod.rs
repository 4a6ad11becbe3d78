//! Multi-step form engine with persisted intermediate state.
//!
//! A wizard is a [`WizardDefinition`] (attribute struct, step enum, output) run
//! by [`Wizard`] against a [`WizardStateStore`]. State is kept in a versioned
//! envelope keyed per actor and entity, validated one step at a time, and
//! cleared once the wizard materialises its output.

mod state;
mod step;
mod store;


use std::fmt::Debug;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

pub use state::WizardState;
pub use step::{Presence, Step, StepTarget, ValidationErrors};
pub use store::{InMemoryWizardStore, StateMap, StoreError, StoreKey, WizardStateStore};

/// Guard against step graphs that loop back on themselves.
const MAX_PATH_LENGTH: usize = 64;

/// Static description of one wizard.
pub trait WizardDefinition {
    /// Prefix of the store key, e.g. `course_selection`.
    const NAME: &'static str;
    /// Bumped whenever the attribute struct changes incompatibly.
    const SCHEMA_VERSION: u32 = 1;
    /// Every step name the wizard may resolve to.
    const STEPS: &'static [&'static str];

    type Attributes: Serialize + DeserializeOwned + Default + Clone + PartialEq + Debug;
    type Context;
    type Step: Step<Attributes = Self::Attributes, Context = Self::Context>;
    type Output;

    fn first_step(context: &Self::Context) -> Self::Step;

    /// Builds the finished domain object from accumulated attributes.
    fn materialize(
        attributes: &Self::Attributes,
        context: &Self::Context,
    ) -> Result<Self::Output, WizardError>;

    /// Rewrites attributes saved under an older schema. `None` discards them.
    fn upgrade(_from_version: u32, _attributes: StateMap) -> Option<StateMap> {
        None
    }
}

/// Outcome of submitting parameters to the current step.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance<S> {
    Next(StepTarget<S>),
    Invalid(ValidationErrors),
}

/// Outcome of requesting a specific step, e.g. from a bookmarked URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit<S> {
    Show(S),
    Redirect(S),
}

/// How a request reached the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// From a page that starts the flow; leftover state is discarded.
    Start,
    /// From within the flow; stored answers are kept.
    Resume,
}

/// Outcome of [`Wizard::save`].
#[derive(Debug, Clone, PartialEq)]
pub enum Saved<T> {
    Created(T),
    Skipped,
}

/// Error raised by the wizard engine. Validation failures are never errors.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("wizard precondition violated: {0}")]
    Precondition(String),
    #[error("step `{0}` is not declared by this wizard")]
    UnknownStep(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error("wizard attributes could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Running wizard bound to one store key.
pub struct Wizard<'a, D: WizardDefinition> {
    store: &'a dyn WizardStateStore,
    key: StoreKey,
    context: &'a D::Context,
    current_step: D::Step,
    attributes: D::Attributes,
    _definition: PhantomData<fn() -> D>,
}

impl<'a, D: WizardDefinition> Wizard<'a, D> {
    /// Resume from stored state, or start at the first step when none exists.
    pub fn load(
        store: &'a dyn WizardStateStore,
        key: StoreKey,
        context: &'a D::Context,
    ) -> Result<Self, WizardError> {
        let stored = match store.read(&key) {
            Ok(stored) => stored,
            Err(StoreError::Corrupt { key: raw_key }) => {
                warn!(wizard = D::NAME, key = %raw_key, "discarding corrupt wizard state");
                None
            }
            Err(err) => return Err(err.into()),
        };

        let state = stored.and_then(|map| WizardState::restore::<D>(&key, map));

        let (current_step, attributes) = match state {
            Some(state) => (state.current_step, state.attributes),
            None => (D::first_step(context), D::Attributes::default()),
        };

        Ok(Self {
            store,
            key,
            context,
            current_step,
            attributes,
            _definition: PhantomData,
        })
    }

    /// Start over from an entry point, dropping anything left from a previous visit.
    pub fn enter(
        store: &'a dyn WizardStateStore,
        key: StoreKey,
        context: &'a D::Context,
    ) -> Result<Self, WizardError> {
        store.delete(&key)?;
        debug!(wizard = D::NAME, key = %key, "wizard state cleared on entry");
        Ok(Self {
            store,
            key,
            context,
            current_step: D::first_step(context),
            attributes: D::Attributes::default(),
            _definition: PhantomData,
        })
    }

    pub fn open(
        store: &'a dyn WizardStateStore,
        key: StoreKey,
        context: &'a D::Context,
        entry: Entry,
    ) -> Result<Self, WizardError> {
        match entry {
            Entry::Start => Self::enter(store, key, context),
            Entry::Resume => Self::load(store, key, context),
        }
    }

    pub fn key(&self) -> &StoreKey {
        &self.key
    }

    pub fn current_step(&self) -> D::Step {
        self.current_step
    }

    pub fn attributes(&self) -> &D::Attributes {
        &self.attributes
    }

    pub fn context(&self) -> &D::Context {
        self.context
    }

    /// Validation messages for the current step against the stored attributes.
    pub fn errors(&self) -> Result<ValidationErrors, WizardError> {
        self.current_step.validate(&self.attributes, self.context)
    }

    /// Moves to `requested` if it is reachable with the answers given so far,
    /// otherwise names the earliest step that still needs an answer.
    pub fn visit(&mut self, requested: D::Step) -> Result<Visit<D::Step>, WizardError> {
        let mut step = D::first_step(self.context);

        for _ in 0..MAX_PATH_LENGTH {
            if step == requested {
                self.current_step = requested;
                return Ok(Visit::Show(requested));
            }

            if !step.validate(&self.attributes, self.context)?.is_empty() {
                debug!(
                    wizard = D::NAME,
                    requested = requested.name(),
                    redirect = step.name(),
                    "requested step is beyond the earliest unanswered step"
                );
                return Ok(Visit::Redirect(step));
            }

            match self.resolve(step.next_step(&self.attributes, self.context)?)? {
                StepTarget::Step(next) => step = next,
                StepTarget::Exit => return Ok(Visit::Redirect(step)),
            }
        }

        Err(WizardError::Precondition(format!(
            "{} step graph does not terminate",
            D::NAME
        )))
    }

    /// Merge permitted `params`, validate the current step, and persist on success.
    pub fn advance(&mut self, params: &StateMap) -> Result<Advance<D::Step>, WizardError> {
        let step = self.current_step;
        let permitted = step.permitted_params();

        let mut candidate = match serde_json::to_value(&self.attributes)? {
            Value::Object(map) => map,
            _ => {
                return Err(WizardError::Precondition(format!(
                    "{} attributes must serialize to an object",
                    D::NAME
                )))
            }
        };

        let mut errors = ValidationErrors::new();
        for (name, value) in params {
            if !permitted.contains(&name.as_str()) {
                debug!(wizard = D::NAME, step = step.name(), param = %name, "dropping parameter not permitted on this step");
                continue;
            }

            let mut trial = candidate.clone();
            step.assign(&mut trial, name, value.clone());
            match serde_json::from_value::<D::Attributes>(Value::Object(trial.clone())) {
                Ok(_) => candidate = trial,
                Err(_) => errors.add(name.as_str(), "is not a valid value"),
            }
        }

        if !errors.is_empty() {
            return Ok(Advance::Invalid(errors));
        }

        let attributes: D::Attributes = serde_json::from_value(Value::Object(candidate))?;
        let errors = step.validate(&attributes, self.context)?;
        if !errors.is_empty() {
            return Ok(Advance::Invalid(errors));
        }

        let target = self.resolve(step.next_after_submit(&attributes, self.context)?)?;

        let envelope = WizardState {
            version: D::SCHEMA_VERSION,
            current_step: step,
            attributes,
        };
        self.store.write(&self.key, envelope.to_map()?)?;
        debug!(wizard = D::NAME, step = step.name(), key = %self.key, "wizard state persisted");

        self.attributes = envelope.attributes;
        Ok(Advance::Next(target))
    }

    pub fn next_step(&self) -> Result<StepTarget<D::Step>, WizardError> {
        self.resolve(self.current_step.next_step(&self.attributes, self.context)?)
    }

    pub fn previous_step(&self) -> Result<StepTarget<D::Step>, WizardError> {
        self.resolve(self.current_step.previous_step(&self.attributes, self.context)?)
    }

    pub fn is_complete(&self) -> Result<bool, WizardError> {
        self.current_step.completed(&self.attributes, self.context)
    }

    /// Materialise the output once complete; abandoned wizards report `Skipped`.
    /// A current step that has not been answered is never complete.
    pub fn save(&mut self) -> Result<Saved<D::Output>, WizardError> {
        if !self.errors()?.is_empty() || !self.is_complete()? {
            debug!(
                wizard = D::NAME,
                step = self.current_step.name(),
                "wizard not complete, nothing saved"
            );
            return Ok(Saved::Skipped);
        }

        let output = D::materialize(&self.attributes, self.context)?;
        self.clear_state()?;
        Ok(Saved::Created(output))
    }

    pub fn clear_state(&mut self) -> Result<(), WizardError> {
        self.store.delete(&self.key)?;
        self.current_step = D::first_step(self.context);
        self.attributes = D::Attributes::default();
        debug!(wizard = D::NAME, key = %self.key, "wizard state cleared");
        Ok(())
    }

    fn resolve(&self, target: StepTarget<D::Step>) -> Result<StepTarget<D::Step>, WizardError> {
        match target {
            StepTarget::Step(step) if !D::STEPS.contains(&step.name()) => {
                Err(WizardError::UnknownStep(step.name().to_string()))
            }
            other => Ok(other),
        }
    }
}
