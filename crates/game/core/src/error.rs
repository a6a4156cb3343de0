//! Common error infrastructure for idle-core.
//!
//! Every fallible rules operation returns [`RulesError`]. The variants separate
//! configuration faults (bad definitions, unknown selectors), validation
//! failures raised by content formulas, script evaluation faults, and state
//! faults such as dangling entity references.
//!
//! Idempotent no-ops (removing a modifier that was never applied, unequipping
//! an item that is not equipped) are not errors and return `Ok(false)`.

use rust_decimal::Decimal;

use crate::entity::EntityId;
use crate::modifier::ModifierId;
use crate::script::{Formula, Shape};

/// Category of an error, used for logging and handling strategies.
///
/// All rules errors are fatal to the current operation. The category tells
/// the engine whether content or code is to blame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// Content or configuration is malformed.
    Configuration,
    /// A content validator rejected a generated entity.
    Validation,
    /// A formula failed or returned the wrong shape.
    Script,
    /// Engine state is inconsistent (dangling ids, impossible transforms).
    State,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Validation => "validation",
            Self::Script => "script",
            Self::State => "state",
        }
    }
}

/// Failure raised at the scripting boundary.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// The host refused or failed to evaluate the formula.
    #[error("formula `{formula}` was rejected: {message}")]
    Rejected { formula: Formula, message: String },

    /// The formula evaluated, but not to the shape the call site expects.
    #[error("formula `{formula}` returned {found}, expected {expected}")]
    WrongShape {
        formula: Formula,
        expected: Shape,
        found: Shape,
    },
}

impl ScriptError {
    pub fn rejected(formula: &Formula, message: impl Into<String>) -> Self {
        Self::Rejected {
            formula: formula.clone(),
            message: message.into(),
        }
    }

    pub fn wrong_shape(formula: &Formula, expected: Shape, found: Shape) -> Self {
        Self::WrongShape {
            formula: formula.clone(),
            expected,
            found,
        }
    }
}

/// Malformed content or configuration.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no encounters are defined")]
    MissingEncounters,

    #[error("encounter {encounter} has no creature options")]
    EmptyEncounter { encounter: u64 },

    #[error("encounter {encounter} references unknown creature {creature}")]
    UnknownCreature { encounter: u64, creature: u64 },

    #[error("encounter definition {0} is not registered")]
    UnknownEncounter(u64),

    #[error("creature definition {0} is not registered")]
    MissingCreature(u64),

    #[error("no outcome formula is configured for attack tag `{0}`")]
    UnknownOutcomeTag(String),

    #[error("field `{selector}` does not exist on {target}")]
    UnknownField {
        selector: String,
        target: &'static str,
    },

    #[error("field `{selector}` cannot be written")]
    ReadOnlyField { selector: String },

    #[error("modifier {0} is not registered")]
    UnknownModifier(ModifierId),

    #[error("modifier {0} is already registered")]
    DuplicateModifier(ModifierId),

    #[error("status {0} is not registered")]
    UnknownStatus(u64),

    #[error("item {0} is not registered")]
    UnknownItem(u64),

    #[error("ability {0} is not registered")]
    UnknownAbility(u64),

    #[error("generated level {0} is below 1")]
    InvalidLevel(Decimal),

    #[error("subscriber `{0}` is reserved for the rules' own listeners")]
    ReservedSubscriber(String),
}

/// Error returned by every rules operation.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RulesError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{subject} failed validation: {source}")]
    Validation {
        subject: String,
        #[source]
        source: ScriptError,
    },

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("entity {0} is not registered")]
    UnknownEntity(EntityId),

    #[error("modifier {modifier} cannot be applied to `{selector}`: {reason}")]
    InvalidModifier {
        modifier: ModifierId,
        selector: String,
        reason: &'static str,
    },

    #[error("{operation} overflowed the decimal range")]
    Overflow { operation: &'static str },

    #[error("tick length must be a finite, non-negative number of seconds, got {0}")]
    InvalidTick(f64),
}

impl RulesError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Script(_) => ErrorKind::Script,
            Self::UnknownEntity(_)
            | Self::InvalidModifier { .. }
            | Self::Overflow { .. }
            | Self::InvalidTick(_) => ErrorKind::State,
        }
    }

    /// Stable identifier for this error variant.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(err) => match err {
                ConfigError::MissingEncounters => "MISSING_ENCOUNTERS",
                ConfigError::EmptyEncounter { .. } => "EMPTY_ENCOUNTER",
                ConfigError::UnknownEncounter(_) => "UNKNOWN_ENCOUNTER",
                ConfigError::UnknownCreature { .. } | ConfigError::MissingCreature(_) => {
                    "UNKNOWN_CREATURE"
                }
                ConfigError::UnknownOutcomeTag(_) => "UNKNOWN_OUTCOME_TAG",
                ConfigError::UnknownField { .. } => "UNKNOWN_FIELD",
                ConfigError::ReadOnlyField { .. } => "READ_ONLY_FIELD",
                ConfigError::UnknownModifier(_) => "UNKNOWN_MODIFIER",
                ConfigError::DuplicateModifier(_) => "DUPLICATE_MODIFIER",
                ConfigError::UnknownStatus(_) => "UNKNOWN_STATUS",
                ConfigError::UnknownItem(_) => "UNKNOWN_ITEM",
                ConfigError::UnknownAbility(_) => "UNKNOWN_ABILITY",
                ConfigError::InvalidLevel(_) => "INVALID_LEVEL",
                ConfigError::ReservedSubscriber(_) => "RESERVED_SUBSCRIBER",
            },
            Self::Validation { .. } => "VALIDATION_FAILED",
            Self::Script(ScriptError::Rejected { .. }) => "SCRIPT_REJECTED",
            Self::Script(ScriptError::WrongShape { .. }) => "SCRIPT_WRONG_SHAPE",
            Self::UnknownEntity(_) => "UNKNOWN_ENTITY",
            Self::InvalidModifier { .. } => "INVALID_MODIFIER",
            Self::Overflow { .. } => "NUMERIC_OVERFLOW",
            Self::InvalidTick(_) => "INVALID_TICK",
        }
    }

    pub(crate) fn overflow(operation: &'static str) -> Self {
        Self::Overflow { operation }
    }

    pub(crate) fn validation(subject: impl Into<String>, source: ScriptError) -> Self {
        Self::Validation {
            subject: subject.into(),
            source,
        }
    }
}
