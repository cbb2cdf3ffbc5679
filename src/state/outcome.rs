/// Outcome definitions for a single identifier
///
/// Every identifier ends a run with exactly one of these outcomes.
use crate::source::Metadata;
use std::fmt;

/// Stock availability derived from a product page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockState {
    InStock,
    OutOfStock,
}

impl StockState {
    /// Builds a stock state from an availability flag
    pub fn from_available(available: bool) -> Self {
        if available {
            Self::InStock
        } else {
            Self::OutOfStock
        }
    }

    /// Returns true if the item can be bought
    pub fn is_available(&self) -> bool {
        matches!(self, Self::InStock)
    }
}

/// Terminal result of attempting one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page fetched and parsed; missing fields degrade to `None`
    Success {
        title: Option<String>,
        price: Option<String>,
        stock: StockState,
    },

    /// The retailer positively reported that the item does not exist
    NotFound,

    /// Network or status failure that outlived the retry budget
    TransientFailure { last_error: String },

    /// No request target could be derived for the identifier
    MissingTarget,
}

impl FetchOutcome {
    /// Returns the kind of this outcome, without its payload
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success { .. } => OutcomeKind::Success,
            Self::NotFound => OutcomeKind::NotFound,
            Self::TransientFailure { .. } => OutcomeKind::TransientFailure,
            Self::MissingTarget => OutcomeKind::MissingTarget,
        }
    }

    /// Returns true if a later attempt in the same run could change this outcome
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientFailure { .. })
    }
}

/// Payload-free discriminant of a [`FetchOutcome`], used for counting and storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutcomeKind {
    Success,
    NotFound,
    TransientFailure,
    MissingTarget,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 4] = [
        Self::Success,
        Self::NotFound,
        Self::TransientFailure,
        Self::MissingTarget,
    ];

    /// Converts the kind to a string for database storage
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::TransientFailure => "transient_failure",
            Self::MissingTarget => "missing_target",
        }
    }

    /// Parses a kind from a database string
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "not_found" => Some(Self::NotFound),
            "transient_failure" => Some(Self::TransientFailure),
            "missing_target" => Some(Self::MissingTarget),
            _ => None,
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "Success",
            Self::NotFound => "Not Found",
            Self::TransientFailure => "Transient Failure",
            Self::MissingTarget => "Missing Target",
        };
        write!(f, "{}", s)
    }
}

/// An outcome bundled with the identifier and passthrough data it belongs to
///
/// This is the unit handed to sinks.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRecord {
    pub identifier: String,

    /// The URL that was (or would have been) requested
    pub target: Option<String>,

    pub metadata: Metadata,

    pub outcome: FetchOutcome,

    /// Network attempts spent on this identifier, zero for missing targets
    pub attempts: u32,
}

impl OutcomeRecord {
    pub fn kind(&self) -> OutcomeKind {
        self.outcome.kind()
    }
}
