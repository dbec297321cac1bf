use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use crate::{Infeasible, PrepareMode};

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot read sequence description {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse sequence description: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{node} has no attribute '{attribute}'")]
    UnknownAttribute { node: String, attribute: String },
    #[error("attribute '{attribute}' of {node} is read-only")]
    HiddenAttribute { node: String, attribute: String },
    #[error("no sequence node or pulse named '{0}'")]
    UnknownNode(String),
    #[error("sequence tree is {depth} levels deep, at most {limit} are supported")]
    TreeTooDeep { depth: usize, limit: usize },
    #[error("the sequence tree must be prepared successfully before it can be exported")]
    NotPrepared,
    #[error("cannot write sequence diagram to {path}: {source}")]
    Export {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A single reason why a node could not be prepared.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{node}: {kind}")]
pub struct PrepareError {
    /// Name of the offending node or pulse
    pub node: String,
    pub kind: PrepareErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrepareErrorKind {
    #[error("set only one of '{first}' and '{second}'")]
    ConstraintConflict {
        first: &'static str,
        second: &'static str,
    },
    #[error("'{attribute}' needs also '{requires}'")]
    MissingDependentConstraint {
        attribute: &'static str,
        requires: &'static str,
    },
    #[error(transparent)]
    Infeasible(#[from] Infeasible),
    #[error("invalid value {value} for '{attribute}'")]
    InvalidAttribute { attribute: &'static str, value: f64 },
    #[error("{repetitions} repetitions exceed the number of addressable time points")]
    TooManyTimePoints { repetitions: usize },
}

/// Returned by `SequenceTree::prepare`: every error found in one pass.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("preparation of sequence {sequence} failed ({} error(s))", .errors.len())]
pub struct PrepareFailure {
    pub sequence: String,
    pub errors: Vec<PrepareError>,
}

/// Collects the errors of a preparation pass. Validation code only reports
/// structured errors, this is the only place where they are turned into log
/// messages, and only in verbose mode.
#[derive(Debug)]
pub struct Diagnostics {
    mode: PrepareMode,
    errors: Vec<PrepareError>,
}

impl Diagnostics {
    pub fn new(mode: PrepareMode) -> Self {
        Self {
            mode,
            errors: Vec::new(),
        }
    }

    pub fn mode(&self) -> PrepareMode {
        self.mode
    }

    pub fn is_verbose(&self) -> bool {
        self.mode == PrepareMode::Verbose
    }

    pub fn report(&mut self, node: &str, kind: PrepareErrorKind) {
        let error = PrepareError {
            node: node.to_owned(),
            kind,
        };
        if self.is_verbose() {
            warn!("{error}");
        }
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[PrepareError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<PrepareError> {
        self.errors
    }
}
