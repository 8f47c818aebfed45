//! Error types for operator construction, Hamiltonian compilation, and runs.

use thiserror::Error;

/// Errors produced while building or running a simulation.
///
/// Everything except [`Self::Solver`], [`Self::Io`], and [`Self::Npz`] is a
/// validation failure on caller input, raised at the point the offending
/// input is first seen.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QSimError {
    /// An energy-level symbol is not defined for a species.
    #[error("species `{species}` has no energy level `{symbol}`")]
    UnknownSymbol {
        /// Name of the species that was searched.
        species: String,
        /// The offending symbol.
        symbol: String,
    },

    /// A subsystem index does not exist in the system.
    #[error("subsystem index {index} out of range for a system of {len} subsystems")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of subsystems in the system.
        len: usize,
    },

    /// A level string does not have one symbol per subsystem.
    #[error("state has {got} level symbols but the system has {expected} subsystems")]
    MalformedState {
        /// Number of subsystems in the system.
        expected: usize,
        /// Number of symbols given.
        got: usize,
    },

    /// A species was declared with no levels or with repeated levels.
    #[error("malformed species `{name}`: {reason}")]
    MalformedQuanta {
        name: String,
        reason: String,
    },

    /// An operator recipe is inconsistent with itself.
    #[error("malformed recipe: {0}")]
    MalformedRecipe(String),

    /// A target tuple and a transition disagree on how many subsystems the
    /// operator acts on.
    #[error("operator acts on {expected} subsystems but target {target:?} names {got}")]
    TargetArityMismatch {
        /// The offending target tuple.
        target: Vec<usize>,
        /// Number of symbols in the transition.
        expected: usize,
        /// Number of indices in the target tuple.
        got: usize,
    },

    /// A pulse shape name is not recognized.
    #[error("unknown pulse shape `{0}`")]
    UnknownPulseShape(String),

    /// A pulse shape requires a parameter that was not supplied.
    #[error("pulse shape `{shape}` requires parameter `{param}`")]
    MissingParameter {
        shape: &'static str,
        param: &'static str,
    },

    /// A pulse parameter is present but unusable.
    #[error("invalid value {value} for pulse parameter `{param}`: {reason}")]
    InvalidParameter {
        param: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A term or noise key is already registered.
    #[error("key `{0}` already exists")]
    DuplicateKey(String),

    /// A sampling grid cannot be constructed.
    #[error("invalid time grid: total_time = {total_time}, sample_count = {sample_count}")]
    InvalidGrid {
        total_time: f64,
        sample_count: usize,
    },

    /// An array does not match the dimension of the full space.
    #[error("expected an array of dimension {expected}, got {got}")]
    DimensionMismatch {
        expected: usize,
        got: usize,
    },

    /// A species named in an experiment file was never declared.
    #[error("species `{0}` does not exist")]
    UnknownSpecies(String),

    /// The solver failed; the message is passed through from the solver.
    #[error("solver error: {0}")]
    Solver(String),

    /// An experiment file could not be parsed.
    #[error("experiment config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("npz write error: {0}")]
    Npz(#[from] ndarray_npy::WriteNpzError),
}

/// Result type for simulation operations.
pub type QSimResult<T> = Result<T, QSimError>;
