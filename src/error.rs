//! Error types for the compartmental tree solver.

use thiserror::Error;

/// Errors that can occur while building or stepping a compartment tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CmError {
    /// A compartment with this stable index was already added.
    #[error("compartment {index} already exists")]
    DuplicateCompartment { index: i64 },

    /// `parent_idx` does not refer to a compartment added earlier.
    #[error("parent compartment {index} not found")]
    UnknownParent { index: i64 },

    /// A lookup (`get_compartment`, `add_receptor`, ...) named a compartment
    /// that is not in the tree.
    #[error("compartment {index} not found")]
    UnknownCompartment { index: i64 },

    /// `add_receptor` was called with a receptor type that is not one of
    /// `{AMPA, GABA, NMDA, AMPA_NMDA}`.
    #[error("unknown receptor type: {kind}")]
    UnknownReceptorKind { kind: String },

    /// `C_m <= 0` for a compartment being added.
    #[error("invalid capacitance {value}: must be > 0")]
    InvalidCapacitance { value: f64 },

    /// A receptor kernel's `tau_r`/`tau_d` was non-positive, or `tau_d` did
    /// not exceed `tau_r`.
    #[error("invalid time constant {value}")]
    InvalidTimeConstant { value: f64 },

    /// A spike was delivered with a negative weight.
    #[error("negative spike weight: {value}")]
    NegativeSpikeWeight { value: f64 },

    /// A ring buffer or compartment index was used outside of its valid
    /// range.
    #[error("index {index} out of range (capacity {capacity})")]
    IndexOutOfRange { index: i64, capacity: usize },

    /// The down-sweep hit a zero pivot (`gg == 0`): a mis-parameterized
    /// compartment (zero capacitance and zero coupling). Fatal; the tree's
    /// state is undefined until `init()` is called again.
    #[error("numerical degeneracy at compartment {compartment}: zero pivot")]
    NumericalDegeneracy { compartment: i64 },

    /// `construct_matrix`/`solve_matrix`/`tick` was called before any
    /// compartment (the root) was added.
    #[error("tree has no root compartment")]
    MissingRoot,
}

/// Result type for compartment tree operations.
pub type Result<T> = std::result::Result<T, CmError>;
