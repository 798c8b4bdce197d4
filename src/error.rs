//! Error types for scene composition and placement sampling.
//!
//! The two enums are deliberately disjoint. A [`LayoutError`] is an authoring
//! mistake that retrying cannot fix, so composition fails fast and surfaces it
//! immediately. A [`SamplingError`] is an unlucky draw: the caller may respond
//! by re-sampling, or by tearing the episode down and rebuilding with a fresh
//! seed. No API mixes the two in one signature.

use thiserror::Error;

/// Fatal configuration errors raised while validating or resolving a layout.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum LayoutError {
    /// Two fixture specs resolved to the same name after group suffixing.
    #[error("duplicate fixture name `{0}`")]
    DuplicateName(String),

    /// `align_to`, `stack_on`, `interior_of` or a size reference names a
    /// fixture that is not in the layout.
    #[error("fixture `{fixture}` references `{target}`, which is not in the layout")]
    DanglingReference { fixture: String, target: String },

    /// The referenced fixture exists but resolves later than its dependant.
    #[error("fixture `{fixture}` depends on `{target}`, which resolves later; reorder the layout")]
    UnresolvedReference { fixture: String, target: String },

    /// The alignment token re-aligns the axis the side already fixes.
    #[error("fixture `{fixture}`: alignment `{alignment}` conflicts with side `{side}`")]
    IncompatibleAlignment {
        fixture: String,
        side: String,
        alignment: String,
    },

    /// A stack table is malformed (level/percentage mismatch, bad sum, ...).
    #[error("stack `{fixture}`: {reason}")]
    InvalidStack { fixture: String, reason: String },

    /// A spec has neither a placement nor a container to position it.
    #[error("fixture `{fixture}` has no placement")]
    MissingPlacement { fixture: String },

    /// A size component references a fixture whose own size is not yet known.
    #[error("fixture `{fixture}`: size on axis {axis} cannot be resolved from `{target}`")]
    SizeUnresolvable {
        fixture: String,
        target: String,
        axis: usize,
    },

    /// The named fixture does not exist in the composed scene.
    #[error("no fixture named `{0}` in the scene")]
    NoSuchFixture(String),
}

/// Recoverable errors raised while sampling reset regions or placements.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SamplingError {
    /// No region satisfies the size, height and location constraints.
    #[error("no region of `{fixture}` admits a {width:.3} x {depth:.3} footprint")]
    NoRegion {
        fixture: String,
        width: f32,
        depth: f32,
    },

    /// Every candidate pose violated containment or overlapped a placed object.
    #[error("gave up after {attempts} placement attempts in region `{region}`")]
    RetriesExhausted { region: String, attempts: usize },
}
