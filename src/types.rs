//! Types specific to projmap

use rlst::RlstScalar;

/// A real floating point scalar that mappings and constraints can be defined over
pub trait RealScalar: num::Float + RlstScalar<Real = Self> + Send + Sync {}

impl<T: num::Float + RlstScalar<Real = T> + Send + Sync> RealScalar for T {}

/// The type of a reference cell
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ReferenceCellType {
    /// A triangle
    Triangle,
    /// A quadrilateral
    Quadrilateral,
}

impl ReferenceCellType {
    /// The number of vertices of the cell
    pub fn vertex_count(&self) -> usize {
        match self {
            ReferenceCellType::Triangle => 3,
            ReferenceCellType::Quadrilateral => 4,
        }
    }
}

/// Lifecycle state of a mapping
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MappingState {
    /// `init` has not been called yet
    Uninitialised,
    /// The mapping has been validated and sized
    Ready,
    /// Setup failed; the mapping cannot be used
    Invalid,
}

/// Errors raised by sparse matrices, mappings and constraints
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A column was inserted into a row out of increasing order
    #[error("column {col} inserted after column {last} in row {row}")]
    ColumnOrder {
        /// Block row
        row: usize,
        /// Rejected block column
        col: usize,
        /// Last column inserted in the row
        last: usize,
    },
    /// A row was opened after a later row
    #[error("row {row} opened after row {last}")]
    RowOrder {
        /// Rejected block row
        row: usize,
        /// Last opened block row
        last: usize,
    },
    /// A block index lies outside the matrix
    #[error("block ({row}, {col}) is outside a {shape:?} block matrix")]
    OutOfBounds {
        /// Block row
        row: usize,
        /// Block column
        col: usize,
        /// Shape of the matrix in blocks
        shape: [usize; 2],
    },
    /// The matrix was used before `compress` was called
    #[error("matrix must be compressed before it is used")]
    NotCompressed,
    /// Sizes of operands do not agree
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected number of blocks
        expected: usize,
        /// Number of blocks provided
        found: usize,
    },
    /// The topology does not contain any triangles
    #[error("topology does not contain any triangles")]
    NoTriangles,
    /// The topology contains cells that are not supported
    #[error("cells of type {0:?} are not supported; only triangles are")]
    UnsupportedCell(ReferenceCellType),
    /// An element has zero or non-finite area
    #[error("triangle {0} is degenerate")]
    DegenerateElement(usize),
    /// The component was used before a successful `init`
    #[error("component has not been initialised")]
    NotInitialised,
    /// A DOF index does not exist in the state it is applied to
    #[error("index {index} is out of range for {size} DOFs")]
    IndexOutOfRange {
        /// Offending index
        index: usize,
        /// Number of DOF blocks
        size: usize,
    },
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
