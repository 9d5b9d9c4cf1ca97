//! Stage catalogue: the ordered rows of stage tags that define priority.
//!
//! Each row is one ordering dimension. A functor's position in a row is
//! the 1-based index of its tag in that row (0 when untagged there), and
//! rows are compared lexicographically in catalogue order.

use std::error::Error;
use std::fmt;

use crate::functor::InvocationMode;

/// Stage tags every registry knows about, whatever the catalogue.
pub const UNIVERSAL_STAGES: [&str; 14] = [
    "priorbalance",
    "selfbalance",
    "stepinit",
    "rate",
    "totalrate",
    "state",
    "totalstate",
    "axial",
    "potential",
    "deficit",
    "allocation",
    "actual",
    "segmentation",
    "postsegmentation",
];

const DEFAULT_ROWS: [&[&str]; 4] = [
    &["priorbalance", "selfbalance"],
    &["stepinit", "rate", "totalrate", "state", "totalstate"],
    &["axial"],
    &[
        "potential",
        "deficit",
        "allocation",
        "actual",
        "segmentation",
        "postsegmentation",
    ],
];

/// Invocation mode implied by registering under `stage`, if any.
///
/// Balancing and initialization stages act on the whole store; totals
/// act on aggregate values. Other stages imply nothing.
pub fn implied_mode(stage: &str) -> Option<InvocationMode> {
    match stage {
        "priorbalance" | "selfbalance" | "stepinit" => Some(InvocationMode::Iterating),
        "totalrate" | "totalstate" => Some(InvocationMode::Total),
        _ => None,
    }
}

/// Errors from building a [`StageCatalogue`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogueError {
    /// The catalogue has no rows.
    Empty,
    /// A row has no tags.
    EmptyRow {
        /// Index of the offending row.
        row: usize,
    },
    /// A tag appears twice in the same row.
    DuplicateStage {
        /// Index of the offending row.
        row: usize,
        /// The repeated tag.
        stage: String,
    },
}

impl fmt::Display for CatalogueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "stage catalogue has no rows"),
            Self::EmptyRow { row } => write!(f, "stage catalogue row {row} is empty"),
            Self::DuplicateStage { row, stage } => {
                write!(f, "stage '{stage}' appears twice in catalogue row {row}")
            }
        }
    }
}

impl Error for CatalogueError {}

/// Ordered rows of stage tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageCatalogue {
    rows: Vec<Vec<String>>,
}

impl StageCatalogue {
    /// Build a catalogue from rows of tags.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError`] if there are no rows, a row is empty, or
    /// a row repeats a tag.
    pub fn new<R, S>(rows: R) -> Result<Self, CatalogueError>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        if rows.is_empty() {
            return Err(CatalogueError::Empty);
        }
        for (i, row) in rows.iter().enumerate() {
            if row.is_empty() {
                return Err(CatalogueError::EmptyRow { row: i });
            }
            for (j, stage) in row.iter().enumerate() {
                if row[..j].contains(stage) {
                    return Err(CatalogueError::DuplicateStage {
                        row: i,
                        stage: stage.clone(),
                    });
                }
            }
        }
        Ok(Self { rows })
    }

    /// The rows, in comparison order.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows (length of every priority vector).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether `stage` appears in any row.
    pub fn contains(&self, stage: &str) -> bool {
        self.rows.iter().any(|row| row.iter().any(|s| s == stage))
    }

    /// Every tag, row by row.
    pub fn stages(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().flatten().map(String::as_str)
    }
}

impl Default for StageCatalogue {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS
                .iter()
                .map(|row| row.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }
}
