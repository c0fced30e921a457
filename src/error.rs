use thiserror::Error;

use crate::models::Category;

/// Failures a contributor has to be told about.
///
/// Everything else (missing model, unreadable corpus, a broken similarity
/// check) degrades to "no duplicate found" and is reported as a warning
/// alongside a successful submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("please enter the text before submitting")]
    EmptyText,

    #[error("could not save {}", .category.plural())]
    SaveFailed {
        category: Category,
        #[source]
        source: anyhow::Error,
    },
}
