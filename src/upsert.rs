use log::{info, warn};

use crate::{
    config::SchemaConfig,
    document::NormalizedDocument,
    store::{DocumentStore, ReplaceOne, StoreError, WriteFailure},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub upserted: usize,
    pub modified: usize,
    pub failures: Vec<WriteFailure>,
}

/// Replaces or inserts each document under its natural key.
///
/// Documents are conformed to the configured schema first. The whole batch
/// goes to the store in one call; items fail independently and only
/// successes are counted. Store-level failures propagate.
pub fn upsert_documents<S: DocumentStore + ?Sized>(
    store: &mut S,
    documents: Vec<NormalizedDocument>,
    config: &SchemaConfig,
) -> Result<UpsertSummary, StoreError> {
    if documents.is_empty() {
        return Ok(UpsertSummary::default());
    }
    let ops = documents
        .into_iter()
        .map(|mut doc| {
            doc.conform(config);
            ReplaceOne::new(doc)
        })
        .collect::<Vec<_>>();

    let result = store.bulk_replace(&ops)?;
    for failure in &result.failures {
        warn!(
            "Upsert of item {} ({}) failed: {}",
            failure.index, failure.key, failure.message
        );
    }
    info!(
        "Upserted {} new and {} existing document(s); {} failed",
        result.upserted_count,
        result.modified_count,
        result.failures.len()
    );
    Ok(UpsertSummary {
        upserted: result.upserted_count,
        modified: result.modified_count,
        failures: result.failures,
    })
}
