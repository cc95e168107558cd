//! Batch extraction: many documents, results as each one finishes.
//!
//! Each document runs its own independent chain with its own oracle session;
//! nothing is shared between documents except the (immutable) configuration
//! and taxonomy. Up to `config.concurrency` documents are in flight at once
//! and results arrive in completion order, tagged with their input path.

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::extract::extract;
use crate::output::ExtractionOutput;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// One finished document.
pub type BatchItem = (PathBuf, Result<ExtractionOutput, ExtractionError>);

/// A boxed stream of finished documents.
pub type ExtractionStream = Pin<Box<dyn Stream<Item = BatchItem> + Send>>;

/// Extract several PDFs concurrently, yielding each result as it completes.
///
/// A fatal error for one document is yielded for that document only; the
/// others carry on.
///
/// # Example
/// ```rust,no_run
/// use procure_extract::{extract_stream, ExtractionConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let config = ExtractionConfig::builder().concurrency(2).build().unwrap();
/// let mut results = extract_stream(vec!["a.pdf".into(), "b.pdf".into()], &config);
/// while let Some((path, result)) = results.next().await {
///     match result {
///         Ok(out) => println!("{}: {}", path.display(), out.data.vendor_name),
///         Err(e) => eprintln!("{}: {e}", path.display()),
///     }
/// }
/// # }
/// ```
pub fn extract_stream(inputs: Vec<PathBuf>, config: &ExtractionConfig) -> ExtractionStream {
    info!(
        "Starting batch extraction: {} documents, concurrency {}",
        inputs.len(),
        config.concurrency
    );
    let concurrency = config.concurrency.max(1);
    let config = config.clone();

    let s = stream::iter(inputs.into_iter().map(move |path| {
        let cfg = config.clone();
        async move {
            let result = extract(&path, &cfg).await;
            (path, result)
        }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn every_input_yields_exactly_one_result() {
        let inputs: Vec<PathBuf> = (0..5)
            .map(|i| PathBuf::from(format!("/definitely/not/here/{i}.pdf")))
            .collect();
        let config = ExtractionConfig::builder().concurrency(2).build().unwrap();

        let results: Vec<BatchItem> = extract_stream(inputs.clone(), &config).collect().await;
        assert_eq!(results.len(), 5);

        let seen: HashSet<_> = results.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(seen, inputs.into_iter().collect());
        assert!(results
            .iter()
            .all(|(_, r)| matches!(r, Err(ExtractionError::FileNotFound { .. }))));
    }
}
