use crate::traits::Recognizer;
use crate::{SourceDocument, SourceError};
use async_trait::async_trait;
use std::future::Future;
use tokio::sync::OnceCell;

/// Builds the wrapped recognizer on first use.
///
/// Initialization runs at most once: callers arriving while it is in flight
/// wait on the same initialization instead of starting their own. A failed
/// initialization leaves the cell empty and the next caller retries.
pub struct LazyRecognizer<R, F> {
    cell: OnceCell<R>,
    init: F,
}

impl<R, F, Fut> LazyRecognizer<R, F>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<R, SourceError>>,
{
    pub fn new(init: F) -> Self {
        Self {
            cell: OnceCell::new(),
            init,
        }
    }

    pub async fn get(&self) -> Result<&R, SourceError> {
        self.cell.get_or_try_init(|| (self.init)()).await
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[async_trait]
impl<R, F, Fut> Recognizer for LazyRecognizer<R, F>
where
    R: Recognizer + Send + Sync,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, SourceError>> + Send,
{
    async fn recognize(
        &self,
        document: &SourceDocument,
        page_index: usize,
    ) -> Result<String, SourceError> {
        self.get().await?.recognize(document, page_index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct EchoRecognizer;

    #[async_trait]
    impl Recognizer for EchoRecognizer {
        async fn recognize(
            &self,
            document: &SourceDocument,
            page_index: usize,
        ) -> Result<String, SourceError> {
            Ok(format!("{} page {}", document.name, page_index + 1))
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_initialization() {
        let starts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&starts);
        let lazy = LazyRecognizer::new(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok::<_, SourceError>(EchoRecognizer)
            }
        });
        let document = SourceDocument::new("RS-0001.pdf", "/tmp/RS-0001.pdf");

        let (first, second, third) = tokio::join!(
            lazy.recognize(&document, 0),
            lazy.recognize(&document, 1),
            lazy.recognize(&document, 2),
        );

        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(first.expect("first page"), "RS-0001 page 1");
        assert_eq!(second.expect("second page"), "RS-0001 page 2");
        assert_eq!(third.expect("third page"), "RS-0001 page 3");
        assert!(lazy.is_initialized());
    }

    #[tokio::test]
    async fn failed_initialization_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let lazy = LazyRecognizer::new(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(SourceError::OcrFailed("worker failed to start".to_string()))
                } else {
                    Ok(EchoRecognizer)
                }
            }
        });
        let document = SourceDocument::new("RS-0002.pdf", "/tmp/RS-0002.pdf");

        assert!(lazy.recognize(&document, 0).await.is_err());
        assert!(!lazy.is_initialized());
        assert_eq!(
            lazy.recognize(&document, 0).await.expect("second attempt"),
            "RS-0002 page 1"
        );
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
