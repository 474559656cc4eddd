use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::driver::PageDriver;
use crate::error::AutomationError;

/// Owns a browser and the single page all automation runs on
#[async_trait]
pub trait BrowserSession: Send + Sync + Sized {
    type Page: PageDriver;

    fn page(&self) -> &Self::Page;

    /// Tear the browser down; failures are logged
    async fn close(self);
}

/// Run `operation` against the session's page and close the session
/// exactly once afterwards, whether the operation succeeded, failed or was
/// cancelled through `cancel`.
pub async fn run_scoped<S, F, R>(session: S, cancel: CancellationToken, operation: F) -> Result<R, AutomationError>
where
    S: BrowserSession,
    F: for<'a> FnOnce(&'a S::Page) -> BoxFuture<'a, Result<R, AutomationError>>,
{
    let result = {
        let page = session.page();
        tokio::select! {
            result = operation(page) => result,
            _ = cancel.cancelled() => {
                warn!("Interrupted, closing browser session");
                Err(AutomationError::Interrupted)
            }
        }
    };

    session.close().await;
    result
}
