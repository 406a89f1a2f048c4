//! Timeout-guarded outbound requests.
//!
//! Header arrival and body decoding get independent budgets: a server can answer
//! promptly and then stall mid-body.

use std::future::Future;
use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use tokio::time;

use crate::error::TransportError;

/// Send `request` and wait at most `budget` for the response headers.
///
/// On timeout the in-flight request future is dropped, which aborts the connection
/// attempt. The body is left unread.
///
/// # Errors
///
/// Returns `TransportError::Timeout` if the budget elapses and
/// `TransportError::NetworkFailure` for any other transport failure.
pub async fn request_with_timeout(
    request: RequestBuilder,
    budget: Duration,
) -> Result<Response, TransportError> {
    match time::timeout(budget, request.send()).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "request failed");
            Err(TransportError::NetworkFailure(err))
        }
        Err(_) => {
            tracing::debug!(budget = ?budget, "request timed out");
            Err(TransportError::Timeout)
        }
    }
}

/// Race `body` against a timer of `budget`.
///
/// The inner result is the decoder's own outcome; only the timer firing is turned
/// into a `TransportError`.
///
/// # Errors
///
/// Returns `TransportError::DecodeTimeout` carrying `message` if the timer wins.
pub async fn decode_with_timeout<F, T, E>(
    body: F,
    budget: Duration,
    message: &str,
) -> Result<Result<T, E>, TransportError>
where
    F: Future<Output = Result<T, E>>,
{
    time::timeout(budget, body).await.map_err(|_| {
        tracing::debug!(budget = ?budget, "response body timed out");
        TransportError::DecodeTimeout {
            message: message.to_owned(),
        }
    })
}
