/*!
 * Status polling engine.
 *
 * `await_terminal` repeatedly fetches a resource until it reaches a terminal
 * status, the policy's budget runs out, or the caller cancels. It is generic
 * over the resource type so translations and iterations share one loop.
 */

use log::{debug, warn};
use std::future::Future;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::{TransportError, WaitError};
use crate::model::JobResource;

pub mod policy;

pub use policy::{Backoff, PollPolicy};

/// Poll `fetch` until the returned resource is terminal.
///
/// A terminal resource is returned as-is, including `Failed` ones; deciding
/// what a failure means is left to the caller. Transient transport errors are
/// retried up to the policy's budget. Any other error ends the wait
/// immediately.
pub async fn await_terminal<T, F, Fut>(
    mut fetch: F,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<T, WaitError<T>>
where
    T: JobResource,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let started = Instant::now();
    let mut polls: u32 = 0;
    let mut transient_failures: u32 = 0;
    let mut last: Option<Box<T>> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled { polls, last });
        }

        if polls >= policy.max_polls {
            return Err(WaitError::Timeout {
                elapsed: started.elapsed(),
                polls,
                last,
            });
        }

        // Requests in flight run to completion; cancellation is observed
        // between polls and while sleeping.
        polls += 1;
        let fetched = fetch().await;

        let delay = match fetched {
            Ok(resource) if resource.is_terminal() => {
                debug!("{} reached {} after {} polls", resource.id(), resource.status(), polls);
                return Ok(resource);
            }
            Ok(resource) => {
                debug!("{} is {} (poll {})", resource.id(), resource.status(), polls);
                transient_failures = 0;
                last = Some(Box::new(resource));
                policy.delay_after_poll(polls)
            }
            Err(err) if err.is_transient() => {
                transient_failures += 1;
                if transient_failures > policy.max_transient_retries {
                    warn!("Giving up after {} consecutive transient failures: {}", transient_failures, err);
                    return Err(WaitError::ServiceRejected { source: err, last });
                }
                warn!(
                    "Transient failure on poll {} ({}/{}): {}",
                    polls, transient_failures, policy.max_transient_retries, err
                );
                policy.delay_after_transient(transient_failures, err.retry_after())
            }
            Err(err) => return Err(WaitError::ServiceRejected { source: err, last }),
        };

        let elapsed = started.elapsed();
        if elapsed.saturating_add(delay) > policy.max_wait {
            return Err(WaitError::Timeout { elapsed, polls, last });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WaitError::Cancelled { polls, last }),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
