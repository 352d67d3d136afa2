/*!
 * Job submission: create a translation and see it through.
 *
 * The service creates the first iteration together with the translation.
 * Submission waits for the translation to finish, then for that iteration,
 * and hands back both final snapshots.
 */

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::iteration::{list_iterations, wait_for_iteration};
use super::{registry, TRANSLATIONS_PATH};
use crate::app_config::SubmissionDefaults;
use crate::errors::SubmissionError;
use crate::model::{Iteration, Translation, TranslationInput};
use crate::polling::{self, PollPolicy};
use crate::transport::Transport;

/// Submit a translation and wait for it and its first iteration.
///
/// Unset optional input fields are filled from `defaults` before the input
/// is validated; invalid input fails without any request. Exactly one
/// creation request is issued.
pub async fn submit(
    transport: &Transport,
    input: TranslationInput,
    defaults: &SubmissionDefaults,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<(Translation, Iteration), SubmissionError> {
    let input = defaults.apply(input);
    input.validate()?;

    info!(
        "Submitting translation of {} ({} -> {}, {})",
        input.video_file_url, input.source_locale, input.target_locale, input.voice_kind
    );
    let body = serde_json::json!({ "input": input });
    let created: Translation = transport.create(TRANSLATIONS_PATH, &body).await?.json()?;
    let translation_id = created.id.clone();
    info!("Created translation {}", translation_id);

    let iteration_id = first_iteration_id(transport, &created).await?;
    debug!("First iteration of {} is {}", translation_id, iteration_id);

    let tid = translation_id.as_str();
    let translation = polling::await_terminal(move || registry::get(transport, tid), policy, cancel)
        .await
        .map_err(|source| SubmissionError::TranslationWait {
            translation_id: translation_id.clone(),
            source,
        })?;

    if translation.status.is_failed() {
        warn!(
            "Translation {} failed: {}",
            translation.id,
            translation.failure_reason.as_deref().unwrap_or("no reason given")
        );
        return Err(SubmissionError::TranslationFailed {
            translation: Box::new(translation),
        });
    }

    let iteration = wait_for_iteration(transport, &translation_id, &iteration_id, policy, cancel)
        .await
        .map_err(|source| SubmissionError::IterationWait {
            translation_id: translation_id.clone(),
            iteration_id: iteration_id.clone(),
            source,
        })?;

    if iteration.status.is_failed() {
        warn!(
            "Iteration {} of translation {} failed: {}",
            iteration.id,
            translation.id,
            iteration.failure_reason.as_deref().unwrap_or("no reason given")
        );
        return Err(SubmissionError::IterationFailed {
            translation: Box::new(translation),
            iteration: Box::new(iteration),
        });
    }

    info!("Translation {} succeeded (iteration {})", translation.id, iteration.id);
    Ok((translation, iteration))
}

/// Id of the implicitly created first iteration.
///
/// Taken from the creation response when listed there, otherwise from the
/// first page of the iteration listing.
async fn first_iteration_id(transport: &Transport, created: &Translation) -> Result<String, SubmissionError> {
    if let Some(first) = created.first_iteration() {
        return Ok(first.id.clone());
    }

    debug!("Creation response of {} lists no iterations, querying", created.id);
    let page = list_iterations(transport, &created.id, None).await?;
    page.items
        .into_iter()
        .next()
        .map(|it| it.id)
        .ok_or_else(|| SubmissionError::MissingFirstIteration(created.id.clone()))
}
