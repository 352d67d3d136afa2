/*!
 * Iteration manager: follow-up iterations of an existing translation.
 *
 * A follow-up iteration hands the service a corrected WebVTT file (source or
 * target subtitles, or metadata) and produces new outputs. Creation is
 * followed by a wait for the iteration's terminal state.
 */

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use super::{checked_id, iteration_path, iterations_path, validate_id};
use crate::errors::{IterationError, TransportError, ValidationError, WaitError};
use crate::model::{Iteration, IterationInput, Page, PageToken, PageWire};
use crate::polling::{self, PollPolicy};
use crate::transport::{Method, Transport};

/// Create a follow-up iteration and wait for it to finish.
///
/// A missing translation surfaces as `IterationError::Transport` with
/// `TransportError::NotFound`. A `Failed` iteration is an error.
pub async fn create_iteration(
    transport: &Transport,
    translation_id: &str,
    input: IterationInput,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<Iteration, IterationError> {
    validate_id(translation_id)?;
    if input.webvtt_file.is_none() {
        return Err(ValidationError::Empty { field: "webvttFile" }.into());
    }
    input.validate()?;

    let body = serde_json::json!({ "input": input });
    let created: Iteration = transport.create(&iterations_path(translation_id), &body).await?.json()?;
    info!("Created iteration {} of translation {}", created.id, translation_id);

    let iteration_id = created.id.clone();
    let iteration = wait_for_iteration(transport, translation_id, &iteration_id, policy, cancel)
        .await
        .map_err(|source| IterationError::Wait {
            iteration_id: iteration_id.clone(),
            source,
        })?;

    if iteration.status.is_failed() {
        return Err(IterationError::Failed {
            iteration: Box::new(iteration),
        });
    }
    Ok(iteration)
}

/// Like `create_iteration`, with the WebVTT kind given as text.
///
/// An unknown kind is rejected before anything is sent.
pub async fn create_iteration_with_webvtt(
    transport: &Transport,
    translation_id: &str,
    webvtt_file_kind: &str,
    webvtt_file_url: &str,
    export_subtitle_in_video: Option<bool>,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<Iteration, IterationError> {
    let input = IterationInput::parse(webvtt_file_kind, webvtt_file_url, export_subtitle_in_video)?;
    create_iteration(transport, translation_id, input, policy, cancel).await
}

/// Poll an iteration until it is terminal
pub(crate) async fn wait_for_iteration(
    transport: &Transport,
    translation_id: &str,
    iteration_id: &str,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<Iteration, WaitError<Iteration>> {
    debug!("Waiting for iteration {} of translation {}", iteration_id, translation_id);
    polling::await_terminal(
        move || get_iteration(transport, translation_id, iteration_id),
        policy,
        cancel,
    )
    .await
}

/// Fetch one iteration
pub async fn get_iteration(
    transport: &Transport,
    translation_id: &str,
    iteration_id: &str,
) -> Result<Iteration, TransportError> {
    let translation_id = checked_id(translation_id)?;
    let iteration_id = checked_id(iteration_id)?;
    transport.get_json(&iteration_path(translation_id, iteration_id)).await
}

/// Fetch one page of a translation's iterations, in creation order
pub async fn list_iterations(
    transport: &Transport,
    translation_id: &str,
    page_token: Option<&PageToken>,
) -> Result<Page<Iteration>, TransportError> {
    let response = match page_token {
        Some(token) => transport.send_to_link(Method::GET, token.as_str()).await?,
        None => {
            let translation_id = checked_id(translation_id)?;
            transport.send(Method::GET, &iterations_path(translation_id), None).await?
        }
    };
    Ok(response.json::<PageWire<Iteration>>()?.into())
}
