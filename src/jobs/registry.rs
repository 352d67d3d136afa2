/*!
 * Translation registry operations: list, get and delete.
 */

use log::{debug, info};

use super::{checked_id, translation_path, TRANSLATIONS_PATH};
use crate::errors::TransportError;
use crate::model::{Page, PageToken, PageWire, Translation, TranslationSummary};
use crate::transport::{Method, Transport};

/// Fetch one page of translations.
///
/// Pass the previous page's `next_page_token` to continue; `page_size` only
/// applies to the first page, later pages keep the size encoded in the token.
pub async fn list(
    transport: &Transport,
    page_token: Option<&PageToken>,
    page_size: Option<u32>,
) -> Result<Page<TranslationSummary>, TransportError> {
    let response = match page_token {
        Some(token) => transport.send_to_link(Method::GET, token.as_str()).await?,
        None => {
            let path = match page_size {
                Some(size) => format!("{}?maxpagesize={}", TRANSLATIONS_PATH, size.max(1)),
                None => TRANSLATIONS_PATH.to_string(),
            };
            transport.send(Method::GET, &path, None).await?
        }
    };

    let page: Page<TranslationSummary> = response.json::<PageWire<TranslationSummary>>()?.into();
    debug!("Listed {} translations (more: {})", page.items.len(), page.has_more());
    Ok(page)
}

/// Fetch a translation by id
pub async fn get(transport: &Transport, translation_id: &str) -> Result<Translation, TransportError> {
    let id = checked_id(translation_id)?;
    transport.get_json(&translation_path(id)).await
}

/// Delete a translation. Deleting one that does not exist succeeds.
pub async fn delete(transport: &Transport, translation_id: &str) -> Result<(), TransportError> {
    let id = checked_id(translation_id)?;
    match transport.send(Method::DELETE, &translation_path(id), None).await {
        Ok(_) => {
            info!("Deleted translation {}", id);
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            debug!("Translation {} already absent", id);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
