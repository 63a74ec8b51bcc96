use parley_model::{ErrorKind, ModelChoice, ModelReply};

use crate::Error;
use crate::proto::ChatCompletion;

/// Converts a raw completion body into a [`ModelReply`].
///
/// Only the last choice is inspected for moderation, since that is the
/// one consumers read.
pub fn reply_from_body(body: &[u8]) -> Result<ModelReply, Error> {
    let completion = serde_json::from_slice::<ChatCompletion>(body)
        .map_err(|err| {
            Error::new(
                format!("Malformed completion: {err}"),
                ErrorKind::InvalidReply,
            )
        })?;
    trace!("got completion: {:?}", completion.id);

    let Some(last) = completion.choices.last() else {
        return Err(Error::new(
            "Completion has no choices",
            ErrorKind::InvalidReply,
        ));
    };
    if last.finish_reason.as_deref() == Some("content_filter") {
        return Err(Error::new(
            "Completion was filtered by the provider",
            ErrorKind::Moderated,
        ));
    }

    let choices = completion
        .choices
        .into_iter()
        .map(|choice| ModelChoice {
            content: choice.message.content.unwrap_or_default(),
        })
        .collect();
    Ok(ModelReply { choices })
}
