use snafu::OptionExt as _;

use super::{MissingSourceImageSnafu, Result};
use crate::{
    model::ImageReference,
    value::{Block, Value},
};

/// An explicit `source_image_id` takes precedence over a
/// `source_image_reference` block.
pub(super) fn expand_source_image(config: &Block) -> Result<ImageReference> {
    if let Some(id) = config.optional_str("source_image_id")? {
        return Ok(ImageReference {
            id: Some(id.to_owned()),
            ..Default::default()
        });
    }

    let raw = config
        .first_block("source_image_reference")?
        .context(MissingSourceImageSnafu)?;

    Ok(ImageReference {
        id: None,
        publisher: Some(raw.required_str("publisher")?.to_owned()),
        offer: Some(raw.required_str("offer")?.to_owned()),
        sku: Some(raw.required_str("sku")?.to_owned()),
        version: Some(raw.required_str("version")?.to_owned()),
    })
}

/// Writes both `source_image_id` and `source_image_reference`. Only one of
/// them is ever populated.
pub(super) fn flatten_source_image(input: Option<&ImageReference>, block: &mut Block) {
    let id = input.and_then(|image| image.id.clone());

    let reference = match input {
        Some(image) if id.is_none() => Value::single(
            Block::new()
                .with("publisher", image.publisher.clone().unwrap_or_default())
                .with("offer", image.offer.clone().unwrap_or_default())
                .with("sku", image.sku.clone().unwrap_or_default())
                .with("version", image.version.clone().unwrap_or_default()),
        ),
        _ => Value::empty_list(),
    };

    block.insert("source_image_id", id.unwrap_or_default());
    block.insert("source_image_reference", reference);
}
