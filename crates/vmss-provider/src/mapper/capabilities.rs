use super::Result;
use crate::{
    model::AdditionalCapabilities,
    value::{Block, Value},
};

/// The API always receives the capabilities, with everything disabled when
/// the block is omitted.
pub(super) fn expand_additional_capabilities(
    input: Option<&Block>,
) -> Result<AdditionalCapabilities> {
    let ultra_ssd_enabled = match input {
        Some(block) => block.bool_or("ultra_ssd_enabled", false)?,
        None => false,
    };

    Ok(AdditionalCapabilities {
        ultra_ssd_enabled: Some(ultra_ssd_enabled),
    })
}

pub(super) fn flatten_additional_capabilities(input: Option<&AdditionalCapabilities>) -> Value {
    let Some(capabilities) = input else {
        return Value::empty_list();
    };

    Value::single(Block::new().with(
        "ultra_ssd_enabled",
        capabilities.ultra_ssd_enabled.unwrap_or_default(),
    ))
}
