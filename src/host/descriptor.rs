//! Command descriptors issued by the panel
//!
//! Descriptors are opaque JSON objects keyed by `_obj`. Only the handful the
//! panel builds itself live here; everything else passes through untouched.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::LayerId;

/// A single structured instruction sent to the host
pub type Descriptor = serde_json::Value;

/// Command verbs understood by the in-memory host
pub mod verb {
    pub const STAMP_VISIBLE: &str = "stampVisible";
    pub const MOVE: &str = "move";
    pub const SET: &str = "set";
    pub const SELECT: &str = "select";
    pub const WHITE_BALANCE: &str = "whiteBalance";
    pub const GET: &str = "get";
    pub const DELETE: &str = "delete";
    pub const FLATTEN: &str = "flattenImage";
    pub const MERGE_VISIBLE: &str = "mergeVisible";
}

/// White balance mode stored in the marker's filter record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiteBalanceMode {
    #[default]
    Custom,
    Auto,
}

/// The marker layer's parameter record.
///
/// The host replaces the whole record on every write, so both axes are
/// always supplied together.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WhiteBalance {
    pub temperature: f64,
    pub tint: f64,
    #[serde(default)]
    pub mode: WhiteBalanceMode,
}

impl WhiteBalance {
    pub fn custom(temperature: f64, tint: f64) -> Self {
        Self {
            temperature,
            tint,
            mode: WhiteBalanceMode::Custom,
        }
    }

    pub fn neutral() -> Self {
        Self::custom(0.0, 0.0)
    }

    pub fn is_auto(&self) -> bool {
        self.mode == WhiteBalanceMode::Auto
    }
}

fn layer_target(layer: LayerId) -> Descriptor {
    json!([{ "_ref": "layer", "_id": layer.0 }])
}

/// Verb of a descriptor, if it has one
pub fn verb_of(descriptor: &Descriptor) -> Option<&str> {
    descriptor.get("_obj").and_then(|v| v.as_str())
}

/// Target layer id of a descriptor, if it addresses one
pub fn target_layer(descriptor: &Descriptor) -> Option<LayerId> {
    descriptor
        .get("_target")?
        .as_array()?
        .iter()
        .find(|r| r.get("_ref").and_then(|v| v.as_str()) == Some("layer"))?
        .get("_id")?
        .as_u64()
        .and_then(|id| u32::try_from(id).ok())
        .map(LayerId)
}

/// Merge every visible layer into a new layer, keeping the originals
pub fn stamp_visible() -> Descriptor {
    json!({ "_obj": verb::STAMP_VISIBLE, "duplicate": true })
}

/// Move a layer to the top of the stack
pub fn move_to_top(layer: LayerId) -> Descriptor {
    json!({
        "_obj": verb::MOVE,
        "_target": layer_target(layer),
        "to": { "_ref": "layer", "_enum": "ordinal", "_value": "front" }
    })
}

pub fn rename_layer(layer: LayerId, name: &str) -> Descriptor {
    json!({
        "_obj": verb::SET,
        "_target": layer_target(layer),
        "to": { "_obj": "layer", "name": name }
    })
}

pub fn select_layer(layer: LayerId) -> Descriptor {
    json!({ "_obj": verb::SELECT, "_target": layer_target(layer), "makeVisible": false })
}

/// Replace a layer's white balance record
pub fn set_white_balance(layer: LayerId, wb: WhiteBalance) -> Descriptor {
    json!({
        "_obj": verb::WHITE_BALANCE,
        "_target": layer_target(layer),
        "mode": wb.mode,
        "temperature": wb.temperature,
        "tint": wb.tint
    })
}

/// Let the host compute the white balance for a layer
pub fn auto_white_balance(layer: LayerId) -> Descriptor {
    json!({
        "_obj": verb::WHITE_BALANCE,
        "_target": layer_target(layer),
        "mode": WhiteBalanceMode::Auto
    })
}

/// Fetch a layer's full descriptor
pub fn get_layer(layer: LayerId) -> Descriptor {
    json!({ "_obj": verb::GET, "_target": layer_target(layer) })
}

pub fn delete_layer(layer: LayerId) -> Descriptor {
    json!({ "_obj": verb::DELETE, "_target": layer_target(layer) })
}

pub fn flatten_image() -> Descriptor {
    json!({ "_obj": verb::FLATTEN })
}

/// Layer id carried by a reply (e.g. the layer a stamp created)
pub fn reply_layer_id(reply: &Descriptor) -> Option<LayerId> {
    reply
        .get("layerID")
        .and_then(|v| v.as_u64())
        .and_then(|id| u32::try_from(id).ok())
        .map(LayerId)
}

/// Decode the white balance record nested in a `get` reply.
///
/// Returns `None` when the layer carries no white balance filter.
pub fn read_white_balance(reply: &Descriptor) -> Option<WhiteBalance> {
    let filter = reply.get("filterFX")?;
    if verb_of(filter) != Some(verb::WHITE_BALANCE) {
        return None;
    }
    serde_json::from_value(filter.clone()).ok()
}
