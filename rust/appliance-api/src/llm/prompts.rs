//! Prompts and response schemas for device extraction and matching.

use serde_json::{Value, json};

/// Extraction prompt when the document will be filled from the catalog and
/// vendor details matter.
pub const EXTRACTION_WITH_VENDOR: &str = "\
Extract every numbered kitchen appliance and its full description from the attached document. \
For each appliance record its type, its dimensions (length, width, height; use 0 when a value \
is not given), the complete description text, the manufacturer or brand, the model designation \
and the quoted price if present.";

/// Extraction prompt for new catalog entries. Text stays in German.
pub const EXTRACTION: &str = "\
Extract every numbered kitchen appliance and its full description from the attached document. \
For each appliance record its type and its dimensions (length, width, height; use 0 when a \
value is not given), plus the complete description text. Keep all text in German.";

/// Matching prompt. `{canonical_groups}` and `{devices}` are substituted.
pub const MATCHING: &str = "\
You match kitchen appliances to standardized device names. For every device in DEVICES choose \
the single best fitting name from CANONICAL_GROUPS and store it under the key 'device_matched'. \
Only use names from CANONICAL_GROUPS. Return the devices in the given order and keep every \
original key and value unchanged.

CANONICAL_GROUPS:
---
{canonical_groups}
---

DEVICES:
---
{devices}
---";

/// Fill the matching prompt.
pub fn matching_prompt(canonical_groups: &str, devices: &str) -> String {
    MATCHING
        .replace("{canonical_groups}", canonical_groups)
        .replace("{devices}", devices)
}

fn device_properties() -> serde_json::Map<String, Value> {
    let mut properties = serde_json::Map::new();
    for (name, kind) in [
        ("device_raw", "STRING"),
        ("length", "INTEGER"),
        ("width", "INTEGER"),
        ("height", "INTEGER"),
        ("description", "STRING"),
        ("manufacturer", "STRING"),
        ("model", "STRING"),
        ("price", "INTEGER"),
    ] {
        properties.insert(name.to_string(), json!({ "type": kind }));
    }
    properties
}

const DEVICE_FIELDS: [&str; 8] = [
    "device_raw",
    "length",
    "width",
    "height",
    "description",
    "manufacturer",
    "model",
    "price",
];

fn devices_schema(properties: serde_json::Map<String, Value>, required: &[&str]) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "devices": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": properties,
                    "required": required,
                }
            }
        },
        "required": ["devices"],
    })
}

/// Response schema for extraction.
pub fn extraction_schema() -> Value {
    devices_schema(device_properties(), &DEVICE_FIELDS)
}

/// Response schema for matching: the extraction fields plus `device_matched`.
pub fn matching_schema() -> Value {
    let mut properties = device_properties();
    properties.insert("device_matched".to_string(), json!({ "type": "STRING" }));
    let mut required = DEVICE_FIELDS.to_vec();
    required.push("device_matched");
    devices_schema(properties, &required)
}
