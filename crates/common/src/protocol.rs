//! Request and response types exchanged over the HTTP API.
//!
//! These types only ever carry decoded plaintext. Stored tokens never cross
//! this boundary.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::model::{ItemStatus, ItemType, KitStatus};

// ---------------------------------------------------------------------------
// Kits
// ---------------------------------------------------------------------------

/// Request body for `POST /kits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewKit {
    /// Unique kit code (QR code or manual entry).
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Plaintext serial number; sealed before it is stored.
    #[serde(default)]
    pub serial_number: Option<String>,
}

/// A kit as returned to callers, with its serial number decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kit {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub status: KitStatus,
    pub serial_number: Option<String>,
}

/// Request body for `PUT /kits/:code/serial-number`. `null` clears the serial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialNumberUpdate {
    pub serial_number: Option<String>,
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Request body for `POST /items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub item_type: ItemType,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub friendly_name: Option<String>,
    /// Defaults to 1.
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    /// Code of the kit to assign the item to on creation.
    #[serde(default)]
    pub kit_code: Option<String>,
}

/// An item as returned to callers, with its serial number decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub current_kit_id: Option<Uuid>,
    pub item_type: ItemType,
    pub make: Option<String>,
    pub model: Option<String>,
    pub friendly_name: Option<String>,
    pub quantity: u32,
    pub status: ItemStatus,
    pub notes: Option<String>,
    pub serial_number: Option<String>,
}

/// Request body for `PATCH /items/:id`.
///
/// Omitted fields are left unchanged. For `serial_number` an explicit `null`
/// clears the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemUpdate {
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub status: Option<ItemStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub serial_number: Option<Option<String>>,
}

/// Distinguishes an explicit `null` from an omitted field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query string for `GET /items`. Every filter is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    pub status: Option<ItemStatus>,
    pub item_type: Option<ItemType>,
    /// `true` keeps only items in a kit, `false` only items outside one.
    pub assigned: Option<bool>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

/// Request body for `PUT /items/:id/kit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitAssignment {
    pub kit_code: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"data_unavailable"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status. Always `"ok"` once the process is serving.
    pub status: String,
    /// Number of kits in the store.
    pub kits: usize,
    /// Number of items in the store.
    pub items: usize,
    /// Whether the store is backed by a data file.
    pub persistent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_kit_optional_fields_default() {
        let req: NewKit = serde_json::from_value(json!({"code": "K-1", "name": "Rifle kit"})).unwrap();
        assert_eq!(req.code, "K-1");
        assert!(req.description.is_none());
        assert!(req.serial_number.is_none());
    }

    #[test]
    fn item_update_distinguishes_null_from_omitted() {
        let omitted: ItemUpdate = serde_json::from_value(json!({"make": "Anschutz"})).unwrap();
        assert_eq!(omitted.serial_number, None);
        assert_eq!(omitted.make.as_deref(), Some("Anschutz"));

        let cleared: ItemUpdate = serde_json::from_value(json!({"serial_number": null})).unwrap();
        assert_eq!(cleared.serial_number, Some(None));

        let set: ItemUpdate = serde_json::from_value(json!({"serial_number": "SN-9"})).unwrap();
        assert_eq!(set.serial_number, Some(Some("SN-9".into())));
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("data_unavailable", "data unavailable");
        assert_eq!(e.code, "data_unavailable");
        assert!(e.message.contains("unavailable"));
    }

    #[test]
    fn health_response_serde() {
        let h = HealthResponse {
            status: "ok".into(),
            kits: 3,
            items: 7,
            persistent: false,
        };
        let json = serde_json::to_string(&h).unwrap();
        let decoded: HealthResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.items, 7);
    }
}
