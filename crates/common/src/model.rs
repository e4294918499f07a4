//! Status and category enums shared by stored records and API payloads.

use serde::{Deserialize, Serialize};

/// Custody state of a kit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KitStatus {
    #[default]
    Available,
    CheckedOut,
    InMaintenance,
    Lost,
}

/// Category of an inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Firearm,
    Optic,
    Case,
    Magazine,
    Tool,
    Accessory,
    Other,
}

/// Availability of an inventory item.
///
/// `Assigned` means the item sits in a kit that is in storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Available,
    Assigned,
    CheckedOut,
    Lost,
    Maintenance,
}

impl ItemStatus {
    /// Wire name, as used in JSON and query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::Assigned => "assigned",
            ItemStatus::CheckedOut => "checked_out",
            ItemStatus::Lost => "lost",
            ItemStatus::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
