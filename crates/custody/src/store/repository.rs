//! Kit and item persistence with sealed serial numbers.
//!
//! [`CustodyRepository`] is the only path between API payloads and stored
//! records. Every write seals sensitive fields with the [`FieldCodec`] before
//! the record is built; every read opens them before a payload is returned.
//! An unopenable value fails the whole read with [`StoreError::Integrity`].

use std::sync::Arc;

use common::crypto::{DecryptError, EncryptError, FieldCodec, SealedValue};
use common::model::ItemStatus;
use common::protocol::{Item, ItemFilter, ItemUpdate, Kit, NewItem, NewKit};
use common::records::{ItemRecord, KitRecord, Snapshot, SnapshotError};
use common::ServiceError;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use super::records::RecordStore;

/// Largest page `list_items` returns.
pub const MAX_PAGE: usize = 100;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("kit not found: {0}")]
    KitNotFound(String),

    #[error("item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("kit code already exists: {0}")]
    DuplicateCode(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    /// A stored sensitive value could not be opened.
    #[error("sealed {field} on {kind} {id} failed integrity check: {source}")]
    Integrity {
        kind: &'static str,
        id: Uuid,
        field: &'static str,
        #[source]
        source: DecryptError,
    },

    #[error(transparent)]
    Encrypt(#[from] EncryptError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::KitNotFound(_) | StoreError::ItemNotFound(_) => {
                ServiceError::NotFound(e.to_string())
            }
            StoreError::DuplicateCode(_) => ServiceError::Conflict(e.to_string()),
            StoreError::Invalid(msg) => ServiceError::BadRequest(msg),
            StoreError::Integrity { .. } => ServiceError::DataUnavailable,
            StoreError::Encrypt(_) | StoreError::Snapshot(_) => {
                ServiceError::Internal(e.to_string())
            }
        }
    }
}

/// Kit and item repository sealing sensitive fields on the way in and opening
/// them on the way out.
#[derive(Clone, Debug)]
pub struct CustodyRepository {
    store: RecordStore,
    codec: Arc<FieldCodec>,
}

impl CustodyRepository {
    pub fn new(store: RecordStore, codec: Arc<FieldCodec>) -> Self {
        Self { store, codec }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Kits
    // -----------------------------------------------------------------------

    /// Create a kit. Codes are trimmed and must be unique.
    pub async fn create_kit(&self, new: NewKit) -> Result<Kit, StoreError> {
        let code = required(&new.code, "code")?;
        let name = required(&new.name, "name")?;
        let sealed = self.codec.encode(new.serial_number.as_deref())?;

        let record = KitRecord {
            id: Uuid::new_v4(),
            code,
            name,
            description: new.description,
            status: Default::default(),
            serial_number_encrypted: sealed,
        };

        let record = self
            .store
            .update(|s| {
                if find_kit(s, &record.code).is_some() {
                    return Err(StoreError::DuplicateCode(record.code.clone()));
                }
                s.kits.push(record.clone());
                Ok(record)
            })
            .await?;

        info!(kit_id = %record.id, "kit created");
        self.open_kit(&record)
    }

    /// All kits, serial numbers decoded. Fails as a whole on any integrity error.
    pub async fn list_kits(&self) -> Result<Vec<Kit>, StoreError> {
        let snapshot = self.store.snapshot();
        snapshot.kits.iter().map(|k| self.open_kit(k)).collect()
    }

    pub async fn get_kit(&self, code: &str) -> Result<Kit, StoreError> {
        let snapshot = self.store.snapshot();
        let kit = find_kit(&snapshot, code)
            .ok_or_else(|| StoreError::KitNotFound(code.trim().into()))?;
        self.open_kit(kit)
    }

    /// Replace or clear a kit's serial number.
    pub async fn set_kit_serial(
        &self,
        code: &str,
        serial_number: Option<String>,
    ) -> Result<Kit, StoreError> {
        let sealed = self.codec.encode(serial_number.as_deref())?;
        let record = self
            .store
            .update(|s| {
                let kit = s
                    .kits
                    .iter_mut()
                    .find(|k| k.code == code.trim())
                    .ok_or_else(|| StoreError::KitNotFound(code.trim().into()))?;
                kit.serial_number_encrypted = sealed;
                Ok::<_, StoreError>(kit.clone())
            })
            .await?;

        info!(kit_id = %record.id, "kit serial number updated");
        self.open_kit(&record)
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Create an item, optionally assigning it to a kit by code.
    pub async fn create_item(&self, new: NewItem) -> Result<Item, StoreError> {
        let sealed = self.codec.encode(new.serial_number.as_deref())?;

        let record = self
            .store
            .update(|s| {
                let current_kit_id = match new.kit_code.as_deref() {
                    Some(code) => Some(
                        find_kit(s, code)
                            .map(|k| k.id)
                            .ok_or_else(|| StoreError::Invalid(format!("unknown kit code: {code}")))?,
                    ),
                    None => None,
                };
                let record = ItemRecord {
                    id: Uuid::new_v4(),
                    current_kit_id,
                    item_type: new.item_type,
                    make: new.make,
                    model: new.model,
                    friendly_name: new.friendly_name,
                    quantity: new.quantity.unwrap_or(1),
                    status: if current_kit_id.is_some() {
                        ItemStatus::Assigned
                    } else {
                        ItemStatus::Available
                    },
                    notes: new.notes,
                    serial_number_encrypted: sealed,
                };
                s.items.push(record.clone());
                Ok::<_, StoreError>(record)
            })
            .await?;

        info!(item_id = %record.id, kit_id = ?record.current_kit_id, "item created");
        self.open_item(&record)
    }

    /// Items matching `filter`, serial numbers decoded. Fails as a whole on any
    /// integrity error in the returned page.
    pub async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, StoreError> {
        let limit = filter.limit.unwrap_or(MAX_PAGE);
        if limit == 0 || limit > MAX_PAGE {
            return Err(StoreError::Invalid(format!(
                "limit must be between 1 and {MAX_PAGE}"
            )));
        }
        let snapshot = self.store.snapshot();
        snapshot
            .items
            .iter()
            .filter(|i| filter.status.map_or(true, |st| i.status == st))
            .filter(|i| filter.item_type.map_or(true, |t| i.item_type == t))
            .filter(|i| {
                filter
                    .assigned
                    .map_or(true, |a| i.current_kit_id.is_some() == a)
            })
            .skip(filter.skip.unwrap_or(0))
            .take(limit)
            .map(|i| self.open_item(i))
            .collect()
    }

    pub async fn get_item(&self, id: Uuid) -> Result<Item, StoreError> {
        let snapshot = self.store.snapshot();
        let item = snapshot
            .items
            .iter()
            .find(|i| i.id == id)
            .ok_or(StoreError::ItemNotFound(id))?;
        self.open_item(item)
    }

    /// Items currently assigned to the kit with `code`.
    pub async fn list_kit_items(&self, code: &str) -> Result<Vec<Item>, StoreError> {
        let snapshot = self.store.snapshot();
        let kit = find_kit(&snapshot, code)
            .ok_or_else(|| StoreError::KitNotFound(code.trim().into()))?;
        snapshot
            .items
            .iter()
            .filter(|i| i.current_kit_id == Some(kit.id))
            .map(|i| self.open_item(i))
            .collect()
    }

    /// Apply a partial update. See [`ItemUpdate`] for the serial number rules.
    pub async fn update_item(&self, id: Uuid, update: ItemUpdate) -> Result<Item, StoreError> {
        let sealed = match update.serial_number {
            Some(serial) => Some(self.codec.encode(serial.as_deref())?),
            None => None,
        };

        let record = self
            .store
            .update(|s| {
                let item = find_item_mut(s, id)?;
                if let Some(make) = update.make {
                    item.make = Some(make);
                }
                if let Some(model) = update.model {
                    item.model = Some(model);
                }
                if let Some(name) = update.friendly_name {
                    item.friendly_name = Some(name);
                }
                if let Some(quantity) = update.quantity {
                    item.quantity = quantity;
                }
                if let Some(status) = update.status {
                    item.status = status;
                }
                if let Some(notes) = update.notes {
                    item.notes = Some(notes);
                }
                if let Some(sealed) = sealed {
                    item.serial_number_encrypted = sealed;
                }
                Ok::<_, StoreError>(item.clone())
            })
            .await?;

        info!(item_id = %record.id, "item updated");
        self.open_item(&record)
    }

    /// Move an `available` item into the kit with `kit_code`.
    pub async fn assign_item(&self, id: Uuid, kit_code: &str) -> Result<Item, StoreError> {
        let record = self
            .store
            .update(|s| {
                let kit_id = find_kit(s, kit_code)
                    .map(|k| k.id)
                    .ok_or_else(|| StoreError::KitNotFound(kit_code.trim().into()))?;
                let item = find_item_mut(s, id)?;
                if item.status != ItemStatus::Available {
                    return Err(StoreError::Invalid(format!(
                        "item is {} and cannot be assigned; only available items can be",
                        item.status
                    )));
                }
                item.current_kit_id = Some(kit_id);
                item.status = ItemStatus::Assigned;
                Ok(item.clone())
            })
            .await?;

        info!(item_id = %record.id, kit_id = ?record.current_kit_id, "item assigned");
        self.open_item(&record)
    }

    /// Take an item out of its kit and make it `available` again.
    pub async fn unassign_item(&self, id: Uuid) -> Result<Item, StoreError> {
        let record = self
            .store
            .update(|s| {
                let item = find_item_mut(s, id)?;
                if item.current_kit_id.is_none() {
                    return Err(StoreError::Invalid("item is not assigned to any kit".into()));
                }
                item.current_kit_id = None;
                item.status = ItemStatus::Available;
                Ok(item.clone())
            })
            .await?;

        info!(item_id = %record.id, "item unassigned");
        self.open_item(&record)
    }

    /// Remove an item. Items still in a kit must be unassigned first.
    pub async fn delete_item(&self, id: Uuid) -> Result<(), StoreError> {
        self.store
            .update(|s| {
                let pos = s
                    .items
                    .iter()
                    .position(|i| i.id == id)
                    .ok_or(StoreError::ItemNotFound(id))?;
                if s.items[pos].current_kit_id.is_some() {
                    return Err(StoreError::Invalid(
                        "item is assigned to a kit; unassign it before deleting".into(),
                    ));
                }
                s.items.remove(pos);
                Ok(())
            })
            .await?;

        info!(item_id = %id, "item deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Integrity
    // -----------------------------------------------------------------------

    /// Open every sealed value in the store, returning how many were checked.
    ///
    /// Run at startup so a key that parses but does not match the data stops
    /// the process before it serves anything.
    pub fn verify_all(&self) -> Result<usize, StoreError> {
        let snapshot = self.store.snapshot();
        for kit in &snapshot.kits {
            self.open_kit(kit)?;
        }
        for item in &snapshot.items {
            self.open_item(item)?;
        }
        Ok(snapshot.sealed_value_count())
    }

    fn open_kit(&self, record: &KitRecord) -> Result<Kit, StoreError> {
        let serial_number = self.open(
            "kit",
            record.id,
            record.serial_number_encrypted.as_ref(),
        )?;
        Ok(Kit {
            id: record.id,
            code: record.code.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            status: record.status,
            serial_number,
        })
    }

    fn open_item(&self, record: &ItemRecord) -> Result<Item, StoreError> {
        let serial_number = self.open(
            "item",
            record.id,
            record.serial_number_encrypted.as_ref(),
        )?;
        Ok(Item {
            id: record.id,
            current_kit_id: record.current_kit_id,
            item_type: record.item_type,
            make: record.make.clone(),
            model: record.model.clone(),
            friendly_name: record.friendly_name.clone(),
            quantity: record.quantity,
            status: record.status,
            notes: record.notes.clone(),
            serial_number,
        })
    }

    fn open(
        &self,
        kind: &'static str,
        id: Uuid,
        sealed: Option<&SealedValue>,
    ) -> Result<Option<String>, StoreError> {
        self.codec.decode(sealed).map_err(|source| {
            error!(
                kind,
                id = %id,
                error = %source,
                key_fingerprint = %self.codec.fingerprint(),
                "sealed serial number failed integrity check"
            );
            StoreError::Integrity {
                kind,
                id,
                field: "serial_number",
                source,
            }
        })
    }
}

fn required(value: &str, field: &str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Invalid(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_owned())
}

fn find_kit<'a>(snapshot: &'a Snapshot, code: &str) -> Option<&'a KitRecord> {
    let code = code.trim();
    snapshot.kits.iter().find(|k| k.code == code)
}

fn find_item_mut(snapshot: &mut Snapshot, id: Uuid) -> Result<&mut ItemRecord, StoreError> {
    snapshot
        .items
        .iter_mut()
        .find(|i| i.id == id)
        .ok_or(StoreError::ItemNotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::crypto::{EncryptionKey, KEY_LEN};
    use common::model::ItemType;

    fn codec(byte: u8) -> Arc<FieldCodec> {
        Arc::new(FieldCodec::with_key(
            &EncryptionKey::from_bytes(&[byte; KEY_LEN]).unwrap(),
        ))
    }

    fn repo() -> CustodyRepository {
        CustodyRepository::new(RecordStore::in_memory(), codec(0x11))
    }

    fn new_kit(code: &str, serial: Option<&str>) -> NewKit {
        NewKit {
            code: code.into(),
            name: format!("Kit {code}"),
            description: None,
            serial_number: serial.map(Into::into),
        }
    }

    fn new_item(kit_code: Option<&str>, serial: Option<&str>) -> NewItem {
        NewItem {
            item_type: ItemType::Firearm,
            make: Some("Anschutz".into()),
            model: Some("1903".into()),
            friendly_name: None,
            quantity: None,
            notes: None,
            serial_number: serial.map(Into::into),
            kit_code: kit_code.map(Into::into),
        }
    }

    async fn corrupt_kit_serial(repo: &CustodyRepository, code: &str) {
        let code = code.to_owned();
        repo.store()
            .update(|s| {
                let kit = s.kits.iter_mut().find(|k| k.code == code).unwrap();
                kit.serial_number_encrypted =
                    Some(SealedValue::from_storage("v1.AAAAAAAAAAAAAAAA.AAAAAAAAAAAAAAAAAAAAAA".into()));
                Ok::<_, StoreError>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn serial_is_sealed_in_storage_and_opened_on_read() {
        let repo = repo();
        let kit = repo.create_kit(new_kit("TEST-001", Some("SN-12345-ABCD"))).await.unwrap();
        assert_eq!(kit.serial_number.as_deref(), Some("SN-12345-ABCD"));

        let snapshot = repo.store().snapshot();
        let stored = snapshot.kits[0].serial_number_encrypted.as_ref().unwrap();
        assert_ne!(stored.as_str(), "SN-12345-ABCD");
        assert!(!serde_json::to_string(&*snapshot).unwrap().contains("SN-12345"));

        let fetched = repo.get_kit("TEST-001").await.unwrap();
        assert_eq!(fetched.serial_number.as_deref(), Some("SN-12345-ABCD"));
    }

    #[tokio::test]
    async fn absent_serial_never_produces_a_token() {
        let repo = repo();
        let kit = repo.create_kit(new_kit("TEST-003", None)).await.unwrap();
        assert!(kit.serial_number.is_none());
        assert!(repo.store().snapshot().kits[0].serial_number_encrypted.is_none());
        assert!(repo.get_kit("TEST-003").await.unwrap().serial_number.is_none());
    }

    #[tokio::test]
    async fn identical_serials_store_different_tokens() {
        let repo = repo();
        repo.create_kit(new_kit("A", Some("SN-SAME"))).await.unwrap();
        repo.create_kit(new_kit("B", Some("SN-SAME"))).await.unwrap();
        let snapshot = repo.store().snapshot();
        assert_ne!(
            snapshot.kits[0].serial_number_encrypted,
            snapshot.kits[1].serial_number_encrypted
        );
    }

    #[tokio::test]
    async fn serial_can_be_updated_and_cleared() {
        let repo = repo();
        repo.create_kit(new_kit("TEST-004", Some("SN-ORIGINAL"))).await.unwrap();
        let before = repo.store().snapshot().kits[0].serial_number_encrypted.clone();

        let kit = repo.set_kit_serial("TEST-004", Some("SN-UPDATED".into())).await.unwrap();
        assert_eq!(kit.serial_number.as_deref(), Some("SN-UPDATED"));
        assert_ne!(repo.store().snapshot().kits[0].serial_number_encrypted, before);

        let kit = repo.set_kit_serial("TEST-004", None).await.unwrap();
        assert!(kit.serial_number.is_none());
        assert!(repo.store().snapshot().kits[0].serial_number_encrypted.is_none());
    }

    #[tokio::test]
    async fn duplicate_and_blank_codes_rejected() {
        let repo = repo();
        repo.create_kit(new_kit("K-1", None)).await.unwrap();
        assert!(matches!(
            repo.create_kit(new_kit("K-1", None)).await,
            Err(StoreError::DuplicateCode(_))
        ));
        assert!(matches!(
            repo.create_kit(new_kit("   ", None)).await,
            Err(StoreError::Invalid(_))
        ));
        assert_eq!(repo.list_kits().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn corrupted_token_is_an_integrity_error() {
        let repo = repo();
        repo.create_kit(new_kit("K-1", Some("SN-1"))).await.unwrap();
        corrupt_kit_serial(&repo, "K-1").await;

        let err = repo.get_kit("K-1").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Integrity { source: DecryptError::AuthenticationFailed, .. }
        ));
        assert!(matches!(repo.list_kits().await, Err(StoreError::Integrity { .. })));
        assert!(matches!(ServiceError::from(err), ServiceError::DataUnavailable));
    }

    #[tokio::test]
    async fn wrong_key_fails_verification() {
        let store = RecordStore::in_memory();
        let writer = CustodyRepository::new(store.clone(), codec(0x11));
        writer.create_kit(new_kit("K-1", Some("SN-1"))).await.unwrap();
        writer.create_kit(new_kit("K-2", None)).await.unwrap();
        assert_eq!(writer.verify_all().unwrap(), 1);

        let reader = CustodyRepository::new(store, codec(0x22));
        assert!(matches!(reader.verify_all(), Err(StoreError::Integrity { .. })));
    }

    #[tokio::test]
    async fn item_lifecycle() {
        let repo = repo();
        let kit = repo.create_kit(new_kit("K-1", None)).await.unwrap();

        let item = repo.create_item(new_item(None, Some("SN-ITEM-1"))).await.unwrap();
        assert_eq!(item.status, ItemStatus::Available);
        assert_eq!(item.quantity, 1);
        assert_eq!(item.serial_number.as_deref(), Some("SN-ITEM-1"));

        let assigned = repo.assign_item(item.id, "K-1").await.unwrap();
        assert_eq!(assigned.current_kit_id, Some(kit.id));
        assert_eq!(assigned.status, ItemStatus::Assigned);

        let in_kit = repo.list_kit_items("K-1").await.unwrap();
        assert_eq!(in_kit.len(), 1);
        assert_eq!(in_kit[0].serial_number.as_deref(), Some("SN-ITEM-1"));
    }

    #[tokio::test]
    async fn create_item_into_kit() {
        let repo = repo();
        let kit = repo.create_kit(new_kit("K-1", None)).await.unwrap();
        let item = repo.create_item(new_item(Some("K-1"), None)).await.unwrap();
        assert_eq!(item.current_kit_id, Some(kit.id));
        assert_eq!(item.status, ItemStatus::Assigned);
        assert!(repo.store().snapshot().items[0].serial_number_encrypted.is_none());

        assert!(matches!(
            repo.create_item(new_item(Some("NOPE"), None)).await,
            Err(StoreError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn update_item_serial_rules() {
        let repo = repo();
        let item = repo.create_item(new_item(None, Some("SN-1"))).await.unwrap();

        let unchanged = repo
            .update_item(item.id, ItemUpdate { notes: Some("cleaned".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(unchanged.serial_number.as_deref(), Some("SN-1"));
        assert_eq!(unchanged.notes.as_deref(), Some("cleaned"));

        let replaced = repo
            .update_item(item.id, ItemUpdate { serial_number: Some(Some("SN-2".into())), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(replaced.serial_number.as_deref(), Some("SN-2"));

        let cleared = repo
            .update_item(item.id, ItemUpdate { serial_number: Some(None), ..Default::default() })
            .await
            .unwrap();
        assert!(cleared.serial_number.is_none());
        assert!(repo.store().snapshot().items[0].serial_number_encrypted.is_none());
    }

    #[tokio::test]
    async fn missing_records_reported() {
        let repo = repo();
        assert!(matches!(repo.get_kit("NOPE").await, Err(StoreError::KitNotFound(_))));
        let id = Uuid::new_v4();
        assert!(matches!(repo.get_item(id).await, Err(StoreError::ItemNotFound(_))));
        assert!(matches!(
            repo.update_item(id, ItemUpdate::default()).await,
            Err(StoreError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn serials_survive_restart_with_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        let repo = CustodyRepository::new(RecordStore::open(path.clone()).await.unwrap(), codec(0x11));
        repo.create_kit(new_kit("REFRESH-TEST", Some("SN-REFRESH-999"))).await.unwrap();
        drop(repo);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("SN-REFRESH-999"));

        let reopened = CustodyRepository::new(RecordStore::open(path).await.unwrap(), codec(0x11));
        for _ in 0..3 {
            let kit = reopened.get_kit("REFRESH-TEST").await.unwrap();
            assert_eq!(kit.serial_number.as_deref(), Some("SN-REFRESH-999"));
        }
    }

    #[tokio::test]
    async fn only_available_items_can_be_assigned() {
        let repo = repo();
        repo.create_kit(new_kit("K-1", None)).await.unwrap();
        repo.create_kit(new_kit("K-2", None)).await.unwrap();
        let item = repo.create_item(new_item(Some("K-1"), None)).await.unwrap();

        // Already in a kit.
        assert!(matches!(
            repo.assign_item(item.id, "K-2").await,
            Err(StoreError::Invalid(_))
        ));

        repo.update_item(item.id, ItemUpdate { status: Some(ItemStatus::Lost), ..Default::default() })
            .await
            .unwrap();
        let err = repo.assign_item(item.id, "K-2").await.unwrap_err();
        assert!(err.to_string().contains("lost"));
        assert!(matches!(ServiceError::from(err), ServiceError::BadRequest(_)));

        let stored = repo.get_item(item.id).await.unwrap();
        assert_eq!(stored.status, ItemStatus::Lost);
        assert!(repo.list_kit_items("K-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unassign_returns_item_to_inventory() {
        let repo = repo();
        repo.create_kit(new_kit("K-1", None)).await.unwrap();
        repo.create_kit(new_kit("K-2", None)).await.unwrap();
        let item = repo.create_item(new_item(Some("K-1"), Some("SN-U"))).await.unwrap();

        let freed = repo.unassign_item(item.id).await.unwrap();
        assert_eq!(freed.current_kit_id, None);
        assert_eq!(freed.status, ItemStatus::Available);
        assert_eq!(freed.serial_number.as_deref(), Some("SN-U"));

        assert!(matches!(
            repo.unassign_item(item.id).await,
            Err(StoreError::Invalid(_))
        ));
        let moved = repo.assign_item(item.id, "K-2").await.unwrap();
        assert_eq!(moved.status, ItemStatus::Assigned);
    }

    #[tokio::test]
    async fn delete_requires_unassigned_item() {
        let repo = repo();
        repo.create_kit(new_kit("K-1", None)).await.unwrap();
        let item = repo.create_item(new_item(Some("K-1"), None)).await.unwrap();

        assert!(matches!(repo.delete_item(item.id).await, Err(StoreError::Invalid(_))));
        assert_eq!(repo.store().snapshot().items.len(), 1);

        repo.unassign_item(item.id).await.unwrap();
        repo.delete_item(item.id).await.unwrap();
        assert!(repo.store().snapshot().items.is_empty());
        assert!(matches!(
            repo.delete_item(item.id).await,
            Err(StoreError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_items_filters_and_pages() {
        let repo = repo();
        repo.create_kit(new_kit("K-1", None)).await.unwrap();
        repo.create_item(new_item(Some("K-1"), Some("SN-A"))).await.unwrap();
        repo.create_item(new_item(None, Some("SN-B"))).await.unwrap();
        let mut optic = new_item(None, None);
        optic.item_type = ItemType::Optic;
        repo.create_item(optic).await.unwrap();

        let all = repo.list_items(&ItemFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].serial_number.as_deref(), Some("SN-A"));

        let free = ItemFilter { assigned: Some(false), ..Default::default() };
        assert_eq!(repo.list_items(&free).await.unwrap().len(), 2);

        let assigned = ItemFilter { status: Some(ItemStatus::Assigned), ..Default::default() };
        assert_eq!(repo.list_items(&assigned).await.unwrap().len(), 1);

        let optics = ItemFilter { item_type: Some(ItemType::Optic), ..Default::default() };
        assert_eq!(repo.list_items(&optics).await.unwrap().len(), 1);

        let page = ItemFilter { skip: Some(1), limit: Some(1), ..Default::default() };
        let page = repo.list_items(&page).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].serial_number.as_deref(), Some("SN-B"));

        let too_big = ItemFilter { limit: Some(MAX_PAGE + 1), ..Default::default() };
        assert!(matches!(repo.list_items(&too_big).await, Err(StoreError::Invalid(_))));
    }

    #[tokio::test]
    async fn kit_codes_are_matched_after_trimming() {
        let repo = repo();
        let kit = repo.create_kit(new_kit("  K-1 ", Some("SN-K"))).await.unwrap();
        assert_eq!(kit.code, "K-1");

        assert_eq!(repo.get_kit(" K-1").await.unwrap().id, kit.id);
        let item = repo.create_item(new_item(Some("K-1 "), None)).await.unwrap();
        assert_eq!(item.current_kit_id, Some(kit.id));
        repo.unassign_item(item.id).await.unwrap();
        let item = repo.assign_item(item.id, " K-1 ").await.unwrap();
        assert_eq!(item.current_kit_id, Some(kit.id));
        assert_eq!(repo.list_kit_items("K-1\t").await.unwrap().len(), 1);
        repo.set_kit_serial(" K-1", None).await.unwrap();
    }
}
