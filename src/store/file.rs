//! File-backed store backend
//!
//! One JSON document per record under a data directory:
//!
//! ```text
//! <root>/instances/<id>.json         record, secure details stripped
//! <root>/instances/<id>.secure.json  secure details only
//! <root>/bindings/<id>.json          record, secure details stripped
//! <root>/bindings/<id>.secure.json   secure details only
//! ```
//!
//! Secure details live in their own file so the deployment can encrypt or
//! mount that path separately; the broker itself never co-mingles them
//! with the general record on disk.
//!
//! Writes go to a temp file and are renamed into place, so a crash never
//! leaves a half-written record. Conditional writes are serialized by a
//! process-local mutex; running several broker processes against the same
//! directory needs a backend with true atomic conditional writes instead.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::model::{BindingRecord, DetailMap, InstanceRecord, OperationStatus};

use super::errors::{StoreError, StoreResult};
use super::BrokerStore;

/// Directory-of-JSON-documents implementation of `BrokerStore`.
pub struct FileStore {
    instances_dir: PathBuf,
    bindings_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref();
        let instances_dir = root.join("instances");
        let bindings_dir = root.join("bindings");
        fs::create_dir_all(&instances_dir)?;
        fs::create_dir_all(&bindings_dir)?;
        Ok(Self {
            instances_dir,
            bindings_dir,
            write_lock: Mutex::new(()),
        })
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record IDs become file names; anything that could escape the data
    /// directory is refused outright.
    fn check_id(id: &str) -> StoreResult<()> {
        let ok = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !id.starts_with('.')
            && !id.ends_with(".secure");
        if ok {
            Ok(())
        } else {
            Err(StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("record id not usable as file name: {:?}", id),
            )))
        }
    }

    fn record_path(dir: &Path, id: &str) -> PathBuf {
        dir.join(format!("{}.json", id))
    }

    fn secure_path(dir: &Path, id: &str) -> PathBuf {
        dir.join(format!("{}.secure.json", id))
    }

    fn write_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path, id: &str) -> StoreResult<Option<T>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            StoreError::CorruptRecord {
                id: id.to_string(),
                reason: e.to_string(),
            }
        })
    }

    fn write_instance(&self, record: &InstanceRecord) -> StoreResult<()> {
        let mut public = record.clone();
        let secure = std::mem::take(&mut public.secure_details);

        let body = serde_json::to_vec_pretty(&public).map_err(|e| StoreError::CorruptRecord {
            id: record.instance_id.clone(),
            reason: e.to_string(),
        })?;
        Self::write_atomic(&Self::record_path(&self.instances_dir, &record.instance_id), &body)?;

        let secure_body =
            serde_json::to_vec_pretty(&secure).map_err(|e| StoreError::CorruptRecord {
                id: record.instance_id.clone(),
                reason: e.to_string(),
            })?;
        Self::write_atomic(
            &Self::secure_path(&self.instances_dir, &record.instance_id),
            &secure_body,
        )
    }

    fn read_instance(&self, instance_id: &str) -> StoreResult<Option<InstanceRecord>> {
        let Some(mut record): Option<InstanceRecord> = Self::read_json(
            &Self::record_path(&self.instances_dir, instance_id),
            instance_id,
        )?
        else {
            return Ok(None);
        };
        let secure: Option<DetailMap> = Self::read_json(
            &Self::secure_path(&self.instances_dir, instance_id),
            instance_id,
        )?;
        record.secure_details = secure.unwrap_or_default();
        Ok(Some(record))
    }

    fn scan_ids(dir: &Path) -> StoreResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(id) = name
                .to_str()
                .and_then(|n| n.strip_suffix(".json"))
                .filter(|n| !n.ends_with(".secure"))
            else {
                continue;
            };
            ids.push(id.to_string());
        }
        ids.sort();
        Ok(ids)
    }

    fn remove_pair(dir: &Path, id: &str) -> StoreResult<()> {
        fs::remove_file(Self::record_path(dir, id))
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => StoreError::NotFound(id.to_string()),
                _ => StoreError::Io(e),
            })?;
        match fs::remove_file(Self::secure_path(dir, id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl BrokerStore for FileStore {
    fn get_instance(&self, instance_id: &str) -> StoreResult<Option<InstanceRecord>> {
        Self::check_id(instance_id)?;
        self.read_instance(instance_id)
    }

    fn create_instance(&self, record: &InstanceRecord) -> StoreResult<()> {
        Self::check_id(&record.instance_id)?;
        let _guard = self.guard();
        if Self::record_path(&self.instances_dir, &record.instance_id).exists() {
            return Err(StoreError::AlreadyExists(record.instance_id.clone()));
        }
        self.write_instance(record)
    }

    fn update_instance(&self, record: &InstanceRecord) -> StoreResult<()> {
        Self::check_id(&record.instance_id)?;
        let _guard = self.guard();
        if !Self::record_path(&self.instances_dir, &record.instance_id).exists() {
            return Err(StoreError::NotFound(record.instance_id.clone()));
        }
        self.write_instance(record)
    }

    fn update_instance_if_status(
        &self,
        record: &InstanceRecord,
        expected: OperationStatus,
    ) -> StoreResult<bool> {
        Self::check_id(&record.instance_id)?;
        let _guard = self.guard();
        let current = self
            .read_instance(&record.instance_id)?
            .ok_or_else(|| StoreError::NotFound(record.instance_id.clone()))?;
        if current.status != expected {
            return Ok(false);
        }
        self.write_instance(record)?;
        Ok(true)
    }

    fn delete_instance(&self, instance_id: &str) -> StoreResult<()> {
        Self::check_id(instance_id)?;
        let _guard = self.guard();
        Self::remove_pair(&self.instances_dir, instance_id)
    }

    fn list_instance_ids(&self) -> StoreResult<Vec<String>> {
        Self::scan_ids(&self.instances_dir)
    }

    fn list_child_instances(&self, parent_instance_id: &str) -> StoreResult<Vec<String>> {
        let mut children = Vec::new();
        for id in Self::scan_ids(&self.instances_dir)? {
            if let Some(record) = self.read_instance(&id)? {
                if record.parent_instance_id.as_deref() == Some(parent_instance_id) {
                    children.push(record.instance_id);
                }
            }
        }
        Ok(children)
    }

    fn get_binding(&self, binding_id: &str) -> StoreResult<Option<BindingRecord>> {
        Self::check_id(binding_id)?;
        let Some(mut record): Option<BindingRecord> = Self::read_json(
            &Self::record_path(&self.bindings_dir, binding_id),
            binding_id,
        )?
        else {
            return Ok(None);
        };
        let secure: Option<DetailMap> =
            Self::read_json(&Self::secure_path(&self.bindings_dir, binding_id), binding_id)?;
        record.secure_details = secure.unwrap_or_default();
        Ok(Some(record))
    }

    fn create_binding(&self, record: &BindingRecord) -> StoreResult<()> {
        Self::check_id(&record.binding_id)?;
        let _guard = self.guard();
        if Self::record_path(&self.bindings_dir, &record.binding_id).exists() {
            return Err(StoreError::AlreadyExists(record.binding_id.clone()));
        }

        let mut public = record.clone();
        let secure = std::mem::take(&mut public.secure_details);
        let body = serde_json::to_vec_pretty(&public).map_err(|e| StoreError::CorruptRecord {
            id: record.binding_id.clone(),
            reason: e.to_string(),
        })?;
        Self::write_atomic(&Self::record_path(&self.bindings_dir, &record.binding_id), &body)?;
        let secure_body =
            serde_json::to_vec_pretty(&secure).map_err(|e| StoreError::CorruptRecord {
                id: record.binding_id.clone(),
                reason: e.to_string(),
            })?;
        Self::write_atomic(
            &Self::secure_path(&self.bindings_dir, &record.binding_id),
            &secure_body,
        )
    }

    fn delete_binding(&self, binding_id: &str) -> StoreResult<()> {
        Self::check_id(binding_id)?;
        let _guard = self.guard();
        Self::remove_pair(&self.bindings_dir, binding_id)
    }

    fn list_bindings(&self, instance_id: &str) -> StoreResult<Vec<String>> {
        let mut bindings = Vec::new();
        for id in Self::scan_ids(&self.bindings_dir)? {
            if let Some(record) = self.get_binding(&id)? {
                if record.instance_id == instance_id {
                    bindings.push(record.binding_id);
                }
            }
        }
        Ok(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParamMap;
    use serde_json::json;

    fn record(id: &str) -> InstanceRecord {
        InstanceRecord::new(id, "svc-1", "plan-a", ParamMap::new())
    }

    #[test]
    fn test_round_trip_preserves_secure_details() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        let mut rec = record("inst-1");
        rec.details.insert("host".to_string(), json!("db.internal"));
        rec.secure_details
            .insert("admin_password".to_string(), json!("s3cret"));
        store.create_instance(&rec).unwrap();

        let loaded = store.get_instance("inst-1").unwrap().unwrap();
        assert_eq!(loaded.details["host"], json!("db.internal"));
        assert_eq!(loaded.secure_details["admin_password"], json!("s3cret"));
    }

    #[test]
    fn test_secure_details_not_in_public_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        let mut rec = record("inst-1");
        rec.secure_details
            .insert("admin_password".to_string(), json!("s3cret"));
        store.create_instance(&rec).unwrap();

        let public =
            fs::read_to_string(dir.path().join("instances").join("inst-1.json")).unwrap();
        assert!(!public.contains("s3cret"));

        let secure =
            fs::read_to_string(dir.path().join("instances").join("inst-1.secure.json")).unwrap();
        assert!(secure.contains("s3cret"));
    }

    #[test]
    fn test_conditional_update_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.create_instance(&record("inst-1")).unwrap();

        let mut claimed = record("inst-1");
        claimed.status = OperationStatus::InProgress;
        assert!(store
            .update_instance_if_status(&claimed, OperationStatus::Idle)
            .unwrap());
        assert!(!store
            .update_instance_if_status(&claimed, OperationStatus::Idle)
            .unwrap());
    }

    #[test]
    fn test_path_escaping_ids_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.get_instance("../etc/passwd").is_err());
        assert!(store.get_instance("").is_err());
        assert!(store.get_instance(".hidden").is_err());
    }

    #[test]
    fn test_delete_removes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        let mut rec = record("inst-1");
        rec.secure_details.insert("k".to_string(), json!("v"));
        store.create_instance(&rec).unwrap();
        store.delete_instance("inst-1").unwrap();

        assert!(store.get_instance("inst-1").unwrap().is_none());
        assert!(!dir
            .path()
            .join("instances")
            .join("inst-1.secure.json")
            .exists());
    }

    #[test]
    fn test_list_instance_ids_skips_secure_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        let mut rec = record("inst-b");
        rec.secure_details.insert("k".to_string(), json!("v"));
        store.create_instance(&rec).unwrap();
        store.create_instance(&record("inst-a")).unwrap();

        assert_eq!(
            store.list_instance_ids().unwrap(),
            vec!["inst-a".to_string(), "inst-b".to_string()]
        );
    }

    #[test]
    fn test_list_children_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.create_instance(&record("parent")).unwrap();
        store
            .create_instance(&record("child").with_parent("parent"))
            .unwrap();

        assert_eq!(store.list_child_instances("parent").unwrap(), vec!["child"]);
    }
}
