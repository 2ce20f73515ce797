//! Loading the initial state of a data manager from JSON.
//!
//! ```json
//! {
//!   "group_type_ids": ["household"],
//!   "property_definitions": [],
//!   "groups": [{ "group_id": 0, "group_type_id": "household" }],
//!   "property_values": [],
//!   "memberships": [{ "person_id": 0, "group_id": 0 }]
//! }
//! ```
use std::fs;
use std::path::Path;

use log::debug;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// The serializable initial state of a data manager.
pub trait PluginData: DeserializeOwned {
    /// Checks the internal consistency of the data: no duplicates, no dangling references, every
    /// value compatible with its property, and every property without a default covered.
    ///
    /// # Errors
    ///
    /// Returns the [`StoreError`] describing the first inconsistency found.
    fn validate(&self) -> Result<(), StoreError>;
}

/// Parses and validates plugin data from a JSON string.
///
/// # Errors
///
/// - [`StoreError::JsonError`] if the text is not a valid document.
/// - Any validation error of the data itself.
pub fn load_plugin_data_from_str<T: PluginData>(json: &str) -> Result<T, StoreError> {
    let data: T = serde_json::from_str(json)?;
    data.validate()?;
    Ok(data)
}

/// Reads, parses, and validates plugin data from a JSON file.
///
/// # Errors
///
/// - [`StoreError::IoError`] if the file cannot be read.
/// - [`StoreError::JsonError`] if the file is not a valid document.
/// - Any validation error of the data itself.
pub fn load_plugin_data_from_file<T: PluginData>(path: &Path) -> Result<T, StoreError> {
    debug!("loading plugin data from {}", path.display());
    let json = fs::read_to_string(path)?;
    load_plugin_data_from_str(&json)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::groups::{GroupId, GroupsPluginData};
    use crate::regions::RegionsPluginData;

    const GROUPS_JSON: &str = r#"{
        "group_type_ids": ["household"],
        "property_definitions": [{
            "group_type_id": "household",
            "property_id": "size",
            "definition": {
                "value_type": "Int",
                "default_value": {"Int": 1},
                "mutable": true,
                "time_tracked": false
            }
        }],
        "groups": [{"group_id": 0, "group_type_id": "household"}],
        "property_values": [{"group_id": 0, "property_id": "size", "value": {"Int": 4}}],
        "memberships": [{"person_id": 0, "group_id": 0}]
    }"#;

    #[test]
    fn loads_groups_from_str() {
        let data: GroupsPluginData = load_plugin_data_from_str(GROUPS_JSON).unwrap();
        assert_eq!(data.groups()[0].group_id, GroupId(0));
        assert_eq!(data.next_group_id(), 1);
        assert_eq!(data.memberships().len(), 1);
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(GROUPS_JSON.as_bytes()).unwrap();
        let data: GroupsPluginData = load_plugin_data_from_file(file.path()).unwrap();
        assert_eq!(data.group_type_ids().len(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<GroupsPluginData, _> =
            load_plugin_data_from_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(StoreError::IoError(_))));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let result: Result<RegionsPluginData, _> = load_plugin_data_from_str("{ not json");
        assert!(matches!(result, Err(StoreError::JsonError(_))));
    }

    #[test]
    fn inconsistent_data_is_rejected() {
        let json = r#"{
            "group_type_ids": [],
            "property_definitions": [],
            "groups": [{"group_id": 0, "group_type_id": "household"}],
            "property_values": [],
            "memberships": []
        }"#;
        let result: Result<GroupsPluginData, _> = load_plugin_data_from_str(json);
        assert!(matches!(result, Err(StoreError::UnknownIdentifier(_))));
    }
}
