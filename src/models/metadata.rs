use chrono::Local;
use serde::{Deserialize, Serialize};

/// File name of the metadata record at the root of an export archive.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Metadata written alongside the config bundle in an export archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub exported_by: String,
    pub account_id: String,
    pub export_date: String,
    pub exporter_version: String,
}

impl ArchiveMetadata {
    /// Metadata stamped with the current local time and this crate's version.
    pub fn new(exported_by: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            exported_by: exported_by.into(),
            account_id: account_id.into(),
            export_date: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            exporter_version: crate::VERSION.to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metadata_stamps_version_and_date() {
        let metadata = ArchiveMetadata::new("Invoker", "12345");
        assert_eq!(metadata.exporter_version, crate::VERSION);
        // "YYYY-MM-DD HH:MM:SS"
        assert_eq!(metadata.export_date.len(), 19);
        assert_eq!(&metadata.export_date[4..5], "-");
        assert_eq!(&metadata.export_date[10..11], " ");
    }

    #[test]
    fn test_json_field_names() {
        let metadata = ArchiveMetadata {
            exported_by: "Invoker".to_string(),
            account_id: "12345".to_string(),
            export_date: "2024-01-02 03:04:05".to_string(),
            exporter_version: "2.0.1".to_string(),
        };

        let json = metadata.to_json().unwrap();
        assert!(json.contains("\"exported_by\": \"Invoker\""));
        assert!(json.contains("\"account_id\": \"12345\""));
        assert!(json.contains("\"export_date\""));
        assert!(json.contains("\"exporter_version\""));
        assert_eq!(ArchiveMetadata::from_json(&json).unwrap(), metadata);
    }
}
