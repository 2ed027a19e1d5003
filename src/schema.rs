//! JSON Schema validation gate for canonical records.
//!
//! Every record passes through the validator before it is persisted, so
//! nothing downstream (indexing, rendering) ever sees a record missing
//! its identity or timeline fields. The schema ships embedded in the
//! binary; a site can supply its own stricter one via `[schema] path`.

use jsonschema::Validator;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;

/// Schema compiled into the binary, used when the config names none.
pub const DEFAULT_SCHEMA: &str = include_str!("../schemas/Item.json");

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("cannot read schema {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid schema: {0}")]
    Compile(String),
    #[error("record invalid at {pointer}: {message}")]
    Validation { pointer: String, message: String },
}

/// A compiled schema, reused across every record in a build.
#[derive(Debug)]
pub struct SchemaValidator {
    validator: Validator,
}

impl SchemaValidator {
    pub fn from_embedded() -> Result<Self, SchemaError> {
        let schema: Value =
            serde_json::from_str(DEFAULT_SCHEMA).map_err(|e| SchemaError::Compile(e.to_string()))?;
        Self::compile(&schema)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let schema: Value =
            serde_json::from_str(&raw).map_err(|e| SchemaError::Compile(e.to_string()))?;
        Self::compile(&schema)
    }

    /// Build from the site config, falling back to the embedded schema.
    pub fn from_config(config: &Config) -> Result<Self, SchemaError> {
        match &config.schema.path {
            Some(path) => Self::from_file(path),
            None => Self::from_embedded(),
        }
    }

    fn compile(schema: &Value) -> Result<Self, SchemaError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self { validator })
    }

    /// Check one record, reporting the first violation.
    pub fn validate(&self, record: &Value) -> Result<(), SchemaError> {
        match self.validator.validate(record) {
            Ok(()) => Ok(()),
            Err(error) => Err(SchemaError::Validation {
                pointer: error.instance_path.to_string(),
                message: error.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_record() -> Value {
        json!({
            "Item": {
                "guid": "25cf55b5-345e-48e3-86ae-bc6c186f0fb1",
                "itemtype": "Item/Page/Article",
                "title": "A Test Article",
                "published": "2016-09-28T00:00:00-04:00",
                "updated": "2016-09-29T18:00:00-04:00"
            },
            "Article": { "body": "<p>hi</p>" }
        })
    }

    #[test]
    fn embedded_schema_compiles() {
        SchemaValidator::from_embedded().unwrap();
    }

    #[test]
    fn complete_record_passes() {
        let validator = SchemaValidator::from_embedded().unwrap();
        validator.validate(&valid_record()).unwrap();
    }

    #[test]
    fn missing_published_is_rejected() {
        let validator = SchemaValidator::from_embedded().unwrap();
        let mut record = valid_record();
        record["Item"].as_object_mut().unwrap().remove("published");
        let err = validator.validate(&record).unwrap_err();
        assert!(matches!(err, SchemaError::Validation { .. }));
    }

    #[test]
    fn missing_guid_is_rejected() {
        let validator = SchemaValidator::from_embedded().unwrap();
        let mut record = valid_record();
        record["Item"].as_object_mut().unwrap().remove("guid");
        assert!(validator.validate(&record).is_err());
    }

    #[test]
    fn violation_names_the_location() {
        let validator = SchemaValidator::from_embedded().unwrap();
        let mut record = valid_record();
        record["Item"]["guid"] = json!("");
        match validator.validate(&record).unwrap_err() {
            SchemaError::Validation { pointer, .. } => {
                assert_eq!(pointer, "/Item/guid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unreadable_schema_file_reports_path() {
        let err = SchemaValidator::from_file(Path::new("/no/such/schema.json")).unwrap_err();
        assert!(matches!(err, SchemaError::Read { .. }));
    }
}
