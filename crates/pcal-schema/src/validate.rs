//! # Schema Validation
//!
//! Runtime validation of JSON/YAML documents against JSON Schema
//! definitions (Draft 7).
//!
//! ## Trust Boundary
//!
//! A labware definition decides where the gantry goes. Documents that fail
//! validation are rejected with structured error information: the instance
//! path, the schema path, and the violation message.
//!
//! ## Schema Resolution
//!
//! Schemas are indexed by filename. Internal `$ref`s of the form
//! `#/definitions/<name>` are resolved by the jsonschema crate natively.
//! Cross-schema references are resolved against the loaded set by a local
//! retriever; unknown URIs resolve to the permissive empty schema.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use jsonschema::{Retrieve, Uri, ValidationOptions, Validator};
use serde_json::Value;
use thiserror::Error;

/// Filename of the bundled labware definition schema.
pub const LABWARE_DEFINITION_SCHEMA: &str = "labware-definition.schema.json";

const BUNDLED_SCHEMAS: &[(&str, &str)] = &[(
    LABWARE_DEFINITION_SCHEMA,
    include_str!("../schemas/labware-definition.schema.json"),
)];

struct LocalSchemaRetriever {
    schemas_by_uri: HashMap<String, Value>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        if let Some(value) = self.schemas_by_uri.get(uri_str) {
            return Ok(value.clone());
        }
        let filename = uri_str.rsplit('/').next().unwrap_or(uri_str);
        if let Some(value) = self.schemas_by_uri.get(filename) {
            return Ok(value.clone());
        }
        Ok(serde_json::json!({}))
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Error during schema validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The document did not conform to the schema.
    #[error("validation failed against schema '{schema_name}':\n{violations}")]
    ValidationFailed {
        /// Name of the schema that was validated against.
        schema_name: String,
        /// Structured list of individual violations.
        violations: ValidationViolations,
    },

    /// The schema could not be loaded.
    #[error("schema load error for '{schema_name}': {reason}")]
    SchemaLoadError {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// The document file could not be loaded or parsed.
    #[error("document load error for '{path}': {reason}")]
    DocumentLoadError {
        /// Path to the document that failed to load.
        path: String,
        /// Reason the document could not be loaded.
        reason: String,
    },

    /// The compiled validator could not be built.
    #[error("validator build error for schema '{schema_name}': {reason}")]
    ValidatorBuildError {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the validator could not be built.
        reason: String,
    },

    /// IO error reading a schema or document.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single validation violation with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Whether any violation points at or below `instance_path`.
    pub fn touches(&self, instance_path: &str) -> bool {
        self.violations
            .iter()
            .any(|v| v.instance_path.starts_with(instance_path))
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

// ─── Validator ───────────────────────────────────────────────────────

/// A schema validator backed by the `jsonschema` crate.
///
/// `SchemaValidator` is `Send + Sync`. Schemas are parsed once at
/// construction; each validation compiles against the loaded set.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    /// Where schemas were loaded from; `None` for the bundled set.
    schema_dir: Option<PathBuf>,
    /// Map from schema filename to parsed JSON value.
    schemas: HashMap<String, Value>,
}

impl SchemaValidator {
    /// A validator over the schemas embedded in this crate.
    ///
    /// # Errors
    ///
    /// Returns `SchemaLoadError` if an embedded schema is not valid JSON.
    pub fn bundled() -> Result<Self, SchemaValidationError> {
        let mut schemas = HashMap::new();
        for (name, text) in BUNDLED_SCHEMAS {
            let value: Value =
                serde_json::from_str(text).map_err(|e| SchemaValidationError::SchemaLoadError {
                    schema_name: (*name).to_string(),
                    reason: format!("invalid JSON: {e}"),
                })?;
            schemas.insert((*name).to_string(), value);
        }
        Ok(Self {
            schema_dir: None,
            schemas,
        })
    }

    /// Load every `*.schema.json` file in `schema_dir`, on top of the
    /// bundled set. A file with a bundled name replaces the bundled schema.
    pub fn from_dir(schema_dir: impl AsRef<Path>) -> Result<Self, SchemaValidationError> {
        let schema_dir = schema_dir.as_ref().to_path_buf();
        let mut validator = Self::bundled()?;

        let entries = std::fs::read_dir(&schema_dir).map_err(|e| {
            SchemaValidationError::SchemaLoadError {
                schema_name: schema_dir.display().to_string(),
                reason: format!("cannot read schema directory: {e}"),
            }
        })?;

        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".schema.json") {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            let value: Value = serde_json::from_str(&content).map_err(|e| {
                SchemaValidationError::SchemaLoadError {
                    schema_name: name.to_string(),
                    reason: format!("invalid JSON: {e}"),
                }
            })?;
            validator.schemas.insert(name.to_string(), value);
        }

        validator.schema_dir = Some(schema_dir);
        Ok(validator)
    }

    pub fn schema_dir(&self) -> Option<&Path> {
        self.schema_dir.as_deref()
    }

    /// Names of all loaded schemas, sorted alphabetically.
    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn build_options(&self) -> ValidationOptions {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft7);

        let mut schemas_by_uri: HashMap<String, Value> = HashMap::new();
        for (filename, value) in &self.schemas {
            if let Some(id) = value.get("$id").and_then(Value::as_str) {
                schemas_by_uri.insert(id.to_string(), value.clone());
            }
            schemas_by_uri.insert(filename.clone(), value.clone());
        }
        opts.with_retriever(LocalSchemaRetriever { schemas_by_uri });
        opts
    }

    /// Compile a validator for the named schema.
    pub fn build_validator(&self, schema_name: &str) -> Result<Validator, SchemaValidationError> {
        let schema_value =
            self.schemas
                .get(schema_name)
                .ok_or_else(|| SchemaValidationError::SchemaLoadError {
                    schema_name: schema_name.to_string(),
                    reason: "schema not loaded".to_string(),
                })?;

        self.build_options().build(schema_value).map_err(|e| {
            SchemaValidationError::ValidatorBuildError {
                schema_name: schema_name.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Validate a parsed JSON value against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` listing every violation if the document is
    /// invalid.
    pub fn validate_document(
        &self,
        instance: &Value,
        schema_name: &str,
    ) -> Result<(), SchemaValidationError> {
        let validator = self.build_validator(schema_name)?;

        let violations: Vec<Violation> = validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError::ValidationFailed {
                schema_name: schema_name.to_string(),
                violations: ValidationViolations { violations },
            })
        }
    }

    /// Validate a labware definition document.
    pub fn validate_labware(&self, definition: &Value) -> Result<(), SchemaValidationError> {
        self.validate_document(definition, LABWARE_DEFINITION_SCHEMA)
    }

    /// Load a JSON or YAML document from disk, then validate it.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML; everything else
    /// as JSON. Returns the parsed document on success.
    pub fn validate_file(
        &self,
        path: &Path,
        schema_name: &str,
    ) -> Result<Value, SchemaValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SchemaValidationError::DocumentLoadError {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        let document: Value = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| SchemaValidationError::DocumentLoadError {
                path: path.display().to_string(),
                reason: format!("invalid YAML: {e}"),
            })?
        } else {
            serde_json::from_str(&content).map_err(|e| {
                SchemaValidationError::DocumentLoadError {
                    path: path.display().to_string(),
                    reason: format!("invalid JSON: {e}"),
                }
            })?
        };
        self.validate_document(&document, schema_name)?;
        Ok(document)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
