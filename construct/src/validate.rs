//! Optional acceptance checks applied to a parsed document.

use jsonschema::Validator;
use serde_json::Value;

/// Decides whether a parsed document is acceptable.
///
/// A rejected document counts as a failed attempt and its errors are fed back
/// to the generator in the corrective prompt.
pub trait DocumentValidator: Send + Sync {
    /// Returns every problem found in `document`; empty means accepted.
    fn validate(&self, document: &Value) -> Vec<String>;
}

/// Validates documents against a compiled JSON Schema.
pub struct JsonSchemaValidator {
    schema: Value,
    validator: Validator,
}

impl JsonSchemaValidator {
    /// Compiles `schema`.
    ///
    /// # Errors
    ///
    /// Returns the compiler's message when `schema` is not a valid JSON Schema.
    pub fn new(schema: Value) -> Result<Self, String> {
        let validator = Validator::new(&schema).map_err(|e| e.to_string())?;
        Ok(Self { schema, validator })
    }

    /// The schema this validator was compiled from.
    #[must_use]
    pub const fn schema(&self) -> &Value {
        &self.schema
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl DocumentValidator for JsonSchemaValidator {
    /// Collects all failures with their instance paths, not just the first.
    fn validate(&self, document: &Value) -> Vec<String> {
        self.validator
            .iter_errors(document)
            .map(|error| format!("At path '{}': {}", error.instance_path, error))
            .collect()
    }
}
