// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool definition types
//!
//! These types describe tools to the backend. The backend executes them;
//! the client only needs their names, descriptions and parameter schemas.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name as the model calls it
    pub name: String,

    /// Tool description
    pub description: String,

    /// Parameter schema (JSON Schema)
    pub parameters: ToolInputSchema,
}

/// Input schema for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    /// Schema type (always "object")
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Property definitions
    pub properties: Value,

    /// Required properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// Helper to create a tool input schema
pub struct SchemaBuilder {
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            properties: serde_json::Map::new(),
            required: vec![],
        }
    }

    /// Add a string property
    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, "string", description, required)
    }

    /// Add a string property that must be a URL
    pub fn url(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            serde_json::json!({
                "type": "string",
                "format": "uri",
                "description": description
            }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add a number property
    pub fn number(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, "number", description, required)
    }

    fn property(mut self, name: &str, kind: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            serde_json::json!({
                "type": kind,
                "description": description
            }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Build the schema
    pub fn build(self) -> ToolInputSchema {
        ToolInputSchema {
            schema_type: "object".to_string(),
            properties: Value::Object(self.properties),
            required: self.required,
        }
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_builder_default_is_empty() {
        let schema = SchemaBuilder::default().build();
        assert_eq!(schema.schema_type, "object");
        assert_eq!(schema.properties, serde_json::json!({}));
        assert!(schema.required.is_empty());
    }

    #[test]
    fn test_schema_builder_required_and_optional() {
        let schema = SchemaBuilder::new()
            .string("prompt", "What to draw", true)
            .number("width", "Width in pixels", false)
            .build();

        assert_eq!(schema.properties["prompt"]["type"], "string");
        assert_eq!(schema.properties["width"]["type"], "number");
        assert_eq!(schema.required, vec!["prompt".to_string()]);
    }

    #[test]
    fn test_schema_builder_url_format() {
        let schema = SchemaBuilder::new().url("url", "Video link", true).build();
        assert_eq!(schema.properties["url"]["format"], "uri");
    }

    #[test]
    fn test_tool_spec_serializes_type_field() {
        let spec = ToolSpec {
            name: "displayWeather".to_string(),
            description: "Display the weather".to_string(),
            parameters: SchemaBuilder::new().string("location", "Where", true).build(),
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["parameters"]["type"], "object");
        assert_eq!(json["parameters"]["required"][0], "location");
    }

    #[test]
    fn test_empty_required_is_skipped() {
        let schema = SchemaBuilder::new().number("n", "count", false).build();
        let json = serde_json::to_value(&schema).unwrap();
        assert!(json.get("required").is_none());
    }
}
