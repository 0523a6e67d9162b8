//! Tool catalog — typed metadata, parameter validation, schema generation.
//!
//! Owns the static tool table. Entries are registered once at startup and
//! never change afterwards.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::jira::JiraTool;
use crate::types::{Error, Result};

// =============================================================================
// Parameter types
// =============================================================================

/// Parameter type for tool inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int,
    Bool,
    StringList,
    Enum(Vec<&'static str>),
    Object,
    ObjectList,
    Optional(Box<ParamType>),
}

impl ParamType {
    /// Validate a JSON value against this parameter type.
    pub fn validate(&self, value: &Value) -> std::result::Result<(), String> {
        match self {
            ParamType::String => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(format!("expected string, got {}", value_type_name(value)))
                }
            }
            ParamType::Int => {
                if value.is_i64() || value.is_u64() {
                    Ok(())
                } else {
                    Err(format!("expected integer, got {}", value_type_name(value)))
                }
            }
            ParamType::Bool => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(format!("expected boolean, got {}", value_type_name(value)))
                }
            }
            ParamType::StringList => list_of(value, "string", Value::is_string),
            ParamType::ObjectList => list_of(value, "object", Value::is_object),
            ParamType::Object => {
                if value.is_object() {
                    Ok(())
                } else {
                    Err(format!("expected object, got {}", value_type_name(value)))
                }
            }
            ParamType::Enum(variants) => match value.as_str() {
                Some(s) if variants.iter().any(|v| *v == s) => Ok(()),
                Some(s) => Err(format!(
                    "invalid enum value '{}', expected one of: {}",
                    s,
                    variants.join(", ")
                )),
                None => Err(format!(
                    "expected string for enum, got {}",
                    value_type_name(value)
                )),
            },
            ParamType::Optional(inner) => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.validate(value)
                }
            }
        }
    }

    /// JSON Schema fragment for this type.
    pub fn json_schema(&self) -> Value {
        match self {
            ParamType::String => json!({ "type": "string" }),
            ParamType::Int => json!({ "type": "integer" }),
            ParamType::Bool => json!({ "type": "boolean" }),
            ParamType::StringList => json!({ "type": "array", "items": { "type": "string" } }),
            ParamType::Enum(variants) => json!({ "type": "string", "enum": variants }),
            ParamType::Object => json!({ "type": "object" }),
            ParamType::ObjectList => json!({ "type": "array", "items": { "type": "object" } }),
            ParamType::Optional(inner) => inner.json_schema(),
        }
    }
}

fn list_of(value: &Value, item_name: &str, check: fn(&Value) -> bool) -> std::result::Result<(), String> {
    let arr = value
        .as_array()
        .ok_or_else(|| format!("expected array, got {}", value_type_name(value)))?;
    for (i, item) in arr.iter().enumerate() {
        if !check(item) {
            return Err(format!(
                "expected {} at index {}, got {}",
                item_name,
                i,
                value_type_name(item)
            ));
        }
    }
    Ok(())
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Parameter definition
// =============================================================================

/// A single parameter definition for a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ParamDef {
    pub name: &'static str,
    pub param_type: ParamType,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn required(name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        Self {
            name,
            param_type,
            description,
            default: None,
        }
    }

    pub fn optional(name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        Self {
            name,
            param_type: ParamType::Optional(Box::new(param_type)),
            description,
            default: None,
        }
    }

    pub fn with_default(
        name: &'static str,
        param_type: ParamType,
        description: &'static str,
        default: Value,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Optional(Box::new(param_type)),
            description,
            default: Some(default),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !matches!(self.param_type, ParamType::Optional(_))
    }
}

// =============================================================================
// Tool definition
// =============================================================================

/// What a tool does to remote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolAccess {
    ReadOnly,
    Write,
    Destructive,
}

/// Complete tool metadata entry.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub tool: JiraTool,
    pub description: &'static str,
    pub parameters: Vec<ParamDef>,
    pub access: ToolAccess,
}

impl ToolDefinition {
    pub fn name(&self) -> &'static str {
        self.tool.name()
    }

    /// JSON Schema describing the tool arguments.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            let mut schema = param.param_type.json_schema();
            if let Some(obj) = schema.as_object_mut() {
                obj.insert("description".to_string(), json!(param.description));
                if let Some(default) = &param.default {
                    obj.insert("default".to_string(), default.clone());
                }
            }
            properties.insert(param.name.to_string(), schema);
            if param.is_required() {
                required.push(param.name);
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// MCP `tools/list` entry.
    pub fn to_mcp(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description,
            "inputSchema": self.input_schema(),
            "annotations": {
                "readOnlyHint": self.access == ToolAccess::ReadOnly,
                "destructiveHint": self.access == ToolAccess::Destructive,
            },
        })
    }
}

/// Problems with `params` against `defs`; empty when valid.
///
/// Shared by the catalog and by batch tools checking each item.
pub fn check_params(defs: &[ParamDef], params: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();
    for param_def in defs {
        match params.get(param_def.name) {
            None | Some(Value::Null) if param_def.is_required() => {
                errors.push(format!("Missing required parameter: {}", param_def.name));
            }
            Some(value) => {
                if let Err(e) = param_def.param_type.validate(value) {
                    errors.push(format!("Parameter '{}': {}", param_def.name, e));
                }
            }
            None => {}
        }
    }
    errors
}

// =============================================================================
// Tool catalog
// =============================================================================

/// In-memory tool catalog.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    entries: HashMap<&'static str, ToolDefinition>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Catalog with every Jira tool registered.
    pub fn jira() -> Result<Self> {
        let mut catalog = Self::new();
        for tool in JiraTool::ALL {
            catalog.register(tool.definition())?;
        }
        Ok(catalog)
    }

    /// Register a tool definition. Names are unique.
    pub fn register(&mut self, entry: ToolDefinition) -> Result<()> {
        let name = entry.name();
        if name.is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }
        if self.entries.contains_key(name) {
            return Err(Error::validation(format!("Duplicate tool name: {}", name)));
        }
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Get a tool definition by name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.entries.get(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All tool definitions, sorted by name.
    pub fn list_entries(&self) -> Vec<&ToolDefinition> {
        let mut entries: Vec<&ToolDefinition> = self.entries.values().collect();
        entries.sort_by_key(|e| e.name());
        entries
    }

    /// Validate arguments against a tool's parameter definitions.
    ///
    /// Returns a list of validation errors (empty = valid). Arguments the tool
    /// does not declare are ignored.
    pub fn validate_params(&self, name: &str, params: &Map<String, Value>) -> Result<Vec<String>> {
        let entry = self
            .get(name)
            .ok_or_else(|| Error::validation(format!("Unknown tool: {}", name)))?;

        Ok(check_params(&entry.parameters, params))
    }

    /// Fill in default values for missing optional parameters.
    pub fn fill_defaults(&self, name: &str, params: &mut Map<String, Value>) -> Result<()> {
        let entry = self
            .get(name)
            .ok_or_else(|| Error::validation(format!("Unknown tool: {}", name)))?;

        for param_def in &entry.parameters {
            if let Some(default) = &param_def.default {
                let missing = params.get(param_def.name).map_or(true, Value::is_null);
                if missing {
                    params.insert(param_def.name.to_string(), default.clone());
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
