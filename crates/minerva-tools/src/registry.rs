//! Registry - the declarative tool catalog.
//!
//! Each entry describes a callable function: name, description, JSON
//! parameter schema with a required subset, the roles allowed to invoke
//! it, and whether it is flagged as needing confirmation before a side
//! effect. The catalog is built once at startup and never mutated.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Caller role, from the identity claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Enrolled student (the default for chat callers)
    Student,
    /// Academic advisor
    Advisor,
    /// Registrar office staff
    Registrar,
    /// System administrator
    Admin,
}

impl Role {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Advisor => "advisor",
            Self::Registrar => "registrar",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique function name
    pub name: String,
    /// Natural-language description shown to the model
    pub description: String,
    /// JSON schema for parameters, with a `required` subset
    pub parameters: serde_json::Value,
    /// Roles permitted to invoke this tool
    pub roles: Vec<Role>,
    /// Whether the tool is flagged as needing confirmation before a side
    /// effect. Policy: flagged write tools are single-shot and return
    /// alternatives when the requested parameter is infeasible; reads
    /// execute immediately.
    pub requires_confirmation: bool,
}

impl ToolSpec {
    /// Create a new spec with an empty object schema, open to all roles.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            roles: vec![Role::Student, Role::Advisor, Role::Registrar, Role::Admin],
            requires_confirmation: false,
        }
    }

    /// Set the parameters schema
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Restrict to a set of roles
    #[must_use]
    pub fn with_roles(mut self, roles: &[Role]) -> Self {
        self.roles = roles.to_vec();
        self
    }

    /// Flag as requiring confirmation
    #[must_use]
    pub fn with_confirmation(mut self) -> Self {
        self.requires_confirmation = true;
        self
    }

    /// Whether a role may invoke this tool
    #[must_use]
    pub fn allows(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Required parameter names, from the schema's `required` array.
    #[must_use]
    pub fn required_params(&self) -> Vec<&str> {
        self.parameters["required"]
            .as_array()
            .map(|names| names.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Ordered, immutable tool catalog.
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    /// Create a registry from catalog entries. Order is preserved; it is
    /// the order the model sees.
    #[must_use]
    pub fn new(specs: Vec<ToolSpec>) -> Self {
        debug!(count = specs.len(), "Tool registry built");
        Self { specs }
    }

    /// Look up a spec by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    /// Check if a tool exists.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All specs, catalog order.
    #[must_use]
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    /// Specs a role is permitted to invoke, catalog order.
    #[must_use]
    pub fn specs_for_role(&self, role: Role) -> Vec<&ToolSpec> {
        self.specs.iter().filter(|spec| spec.allows(role)).collect()
    }

    /// The catalog in the model-facing tool format, filtered by role.
    #[must_use]
    pub fn to_llm_tools(&self, role: Role) -> Vec<minerva_llm::ToolDefinition> {
        self.specs_for_role(role)
            .into_iter()
            .map(|spec| {
                minerva_llm::ToolDefinition::new(
                    &spec.name,
                    &spec.description,
                    spec.parameters.clone(),
                )
            })
            .collect()
    }

    /// Number of catalog entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
