//! Catalog vocabulary, configuration definitions and resolved descriptors
//!
//! Definitions (`*Def`) are the JSON shape read from the catalog file.
//! Descriptors are the immutable, id-addressed form shared by all requests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Value kinds a logical field can declare
///
/// Timestamp columns are stored as text. Filter and time-range bounds bind as
/// `YYYY-MM-DD HH:MM:SS` (UTC), so range predicates only compare correctly
/// against columns stored in that form. Keyset cursors carry the stored text
/// unchanged and work with any consistent format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Timestamp,
}

impl ValueKind {
    /// Returns the kind name for error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Timestamp => "timestamp",
        }
    }

    /// Operators allowed when the catalog does not list them explicitly
    pub fn default_operators(&self) -> BTreeSet<FilterOperator> {
        use FilterOperator::*;
        let ops: &[FilterOperator] = match self {
            ValueKind::String => &[Eq, Neq, In, Like],
            ValueKind::Number => &[Eq, Neq, Gt, Gte, Lt, Lte, In, Between],
            ValueKind::Boolean => &[Eq, Neq],
            ValueKind::Timestamp => &[Eq, Neq, Gt, Gte, Lt, Lte, Between],
        };
        ops.iter().copied().collect()
    }

    /// Whether an operator can ever apply to values of this kind
    pub fn supports(&self, op: FilterOperator) -> bool {
        match op {
            FilterOperator::Like => *self == ValueKind::String,
            FilterOperator::Gt
            | FilterOperator::Gte
            | FilterOperator::Lt
            | FilterOperator::Lte
            | FilterOperator::Between => *self != ValueKind::Boolean,
            FilterOperator::Eq | FilterOperator::Neq | FilterOperator::In => true,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed filter operator vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Like,
    Between,
}

impl FilterOperator {
    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::In => "in",
            FilterOperator::Like => "like",
            FilterOperator::Between => "between",
        }
    }

    /// Parse a wire operator name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(FilterOperator::Eq),
            "neq" => Some(FilterOperator::Neq),
            "gt" => Some(FilterOperator::Gt),
            "gte" => Some(FilterOperator::Gte),
            "lt" => Some(FilterOperator::Lt),
            "lte" => Some(FilterOperator::Lte),
            "in" => Some(FilterOperator::In),
            "like" => Some(FilterOperator::Like),
            "between" => Some(FilterOperator::Between),
            _ => None,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity-level conditions every plan must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Requirement {
    #[serde(rename = "REQUIRES_TIME_RANGE")]
    RequiresTimeRange,
}

/// Field definition as written in the catalog file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Logical field name used by plans
    pub name: String,
    /// Physical column name, emitted verbatim into SQL
    pub column: String,
    /// Declared value kind
    pub kind: ValueKind,
    /// Allowed operators; the kind's defaults when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operators: Option<Vec<FilterOperator>>,
    /// Whether the column identifies a row
    #[serde(default)]
    pub unique: bool,
    /// Whether the column may hold NULL; unique fields default to not null,
    /// every other field to nullable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

impl FieldDef {
    /// Create a field with default operators
    pub fn new(name: impl Into<String>, column: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            kind,
            operators: None,
            unique: false,
            nullable: None,
        }
    }

    /// Mark the field as a unique row identifier
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Declare whether the column may hold NULL
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Restrict the field to the given operators
    pub fn with_operators(mut self, ops: impl IntoIterator<Item = FilterOperator>) -> Self {
        self.operators = Some(ops.into_iter().collect());
        self
    }
}

/// Entity definition as written in the catalog file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDef {
    /// Logical entity name
    pub name: String,
    /// Physical table name
    pub table: String,
    /// Logical name of the designated timestamp field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_field: Option<String>,
    /// Required conditions
    #[serde(default)]
    pub requires: Vec<Requirement>,
    /// Ordered field definitions
    pub fields: Vec<FieldDef>,
}

/// Whole catalog file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDef {
    pub entities: Vec<EntityDef>,
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"))
}

/// Returns true if `name` can be emitted into SQL as a bare identifier
pub fn is_sql_identifier(name: &str) -> bool {
    identifier_pattern().is_match(name)
}

impl CatalogDef {
    /// Validates the catalog structure itself (not a plan)
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.entities.is_empty() {
            return Err("catalog declares no entities".into());
        }

        let mut entity_names = HashSet::new();
        for entity in &self.entities {
            if !entity_names.insert(entity.name.as_str()) {
                return Err(format!("entity '{}' declared twice", entity.name));
            }
            entity.validate_structure()?;
        }

        Ok(())
    }
}

impl EntityDef {
    fn validate_structure(&self) -> Result<(), String> {
        if !is_sql_identifier(&self.table) {
            return Err(format!(
                "entity '{}': table '{}' is not a plain SQL identifier",
                self.name, self.table
            ));
        }
        if self.fields.is_empty() {
            return Err(format!("entity '{}' declares no fields", self.name));
        }

        let mut field_names = HashSet::new();
        for field in &self.fields {
            if !field_names.insert(field.name.as_str()) {
                return Err(format!(
                    "entity '{}': field '{}' declared twice",
                    self.name, field.name
                ));
            }
            if !is_sql_identifier(&field.column) {
                return Err(format!(
                    "entity '{}': column '{}' is not a plain SQL identifier",
                    self.name, field.column
                ));
            }
            if let Some(ops) = &field.operators {
                if let Some(op) = ops.iter().find(|op| !field.kind.supports(**op)) {
                    return Err(format!(
                        "entity '{}': operator '{}' cannot apply to {} field '{}'",
                        self.name, op, field.kind, field.name
                    ));
                }
            }
        }

        match &self.time_field {
            Some(time_field) => {
                let field = self
                    .fields
                    .iter()
                    .find(|f| &f.name == time_field)
                    .ok_or_else(|| {
                        format!(
                            "entity '{}': time field '{}' is not declared",
                            self.name, time_field
                        )
                    })?;
                if field.kind != ValueKind::Timestamp {
                    return Err(format!(
                        "entity '{}': time field '{}' must be a timestamp",
                        self.name, time_field
                    ));
                }
            }
            None => {
                if self.requires.contains(&Requirement::RequiresTimeRange) {
                    return Err(format!(
                        "entity '{}' requires a time range but has no time field",
                        self.name
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Interned entity identifier (index into the catalog arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) u32);

/// Interned field identifier (index into its entity's field list)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) u32);

/// Resolved field mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub id: FieldId,
    pub name: String,
    pub column: String,
    pub kind: ValueKind,
    pub operators: BTreeSet<FilterOperator>,
    pub unique: bool,
    pub nullable: bool,
}

impl FieldDescriptor {
    /// Checks if an operator is allowed on this field
    pub fn allows(&self, op: FilterOperator) -> bool {
        self.operators.contains(&op)
    }

    /// A unique, non-null column totally orders rows on its own
    pub fn identifies_rows(&self) -> bool {
        self.unique && !self.nullable
    }
}

/// Resolved entity mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub id: EntityId,
    pub name: String,
    pub table: String,
    fields: Vec<FieldDescriptor>,
    field_index: HashMap<String, FieldId>,
    requirements: BTreeSet<Requirement>,
    time_field: Option<FieldId>,
}

impl EntityDescriptor {
    /// Builds a descriptor from a structurally valid definition
    pub(crate) fn from_def(id: EntityId, def: &EntityDef) -> Self {
        let fields: Vec<FieldDescriptor> = def
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| FieldDescriptor {
                id: FieldId(i as u32),
                name: f.name.clone(),
                column: f.column.clone(),
                kind: f.kind,
                operators: match &f.operators {
                    Some(ops) => ops.iter().copied().collect(),
                    None => f.kind.default_operators(),
                },
                unique: f.unique,
                nullable: f.nullable.unwrap_or(!f.unique),
            })
            .collect();

        let field_index = fields
            .iter()
            .map(|f| (f.name.clone(), f.id))
            .collect::<HashMap<_, _>>();

        let time_field = def
            .time_field
            .as_ref()
            .and_then(|name| field_index.get(name).copied());

        Self {
            id,
            name: def.name.clone(),
            table: def.table.clone(),
            fields,
            field_index,
            requirements: def.requires.iter().copied().collect(),
            time_field,
        }
    }

    /// Fields in declared order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Field by interned id
    pub fn field(&self, id: FieldId) -> &FieldDescriptor {
        &self.fields[id.0 as usize]
    }

    /// Field by logical name
    pub fn field_named(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index.get(name).map(|id| self.field(*id))
    }

    /// Checks an entity-level requirement
    pub fn requires(&self, requirement: Requirement) -> bool {
        self.requirements.contains(&requirement)
    }

    /// The designated timestamp field, if any
    pub fn time_field(&self) -> Option<&FieldDescriptor> {
        self.time_field.map(|id| self.field(id))
    }
}
