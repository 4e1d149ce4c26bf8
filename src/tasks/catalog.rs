//! Loading the ordered task catalog from its YAML definition.
//!
//! The definition is a YAML stream. Each document is either a single task
//! record or a sequence of task records; documents are read in order. A check
//! declaration is a bare kind name, or a one-key mapping from kind name to
//! keyword arguments.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::Task;
use crate::checks::{Check, CheckEnv, CheckRegistry};
use crate::validation::validate_task_name;

/// A catalog that cannot be loaded. The process must not start with one.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read task catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse task catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown check kind '{0}'")]
    UnknownKind(String),

    #[error("malformed check declaration: {0}")]
    MalformedDeclaration(String),

    #[error("invalid arguments for {kind}: {reason}")]
    InvalidArgs { kind: String, reason: String },

    #[error("task '{task}'")]
    InTask {
        task: String,
        #[source]
        source: Box<CatalogError>,
    },

    #[error("invalid task catalog:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskRecord {
    name: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    checks: Vec<Value>,
}

/// The ordered, read-only sequence of tasks. Never empty.
#[derive(Debug)]
pub struct TaskCatalog {
    tasks: Vec<Task>,
}

impl TaskCatalog {
    /// Build a catalog from already constructed tasks, validating it.
    pub fn new(tasks: Vec<Task>) -> Result<Self, CatalogError> {
        let catalog = Self { tasks };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load and validate the catalog at `path`.
    pub fn load(path: &Path, registry: &CheckRegistry, env: &CheckEnv) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content, registry, env)
    }

    /// Parse catalog content (for testing without file system)
    pub fn from_yaml(
        content: &str,
        registry: &CheckRegistry,
        env: &CheckEnv,
    ) -> Result<Self, CatalogError> {
        let mut records = Vec::new();
        for document in serde_yaml::Deserializer::from_str(content) {
            match Value::deserialize(document)? {
                Value::Null => {}
                Value::Sequence(items) => {
                    for item in items {
                        records.push(serde_yaml::from_value::<TaskRecord>(item)?);
                    }
                }
                record @ Value::Mapping(_) => records.push(serde_yaml::from_value(record)?),
                other => {
                    return Err(CatalogError::MalformedDeclaration(format!(
                        "expected a task record or a list of task records, found {}",
                        describe(&other)
                    )))
                }
            }
        }

        let tasks = records
            .into_iter()
            .map(|record| build_task(record, registry, env))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(tasks)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.name == name)
    }

    /// Position of `name` in catalog order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|task| task.name.as_str())
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut errors = Vec::new();

        if self.tasks.is_empty() {
            errors.push("No tasks defined".to_string());
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if let Err(e) = validate_task_name(&task.name) {
                errors.push(format!("Task '{}': invalid name: {e}", task.name));
            }
            if !seen.insert(task.name.as_str()) {
                errors.push(format!("Task '{}': duplicate task name", task.name));
            }
            if task.title.trim().is_empty() {
                errors.push(format!("Task '{}': title cannot be empty", task.name));
            }
            if task.checks().is_empty() {
                errors.push(format!("Task '{}': no checks defined", task.name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Validation(errors))
        }
    }
}

impl<'a> IntoIterator for &'a TaskCatalog {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

fn build_task(record: TaskRecord, registry: &CheckRegistry, env: &CheckEnv) -> Result<Task, CatalogError> {
    let checks = record
        .checks
        .into_iter()
        .map(|declaration| parse_check(declaration, registry, env))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| CatalogError::InTask {
            task: record.name.clone(),
            source: Box::new(source),
        })?;

    Ok(Task::new(record.name, record.title, record.description, checks))
}

/// Resolve one check declaration against the registry.
fn parse_check(
    declaration: Value,
    registry: &CheckRegistry,
    env: &CheckEnv,
) -> Result<Box<dyn Check>, CatalogError> {
    match declaration {
        Value::String(kind) => registry.build(&kind, Mapping::new(), env),
        Value::Mapping(mapping) if mapping.len() == 1 => {
            let (kind, args) = mapping
                .into_iter()
                .next()
                .ok_or_else(|| CatalogError::MalformedDeclaration("empty mapping".to_string()))?;
            let kind = match kind {
                Value::String(kind) => kind,
                other => {
                    return Err(CatalogError::MalformedDeclaration(format!(
                        "check kind must be a string, found {}",
                        describe(&other)
                    )))
                }
            };
            let args = match args {
                Value::Mapping(args) => args,
                Value::Null => Mapping::new(),
                other => {
                    return Err(CatalogError::MalformedDeclaration(format!(
                        "arguments of {kind} must be a mapping, found {}",
                        describe(&other)
                    )))
                }
            };
            registry.build(&kind, args, env)
        }
        Value::Mapping(mapping) => Err(CatalogError::MalformedDeclaration(format!(
            "expected a single check kind, found a mapping with {} keys",
            mapping.len()
        ))),
        other => Err(CatalogError::MalformedDeclaration(format!(
            "expected a check name or mapping, found {}",
            describe(&other)
        ))),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
