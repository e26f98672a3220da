//! Directory resource provider.
//!
//! Manages plain directories below [`ProviderContext::root`]:
//!
//! | Operation | Missing directory | Existing directory |
//! |-----------|-------------------|--------------------|
//! | [`create`] / [`update`] | created (with parents) | left alone |
//! | [`read`] | `None` | its state |
//! | [`destroy`] | nothing to do | removed if empty, error otherwise |
//! | [`plan`] | "create" with a diff | "no changes" |
//!
//! Descriptor paths are relative to the root. Absolute paths and `..`
//! components are rejected so a descriptor can never reach outside it.

use super::ProviderContext;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Directory descriptor has an empty path")]
    MissingPath,
    #[error("Path {0:?} escapes the provider root")]
    OutsideRoot(String),
    #[error("{} exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("Invalid directory descriptor: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Desired state of one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DirectoryDescriptor {
    /// Directory path relative to the provider root.
    pub path: String,
    /// Stable identifier; defaults to the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl DirectoryDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id: None,
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.path)
    }
}

/// Observed state of a directory on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryResource {
    pub id: String,
    pub path: String,
    pub absolute_path: PathBuf,
}

/// What applying a descriptor would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryPlan {
    pub current_state: Option<DirectoryResource>,
    /// One-line summary for humans.
    pub describe: String,
    /// Changed attributes, `+ key = value` for additions. Empty when in sync.
    pub diff: Vec<String>,
    pub new_state: DirectoryResource,
}

impl DirectoryPlan {
    pub fn has_changes(&self) -> bool {
        !self.diff.is_empty()
    }
}

/// Resolve a descriptor path against the root, refusing anything that could
/// leave it.
fn resolve(ctx: &ProviderContext, descriptor: &DirectoryDescriptor) -> Result<PathBuf, DirectoryError> {
    let relative = Path::new(descriptor.path.trim());
    if relative.as_os_str().is_empty() {
        return Err(DirectoryError::MissingPath);
    }
    let mut resolved = ctx.root.clone();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(DirectoryError::OutsideRoot(descriptor.path.clone()));
            }
        }
    }
    if resolved == ctx.root {
        return Err(DirectoryError::MissingPath);
    }
    Ok(resolved)
}

fn resource(descriptor: &DirectoryDescriptor, absolute_path: PathBuf) -> DirectoryResource {
    DirectoryResource {
        id: descriptor.id().to_string(),
        path: descriptor.path.clone(),
        absolute_path,
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Ensure the directory exists. Succeeds when it already does.
pub async fn create(
    ctx: &ProviderContext,
    descriptor: &DirectoryDescriptor,
) -> Result<DirectoryResource, DirectoryError> {
    let path = resolve(ctx, descriptor)?;
    tokio::fs::create_dir_all(&path).await.map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists || path.is_file() {
            DirectoryError::NotADirectory(path.clone())
        } else {
            DirectoryError::Io(e)
        }
    })?;
    tracing::debug!(path = %path.display(), "directory ensured");
    Ok(resource(descriptor, path))
}

/// Current state of the directory, `None` when it does not exist.
pub async fn read(
    ctx: &ProviderContext,
    descriptor: &DirectoryDescriptor,
) -> Result<Option<DirectoryResource>, DirectoryError> {
    let path = resolve(ctx, descriptor)?;
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_dir() => Ok(Some(resource(descriptor, path))),
        Ok(_) => Err(DirectoryError::NotADirectory(path)),
        Err(e) if is_absent(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Bring the directory in line with the descriptor.
///
/// A directory has no attributes beyond its existence, so this is [`create`].
pub async fn update(
    ctx: &ProviderContext,
    descriptor: &DirectoryDescriptor,
) -> Result<DirectoryResource, DirectoryError> {
    create(ctx, descriptor).await
}

/// Remove the directory. Fails when it is not empty.
pub async fn destroy(
    ctx: &ProviderContext,
    descriptor: &DirectoryDescriptor,
) -> Result<(), DirectoryError> {
    let path = resolve(ctx, descriptor)?;
    match tokio::fs::remove_dir(&path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "directory removed");
            Ok(())
        }
        Err(e) if is_absent(&e) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// The path does not exist, either outright or because a parent is a file.
fn is_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Describe what [`create`] would do, without doing it.
pub async fn plan(
    ctx: &ProviderContext,
    descriptor: &DirectoryDescriptor,
) -> Result<DirectoryPlan, DirectoryError> {
    let current_state = read(ctx, descriptor).await?;
    let new_state = resource(descriptor, resolve(ctx, descriptor)?);

    let (describe, diff) = match &current_state {
        Some(_) => (
            format!("Directory {} is up to date", descriptor.path),
            Vec::new(),
        ),
        None => (
            format!("Create directory {}", descriptor.path),
            vec![
                format!("+ id = {:?}", new_state.id),
                format!("+ path = {:?}", new_state.path),
            ],
        ),
    };

    Ok(DirectoryPlan {
        current_state,
        describe,
        diff,
        new_state,
    })
}

// ============================================================================
// Validation
// ============================================================================

/// JSON Schema of [`DirectoryDescriptor`].
pub fn schema() -> Value {
    serde_json::to_value(schemars::schema_for!(DirectoryDescriptor))
        .expect("directory schema must serialize")
}

/// Check a raw descriptor, reporting every violation at once.
///
/// Required keys, allowed keys and their JSON types come from [`schema`];
/// the path rules on top of it are the provider's own.
pub fn validate(value: &Value) -> Result<DirectoryDescriptor, DirectoryError> {
    let Some(object) = value.as_object() else {
        return Err(DirectoryError::Invalid(vec![format!(
            "descriptor must be an object, got {}",
            json_type(value)
        )]));
    };

    let schema = schema();
    let empty = serde_json::Map::new();
    let properties = schema["properties"].as_object().unwrap_or(&empty);
    let mut violations = Vec::new();

    for key in schema["required"].as_array().into_iter().flatten() {
        if let Some(key) = key.as_str()
            && !object.contains_key(key)
        {
            violations.push(format!("{key}: required"));
        }
    }
    for (key, property) in properties {
        if let Some(present) = object.get(key)
            && let Some(expected) = type_violation(&property["type"], present)
        {
            violations.push(format!("{key}: must be {expected}, got {}", json_type(present)));
        }
    }
    if let Some(Value::String(path)) = object.get("path") {
        violations.extend(path_violations(path));
    }
    let mut unknown: Vec<&String> = object
        .keys()
        .filter(|k| !properties.contains_key(*k))
        .collect();
    unknown.sort();
    violations.extend(unknown.into_iter().map(|k| format!("{k}: unknown field")));

    if !violations.is_empty() {
        return Err(DirectoryError::Invalid(violations));
    }
    serde_json::from_value(value.clone()).map_err(|e| DirectoryError::Invalid(vec![e.to_string()]))
}

/// `Some("a string")` when `value` is not one of the schema's `types`.
fn type_violation(types: &Value, value: &Value) -> Option<String> {
    let allowed: Vec<&str> = match types {
        Value::String(t) => vec![t.as_str()],
        Value::Array(ts) => ts.iter().filter_map(Value::as_str).collect(),
        _ => return None,
    };
    let actual = json_type(value);
    if allowed.contains(&actual) || (actual == "number" && allowed.contains(&"integer")) {
        return None;
    }
    let named: Vec<String> = allowed
        .iter()
        .filter(|t| **t != "null")
        .map(|t| match *t {
            "array" | "integer" | "object" => format!("an {t}"),
            t => format!("a {t}"),
        })
        .collect();
    Some(named.join(" or "))
}

fn path_violations(path: &str) -> Vec<String> {
    let mut violations = Vec::new();
    let trimmed = path.trim();
    if trimmed.is_empty() {
        violations.push("path: must not be empty".to_string());
        return violations;
    }
    let components: Vec<Component> = Path::new(trimmed).components().collect();
    if components
        .iter()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
    {
        violations.push(format!("path: {path:?} must be relative"));
    }
    if components.iter().any(|c| matches!(c, Component::ParentDir)) {
        violations.push(format!("path: {path:?} must not contain '..'"));
    }
    if !components.iter().any(|c| matches!(c, Component::Normal(_))) && violations.is_empty() {
        violations.push(format!("path: {path:?} does not name a directory"));
    }
    violations
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
