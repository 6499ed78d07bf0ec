use crate::types::ClassId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReflectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a package directory: {0}")]
    NotAPackage(PathBuf),
    #[error("Syntax error in {path} at line {line}")]
    Syntax { path: String, line: usize },
    #[error("Failed to load Python grammar: {0}")]
    Language(String),
    #[error("cannot import name '{name}' from '{module}'")]
    UnresolvedImport { module: String, name: String },
    #[error("module '{module}' has no attribute '{name}'")]
    UnresolvedName { module: String, name: String },
    #[error("Unknown module: {0}")]
    UnknownModule(String),
    #[error("Unknown class: {0}")]
    UnknownClass(ClassId),
    #[error("Inheritance cycle through {0}")]
    InheritanceCycle(ClassId),
    #[error("Cannot create a consistent method resolution order for {0}")]
    Mro(ClassId),
}

pub type Result<T> = std::result::Result<T, ReflectError>;
