//! reflect - Python 包的静态反射
//!
//! 用 tree-sitter 解析包内源码，构建符号表，回答"模块里有哪些类 / 类有哪些基类和成员"

mod catalog;
mod error;
mod parser;
mod scanner;
mod types;

pub use catalog::{PackageCatalog, TypeCatalog};
pub use error::{ReflectError, Result};
pub use parser::{ParsedModule, PythonParser};
pub use scanner::{collect_python_files, discover_modules, module_name_for, DiscoveredModule};
pub use types::{ClassId, Member, MemberKind, Param, ParamKind, Signature};
