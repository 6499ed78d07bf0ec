//! uml - PlantUML 类图生成
//!
//! 遍历包内模块，按类输出带方法签名的类块，并记录继承关系

mod block;
mod class;
mod config;
mod diagram;
mod error;
mod filter;
mod members;
mod module;
mod render;

#[cfg(test)]
mod testing;

pub use block::{NamespaceBlock, ScopedBlock};
pub use class::ClassBlock;
pub use config::UmlConfig;
pub use diagram::{Diagram, DiagramOptions, Relation, INHERITS};
pub use error::{Result, UmlError};
pub use filter::ClassFilter;
pub use members::MemberLister;
pub use module::ModuleBlock;
pub use render::{KrokiRenderer, OutputFormat, RenderError, Renderer};
