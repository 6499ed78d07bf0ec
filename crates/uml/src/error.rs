use crate::render::RenderError;
use reflect::ReflectError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UmlError {
    #[error("Reflection error: {0}")]
    Reflect(#[from] ReflectError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

pub type Result<T> = std::result::Result<T, UmlError>;
