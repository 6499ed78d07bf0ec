//! 生成配置

use crate::diagram::DiagramOptions;
use crate::render::OutputFormat;

pub const DEFAULT_RENDER_URL: &str = "https://kroki.io";

/// 生成配置
#[derive(Debug, Clone)]
pub struct UmlConfig {
    pub sort_modules: bool,
    pub namespace: Option<String>,
    pub internal_only: bool,
    pub render_url: String,
    pub format: OutputFormat,
}

impl Default for UmlConfig {
    fn default() -> Self {
        Self {
            sort_modules: true,
            namespace: None,
            internal_only: false,
            render_url: DEFAULT_RENDER_URL.to_string(),
            format: OutputFormat::Svg,
        }
    }
}

impl UmlConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("UMLGEN_SORT") {
            if let Some(b) = parse_bool(&v) {
                config.sort_modules = b;
            }
        }

        if let Some(v) = lookup("UMLGEN_NAMESPACE") {
            if !v.trim().is_empty() {
                config.namespace = Some(v.trim().to_string());
            }
        }

        if let Some(v) = lookup("UMLGEN_INTERNAL_ONLY") {
            if let Some(b) = parse_bool(&v) {
                config.internal_only = b;
            }
        }

        if let Some(v) = lookup("UMLGEN_RENDER_URL") {
            config.render_url = v;
        }

        if let Some(v) = lookup("UMLGEN_FORMAT") {
            if let Ok(format) = v.parse() {
                config.format = format;
            }
        }

        config
    }

    pub fn diagram_options(&self) -> DiagramOptions {
        DiagramOptions {
            sort_modules: self.sort_modules,
            namespace: self.namespace.clone(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
