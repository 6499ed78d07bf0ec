//! 包目录扫描 - 源文件收集与模块发现

use crate::error::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// 模块发现记录: 相对路径 -> 可导入的完整模块名
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredModule {
    /// 相对路径，点号连接，去掉扩展名: "sub.__init__"
    pub relative: String,
    /// 完整模块名: "pkg.sub"
    pub module: String,
}

/// 递归收集 .py 文件 (文件系统遍历顺序，不排序)
pub fn collect_python_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_into(dir, &mut files)?;
    Ok(files)
}

fn collect_into(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            // 跳过 .git / .venv 之类的隐藏目录
            let hidden = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(false);
            if !hidden {
                collect_into(&path, files)?;
            }
        } else if path.extension().map(|e| e == "py").unwrap_or(false) {
            files.push(path);
        }
    }

    Ok(())
}

/// 相对路径去掉扩展名后的各段
fn segments(relative: &Path) -> Vec<String> {
    relative
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect()
}

/// 源文件的真实模块名: "sub/__init__.py" -> "pkg.sub", "sub/x.py" -> "pkg.sub.x"
pub fn module_name_for(relative: &Path, package: &str) -> String {
    let mut parts = segments(relative);
    if parts.last().map(|s| s == "__init__").unwrap_or(false) {
        parts.pop();
    }

    if parts.is_empty() {
        package.to_string()
    } else {
        format!("{}.{}", package, parts.join("."))
    }
}

/// 文件参与图生成时的模块路径；不参与时返回 None
///
/// 以 `__` 开头的段在任何位置都被丢弃 (`sub/__init__.py` 映射到 `pkg.sub`)，
/// 单下划线的 `_impl.py` 照常发现。以 `.` 开头的段是隐藏路径，整个文件跳过。
/// 结果为空 (根 `__init__.py`) 也跳过。
#[doc(hidden)]
pub fn public_segments(relative: &Path) -> Option<Vec<String>> {
    let mut kept = Vec::new();
    for part in segments(relative) {
        if part.starts_with('.') {
            return None;
        }
        if !part.starts_with("__") {
            kept.push(part);
        }
    }

    if kept.is_empty() {
        None
    } else {
        Some(kept)
    }
}

/// 按遍历顺序生成发现记录，模块名去重 (先出现者保留)
pub fn discover_modules<'a, I>(package: &str, relative_paths: I) -> Vec<DiscoveredModule>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut seen = HashSet::new();
    let mut modules = Vec::new();

    for relative in relative_paths {
        let Some(parts) = public_segments(relative) else {
            tracing::debug!("Skipping module file: {}", relative.display());
            continue;
        };

        let module = format!("{}.{}", package, parts.join("."));
        if !seen.insert(module.clone()) {
            continue;
        }

        modules.push(DiscoveredModule {
            relative: segments(relative).join("."),
            module,
        });
    }

    modules
}
