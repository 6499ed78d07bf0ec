use crate::diagram::Diagram;
use std::ops::{Deref, DerefMut};

/// 可嵌套的输出区域
///
/// 打开时 level + 1，有标题则写入 `<tabs><header> {`；
/// drop 时 (包括出错提前返回) 写入对应的 `<tabs>}` 并 level - 1。
/// 没有标题时只记录嵌套深度，不产生可见标记。
///
/// 块通过 `Deref` 暴露底层 `Diagram`，嵌套块直接在外层块上打开。
pub struct ScopedBlock<'d> {
    diagram: &'d mut Diagram,
    header: Option<String>,
}

/// `namespace <name>` 分组块，由 `Diagram::namespace` 打开
pub type NamespaceBlock<'d> = ScopedBlock<'d>;

impl<'d> ScopedBlock<'d> {
    pub fn open(diagram: &'d mut Diagram, header: Option<String>) -> Self {
        diagram.level += 1;
        if let Some(header) = &header {
            let line = format!("\n{}{} {{\n", diagram.indent(), header);
            diagram.push(&line);
        }
        Self { diagram, header }
    }

    /// 无标题的透明块
    pub fn transparent(diagram: &'d mut Diagram) -> Self {
        Self::open(diagram, None)
    }
}

impl Deref for ScopedBlock<'_> {
    type Target = Diagram;

    fn deref(&self) -> &Diagram {
        &*self.diagram
    }
}

impl DerefMut for ScopedBlock<'_> {
    fn deref_mut(&mut self) -> &mut Diagram {
        &mut *self.diagram
    }
}

impl Drop for ScopedBlock<'_> {
    fn drop(&mut self) {
        if self.header.is_some() {
            let line = format!("\n{}}}\n\n", self.diagram.indent());
            self.diagram.push(&line);
        }
        self.diagram.level -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(diagram: &mut Diagram, fail: bool) -> Result<(), String> {
        let mut outer = ScopedBlock::open(diagram, Some("outer".to_string()));
        let inner = ScopedBlock::open(&mut outer, Some("inner".to_string()));
        if fail {
            return Err("boom".to_string());
        }
        drop(inner);
        Ok(())
    }

    #[test]
    fn test_header_markers_and_indent() {
        let mut diagram = Diagram::new();
        {
            let block = ScopedBlock::open(&mut diagram, Some("class a.B".to_string()));
            assert_eq!(block.level(), 1);
        }
        assert_eq!(diagram.buffer(), "\n\tclass a.B {\n\n\t}\n\n");
        assert_eq!(diagram.level(), 0);
    }

    #[test]
    fn test_transparent_block_tracks_level_only() {
        let mut diagram = Diagram::new();
        {
            let mut outer = ScopedBlock::transparent(&mut diagram);
            let inner = ScopedBlock::open(&mut outer, Some("namespace x".to_string()));
            assert_eq!(inner.level(), 2);
        }
        assert_eq!(diagram.buffer(), "\n\t\tnamespace x {\n\n\t\t}\n\n");
        assert_eq!(diagram.level(), 0);
    }

    #[test]
    fn test_nested_blocks_close_on_error() {
        let mut diagram = Diagram::new();
        assert!(nested(&mut diagram, true).is_err());
        assert_eq!(diagram.level(), 0);

        let buffer = diagram.buffer();
        assert_eq!(buffer.matches(" {\n").count(), 2);
        assert_eq!(buffer.matches("}\n\n").count(), 2);
        // 内层先关闭
        assert!(buffer.find("\n\t\t}").unwrap() < buffer.find("\n\t}").unwrap());
    }

    #[test]
    fn test_nested_blocks_success_matches_error_path() {
        let mut ok = Diagram::new();
        let mut failed = Diagram::new();
        nested(&mut ok, false).unwrap();
        let _ = nested(&mut failed, true);
        assert_eq!(ok.buffer(), failed.buffer());
    }

    #[test]
    fn test_namespace_block() {
        let mut diagram = Diagram::new();
        {
            let mut namespace = diagram.namespace("metrics");
            assert_eq!(namespace.level(), 1);
            namespace.push("\t\t+note\n");
        }
        assert_eq!(
            diagram.buffer(),
            "\n\tnamespace metrics {\n\t\t+note\n\n\t}\n\n"
        );
    }
}
