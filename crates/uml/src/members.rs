use crate::diagram::Diagram;
use crate::error::Result;
use reflect::{ClassId, Member, TypeCatalog};

/// 列出类上的函数成员 (含继承)，按名字升序
///
/// 单下划线开头的 protected 成员隐藏；dunder 和公开成员保留。
pub struct MemberLister<'c> {
    catalog: &'c dyn TypeCatalog,
}

impl<'c> MemberLister<'c> {
    pub fn new(catalog: &'c dyn TypeCatalog) -> Self {
        Self { catalog }
    }

    pub fn entries(&self, class: &ClassId) -> Result<Vec<Member>> {
        let mut members: Vec<Member> = self
            .catalog
            .members_of(class)?
            .into_iter()
            .filter(|m| m.kind.is_function() && !m.is_protected())
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    /// 每个成员写一行 `<tabs>\t+<name><signature>`
    pub fn write(&self, diagram: &mut Diagram, class: &ClassId) -> Result<usize> {
        let entries = self.entries(class)?;
        let indent = diagram.indent();
        for member in &entries {
            let line = format!("{}\t+{}{}\n", indent, member.name, member.signature);
            diagram.push(&line);
        }
        Ok(entries.len())
    }
}
