use crate::block::ScopedBlock;
use crate::diagram::Diagram;
use crate::error::Result;
use crate::members::MemberLister;
use reflect::{ClassId, TypeCatalog};
use std::ops::{Deref, DerefMut};

/// 一个类的输出块
///
/// 被过滤或已输出过的类得到 `Skipped`，不产生任何输出，调用方无需分支。
pub enum ClassBlock<'d> {
    Skipped(&'d mut Diagram),
    Open(ScopedBlock<'d>),
}

impl<'d> ClassBlock<'d> {
    /// 首次遇到的类: 先记录继承边，再打开 `class <module>.<name>` 块并写入成员
    pub fn open(
        diagram: &'d mut Diagram,
        catalog: &dyn TypeCatalog,
        class: &ClassId,
    ) -> Result<Self> {
        if diagram.skip(class) {
            return Ok(Self::Skipped(diagram));
        }

        tracing::debug!("Rendering class {}", class);
        diagram.parent_relations(catalog, class)?;

        let mut block = ScopedBlock::open(diagram, Some(format!("class {}", class)));
        MemberLister::new(catalog).write(&mut block, class)?;
        Ok(Self::Open(block))
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    /// 额外声明一个构造入口: 必选参数在前，可选参数用 [] 包裹
    pub fn constructor(&mut self, required: &[&str], optional: &[&str]) {
        let Self::Open(block) = self else {
            return;
        };

        let mut args: Vec<String> = required.iter().map(|a| a.to_string()).collect();
        args.extend(optional.iter().map(|a| format!("[{}]", a)));

        let line = format!("{}+__init__({})\n", block.indent(), args.join(","));
        block.push(&line);
    }
}

impl Deref for ClassBlock<'_> {
    type Target = Diagram;

    fn deref(&self) -> &Diagram {
        match self {
            Self::Skipped(diagram) => &**diagram,
            Self::Open(block) => &**block,
        }
    }
}

impl DerefMut for ClassBlock<'_> {
    fn deref_mut(&mut self) -> &mut Diagram {
        match self {
            Self::Skipped(diagram) => &mut **diagram,
            Self::Open(block) => &mut **block,
        }
    }
}
