use crate::block::ScopedBlock;
use crate::class::ClassBlock;
use crate::diagram::Diagram;
use crate::error::Result;
use reflect::TypeCatalog;
use std::ops::{Deref, DerefMut};

/// 一个模块的输出范围
///
/// 模块本身在图中不可见 (透明块)，只让其中的类多缩进一层。
pub struct ModuleBlock<'d> {
    scope: ScopedBlock<'d>,
    module: String,
    rendered: usize,
}

impl<'d> ModuleBlock<'d> {
    /// 打开模块并依次打开它命名空间里的每个类
    pub fn open(diagram: &'d mut Diagram, catalog: &dyn TypeCatalog, module: &str) -> Result<Self> {
        let mut scope = ScopedBlock::transparent(diagram);
        let classes = catalog.classes_in(module)?;
        tracing::debug!("Module {} exposes {} classes", module, classes.len());

        let mut rendered = 0;
        for class in &classes {
            if ClassBlock::open(&mut scope, catalog, class)?.is_rendered() {
                rendered += 1;
            }
        }

        Ok(Self {
            scope,
            module: module.to_string(),
            rendered,
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// 本模块实际输出的类数量 (不含跳过的)
    pub fn rendered(&self) -> usize {
        self.rendered
    }
}

impl Deref for ModuleBlock<'_> {
    type Target = Diagram;

    fn deref(&self) -> &Diagram {
        &*self.scope
    }
}

impl DerefMut for ModuleBlock<'_> {
    fn deref_mut(&mut self) -> &mut Diagram {
        &mut *self.scope
    }
}
