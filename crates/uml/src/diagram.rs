use crate::block::{NamespaceBlock, ScopedBlock};
use crate::class::ClassBlock;
use crate::error::Result;
use crate::module::ModuleBlock;
use crate::render::{OutputFormat, Renderer};
use reflect::{ClassId, TypeCatalog};
use std::collections::HashSet;
use std::fmt;

/// 继承箭头
pub const INHERITS: &str = "--|>";

const START_MARKER: &str = "@startuml";
const END_MARKER: &str = "@enduml";

/// 一条关系: source arrow target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub source: ClassId,
    pub arrow: String,
    pub target: ClassId,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.source, self.arrow, self.target)
    }
}

/// 生成选项
#[derive(Debug, Clone, Default)]
pub struct DiagramOptions {
    /// 遍历前按模块名排序 (否则按文件系统遍历顺序)
    pub sort_modules: bool,
    /// 把所有模块包进一个可见的 namespace 块
    pub namespace: Option<String>,
}

type Filter = Box<dyn Fn(&ClassId) -> bool>;

/// 类图 - 一次生成过程的全部状态
///
/// 每次生成创建一个新实例；`generate` 会消费它。
pub struct Diagram {
    pub(crate) buffer: String,
    relations: Vec<Relation>,
    visited: HashSet<ClassId>,
    pub(crate) level: usize,
    filter: Option<Filter>,
    options: DiagramOptions,
}

impl Diagram {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            relations: Vec::new(),
            visited: HashSet::new(),
            level: 0,
            filter: None,
            options: DiagramOptions::default(),
        }
    }

    /// 过滤谓词: 返回 true 的类被排除
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ClassId) -> bool + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn with_options(mut self, options: DiagramOptions) -> Self {
        self.options = options;
        self
    }

    /// 当前嵌套深度
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn is_visited(&self, class: &ClassId) -> bool {
        self.visited.contains(class)
    }

    pub fn filtered(&self, class: &ClassId) -> bool {
        self.filter.as_ref().map(|f| f(class)).unwrap_or(false)
    }

    /// 是否跳过这个类
    ///
    /// 被过滤的类每次都重新判断 (不记入 visited)；其余的类首次遇到时
    /// 记入 visited 并返回 false，之后都返回 true。
    pub fn skip(&mut self, class: &ClassId) -> bool {
        if self.filtered(class) {
            return true;
        }
        !self.visited.insert(class.clone())
    }

    /// 追加文本
    pub fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub(crate) fn indent(&self) -> String {
        "\t".repeat(self.level)
    }

    pub fn relation(&mut self, source: &ClassId, arrow: &str, target: &ClassId) {
        self.relations.push(Relation {
            source: source.clone(),
            arrow: arrow.to_string(),
            target: target.clone(),
        });
    }

    /// 记录 class 到每个未被过滤的直接基类的继承边
    pub fn parent_relations(&mut self, catalog: &dyn TypeCatalog, class: &ClassId) -> Result<()> {
        for base in catalog.bases_of(class)? {
            if !self.filtered(&base) {
                self.relation(class, INHERITS, &base);
            }
        }
        Ok(())
    }

    /// 打开一个 `namespace <name>` 块
    pub fn namespace(&mut self, name: &str) -> NamespaceBlock<'_> {
        ScopedBlock::open(self, Some(format!("namespace {}", name)))
    }

    pub fn module<'d>(
        &'d mut self,
        catalog: &dyn TypeCatalog,
        module: &str,
    ) -> Result<ModuleBlock<'d>> {
        ModuleBlock::open(self, catalog, module)
    }

    pub fn class<'d>(
        &'d mut self,
        catalog: &dyn TypeCatalog,
        class: &ClassId,
    ) -> Result<ClassBlock<'d>> {
        ClassBlock::open(self, catalog, class)
    }

    /// 本次生成要遍历的模块
    pub fn discover_modules(&self, catalog: &dyn TypeCatalog) -> Vec<String> {
        let mut modules: Vec<String> = catalog
            .modules()
            .iter()
            .map(|record| record.module.clone())
            .collect();
        if self.options.sort_modules {
            modules.sort();
        }
        modules
    }

    /// 遍历所有模块并返回最终文本
    pub fn generate(mut self, catalog: &dyn TypeCatalog) -> Result<String> {
        let modules = self.discover_modules(catalog);
        tracing::info!(
            "Generating diagram for {} ({} modules)",
            catalog.root(),
            modules.len()
        );

        match self.options.namespace.clone() {
            Some(name) => {
                let mut namespace = self.namespace(&name);
                render_modules(&mut namespace, catalog, &modules)?;
            }
            None => render_modules(&mut self, catalog, &modules)?,
        }

        debug_assert_eq!(self.level, 0);
        tracing::info!(
            "Rendered {} classes, {} relations",
            self.visited.len(),
            self.relations.len()
        );

        Ok(self.to_text())
    }

    /// 生成文本并交给外部渲染服务
    pub async fn render<R>(
        self,
        catalog: &dyn TypeCatalog,
        renderer: &R,
        format: OutputFormat,
    ) -> Result<Vec<u8>>
    where
        R: Renderer + ?Sized,
    {
        let text = self.generate(catalog)?;
        Ok(renderer.render(&text, format).await?)
    }

    /// 序列化: 开始标记、缓冲区、关系行、结束标记
    pub fn to_text(&self) -> String {
        let relations: Vec<String> = self.relations.iter().map(|r| r.to_string()).collect();
        [
            START_MARKER,
            self.buffer.as_str(),
            relations.join("\n").as_str(),
            END_MARKER,
        ]
        .join("\n")
    }
}

fn render_modules(diagram: &mut Diagram, catalog: &dyn TypeCatalog, modules: &[String]) -> Result<()> {
    for module in modules {
        let block = diagram.module(catalog, module)?;
        tracing::debug!("{}: {} classes rendered", block.module(), block.rendered());
    }
    Ok(())
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Diagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
