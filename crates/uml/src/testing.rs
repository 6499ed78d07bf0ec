//! 单元测试用的内存目录

use reflect::{ClassId, DiscoveredModule, Member, ReflectError, TypeCatalog};
use std::collections::HashMap;

/// 手工构造的 TypeCatalog: 模块按添加顺序发现，成员不做继承合并
pub struct StaticCatalog {
    root: String,
    modules: Vec<DiscoveredModule>,
    namespaces: HashMap<String, Vec<ClassId>>,
    bases: HashMap<ClassId, Vec<ClassId>>,
    members: HashMap<ClassId, Vec<Member>>,
}

impl StaticCatalog {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            modules: Vec::new(),
            namespaces: HashMap::new(),
            bases: HashMap::new(),
            members: HashMap::new(),
        }
    }

    pub fn module(mut self, name: &str, classes: &[ClassId]) -> Self {
        self.modules.push(DiscoveredModule {
            relative: name.to_string(),
            module: name.to_string(),
        });
        self.namespaces.insert(name.to_string(), classes.to_vec());
        self
    }

    pub fn class(mut self, class: ClassId, bases: &[ClassId], members: Vec<Member>) -> Self {
        self.bases.insert(class.clone(), bases.to_vec());
        self.members.insert(class, members);
        self
    }
}

impl TypeCatalog for StaticCatalog {
    fn root(&self) -> &str {
        &self.root
    }

    fn modules(&self) -> &[DiscoveredModule] {
        &self.modules
    }

    fn classes_in(&self, module: &str) -> reflect::Result<Vec<ClassId>> {
        self.namespaces
            .get(module)
            .cloned()
            .ok_or_else(|| ReflectError::UnknownModule(module.to_string()))
    }

    fn bases_of(&self, class: &ClassId) -> reflect::Result<Vec<ClassId>> {
        self.bases
            .get(class)
            .cloned()
            .ok_or_else(|| ReflectError::UnknownClass(class.clone()))
    }

    fn members_of(&self, class: &ClassId) -> reflect::Result<Vec<Member>> {
        self.members
            .get(class)
            .cloned()
            .ok_or_else(|| ReflectError::UnknownClass(class.clone()))
    }
}
