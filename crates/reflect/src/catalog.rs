//! 类型目录 - 反射能力的抽象与基于源码符号表的实现

use crate::error::{ReflectError, Result};
use crate::parser::{BindingTarget, ClassDef, ParsedModule, PythonParser};
use crate::scanner::{collect_python_files, discover_modules, module_name_for, DiscoveredModule};
use crate::types::{ClassId, Member};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// 反射能力 trait
///
/// 图生成只通过这个接口询问"模块里有哪些类、类的基类和成员"，
/// 不关心信息来自运行时反射还是预先构建的符号表。
pub trait TypeCatalog {
    /// 根包名
    fn root(&self) -> &str;

    /// 模块发现记录 (遍历顺序)
    fn modules(&self) -> &[DiscoveredModule];

    /// 模块中类类型的属性，按命名空间顺序
    fn classes_in(&self, module: &str) -> Result<Vec<ClassId>>;

    /// 直接基类，按声明顺序
    fn bases_of(&self, class: &ClassId) -> Result<Vec<ClassId>>;

    /// 类上可达的全部成员 (含继承)
    fn members_of(&self, class: &ClassId) -> Result<Vec<Member>>;
}

/// 名字解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolved {
    Class(ClassId),
    Module(String),
    /// 包外的名字，只知道点号路径
    External(String),
    /// 绑定到了函数或表达式
    Opaque,
}

/// 导入链解析深度上限 (循环导入)
const MAX_DEPTH: usize = 64;

/// star import 解析中已查过的 (模块, 名字)
type Seen = HashSet<(String, String)>;

/// 基于包源码的类型目录
pub struct PackageCatalog {
    root: String,
    modules: HashMap<String, ParsedModule>,
    discovered: Vec<DiscoveredModule>,
}

impl PackageCatalog {
    /// 加载包目录，包名取目录名
    pub fn load(root_dir: &Path) -> Result<Self> {
        if !root_dir.is_dir() {
            return Err(ReflectError::NotAPackage(root_dir.to_path_buf()));
        }

        let name = root_dir
            .canonicalize()?
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ReflectError::NotAPackage(root_dir.to_path_buf()))?;
        Self::load_as(root_dir, &name)
    }

    /// 以指定包名加载包目录
    pub fn load_as(root_dir: &Path, package: &str) -> Result<Self> {
        if !root_dir.is_dir() {
            return Err(ReflectError::NotAPackage(root_dir.to_path_buf()));
        }

        let files = collect_python_files(root_dir)?;
        tracing::info!("Loading {} ({} source files)", package, files.len());

        let mut sources = Vec::with_capacity(files.len());
        for file in files {
            let relative: PathBuf = file.strip_prefix(root_dir).unwrap_or(&file).to_path_buf();
            let source = fs::read_to_string(&file)?;
            sources.push((relative, source));
        }

        Self::from_sources(package, sources)
    }

    /// 从内存中的源码构建: (相对路径, 源码)
    pub fn from_sources<I, P, S>(package: &str, sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, S)>,
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let mut parser = PythonParser::new()?;
        let mut catalog = Self {
            root: package.to_string(),
            modules: HashMap::new(),
            discovered: Vec::new(),
        };

        let mut relative_paths = Vec::new();
        for (relative, source) in sources {
            let relative = relative.as_ref().to_path_buf();
            catalog.insert(&mut parser, &relative, source.as_ref())?;
            relative_paths.push(relative);
        }

        catalog.discovered = discover_modules(package, relative_paths.iter().map(PathBuf::as_path));

        // 被发现的模块都必须可导入；没有 __init__.py 的目录是空的命名空间包
        for record in &catalog.discovered {
            catalog
                .modules
                .entry(record.module.clone())
                .or_insert_with(|| ParsedModule::namespace(&record.module));
        }

        Ok(catalog)
    }

    fn insert(&mut self, parser: &mut PythonParser, relative: &Path, source: &str) -> Result<()> {
        let module = module_name_for(relative, &self.root);
        let is_package = relative
            .file_stem()
            .map(|s| s == "__init__")
            .unwrap_or(false);

        // sub.py 与 sub/__init__.py 同时存在时包优先
        if !is_package && self.modules.get(&module).is_some_and(|m| m.is_package) {
            return Ok(());
        }

        let parsed = parser.parse(&module, is_package, &relative.display().to_string(), source)?;
        self.modules.insert(module, parsed);
        Ok(())
    }

    /// 已解析的模块
    pub fn module(&self, name: &str) -> Option<&ParsedModule> {
        self.modules.get(name)
    }

    /// 是否是包内模块 (包括只有子模块的命名空间包)
    pub fn is_module(&self, name: &str) -> bool {
        if self.modules.contains_key(name) {
            return true;
        }
        let prefix = format!("{}.", name);
        self.modules.keys().any(|k| k.starts_with(&prefix))
    }

    fn class_def(&self, class: &ClassId) -> Option<&ClassDef> {
        self.modules.get(&class.module)?.class(&class.name)
    }

    /// 模块命名空间里查一个名字；名字未绑定时返回 None
    ///
    /// `before` 限定只看该位置之前的绑定 (class 语句执行时的命名空间)。
    /// `seen` 记录查过的 (模块, 名字)，互相 `import *` 的模块不会无限递归。
    fn resolve_name(
        &self,
        module: &str,
        name: &str,
        before: Option<usize>,
        depth: usize,
        seen: &mut Seen,
    ) -> Result<Option<Resolved>> {
        if depth > MAX_DEPTH {
            return Err(ReflectError::UnresolvedImport {
                module: module.to_string(),
                name: name.to_string(),
            });
        }

        if let Some(parsed) = self.modules.get(module) {
            let end = before.unwrap_or(parsed.bindings.len());
            match parsed.binding_before(name, end) {
                Some((_, BindingTarget::Class)) => {
                    return Ok(Some(Resolved::Class(ClassId::new(module, name))));
                }
                Some((_, BindingTarget::Module(target))) => {
                    return Ok(Some(Resolved::Module(target.clone())));
                }
                Some((_, BindingTarget::ImportFrom { module: from, name: imported })) => {
                    return self.resolve_from(from, imported, depth + 1, seen).map(Some);
                }
                Some((index, BindingTarget::Alias(path))) => {
                    // `X = X` 之类的别名只看赋值之前的绑定
                    return self
                        .resolve_path(module, path, Some(index), depth + 1, seen)
                        .map(Some);
                }
                Some((_, BindingTarget::Other)) => return Ok(Some(Resolved::Opaque)),
                Some((_, BindingTarget::Star(_))) | None => {}
            }

            if !name.starts_with('_') {
                seen.insert((module.to_string(), name.to_string()));
                let stars: Vec<&str> = parsed.star_imports_before(end).collect();
                for star in stars.into_iter().rev() {
                    if seen.contains(&(star.to_string(), name.to_string())) {
                        continue;
                    }
                    if let Some(found) = self.resolve_name(star, name, None, depth + 1, seen)? {
                        return Ok(Some(found));
                    }
                }
            }
        }

        let submodule = format!("{}.{}", module, name);
        if self.is_module(&submodule) {
            return Ok(Some(Resolved::Module(submodule)));
        }

        Ok(None)
    }

    /// from module import name
    fn resolve_from(
        &self,
        module: &str,
        name: &str,
        depth: usize,
        seen: &mut Seen,
    ) -> Result<Resolved> {
        if !self.is_module(module) {
            return Ok(Resolved::External(format!("{}.{}", module, name)));
        }

        self.resolve_name(module, name, None, depth, seen)?
            .ok_or_else(|| ReflectError::UnresolvedImport {
                module: module.to_string(),
                name: name.to_string(),
            })
    }

    /// a.b.C 在 module 命名空间中的含义；`before` 只作用于首段
    fn resolve_path(
        &self,
        module: &str,
        path: &[String],
        before: Option<usize>,
        depth: usize,
        seen: &mut Seen,
    ) -> Result<Resolved> {
        let Some((head, rest)) = path.split_first() else {
            return Ok(Resolved::Opaque);
        };

        // 未绑定的裸名字来自 builtins
        let mut current = self
            .resolve_name(module, head, before, depth, seen)?
            .unwrap_or_else(|| Resolved::External(format!("builtins.{}", head)));

        for segment in rest {
            current = self.attribute(current, segment, depth + 1, seen)?;
        }

        Ok(current)
    }

    fn attribute(
        &self,
        value: Resolved,
        name: &str,
        depth: usize,
        seen: &mut Seen,
    ) -> Result<Resolved> {
        match value {
            Resolved::Module(module) if self.is_module(&module) => self
                .resolve_name(&module, name, None, depth, seen)?
                .ok_or_else(|| ReflectError::UnresolvedName {
                    module: module.clone(),
                    name: name.to_string(),
                }),
            Resolved::Module(module) | Resolved::External(module) => {
                Ok(Resolved::External(format!("{}.{}", module, name)))
            }
            // 嵌套类不是模块属性，只保留身份
            Resolved::Class(class) => Ok(Resolved::Class(ClassId::new(
                class.module,
                format!("{}.{}", class.name, name),
            ))),
            Resolved::Opaque => Ok(Resolved::Opaque),
        }
    }

    /// C3 线性化
    fn linearize(&self, class: &ClassId, stack: &mut Vec<ClassId>) -> Result<Vec<ClassId>> {
        if stack.contains(class) {
            return Err(ReflectError::InheritanceCycle(class.clone()));
        }
        // 包外的类没有反射数据，作为叶子
        if self.class_def(class).is_none() {
            return Ok(vec![class.clone()]);
        }

        stack.push(class.clone());
        let bases = self.bases_of(class)?;
        let mut sequences = Vec::with_capacity(bases.len() + 1);
        for base in &bases {
            sequences.push(self.linearize(base, stack)?);
        }
        sequences.push(bases);
        stack.pop();

        let mut mro = vec![class.clone()];
        mro.extend(c3_merge(sequences).ok_or_else(|| ReflectError::Mro(class.clone()))?);
        Ok(mro)
    }

    /// 方法解析顺序，第一个元素是类本身
    pub fn mro(&self, class: &ClassId) -> Result<Vec<ClassId>> {
        if self.class_def(class).is_none() {
            return Err(ReflectError::UnknownClass(class.clone()));
        }
        self.linearize(class, &mut Vec::new())
    }
}

fn c3_merge(mut sequences: Vec<Vec<ClassId>>) -> Option<Vec<ClassId>> {
    let mut merged = Vec::new();

    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Some(merged);
        }

        // 找一个不出现在任何序列尾部的头
        let candidate = sequences
            .iter()
            .map(|s| &s[0])
            .find(|head| !sequences.iter().any(|s| s[1..].contains(head)))?
            .clone();

        for sequence in sequences.iter_mut() {
            if sequence[0] == candidate {
                sequence.remove(0);
            }
        }
        merged.push(candidate);
    }
}

impl TypeCatalog for PackageCatalog {
    fn root(&self) -> &str {
        &self.root
    }

    fn modules(&self) -> &[DiscoveredModule] {
        &self.discovered
    }

    fn classes_in(&self, module: &str) -> Result<Vec<ClassId>> {
        let parsed = self
            .modules
            .get(module)
            .ok_or_else(|| ReflectError::UnknownModule(module.to_string()))?;

        let mut classes = Vec::new();
        for (name, _) in parsed.namespace_order() {
            if let Some(Resolved::Class(class)) =
                self.resolve_name(module, name, None, 0, &mut Seen::new())?
            {
                if self.class_def(&class).is_some() {
                    classes.push(class);
                }
            }
        }

        // from m import * 带进来的公开类
        for star in parsed.star_imports() {
            let Some(source) = self.modules.get(star) else {
                continue;
            };
            for (name, _) in source.namespace_order() {
                if name.starts_with('_') || parsed.binding(name).is_some() {
                    continue;
                }
                if let Some(Resolved::Class(class)) =
                    self.resolve_name(star, name, None, 0, &mut Seen::new())?
                {
                    if self.class_def(&class).is_some() && !classes.contains(&class) {
                        classes.push(class);
                    }
                }
            }
        }

        Ok(classes)
    }

    fn bases_of(&self, class: &ClassId) -> Result<Vec<ClassId>> {
        let def = self
            .class_def(class)
            .ok_or_else(|| ReflectError::UnknownClass(class.clone()))?;

        // 基类在 class 语句执行时求值: `class Base(Base)` 指向之前导入的 Base
        let before = Some(def.binding_index);
        let mut bases = Vec::with_capacity(def.bases.len());
        for path in &def.bases {
            match self.resolve_path(&class.module, path, before, 0, &mut Seen::new())? {
                // 同模块里被重新定义覆盖的旧类已经没有身份可用
                Resolved::Class(base) if base == *class => {
                    tracing::warn!("{}: base class {} was redefined", class, path.join("."));
                }
                Resolved::Class(base) => bases.push(base),
                Resolved::External(dotted) => bases.push(ClassId::from_dotted(&dotted)),
                Resolved::Module(_) | Resolved::Opaque => {
                    tracing::warn!("{}: cannot resolve base class {}", class, path.join("."));
                }
            }
        }

        Ok(bases)
    }

    fn members_of(&self, class: &ClassId) -> Result<Vec<Member>> {
        let mut seen = HashSet::new();
        let mut members = Vec::new();

        for owner in self.mro(class)? {
            let Some(def) = self.class_def(&owner) else {
                continue;
            };
            for member in &def.members {
                if seen.insert(member.name.clone()) {
                    members.push(member.clone());
                }
            }
        }

        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemberKind;

    fn catalog(sources: &[(&str, &str)]) -> PackageCatalog {
        PackageCatalog::from_sources("pkg", sources.iter().copied()).unwrap()
    }

    fn id(module: &str, name: &str) -> ClassId {
        ClassId::new(module, name)
    }

    #[test]
    fn test_classes_in_binding_order() {
        let catalog = catalog(&[
            ("__init__.py", ""),
            ("m.py", "class Foo:\n    pass\n\nclass Bar(Foo):\n    pass\n"),
        ]);

        let classes = catalog.classes_in("pkg.m").unwrap();
        assert_eq!(classes, vec![id("pkg.m", "Foo"), id("pkg.m", "Bar")]);
    }

    #[test]
    fn test_classes_in_includes_imported_classes() {
        let catalog = catalog(&[
            ("base.py", "class Base:\n    pass\n"),
            (
                "impl.py",
                "from .base import Base\nfrom collections import OrderedDict\n\nclass Impl(Base):\n    pass\n",
            ),
        ]);

        let classes = catalog.classes_in("pkg.impl").unwrap();
        assert_eq!(classes, vec![id("pkg.base", "Base"), id("pkg.impl", "Impl")]);
    }

    #[test]
    fn test_classes_in_follows_aliases_and_star_imports() {
        let catalog = catalog(&[
            ("core.py", "class Engine:\n    pass\n\nclass _Hidden:\n    pass\n"),
            ("api.py", "from .core import *\n\nDefault = Engine\n"),
        ]);

        let classes = catalog.classes_in("pkg.api").unwrap();
        assert_eq!(classes, vec![id("pkg.core", "Engine")]);
    }

    #[test]
    fn test_classes_in_unknown_module() {
        let catalog = catalog(&[("m.py", "")]);
        assert!(matches!(
            catalog.classes_in("pkg.nope"),
            Err(ReflectError::UnknownModule(_))
        ));
    }

    #[test]
    fn test_bases_resolution() {
        let catalog = catalog(&[
            ("__init__.py", ""),
            ("base.py", "class Base:\n    pass\n"),
            ("sub/__init__.py", "from ..base import Base as Root\n"),
            (
                "m.py",
                r#"
import abc
import pkg.base
from . import sub
from typing import Generic

class A(pkg.base.Base, sub.Root, abc.ABC, Exception, Generic[T]):
    pass

class B(object):
    pass

class C:
    pass
"#,
            ),
        ]);

        assert_eq!(
            catalog.bases_of(&id("pkg.m", "A")).unwrap(),
            vec![
                id("pkg.base", "Base"),
                id("pkg.base", "Base"),
                id("abc", "ABC"),
                id("builtins", "Exception"),
                id("typing", "Generic"),
            ]
        );
        assert_eq!(
            catalog.bases_of(&id("pkg.m", "B")).unwrap(),
            vec![id("builtins", "object")]
        );
        assert!(catalog.bases_of(&id("pkg.m", "C")).unwrap().is_empty());
    }

    #[test]
    fn test_base_shadowed_by_class_name() {
        let catalog = catalog(&[
            ("base.py", "class Base:\n    def run(self):\n        pass\n"),
            ("m.py", "from .base import Base\n\n\nclass Base(Base):\n    pass\n"),
            ("errors.py", "class Exception(Exception):\n    pass\n"),
        ]);

        let shadow = id("pkg.m", "Base");
        assert_eq!(catalog.bases_of(&shadow).unwrap(), vec![id("pkg.base", "Base")]);
        assert_eq!(
            catalog.mro(&shadow).unwrap(),
            vec![shadow.clone(), id("pkg.base", "Base")]
        );
        assert_eq!(catalog.members_of(&shadow).unwrap()[0].name, "run");

        let error = id("pkg.errors", "Exception");
        assert_eq!(
            catalog.bases_of(&error).unwrap(),
            vec![id("builtins", "Exception")]
        );
        assert!(catalog.members_of(&error).unwrap().is_empty());
    }

    #[test]
    fn test_base_ignores_later_rebinding() {
        let catalog = catalog(&[
            ("__init__.py", ""),
            (
                "m.py",
                "class Foo:\n    pass\n\n\nclass Bar(Foo):\n    pass\n\n\nFoo = None\n",
            ),
        ]);

        assert_eq!(
            catalog.bases_of(&id("pkg.m", "Bar")).unwrap(),
            vec![id("pkg.m", "Foo")]
        );
        // 模块命名空间里 Foo 已不是类
        assert_eq!(catalog.classes_in("pkg.m").unwrap(), vec![id("pkg.m", "Bar")]);
    }

    #[test]
    fn test_mutual_star_imports_fall_back_to_builtins() {
        let catalog = catalog(&[
            ("__init__.py", ""),
            ("a.py", "from .b import *\n\n\nclass E(Exception):\n    pass\n"),
            ("b.py", "from .a import *\n\n\nclass F:\n    pass\n"),
        ]);

        assert_eq!(
            catalog.bases_of(&id("pkg.a", "E")).unwrap(),
            vec![id("builtins", "Exception")]
        );
        assert_eq!(
            catalog.classes_in("pkg.a").unwrap(),
            vec![id("pkg.a", "E"), id("pkg.b", "F")]
        );
        assert_eq!(
            catalog.classes_in("pkg.b").unwrap(),
            vec![id("pkg.b", "F"), id("pkg.a", "E")]
        );
    }

    #[test]
    fn test_unresolved_internal_import_is_fatal() {
        let catalog = catalog(&[
            ("base.py", "class Base:\n    pass\n"),
            ("m.py", "from .base import Missing\n\nclass A(Missing):\n    pass\n"),
        ]);

        match catalog.bases_of(&id("pkg.m", "A")) {
            Err(ReflectError::UnresolvedImport { module, name }) => {
                assert_eq!(module, "pkg.base");
                assert_eq!(name, "Missing");
            }
            other => panic!("expected unresolved import, got {:?}", other),
        }
    }

    #[test]
    fn test_members_include_inherited() {
        let catalog = catalog(&[(
            "m.py",
            r#"
class Base:
    def run(self):
        pass

    def stop(self, force=False):
        pass

class Child(Base):
    def run(self, fast: bool = True):
        pass

    @property
    def state(self):
        pass
"#,
        )]);

        let members = catalog.members_of(&id("pkg.m", "Child")).unwrap();
        let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["run", "state", "stop"]);

        let run = members.iter().find(|m| m.name == "run").unwrap();
        assert_eq!(run.signature.to_string(), "(self, fast: bool = True)");
        assert_eq!(members[1].kind, MemberKind::Property);
    }

    #[test]
    fn test_mro_diamond() {
        let catalog = catalog(&[(
            "m.py",
            r#"
class A:
    def who(self):
        pass

class B(A):
    pass

class C(A):
    def who(self, c):
        pass

class D(B, C):
    pass
"#,
        )]);

        let mro = catalog.mro(&id("pkg.m", "D")).unwrap();
        let names: Vec<_> = mro.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["D", "B", "C", "A"]);

        // C3: C.who 先于 A.who
        let members = catalog.members_of(&id("pkg.m", "D")).unwrap();
        assert_eq!(members[0].signature.to_string(), "(self, c)");
    }

    #[test]
    fn test_mro_inconsistent() {
        let catalog = catalog(&[(
            "m.py",
            "class X:\n    pass\n\nclass Y(X):\n    pass\n\nclass Z(X, Y):\n    pass\n",
        )]);

        assert!(matches!(
            catalog.mro(&id("pkg.m", "Z")),
            Err(ReflectError::Mro(_))
        ));
    }

    #[test]
    fn test_inheritance_cycle() {
        let catalog = catalog(&[
            ("a.py", "from .b import B\n\nclass A(B):\n    pass\n"),
            ("b.py", "from .a import A\n\nclass B(A):\n    pass\n"),
        ]);

        assert!(matches!(
            catalog.members_of(&id("pkg.a", "A")),
            Err(ReflectError::InheritanceCycle(_))
        ));
    }

    #[test]
    fn test_namespace_package_is_importable() {
        let catalog = catalog(&[("sub/m.py", "class Foo:\n    pass\n")]);

        assert!(catalog.is_module("pkg.sub"));
        let names: Vec<_> = catalog.modules().iter().map(|m| m.module.as_str()).collect();
        assert_eq!(names, vec!["pkg.sub.m"]);
    }

    #[test]
    fn test_discovered_dunder_maps_to_package() {
        let catalog = catalog(&[
            ("sub/__init__.py", "class Pkg:\n    pass\n"),
            ("sub/__main__.py", "class Main:\n    pass\n"),
        ]);

        let modules = catalog.modules();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].module, "pkg.sub");
        assert_eq!(catalog.classes_in("pkg.sub").unwrap(), vec![id("pkg.sub", "Pkg")]);
    }
}
