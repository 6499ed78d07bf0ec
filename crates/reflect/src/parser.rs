//! Python 源码解析器 - 使用 tree-sitter 提取模块命名空间和类定义

use crate::error::{ReflectError, Result};
use crate::types::{Member, MemberKind, Param, ParamKind, Signature};
use tree_sitter::{Node, Parser};

/// 模块命名空间中一个名字绑定到的东西
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingTarget {
    /// 本模块定义的类
    Class,
    /// import a.b / import a.b as x
    Module(String),
    /// from m import n
    ImportFrom { module: String, name: String },
    /// from m import *
    Star(String),
    /// X = a.b.C
    Alias(Vec<String>),
    /// 函数、其他赋值
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub target: BindingTarget,
}

/// 类定义 - 基类保持声明顺序，成员保持定义顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    /// 每个基类表达式的点号路径: `abc.ABC` -> ["abc", "ABC"]
    pub bases: Vec<Vec<String>>,
    pub members: Vec<Member>,
    /// class 语句在 `bindings` 中的位置；基类表达式只看它之前的绑定
    pub binding_index: usize,
}

/// 解析后的模块
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedModule {
    pub name: String,
    pub is_package: bool,
    /// 顶层绑定，按出现顺序
    pub bindings: Vec<Binding>,
    pub classes: Vec<ClassDef>,
}

impl ParsedModule {
    /// 空模块 (没有 __init__.py 的命名空间包)
    pub fn namespace(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_package: true,
            ..Self::default()
        }
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// 名字当前的绑定 (后绑定覆盖先绑定)
    pub fn binding(&self, name: &str) -> Option<&BindingTarget> {
        self.binding_before(name, self.bindings.len())
            .map(|(_, target)| target)
    }

    /// 执行到第 `before` 个绑定之前时名字的绑定，连同它的位置
    pub fn binding_before(&self, name: &str, before: usize) -> Option<(usize, &BindingTarget)> {
        let end = before.min(self.bindings.len());
        self.bindings[..end]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, b)| b.name == name)
            .map(|(i, b)| (i, &b.target))
    }

    /// `from m import *` 引入的模块，按出现顺序
    pub fn star_imports(&self) -> impl Iterator<Item = &str> {
        self.star_imports_before(self.bindings.len())
    }

    pub fn star_imports_before(&self, before: usize) -> impl Iterator<Item = &str> {
        let end = before.min(self.bindings.len());
        self.bindings[..end].iter().filter_map(|b| match &b.target {
            BindingTarget::Star(module) => Some(module.as_str()),
            _ => None,
        })
    }

    /// 命名空间顺序: 每个名字取首次出现的位置、最后一次的绑定
    pub fn namespace_order(&self) -> Vec<(&str, &BindingTarget)> {
        let mut order: Vec<(&str, &BindingTarget)> = Vec::new();
        for binding in &self.bindings {
            if matches!(binding.target, BindingTarget::Star(_)) {
                continue;
            }
            match order.iter_mut().find(|(name, _)| *name == binding.name) {
                Some(slot) => slot.1 = &binding.target,
                None => order.push((&binding.name, &binding.target)),
            }
        }
        order
    }
}

/// Python 代码解析器
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::language();
        parser
            .set_language(&language)
            .map_err(|e| ReflectError::Language(e.to_string()))?;
        Ok(Self { parser })
    }

    /// 解析一个模块；语法错误视为导入失败
    pub fn parse(
        &mut self,
        module: &str,
        is_package: bool,
        path: &str,
        source: &str,
    ) -> Result<ParsedModule> {
        let tree = self
            .parser
            .parse(source.as_bytes(), None)
            .ok_or_else(|| ReflectError::Syntax {
                path: path.to_string(),
                line: 0,
            })?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error(root).map(|n| n.start_position().row + 1).unwrap_or(0);
            return Err(ReflectError::Syntax {
                path: path.to_string(),
                line,
            });
        }

        let mut parsed = ParsedModule {
            name: module.to_string(),
            is_package,
            ..ParsedModule::default()
        };

        let mut cursor = root.walk();
        for statement in root.named_children(&mut cursor) {
            visit_statement(statement, source, &mut parsed);
        }

        tracing::debug!(
            "Parsed {}: {} bindings, {} classes",
            module,
            parsed.bindings.len(),
            parsed.classes.len()
        );

        Ok(parsed)
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error() || c.is_missing())
        .find_map(first_error)
}

fn text<'s>(node: Node, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// 归一化空白: 多行注解/默认值压成一行
fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn field_text(node: Node, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field).map(|n| squash(text(n, source)))
}

fn push_binding(parsed: &mut ParsedModule, name: &str, target: BindingTarget) {
    parsed.bindings.push(Binding {
        name: name.to_string(),
        target,
    });
}

/// 处理模块顶层语句 (不进入 if / try 等条件块)
fn visit_statement(node: Node, source: &str, parsed: &mut ParsedModule) {
    match node.kind() {
        "class_definition" => visit_class(node, source, parsed),
        "function_definition" => {
            if let Some(name) = field_text(node, "name", source) {
                push_binding(parsed, &name, BindingTarget::Other);
            }
        }
        "decorated_definition" => {
            if let Some(definition) = node.child_by_field_name("definition") {
                visit_statement(definition, source, parsed);
            }
        }
        "import_statement" => visit_import(node, source, parsed),
        "import_from_statement" => visit_import_from(node, source, parsed),
        "expression_statement" => {
            let mut cursor = node.walk();
            let assignments: Vec<_> = node
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "assignment")
                .collect();
            for assignment in assignments {
                visit_assignment(assignment, source, parsed);
            }
        }
        _ => {}
    }
}

fn visit_class(node: Node, source: &str, parsed: &mut ParsedModule) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };

    let mut bases = Vec::new();
    if let Some(arguments) = node.child_by_field_name("superclasses") {
        let mut cursor = arguments.walk();
        for argument in arguments.named_children(&mut cursor) {
            if let Some(path) = dotted_path(argument, source) {
                bases.push(path);
            }
        }
    }

    let mut members: Vec<Member> = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for statement in body.named_children(&mut cursor) {
            if let Some(member) = member_of(statement, source) {
                // 同名重新定义覆盖前者
                match members.iter_mut().find(|m| m.name == member.name) {
                    Some(existing) => *existing = member,
                    None => members.push(member),
                }
            }
        }
    }

    let binding_index = parsed.bindings.len();
    push_binding(parsed, &name, BindingTarget::Class);
    parsed.classes.retain(|c| c.name != name);
    parsed.classes.push(ClassDef {
        name,
        bases,
        members,
        binding_index,
    });
}

/// 基类表达式 -> 点号路径；`Generic[T]` 取被下标的部分，其他表达式忽略
fn dotted_path(node: Node, source: &str) -> Option<Vec<String>> {
    match node.kind() {
        "identifier" | "attribute" => {
            let path: Vec<String> = text(node, source)
                .split('.')
                .map(|s| s.trim().to_string())
                .collect();
            let valid = path
                .iter()
                .all(|s| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_'));
            valid.then_some(path)
        }
        "subscript" => node
            .child_by_field_name("value")
            .and_then(|value| dotted_path(value, source)),
        _ => None,
    }
}

fn member_of(node: Node, source: &str) -> Option<Member> {
    match node.kind() {
        "function_definition" => function_member(node, source, MemberKind::Function),
        "decorated_definition" => {
            let definition = node.child_by_field_name("definition")?;
            if definition.kind() != "function_definition" {
                return None;
            }

            let mut kind = MemberKind::Function;
            let mut cursor = node.walk();
            for decorator in node.named_children(&mut cursor) {
                if decorator.kind() != "decorator" {
                    continue;
                }
                let expression = squash(text(decorator, source).trim_start_matches('@'));
                if let Some(found) = decorator_kind(&expression) {
                    kind = stronger(kind, found);
                }
            }

            function_member(definition, source, kind)
        }
        _ => None,
    }
}

/// 装饰器决定成员类型；未知装饰器保持原函数
#[doc(hidden)]
pub fn decorator_kind(expression: &str) -> Option<MemberKind> {
    let head = expression.split('(').next().unwrap_or(expression).trim();
    let last = head.rsplit('.').next().unwrap_or(head);
    match last {
        "property" | "cached_property" | "abstractproperty" | "setter" | "getter" | "deleter" => {
            Some(MemberKind::Property)
        }
        "classmethod" => Some(MemberKind::ClassMethod),
        "staticmethod" => Some(MemberKind::StaticMethod),
        _ => None,
    }
}

fn stronger(current: MemberKind, found: MemberKind) -> MemberKind {
    let rank = |k: MemberKind| match k {
        MemberKind::Function => 0,
        MemberKind::StaticMethod => 1,
        MemberKind::ClassMethod => 2,
        MemberKind::Property => 3,
    };
    if rank(found) > rank(current) {
        found
    } else {
        current
    }
}

fn function_member(node: Node, source: &str, kind: MemberKind) -> Option<Member> {
    let name = field_text(node, "name", source)?;
    let params = node
        .child_by_field_name("parameters")
        .map(|p| parameters(p, source))
        .unwrap_or_default();

    Some(Member {
        name,
        kind,
        signature: Signature {
            params,
            returns: field_text(node, "return_type", source),
        },
    })
}

fn parameters(node: Node, source: &str) -> Vec<Param> {
    let mut params = Vec::new();
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        let param = match child.kind() {
            "identifier" => Some(Param::regular(text(child, source))),
            "typed_parameter" => typed_parameter(child, source),
            "default_parameter" => {
                field_text(child, "name", source).map(|name| {
                    let param = Param::regular(name);
                    match field_text(child, "value", source) {
                        Some(value) => param.with_default(value),
                        None => param,
                    }
                })
            }
            "typed_default_parameter" => field_text(child, "name", source).map(|name| {
                let mut param = Param::regular(name);
                param.annotation = field_text(child, "type", source);
                param.default = field_text(child, "value", source);
                param
            }),
            "list_splat_pattern" => Some(splat(child, source, ParamKind::VarArgs)),
            "dictionary_splat_pattern" => Some(splat(child, source, ParamKind::VarKeyword)),
            "keyword_separator" | "*" => Some(Param::separator(ParamKind::KeywordSeparator)),
            "positional_separator" | "/" => Some(Param::separator(ParamKind::PositionalSeparator)),
            _ => None,
        };

        if let Some(param) = param {
            params.push(param);
        }
    }

    params
}

/// x: int / *args: int / **kw: Any
fn typed_parameter(node: Node, source: &str) -> Option<Param> {
    let annotation = field_text(node, "type", source);
    let mut cursor = node.walk();
    let target = node.named_children(&mut cursor).next()?;

    let mut param = match target.kind() {
        "list_splat_pattern" => splat(target, source, ParamKind::VarArgs),
        "dictionary_splat_pattern" => splat(target, source, ParamKind::VarKeyword),
        _ => Param::regular(text(target, source)),
    };
    param.annotation = annotation;
    Some(param)
}

fn splat(node: Node, source: &str, kind: ParamKind) -> Param {
    let name = text(node, source).trim_start_matches('*').trim();
    Param {
        name: name.to_string(),
        kind,
        annotation: None,
        default: None,
    }
}

fn visit_import(node: Node, source: &str, parsed: &mut ParsedModule) {
    let mut cursor = node.walk();
    let names: Vec<_> = node.children_by_field_name("name", &mut cursor).collect();

    for name in names {
        match name.kind() {
            // import a.b.c 绑定 a
            "dotted_name" => {
                let dotted = squash(text(name, source));
                let head = dotted.split('.').next().unwrap_or(&dotted).to_string();
                push_binding(parsed, &head, BindingTarget::Module(head.clone()));
            }
            // import a.b as x 绑定 x -> a.b
            "aliased_import" => {
                if let (Some(module), Some(alias)) = (
                    field_text(name, "name", source),
                    field_text(name, "alias", source),
                ) {
                    push_binding(parsed, &alias, BindingTarget::Module(module));
                }
            }
            _ => {}
        }
    }
}

fn visit_import_from(node: Node, source: &str, parsed: &mut ParsedModule) {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return;
    };

    let module = match module_node.kind() {
        "relative_import" => relative_module(module_node, source, &parsed.name, parsed.is_package),
        _ => squash(text(module_node, source)),
    };

    let mut cursor = node.walk();
    let wildcard = node
        .named_children(&mut cursor)
        .any(|c| c.kind() == "wildcard_import");
    if wildcard {
        push_binding(parsed, "*", BindingTarget::Star(module));
        return;
    }

    let mut cursor = node.walk();
    let names: Vec<_> = node.children_by_field_name("name", &mut cursor).collect();
    for name in names {
        let (imported, bound) = match name.kind() {
            "aliased_import" => match (
                field_text(name, "name", source),
                field_text(name, "alias", source),
            ) {
                (Some(imported), Some(alias)) => (imported, alias),
                _ => continue,
            },
            _ => {
                let imported = squash(text(name, source));
                (imported.clone(), imported)
            }
        };

        push_binding(
            parsed,
            &bound,
            BindingTarget::ImportFrom {
                module: module.clone(),
                name: imported,
            },
        );
    }
}

/// `from ..x import y` 相对于当前模块解析成绝对模块名
fn relative_module(node: Node, source: &str, current: &str, is_package: bool) -> String {
    let raw = squash(text(node, source));
    let dots = raw.chars().take_while(|c| *c == '.').count();
    let rest = raw[dots..].trim();
    resolve_relative(current, is_package, dots, rest)
}

#[doc(hidden)]
pub fn resolve_relative(current: &str, is_package: bool, dots: usize, rest: &str) -> String {
    let mut parts: Vec<&str> = current.split('.').collect();
    if !is_package {
        parts.pop();
    }
    for _ in 1..dots {
        parts.pop();
    }

    let base = parts.join(".");
    match (base.is_empty(), rest.is_empty()) {
        (_, true) => base,
        (true, false) => rest.to_string(),
        (false, false) => format!("{}.{}", base, rest),
    }
}

fn visit_assignment(node: Node, source: &str, parsed: &mut ParsedModule) {
    let Some(left) = node.child_by_field_name("left") else {
        return;
    };
    if left.kind() != "identifier" {
        return;
    }
    // 只有注解没有值: `x: int`
    let Some(right) = node.child_by_field_name("right") else {
        return;
    };

    let name = text(left, source).to_string();
    let target = match right.kind() {
        "identifier" | "attribute" => dotted_path(right, source)
            .map(BindingTarget::Alias)
            .unwrap_or(BindingTarget::Other),
        _ => BindingTarget::Other,
    };
    push_binding(parsed, &name, target);
}
