use serde::{Deserialize, Serialize};
use std::fmt;

/// 类的身份: (定义模块, 类名)，同时用作集合键和图中的标签
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId {
    pub module: String,
    pub name: String,
}

impl ClassId {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// 内置类 (builtins.object, builtins.Exception ...)
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::new("builtins", name)
    }

    /// 从 "a.b.C" 拆出 ("a.b", "C")；没有点号时视为内置
    pub fn from_dotted(path: &str) -> Self {
        match path.rsplit_once('.') {
            Some((module, name)) => Self::new(module, name),
            None => Self::builtin(path),
        }
    }

    /// 模块是否等于 prefix 或位于 prefix 之下
    pub fn is_within(&self, prefix: &str) -> bool {
        self.module == prefix
            || self
                .module
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// 成员类型 - 由装饰器决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Function,
    StaticMethod,
    ClassMethod,
    Property,
}

impl MemberKind {
    /// 从类上读取时仍是普通函数 (classmethod 会绑定，property 是描述符)
    pub fn is_function(self) -> bool {
        matches!(self, MemberKind::Function | MemberKind::StaticMethod)
    }
}

/// 类成员
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub signature: Signature,
}

impl Member {
    /// 单下划线开头但不是双下划线 - protected
    pub fn is_protected(&self) -> bool {
        self.name.starts_with('_') && !self.name.starts_with("__")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// x, x: int, x=1
    Regular,
    /// *args
    VarArgs,
    /// **kwargs
    VarKeyword,
    /// 单独的 `/`
    PositionalSeparator,
    /// 单独的 `*`
    KeywordSeparator,
}

/// 参数 - 保留声明时的注解和默认值原文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub annotation: Option<String>,
    pub default: Option<String>,
}

impl Param {
    pub fn regular(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Regular,
            annotation: None,
            default: None,
        }
    }

    pub fn separator(kind: ParamKind) -> Self {
        let name = match kind {
            ParamKind::PositionalSeparator => "/",
            _ => "*",
        };
        Self {
            name: name.to_string(),
            kind,
            annotation: None,
            default: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParamKind::PositionalSeparator | ParamKind::KeywordSeparator => {
                return f.write_str(&self.name);
            }
            ParamKind::VarArgs => write!(f, "*{}", self.name)?,
            ParamKind::VarKeyword => write!(f, "**{}", self.name)?,
            ParamKind::Regular => f.write_str(&self.name)?,
        }

        if let Some(annotation) = &self.annotation {
            write!(f, ": {}", annotation)?;
        }

        match (&self.default, &self.annotation) {
            (Some(default), Some(_)) => write!(f, " = {}", default),
            (Some(default), None) => write!(f, "={}", default),
            (None, _) => Ok(()),
        }
    }
}

/// 函数签名
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<Param>,
    pub returns: Option<String>,
}

impl Signature {
    pub fn new(params: Vec<Param>) -> Self {
        Self {
            params,
            returns: None,
        }
    }

    pub fn with_returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = Some(returns.into());
        self
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        f.write_str(")")?;
        if let Some(returns) = &self.returns {
            write!(f, " -> {}", returns)?;
        }
        Ok(())
    }
}
