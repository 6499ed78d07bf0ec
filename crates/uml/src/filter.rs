use reflect::ClassId;

/// 常用的类过滤规则
///
/// 组合成 `Diagram::with_filter` 可用的谓词: 返回 true 表示排除。
#[derive(Debug, Clone, Default)]
pub struct ClassFilter {
    internal_root: Option<String>,
    excluded: Vec<String>,
}

impl ClassFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只保留定义在 root 包内的类 (排除 builtins 和第三方基类)
    pub fn internal_only(mut self, root: &str) -> Self {
        self.internal_root = Some(root.to_string());
        self
    }

    /// 排除模块路径或完整类名落在 prefix 下的类
    pub fn exclude(mut self, prefix: &str) -> Self {
        self.excluded.push(prefix.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.internal_root.is_none() && self.excluded.is_empty()
    }

    pub fn excludes(&self, class: &ClassId) -> bool {
        if let Some(root) = &self.internal_root {
            if !class.is_within(root) {
                return true;
            }
        }

        let full = class.to_string();
        self.excluded
            .iter()
            .any(|prefix| class.is_within(prefix) || under(&full, prefix))
    }

    pub fn into_predicate(self) -> impl Fn(&ClassId) -> bool + 'static {
        move |class| self.excludes(class)
    }
}

fn under(name: &str, prefix: &str) -> bool {
    name == prefix
        || name
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}
