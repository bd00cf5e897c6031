use std::fmt;

/// 查询键：资源名加过滤条件的有序分段
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// 追加一个过滤条件，形如 `name=value`
    pub fn with_filter(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.0.push(format!("{}={}", name, value));
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// 按分段判断前缀，`courses` 不会匹配 `courses-archive`
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.len() >= prefix.0.len() && self.0.iter().zip(&prefix.0).all(|(a, b)| a == b)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

impl From<&str> for QueryKey {
    fn from(resource: &str) -> Self {
        QueryKey::new([resource])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matches_by_segment() {
        let key = QueryKey::from("courses").with_filter("teacher", 7);
        assert!(key.starts_with(&QueryKey::from("courses")));
        assert!(!QueryKey::from("courses-archive").starts_with(&QueryKey::from("courses")));
        assert!(!QueryKey::from("courses").starts_with(&key));
        assert_eq!(key.to_string(), "courses:teacher=7");
    }
}
