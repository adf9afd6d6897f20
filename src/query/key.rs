use std::{collections::BTreeMap, fmt::Display};

use crate::ArcStr;

/// A single parameter of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamValue {
    Int(i64),
    Str(ArcStr),
    Bool(bool),
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

impl From<ArcStr> for ParamValue {
    fn from(value: ArcStr) -> Self {
        Self::Str(value)
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Structural identifier of a requestable resource: a kind plus named
/// parameters.
///
/// Parameters live in a sorted map, so two keys built with the same
/// parameters in a different order are equal and hash the same. Absent
/// optional parameters are simply not inserted (see [`QueryKey::param_opt`]).
///
/// # Examples
/// ```ignore
/// let a = QueryKey::new("articles").param("page", 2u32).param("keyword", "rust");
/// let b = QueryKey::new("articles").param("keyword", "rust").param("page", 2u32);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    kind: ArcStr,
    params: BTreeMap<ArcStr, ParamValue>,
}

impl QueryKey {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn param<V: Into<ParamValue>>(mut self, name: &str, value: V) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds the parameter only when there is a value.
    pub fn param_opt<V: Into<ParamValue>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{{", self.kind)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_param_order_is_irrelevant() {
        let a = QueryKey::new("articles")
            .param("page", 2u32)
            .param("feed_id", 5i64)
            .param("keyword", "rust");
        let b = QueryKey::new("articles")
            .param("keyword", "rust")
            .param("page", 2u32)
            .param("feed_id", 5i64);
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_missing_optionals_are_omitted() {
        let with_none = QueryKey::new("articles")
            .param("page", 1u32)
            .param_opt::<&str>("keyword", None);
        let without = QueryKey::new("articles").param("page", 1u32);
        assert_eq!(with_none, without);
        assert_eq!(with_none.get("keyword"), None);
    }

    #[test]
    fn test_kind_and_values_distinguish() {
        let detail = QueryKey::new("articleDetail").param("id", 42i64);
        assert_ne!(detail, QueryKey::new("articleDetail").param("id", 43i64));
        assert_ne!(detail, QueryKey::new("article").param("id", 42i64));
        assert_ne!(
            QueryKey::new("x").param("v", 1i64),
            QueryKey::new("x").param("v", "1")
        );
    }

    #[test]
    fn test_display() {
        let key = QueryKey::new("articles").param("page", 2u32).param("keyword", "rust");
        assert_eq!(key.to_string(), r#"articles{keyword="rust", page=2}"#);
        assert_eq!(QueryKey::new("feeds").to_string(), "feeds{}");
    }
}
