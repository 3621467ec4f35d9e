//! Predicate builder for store queries.

use std::cmp::Ordering;

use super::{Record, Value};

/// One comparison against a document field.
///
/// On list-valued fields `Eq` and `In` match when any element matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Eq(&'static str, Value),
    In(&'static str, Vec<Value>),
    Gt(&'static str, Value),
    Lt(&'static str, Value),
    /// Case-sensitive substring match on a text field.
    Contains(&'static str, String),
}

impl Clause {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Clause::Eq(field, value.into())
    }

    pub fn is_in<V: Into<Value>>(field: &'static str, values: impl IntoIterator<Item = V>) -> Self {
        Clause::In(field, values.into_iter().map(Into::into).collect())
    }

    pub fn gt(field: &'static str, value: impl Into<Value>) -> Self {
        Clause::Gt(field, value.into())
    }

    pub fn lt(field: &'static str, value: impl Into<Value>) -> Self {
        Clause::Lt(field, value.into())
    }

    pub fn contains(field: &'static str, needle: impl Into<String>) -> Self {
        Clause::Contains(field, needle.into())
    }

    pub fn field(&self) -> &'static str {
        match self {
            Clause::Eq(field, _)
            | Clause::In(field, _)
            | Clause::Gt(field, _)
            | Clause::Lt(field, _)
            | Clause::Contains(field, _) => field,
        }
    }

    /// Evaluates the clause against a record.
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        let actual = record.field(self.field()).unwrap_or(Value::Null);
        match self {
            Clause::Eq(_, expected) => any_scalar(&actual, |v| v == expected),
            Clause::In(_, set) => any_scalar(&actual, |v| set.contains(v)),
            Clause::Gt(_, bound) => any_scalar(&actual, |v| {
                !matches!(v, Value::Null) && v.compare(bound) == Some(Ordering::Greater)
            }),
            Clause::Lt(_, bound) => any_scalar(&actual, |v| {
                !matches!(v, Value::Null) && v.compare(bound) == Some(Ordering::Less)
            }),
            Clause::Contains(_, needle) => any_scalar(&actual, |v| {
                matches!(v, Value::Text(text) if text.contains(needle.as_str()))
            }),
        }
    }
}

fn any_scalar(value: &Value, mut predicate: impl FnMut(&Value) -> bool) -> bool {
    match value {
        Value::List(items) => items.iter().any(predicate),
        scalar => predicate(scalar),
    }
}

/// Conjunction of clauses. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// The always-true filter.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Conjoins `clause` only when present.
    pub fn and_opt(self, clause: Option<Clause>) -> Self {
        match clause {
            Some(clause) => self.and(clause),
            None => self,
        }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn matches<R: Record>(&self, record: &R) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::store::fields;

    #[test]
    fn test_empty_filter_matches_everything() {
        let issue = fixtures::issue(1, fixtures::at(0));
        assert!(Filter::all().matches(&issue));
    }

    #[test]
    fn test_and_opt_skips_absent_clauses() {
        let filter = Filter::all()
            .and(Clause::eq(fields::CLOSED, false))
            .and_opt(None)
            .and_opt(Some(Clause::gt(fields::NUMBER, 3i64)));
        assert_eq!(filter.clauses().len(), 2);

        assert!(filter.matches(&fixtures::issue(4, fixtures::at(0))));
        assert!(!filter.matches(&fixtures::issue(3, fixtures::at(0))));
    }

    #[test]
    fn test_in_matches_any_list_element() {
        let mut issue = fixtures::issue(1, fixtures::at(0));
        let label = crate::store::RecordId::generate();
        issue.labels = vec![crate::store::RecordId::generate(), label.clone()];

        assert!(Clause::is_in(fields::LABELS, [label]).matches(&issue));
        assert!(!Clause::is_in(fields::LABELS, Vec::<Value>::new()).matches(&issue));
    }

    #[test]
    fn test_comparisons_skip_missing_values() {
        let issue = fixtures::issue(1, fixtures::at(0));
        assert!(!Clause::gt(fields::MILESTONE, Value::Null).matches(&issue));
        assert!(Clause::eq(fields::MILESTONE, Value::Null).matches(&issue));
    }

    #[test]
    fn test_contains_on_body() {
        let mut issue = fixtures::issue(1, fixtures::at(0));
        issue.body = Some("ping @octocat please".into());
        assert!(Clause::contains(fields::BODY, "@octocat").matches(&issue));
        assert!(!Clause::contains(fields::BODY, "@hubot").matches(&issue));
    }
}
