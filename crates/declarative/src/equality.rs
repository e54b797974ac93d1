//! Structural dirty check between a current projection and a desired definition
//!
//! Values are lowered into a small closed set of [`Shape`]s and compared by
//! one recursive visitor:
//! - lists compare element-wise by position (order matters)
//! - maps compare by key, skipping [`MANAGED_MARKER_KEY`]
//! - records compare field by field; they simply never include the
//!   ownership marker, so the marker is excluded statically
//! - anything else compares by value, and a kind mismatch (including
//!   null vs present) is a change

use crate::policy::MANAGED_MARKER_KEY;
use std::collections::BTreeMap;
use std::fmt;

/// Structural view of a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<Shape>),
    Map(BTreeMap<String, Shape>),
    Record(BTreeMap<&'static str, Shape>),
}

impl Shape {
    /// Build a record from `(field, value)` pairs
    pub fn record<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Shape)>,
    {
        Self::Record(fields.into_iter().collect())
    }

    /// Build a keyed map from string pairs
    pub fn text_map<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.clone(), Shape::Text(v.clone())))
                .collect(),
        )
    }

    /// Build an ordered list from anything shaped
    pub fn list<'a, T, I>(items: I) -> Self
    where
        T: Shaped + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        Self::List(items.into_iter().map(Shaped::shape).collect())
    }
}

impl From<bool> for Shape {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Shape {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Shape {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Shape {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for Shape {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl<T: Into<Shape>> From<Option<T>> for Shape {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str("}")
            }
            Self::Record(fields) => {
                f.write_str("{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Types that can be lowered into a [`Shape`] for comparison.
pub trait Shaped {
    fn shape(&self) -> Shape;
}

impl Shaped for Shape {
    fn shape(&self) -> Shape {
        self.clone()
    }
}

/// One field that differs between current and desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Dotted path to the field, with `[i]` for list positions
    pub path: String,
    pub from: Shape,
    pub to: Shape,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() {
            "value"
        } else {
            &self.path
        };
        write!(f, "{} changed from {} to {}", path, self.from, self.to)
    }
}

/// List every difference between `current` and `desired`
pub fn compare<A, B>(current: &A, desired: &B) -> Vec<Change>
where
    A: Shaped + ?Sized,
    B: Shaped + ?Sized,
{
    let mut changes = Vec::new();
    walk(String::new(), &current.shape(), &desired.shape(), &mut changes);
    changes
}

/// Whether `current` already matches `desired`
pub fn is_unchanged<A, B>(current: &A, desired: &B) -> bool
where
    A: Shaped + ?Sized,
    B: Shaped + ?Sized,
{
    compare(current, desired).is_empty()
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

fn walk(path: String, current: &Shape, desired: &Shape, out: &mut Vec<Change>) {
    match (current, desired) {
        (Shape::List(a), Shape::List(b)) => {
            for i in 0..a.len().max(b.len()) {
                let at = format!("{path}[{i}]");
                match (a.get(i), b.get(i)) {
                    (Some(x), Some(y)) => walk(at, x, y, out),
                    (x, y) => push(at, x, y, out),
                }
            }
        }
        (Shape::Map(a), Shape::Map(b)) => {
            let keys = a
                .keys()
                .chain(b.keys())
                .filter(|k| k.as_str() != MANAGED_MARKER_KEY)
                .collect::<std::collections::BTreeSet<_>>();
            for key in keys {
                let at = join(&path, key);
                match (a.get(key), b.get(key)) {
                    (Some(x), Some(y)) => walk(at, x, y, out),
                    (x, y) => push(at, x, y, out),
                }
            }
        }
        (Shape::Record(a), Shape::Record(b)) => {
            let fields = a
                .keys()
                .chain(b.keys())
                .collect::<std::collections::BTreeSet<_>>();
            for field in fields {
                let at = join(&path, field);
                match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => walk(at, x, y, out),
                    (x, y) => push(at, x, y, out),
                }
            }
        }
        (a, b) => {
            if a != b {
                out.push(Change {
                    path,
                    from: a.clone(),
                    to: b.clone(),
                });
            }
        }
    }
}

fn push(path: String, current: Option<&Shape>, desired: Option<&Shape>, out: &mut Vec<Change>) {
    let from = current.cloned().unwrap_or(Shape::Null);
    let to = desired.cloned().unwrap_or(Shape::Null);
    if from != to {
        out.push(Change { path, from, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> Shape {
        Shape::Map(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), Shape::from(*v)))
                .collect(),
        )
    }

    #[test]
    fn test_identical_records_are_unchanged() {
        let a = Shape::record([("alias", "login".into()), ("top_level", true.into())]);
        assert!(is_unchanged(&a, &a.clone()));
    }

    #[test]
    fn test_list_order_matters() {
        let a = Shape::List(vec!["x".into(), "y".into()]);
        let b = Shape::List(vec!["y".into(), "x".into()]);
        let changes = compare(&a, &b);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].path, "[0]");
    }

    #[test]
    fn test_list_length_mismatch_reports_null() {
        let a = Shape::List(vec!["x".into()]);
        let b = Shape::List(vec!["x".into(), "y".into()]);
        let changes = compare(&a, &b);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].from, Shape::Null);
    }

    #[test]
    fn test_map_key_order_is_irrelevant_and_symmetric() {
        let a = map(&[("otp.digits", "6"), ("otp.period", "30")]);
        let b = map(&[("otp.period", "30"), ("otp.digits", "6")]);
        assert!(is_unchanged(&a, &b));
        assert!(is_unchanged(&b, &a));

        let c = map(&[("otp.period", "60"), ("otp.digits", "6")]);
        assert_eq!(is_unchanged(&a, &c), is_unchanged(&c, &a));
        assert!(!is_unchanged(&a, &c));
    }

    #[test]
    fn test_marker_key_is_ignored() {
        let a = map(&[("x", "1"), (MANAGED_MARKER_KEY, "true")]);
        let b = map(&[("x", "1")]);
        assert!(is_unchanged(&a, &b));
        assert!(is_unchanged(&b, &a));
    }

    #[test]
    fn test_kind_mismatch_is_a_change() {
        assert!(!is_unchanged(&Shape::from("true"), &Shape::from(true)));
        assert!(!is_unchanged(&Shape::Null, &Shape::from("")));
        assert!(!is_unchanged(&Shape::List(vec![]), &Shape::Map(BTreeMap::new())));
    }

    #[test]
    fn test_nested_change_path_and_message() {
        let current = Shape::record([(
            "steps",
            Shape::List(vec![Shape::record([("requirement", "ALTERNATIVE".into())])]),
        )]);
        let desired = Shape::record([(
            "steps",
            Shape::List(vec![Shape::record([("requirement", "REQUIRED".into())])]),
        )]);
        let changes = compare(&current, &desired);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].to_string(),
            "steps[0].requirement changed from \"ALTERNATIVE\" to \"REQUIRED\""
        );
    }
}
