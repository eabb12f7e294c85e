// vim: tw=80
//! Argument patterns and the rules for matching them against actual calls.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    sync::Arc,
};

use predicates::prelude::{Predicate, predicate};
use predicates_tree::CaseTreeExt;

use crate::{
    error::{Error, Result},
    value::{Value, ValueKind},
};

/// A declared pattern for one argument position.
///
/// Patterns are stateless: evaluating one never changes it, so matching the
/// same value twice always gives the same answer.
#[derive(Clone)]
pub enum ArgPattern {
    /// Matches anything
    Any,
    /// Matches values equal to this one
    Eq(Value),
    /// Matches values of one type
    Kind(ValueKind),
    /// Matches values that respond to every listed method
    Duck(Vec<String>),
    /// Matches values whose string form matches a regular expression
    Regex {
        source: String,
        pred: Arc<dyn Predicate<str> + Send + Sync>,
    },
    /// Matches maps containing at least these entries
    Fields(BTreeMap<String, Value>),
    /// Matches values accepted by an arbitrary predicate
    Pred {
        label: String,
        pred: Arc<dyn Predicate<Value> + Send + Sync>,
    },
    /// Matches a callable value, or a position the caller left out
    OptionalProc,
}

impl ArgPattern {
    /// Does `actual` satisfy this pattern?
    pub fn matches(&self, actual: &Value) -> bool {
        match self {
            ArgPattern::Any => true,
            ArgPattern::Eq(v) => v == actual,
            ArgPattern::Kind(k) => actual.kind() == *k,
            ArgPattern::Duck(methods) =>
                methods.iter().all(|m| actual.responds_to(m)),
            ArgPattern::Regex{pred, ..} => pred.eval(actual.to_s().as_str()),
            ArgPattern::Fields(fields) => match actual {
                Value::Map(map) => fields.iter()
                    .all(|(k, v)| map.get(k) == Some(v)),
                _ => false,
            },
            ArgPattern::Pred{pred, ..} => pred.eval(actual),
            ArgPattern::OptionalProc => matches!(actual, Value::Proc(_)),
        }
    }

    /// Does this pattern accept a trailing position the caller omitted?
    ///
    /// Only the optional-callback pattern does.  Every other pattern,
    /// including [`any`], requires the position to be present.
    pub fn matches_missing(&self) -> bool {
        matches!(self, ArgPattern::OptionalProc)
    }

    /// Explain why `actual` fails this pattern, for predicate-backed patterns.
    pub fn explain(&self, actual: &Value) -> Option<String> {
        match self {
            ArgPattern::Pred{pred, ..} => pred.find_case(false, actual)
                .map(|case| case.tree().to_string()),
            ArgPattern::Regex{pred, ..} => {
                let s = actual.to_s();
                pred.find_case(false, s.as_str())
                    .map(|case| case.tree().to_string())
            },
            _ => None,
        }
    }
}

impl Display for ArgPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArgPattern::Any => f.write_str("ANY"),
            ArgPattern::Eq(v) => write!(f, "{v}"),
            ArgPattern::Kind(k) => write!(f, "{k}"),
            ArgPattern::Duck(methods) => {
                let names = methods.iter()
                    .map(|m| format!(":{m}"))
                    .collect::<Vec<_>>();
                write!(f, "ducktype({})", names.join(", "))
            },
            ArgPattern::Regex{source, ..} => write!(f, "/{source}/"),
            ArgPattern::Fields(fields) =>
                write!(f, "hsh({})", Value::Map(fields.clone())),
            ArgPattern::Pred{label, ..} => f.write_str(label),
            ArgPattern::OptionalProc => f.write_str("optional_proc"),
        }
    }
}

impl fmt::Debug for ArgPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Match anything.
pub fn any() -> ArgPattern {
    ArgPattern::Any
}

/// Match values equal to `v`.
pub fn eq(v: impl Into<Value>) -> ArgPattern {
    ArgPattern::Eq(v.into())
}

/// Match values of the given type.
pub fn kind(k: ValueKind) -> ArgPattern {
    ArgPattern::Kind(k)
}

/// Match values that respond to all of `methods`.
pub fn ducktype<I, S>(methods: I) -> ArgPattern
    where I: IntoIterator<Item = S>, S: Into<String>
{
    ArgPattern::Duck(methods.into_iter().map(Into::into).collect())
}

/// Match values whose string form matches the regular expression `re`.
///
/// An invalid expression is a usage error.
pub fn matching(re: &str) -> Result<ArgPattern> {
    let pred = predicate::str::is_match(re)
        .map_err(|e| Error::usage(format!("invalid pattern /{re}/: {e}")))?;
    Ok(ArgPattern::Regex {
        source: re.to_string(),
        pred: Arc::new(pred),
    })
}

/// Match maps that contain every entry of `fields`; extra keys are ignored.
pub fn hsh<I, K, V>(fields: I) -> ArgPattern
    where I: IntoIterator<Item = (K, V)>, K: Into<String>, V: Into<Value>
{
    ArgPattern::Fields(fields.into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect())
}

/// Match values for which `f` returns true.
pub fn on<F>(f: F) -> ArgPattern
    where F: Fn(&Value) -> bool + Send + Sync + 'static
{
    ArgPattern::Pred {
        label: "on{...}".to_string(),
        pred: Arc::new(predicate::function(f)),
    }
}

/// Match values accepted by any [`Predicate`].
///
/// # Examples
/// ```
/// # use flexdouble::*;
/// let p = pred(predicate::in_iter(vec![Value::from(1), Value::from(2)]));
/// assert!(p.matches(&Value::from(2)));
/// assert!(!p.matches(&Value::from(3)));
/// ```
pub fn pred<P>(p: P) -> ArgPattern
    where P: Predicate<Value> + Send + Sync + 'static
{
    ArgPattern::Pred {
        label: p.to_string(),
        pred: Arc::new(p),
    }
}

/// Match a callable value in this position, or no value at all.
pub fn optional_proc() -> ArgPattern {
    ArgPattern::OptionalProc
}

/// Conversion into an [`ArgPattern`].  Plain values become equality patterns.
/// Used by [`params!`](crate::params).
pub trait IntoPattern {
    fn into_pattern(self) -> ArgPattern;
}

impl IntoPattern for ArgPattern {
    fn into_pattern(self) -> ArgPattern {
        self
    }
}

macro_rules! into_eq_pattern {
    ($($t:ty)*) => {
        $(
            impl IntoPattern for $t {
                fn into_pattern(self) -> ArgPattern {
                    ArgPattern::Eq(Value::from(self))
                }
            }
        )*
    }
}

into_eq_pattern!{
    Value bool i8 i16 i32 i64 u8 u16 u32 u64 usize isize f32 f64 String &str
}

/// Build a list of argument patterns.  Plain values are matched by equality.
///
/// # Examples
/// ```
/// # use flexdouble::*;
/// let d = Double::new("calc");
/// d.should_receive("add").unwrap()
///     .with(params![1, any()])
///     .and_return(3);
/// assert_eq!(Value::from(3), d.invoke("add", args![1, 2], false).unwrap());
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::ArgPattern>::new()
    };
    ($($p:expr),+ $(,)?) => {
        vec![$( $crate::IntoPattern::into_pattern($p) ),+]
    };
}

/// Build an argument list for [`Double::invoke`](crate::Double::invoke).
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($a:expr),+ $(,)?) => {
        vec![$( $crate::Value::from($a) ),+]
    };
}

/// Does the whole argument list match?  `None` means "any arguments".
///
/// The caller may omit trailing positions, provided every omitted position's
/// pattern accepts a missing argument.
pub fn all_match(expected: Option<&[ArgPattern]>, actual: &[Value]) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    if actual.len() > expected.len() {
        return false;
    }
    let (present, missing) = expected.split_at(actual.len());
    present.iter().zip(actual).all(|(p, a)| p.matches(a)) &&
        missing.iter().all(ArgPattern::matches_missing)
}

/// Explain, position by position, why `actual` fails `expected`.
pub(crate) fn explain_mismatch(expected: &[ArgPattern], actual: &[Value])
    -> Option<String>
{
    expected.iter()
        .zip(actual)
        .enumerate()
        .find_map(|(i, (p, a))| p.explain(a)
            .map(|tree| format!("argument {i}: {tree}")))
}

/// Whether a call must, must not, or may carry a block.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BlockRequirement {
    Required,
    Forbidden,
    #[default]
    Irrelevant,
}

impl BlockRequirement {
    pub fn admits(self, had_block: bool) -> bool {
        match self {
            BlockRequirement::Required => had_block,
            BlockRequirement::Forbidden => !had_block,
            BlockRequirement::Irrelevant => true,
        }
    }

    pub(crate) fn describe(self) -> &'static str {
        match self {
            BlockRequirement::Required => " with a block",
            BlockRequirement::Forbidden => " without a block",
            BlockRequirement::Irrelevant => "",
        }
    }
}

impl From<Option<bool>> for BlockRequirement {
    fn from(with_block: Option<bool>) -> Self {
        match with_block {
            Some(true) => BlockRequirement::Required,
            Some(false) => BlockRequirement::Forbidden,
            None => BlockRequirement::Irrelevant,
        }
    }
}
