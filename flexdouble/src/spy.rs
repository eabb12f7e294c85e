// vim: tw=80
//! Read-only queries over a double's call log.

use std::{fmt, fmt::Write, sync::Arc};

use crate::{
    call_record::{CallRecord, format_patterns},
    double::Double,
    error::{Error, Result},
    matcher::ArgPattern,
    times::times_in_words,
    value::Value,
};

type Validator = Arc<dyn Fn(&[Value]) -> bool + Send + Sync>;

/// Options for a spy query.
///
/// # Examples
/// ```
/// # use flexdouble::*;
/// let d = Double::new("logger");
/// d.should_ignore_missing();
/// d.invoke("log", args!["starting"], false).unwrap();
/// d.invoke("log", args!["done"], false).unwrap();
///
/// assert!(d.received("log", None, &Received::new().twice()));
/// assert!(d.received("log", None, &Received::new()
///     .on_count(2)
///     .and(|args| args[0] == Value::from("done"))));
/// ```
#[derive(Clone, Default)]
pub struct Received {
    times: Option<usize>,
    with_block: Option<bool>,
    and: Vec<Validator>,
    on_count: Option<usize>,
}

impl Received {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require exactly `n` matching calls.  Without this, one is enough.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    pub fn never(self) -> Self {
        self.times(0)
    }

    pub fn once(self) -> Self {
        self.times(1)
    }

    pub fn twice(self) -> Self {
        self.times(2)
    }

    /// Only count calls that did, or did not, supply a block.
    pub fn with_block(mut self, with_block: bool) -> Self {
        self.with_block = Some(with_block);
        self
    }

    /// Validate the arguments of matching calls.  Every validator must accept
    /// every call it is applied to.
    pub fn and<F>(mut self, f: F) -> Self
        where F: Fn(&[Value]) -> bool + Send + Sync + 'static
    {
        self.and.push(Arc::new(f));
        self
    }

    /// Apply the validators to the `n`th matching call (counting from 1) only.
    pub fn on_count(mut self, n: usize) -> Self {
        self.on_count = Some(n);
        self
    }
}

impl fmt::Debug for Received {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Received")
            .field("times", &self.times)
            .field("with_block", &self.with_block)
            .field("and", &self.and.len())
            .field("on_count", &self.on_count)
            .finish()
    }
}

/// Count the calls matching a query, and check the validators against them.
fn tally(calls: &[CallRecord],
         method: &str,
         patterns: Option<&[ArgPattern]>,
         opts: &Received) -> (usize, bool)
{
    let mut count = 0;
    let mut valid = true;
    for call in calls {
        if !call.matches(method, patterns, opts.with_block) {
            continue;
        }
        count += 1;
        if opts.on_count.map_or(true, |n| n == count) {
            valid &= opts.and.iter().all(|f| f(call.args()));
        }
    }
    (count, valid)
}

fn describe_query(method: &str,
                  patterns: Option<&[ArgPattern]>,
                  opts: &Received) -> String
{
    let mut s = format_patterns(method, patterns);
    match opts.with_block {
        Some(true) => s.push_str(" with a block"),
        Some(false) => s.push_str(" without a block"),
        None => (),
    }
    s
}

fn describe_received(calls: &[CallRecord]) -> String {
    if calls.is_empty() {
        return "No messages have been received".to_string();
    }
    let mut out = "The following messages have been received:".to_string();
    for call in calls {
        let _ = write!(out, "\n    {call}");
    }
    out
}

impl Double {
    /// Was `method` called with arguments matching `patterns` (any arguments
    /// if `None`)?  Uses the same matching rules as call routing.
    pub fn received(&self,
                    method: &str,
                    patterns: Option<&[ArgPattern]>,
                    opts: &Received) -> bool
    {
        let (count, valid) = tally(&self.calls(), method, patterns, opts);
        let count_ok = match opts.times {
            Some(n) => count == n,
            None => count > 0,
        };
        count_ok && valid
    }

    /// Like [`received`](#method.received), but fail with a description of
    /// what was received instead.
    pub fn assert_received(&self,
                           method: &str,
                           patterns: Option<&[ArgPattern]>,
                           opts: &Received) -> Result<()>
    {
        if self.received(method, patterns, opts) {
            return Ok(());
        }
        let mut msg = format!("expected {} to be called on double '{}'",
                              describe_query(method, patterns, opts),
                              self.name());
        if let Some(n) = opts.times {
            let _ = write!(msg, " {}", times_in_words(n));
        }
        if !opts.and.is_empty() {
            msg.push_str(" with arguments passing the validation");
        }
        let _ = write!(msg, ".\n{}", describe_received(&self.calls()));
        Err(Error::NotReceived(msg))
    }

    /// Fail if `method` was called with arguments matching `patterns`.
    pub fn assert_not_received(&self,
                               method: &str,
                               patterns: Option<&[ArgPattern]>,
                               opts: &Received) -> Result<()>
    {
        let (count, _) = tally(&self.calls(), method, patterns, opts);
        if count == 0 {
            return Ok(());
        }
        Err(Error::NotReceived(format!(
            "expected {} not to be called on double '{}', but it was called {}.\n{}",
            describe_query(method, patterns, opts),
            self.name(),
            times_in_words(count),
            describe_received(&self.calls()))))
    }
}
