// vim: tw=80
//! The call log.

use std::fmt::Write;

use crate::{
    matcher::{ArgPattern, all_match},
    value::Value,
};

/// Format a call as `name(arg, ...)`.
pub fn format_call(method: &str, args: &[Value]) -> String {
    let args = args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    format!("{method}({})", args.join(", "))
}

/// Format a declared argument list as `name(pattern, ...)`, or `name(...)` if
/// the arguments are unconstrained.
pub fn format_patterns(method: &str, patterns: Option<&[ArgPattern]>) -> String
{
    match patterns {
        None => format!("{method}(...)"),
        Some(patterns) => {
            let patterns = patterns.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            format!("{method}({})", patterns.join(", "))
        }
    }
}

/// One observed invocation of a double.
#[derive(Clone, Debug)]
pub struct CallRecord {
    method: String,
    args: Vec<Value>,
    had_block: bool,
    matched_by: Option<String>,
}

impl CallRecord {
    pub(crate) fn new(method: &str, args: Vec<Value>, had_block: bool) -> Self {
        CallRecord {
            method: method.to_string(),
            args,
            had_block,
            matched_by: None,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn had_block(&self) -> bool {
        self.had_block
    }

    /// Description of the expectation that handled this call, if any.
    pub fn matched_by(&self) -> Option<&str> {
        self.matched_by.as_deref()
    }

    /// Set once, when the call is dispatched.
    pub(crate) fn set_matched_by(&mut self, description: String) {
        debug_assert!(self.matched_by.is_none());
        self.matched_by = Some(description);
    }

    /// Does this record match a spy query?
    pub fn matches(&self,
                   method: &str,
                   patterns: Option<&[ArgPattern]>,
                   with_block: Option<bool>) -> bool
    {
        self.method == method &&
            all_match(patterns, &self.args) &&
            with_block.map_or(true, |b| b == self.had_block)
    }
}

impl std::fmt::Display for CallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&format_call(&self.method, &self.args))?;
        if self.had_block {
            f.write_str(" with a block")?;
        }
        Ok(())
    }
}

/// Replay a call log for diagnostics, annotating each call with the
/// expectation that handled it.
pub(crate) fn describe_calls(double: &str, calls: &[CallRecord]) -> String {
    if calls.is_empty() {
        return format!("No messages have been received by double '{double}'\n");
    }
    let mut out =
        format!("The following messages have been received by double '{double}':\n");
    for call in calls {
        let _ = write!(out, "    {call}");
        if let Some(exp) = call.matched_by() {
            let _ = write!(out, " matched by {exp}");
        }
        out.push('\n');
    }
    out
}
