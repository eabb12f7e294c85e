// vim: tw=80
//! Per-method routing of calls to expectations.

use std::fmt::Write;

use crate::{
    error::CountViolation,
    expectation::Expectation,
    matcher::explain_mismatch,
    value::Value,
};

/// Owns every [`Expectation`] declared for one method name of one double, in
/// declaration order, and picks the one that handles each call.
pub(crate) struct ExpectationDirector {
    method: String,
    expectations: Vec<Expectation>,
}

impl ExpectationDirector {
    pub fn new(method: &str) -> Self {
        ExpectationDirector {
            method: method.to_string(),
            expectations: Vec::new(),
        }
    }

    /// Append a new expectation, returning its index.
    pub fn expect(&mut self) -> usize {
        self.expectations.push(Expectation::new(&self.method));
        self.expectations.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Expectation> {
        self.expectations.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Expectation> {
        self.expectations.get_mut(index)
    }

    /// Default expectations take part only while there is nothing else.
    fn active(&self) -> impl Iterator<Item = (usize, &Expectation)> + '_ {
        let has_explicit = self.expectations.iter().any(|e| !e.is_default());
        self.expectations.iter()
            .enumerate()
            .filter(move |(_, e)| e.is_default() != has_explicit)
    }

    /// Select the expectation that handles a call.
    ///
    /// The first matching expectation that can still accept calls wins.
    /// Failing that, the first matching expectation wins even though it is
    /// exhausted, so that verification can report the excess call against it.
    pub fn find(&self, args: &[Value], had_block: bool) -> Option<usize> {
        self.active()
            .find(|(_, e)| e.matches(args, had_block) && e.is_eligible())
            .or_else(|| self.active().find(|(_, e)| e.matches(args, had_block)))
            .map(|(i, _)| i)
    }

    /// List the active expectations for a "no matching handler" message.
    pub fn describe_candidates(&self, args: &[Value]) -> String {
        let mut out = String::new();
        for (_, e) in self.active() {
            let _ = write!(out, "\n    {}", e.describe());
            if let Some(why) = e.patterns()
                .and_then(|patterns| explain_mismatch(patterns, args))
            {
                let _ = write!(out, "\n      {}", why.replace('\n', "\n      "));
            }
        }
        if out.is_empty() {
            out
        } else {
            format!("\n  declared expectations:{out}")
        }
    }

    /// Count violations of every non-default expectation.
    pub fn violations(&self) -> Vec<CountViolation> {
        self.expectations.iter()
            .filter(|e| !e.is_default())
            .flat_map(Expectation::violations)
            .collect()
    }
}
