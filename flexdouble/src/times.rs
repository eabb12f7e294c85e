// vim: tw=80
//! Call-count policies.

use std::ops::Range;

use crate::error::usage_panic;

/// Spell a call count the way diagnostics do: in words for 0, 1 and 2.
pub fn times_in_words(n: usize) -> String {
    match n {
        0 => "never".to_string(),
        1 => "once".to_string(),
        2 => "twice".to_string(),
        n => format!("{n} times"),
    }
}

/// A constraint on how many times an expectation may be called.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CountPolicy {
    Exact(usize),
    AtLeast(usize),
    AtMost(usize),
}

impl CountPolicy {
    /// Having been called `n` times, may the expectation accept another call?
    pub fn is_eligible(&self, n: usize) -> bool {
        match *self {
            CountPolicy::Exact(limit) | CountPolicy::AtMost(limit) => n < limit,
            CountPolicy::AtLeast(_) => true,
        }
    }

    /// Is a final count of `n` acceptable?
    pub fn is_satisfied(&self, n: usize) -> bool {
        match *self {
            CountPolicy::Exact(limit) => n == limit,
            CountPolicy::AtLeast(limit) => n >= limit,
            CountPolicy::AtMost(limit) => n <= limit,
        }
    }

    /// The declarator chain that creates this policy, e.g. `.at_least.once`
    pub fn describe(&self) -> String {
        let declarator = |n: usize| match n {
            0 => ".never".to_string(),
            1 => ".once".to_string(),
            2 => ".twice".to_string(),
            n => format!(".times({n})"),
        };
        match *self {
            CountPolicy::Exact(n) => declarator(n),
            CountPolicy::AtLeast(0) => ".zero_or_more_times".to_string(),
            CountPolicy::AtLeast(n) => format!(".at_least{}", declarator(n)),
            CountPolicy::AtMost(n) => format!(".at_most{}", declarator(n)),
        }
    }

    /// The limit in words, e.g. `at least twice`
    pub fn describe_limit(&self) -> String {
        match *self {
            CountPolicy::Exact(0) => "never".to_string(),
            CountPolicy::Exact(n) => format!("exactly {}", times_in_words(n)),
            CountPolicy::AtLeast(n) => format!("at least {}", times_in_words(n)),
            CountPolicy::AtMost(n) => format!("at most {}", times_in_words(n)),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Modifier {
    AtLeast,
    AtMost,
}

/// The count policies attached to one expectation, and its call count.
#[derive(Debug, Default)]
pub(crate) struct Times {
    /// How many times has the expectation already been called?
    count: usize,
    policies: Vec<CountPolicy>,
    /// Set by `at_least`/`at_most`; consumed by the next count declarator.
    pending: Option<Modifier>,
}

impl Times {
    pub fn call(&mut self) {
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn policies(&self) -> &[CountPolicy] {
        &self.policies
    }

    /// May the expectation accept another call?  With no policies attached it
    /// always may.
    pub fn is_eligible(&self) -> bool {
        self.policies.iter().all(|p| p.is_eligible(self.count))
    }

    /// Every attached policy that the current count violates
    pub fn violations(&self) -> impl Iterator<Item = CountPolicy> + '_ {
        self.policies.iter()
            .copied()
            .filter(|p| !p.is_satisfied(self.count))
    }

    pub fn at_least(&mut self) {
        self.modify(Modifier::AtLeast);
    }

    pub fn at_most(&mut self) {
        self.modify(Modifier::AtMost);
    }

    fn modify(&mut self, modifier: Modifier) {
        if let Some(pending) = self.pending {
            usage_panic(format!(
                "{modifier:?} declared while {pending:?} still awaits a count \
                 (use e.g. .at_least().once().at_most().times(3))"));
        }
        self.pending = Some(modifier);
    }

    /// Attach a policy for `n` calls, shaped by any pending modifier.
    pub fn n(&mut self, n: usize) {
        let policy = match self.pending.take() {
            None => CountPolicy::Exact(n),
            Some(Modifier::AtLeast) => CountPolicy::AtLeast(n),
            Some(Modifier::AtMost) => CountPolicy::AtMost(n),
        };
        self.policies.push(policy);
    }

    pub fn range(&mut self, range: Range<usize>) {
        if let Some(pending) = self.pending {
            usage_panic(format!("times_range can't follow {pending:?}"));
        }
        if range.is_empty() {
            usage_panic(format!("times_range({range:?}) admits no call count"));
        }
        self.policies.push(CountPolicy::AtLeast(range.start));
        self.policies.push(CountPolicy::AtMost(range.end - 1));
    }

    pub fn describe(&self) -> String {
        self.policies.iter().map(CountPolicy::describe).collect()
    }
}
