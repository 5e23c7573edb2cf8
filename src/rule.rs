use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::fact::Fact;

// ------------- Rule -------------
/// One derivation step of the fixed point.
///
/// `apply` receives a fact taken off a work queue and pushes every candidate
/// fact derivable from it onto `out`. Candidates may already be known; the
/// pool filters them through the seen-set. The result must depend on the
/// fact alone (and on data captured by the rule when it was built), which is
/// what makes the fixed point independent of the order facts are processed in.
pub trait Rule: Send + Sync {
    fn apply(&self, fact: Fact, out: &mut Vec<Fact>) -> Result<()>;
}

impl<F> Rule for F
where
    F: Fn(Fact, &mut Vec<Fact>) -> Result<()> + Send + Sync,
{
    fn apply(&self, fact: Fact, out: &mut Vec<Fact>) -> Result<()> {
        self(fact, out)
    }
}

// ------------- Stratum -------------
/// A group of rules evaluated together until no new fact appears.
#[derive(Clone)]
pub struct Stratum {
    name: String,
    rules: Vec<Arc<dyn Rule>>,
}

impl Stratum {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }
    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }
    /// Adds a closure as a rule. Unlike [`rule`](Self::rule), the closure's
    /// argument and return types are inferred here.
    pub fn rule_fn<F>(self, f: F) -> Self
    where
        F: Fn(Fact, &mut Vec<Fact>) -> Result<()> + Send + Sync + 'static,
    {
        self.rule(f)
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn len(&self) -> usize {
        self.rules.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
    pub(crate) fn apply(&self, fact: Fact, out: &mut Vec<Fact>) -> Result<()> {
        for rule in &self.rules {
            rule.apply(fact, out)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Stratum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Stratum")
            .field("name", &self.name)
            .field("rules", &self.rules.len())
            .finish()
    }
}

// ------------- Program -------------
/// Seed facts plus an ordered list of strata. Each stratum after the first
/// starts from every fact known when the previous one reached quiescence.
#[derive(Clone, Debug, Default)]
pub struct Program {
    seeds: Vec<Fact>,
    strata: Vec<Stratum>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn seed(mut self, fact: impl Into<Fact>) -> Self {
        self.seeds.push(fact.into());
        self
    }
    pub fn seeds<I>(mut self, facts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Fact>,
    {
        self.seeds.extend(facts.into_iter().map(Into::into));
        self
    }
    pub fn stratum(mut self, stratum: Stratum) -> Self {
        self.strata.push(stratum);
        self
    }
    /// Single-stratum program built from one rule.
    pub fn single<R: Rule + 'static>(rule: R) -> Self {
        Self::new().stratum(Stratum::new("main").rule(rule))
    }
    pub fn single_fn<F>(f: F) -> Self
    where
        F: Fn(Fact, &mut Vec<Fact>) -> Result<()> + Send + Sync + 'static,
    {
        Self::single(f)
    }
    pub fn initial_facts(&self) -> &[Fact] {
        &self.seeds
    }
    pub fn strata(&self) -> &[Stratum] {
        &self.strata
    }
}
