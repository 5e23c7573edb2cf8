// used to print out readable forms of a fact
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FixpointError, Result};

// ------------- Fact -------------
/// A fact is an index into the universe of possible facts. Encoded tuples
/// are produced by a [`TupleCodec`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fact(u64);

impl Fact {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
    pub const fn id(self) -> u64 {
        self.0
    }
}
impl From<u64> for Fact {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
impl From<u32> for Fact {
    fn from(id: u32) -> Self {
        Self(u64::from(id))
    }
}
impl TryFrom<i64> for Fact {
    type Error = FixpointError;
    fn try_from(id: i64) -> Result<Self> {
        u64::try_from(id)
            .map(Self)
            .map_err(|_| FixpointError::InvalidIndex(id))
    }
}
impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ------------- Tuple -------------
/// A decoded fact: a predicate together with its arguments.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tuple {
    pub predicate: u64,
    pub args: Vec<u64>,
}

// ------------- TupleCodec -------------
/// Mixed-radix encoding of `(predicate, arg_1, ..., arg_k)` into a single
/// fact. The predicate is the most significant digit, so all facts of one
/// predicate form a contiguous range.
#[derive(Clone, Debug)]
pub struct TupleCodec {
    predicates: u64,
    arity: usize,
    domain: u64,
    span: u64, // domain^arity, the number of facts per predicate
}

impl TupleCodec {
    pub fn new(predicates: u64, arity: usize, domain: u64) -> Result<Self> {
        if predicates == 0 || domain == 0 {
            return Err(FixpointError::Codec(String::from(
                "predicate count and domain must be positive",
            )));
        }
        let span = u32::try_from(arity)
            .ok()
            .and_then(|a| domain.checked_pow(a))
            .ok_or_else(|| FixpointError::Codec(format!("{domain}^{arity} overflows a fact")))?;
        if span.checked_mul(predicates).is_none() {
            return Err(FixpointError::Codec(format!(
                "{predicates} predicates of {domain}^{arity} tuples overflow a fact"
            )));
        }
        Ok(Self { predicates, arity, domain, span })
    }
    pub fn encode(&self, predicate: u64, args: &[u64]) -> Result<Fact> {
        if predicate >= self.predicates {
            return Err(FixpointError::Codec(format!(
                "predicate {predicate} out of range (< {})",
                self.predicates
            )));
        }
        if args.len() != self.arity {
            return Err(FixpointError::Codec(format!(
                "expected {} arguments, got {}",
                self.arity,
                args.len()
            )));
        }
        let mut id = 0u64;
        for &arg in args {
            if arg >= self.domain {
                return Err(FixpointError::Codec(format!(
                    "argument {arg} out of domain (< {})",
                    self.domain
                )));
            }
            id = id * self.domain + arg;
        }
        Ok(Fact(predicate * self.span + id))
    }
    pub fn predicate(&self, fact: Fact) -> u64 {
        fact.0 / self.span
    }
    pub fn decode(&self, fact: Fact) -> Result<Tuple> {
        let predicate = self.predicate(fact);
        if predicate >= self.predicates {
            return Err(FixpointError::Codec(format!("fact {fact} is outside the codec range")));
        }
        let mut rest = fact.0 % self.span;
        let mut args = vec![0; self.arity];
        for slot in args.iter_mut().rev() {
            *slot = rest % self.domain;
            rest /= self.domain;
        }
        Ok(Tuple { predicate, args })
    }
}
