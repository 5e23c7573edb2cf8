//! Ready-made programs, used by the binary and handy in tests.

use core::hash::BuildHasherDefault;
use std::collections::HashMap;
use std::sync::Arc;

use seahash::SeaHasher;

use crate::error::Result;
use crate::fact::{Fact, TupleCodec};
use crate::rule::{Program, Stratum};

pub type NodeHasher = BuildHasherDefault<SeaHasher>;

// ------------- Successor -------------
/// Seeds plus the rule "if x is known, derive x + 1 while x + 1 < bound".
pub fn successor(seeds: &[u64], bound: u64) -> Program {
    Program::new()
        .seeds(seeds.iter().copied())
        .stratum(Stratum::new("successor").rule_fn(move |fact, out| {
            let next = fact.id().saturating_add(1);
            if next < bound {
                out.push(Fact::new(next));
            }
            Ok(())
        }))
}

// ------------- Closure -------------
pub const EDGE: u64 = 0;
pub const REACHES: u64 = 1;

/// Transitive closure of a directed graph:
///
/// ```text
/// Reaches(x, y) :- Edge(x, y).
/// Reaches(x, z) :- Reaches(x, y), Edge(y, z).
/// ```
///
/// Edges are the seed facts; the adjacency is captured by the second rule.
#[derive(Clone, Debug)]
pub struct Closure {
    codec: TupleCodec,
    program: Program,
}

impl Closure {
    pub fn new(edges: &[(u64, u64)]) -> Result<Self> {
        let domain = edges.iter().map(|&(from, to)| from.max(to)).max().unwrap_or(0).saturating_add(1);
        let codec = TupleCodec::new(2, 2, domain)?;

        let mut successors: HashMap<u64, Vec<u64>, NodeHasher> = HashMap::default();
        let mut seeds = Vec::with_capacity(edges.len());
        for &(from, to) in edges {
            successors.entry(from).or_default().push(to);
            seeds.push(codec.encode(EDGE, &[from, to])?);
        }
        let successors = Arc::new(successors);

        let base = codec.clone();
        let step = codec.clone();
        let stratum = Stratum::new("closure")
            .rule_fn(move |fact, out| {
                if base.predicate(fact) == EDGE {
                    let edge = base.decode(fact)?;
                    out.push(base.encode(REACHES, &edge.args)?);
                }
                Ok(())
            })
            .rule_fn(move |fact, out| {
                if step.predicate(fact) == REACHES {
                    let reach = step.decode(fact)?;
                    let (from, via) = (reach.args[0], reach.args[1]);
                    for &to in successors.get(&via).into_iter().flatten() {
                        out.push(step.encode(REACHES, &[from, to])?);
                    }
                }
                Ok(())
            });

        Ok(Self {
            codec,
            program: Program::new().seeds(seeds).stratum(stratum),
        })
    }
    pub fn codec(&self) -> &TupleCodec {
        &self.codec
    }
    pub fn program(&self) -> Program {
        self.program.clone()
    }
    pub fn reaches(&self, from: u64, to: u64) -> Result<Fact> {
        self.codec.encode(REACHES, &[from, to])
    }
    /// `Reaches(x, y).` for derived facts, `None` for edges and foreign facts.
    pub fn render(&self, fact: Fact) -> Option<String> {
        let tuple = self.codec.decode(fact).ok()?;
        (tuple.predicate == REACHES).then(|| format!("Reaches({}, {}).", tuple.args[0], tuple.args[1]))
    }
}
