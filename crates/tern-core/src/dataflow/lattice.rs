//! Fact lattices for the built-in analyses
//!
//! - [`NameSet`]: powerset of variable names, joined by union
//! - [`ConstLattice`]: per-variable constant lattice where
//!   Top (⊤) = no information yet, Bottom (⊥) = not a constant

use crate::ast::Literal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A set of variable names, ordered for deterministic output
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameSet(pub BTreeSet<String>);

impl NameSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn union_all(sets: &[NameSet]) -> NameSet {
        NameSet(sets.iter().flat_map(|s| s.0.iter().cloned()).collect())
    }
}

impl FromIterator<String> for NameSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        NameSet(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for NameSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        NameSet(iter.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for NameSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// A compile-time constant value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConstValue {
    Num(f64),
    Bool(bool),
    Str(String),
    None,
    Unit,
}

// Numbers compare by bit pattern so that equality stays reflexive; folding
// never produces NaN.
impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstValue::Num(a), ConstValue::Num(b)) => a.to_bits() == b.to_bits(),
            (ConstValue::Bool(a), ConstValue::Bool(b)) => a == b,
            (ConstValue::Str(a), ConstValue::Str(b)) => a == b,
            (ConstValue::None, ConstValue::None) | (ConstValue::Unit, ConstValue::Unit) => true,
            _ => false,
        }
    }
}

impl Eq for ConstValue {}

impl From<&Literal> for ConstValue {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Num(n) => ConstValue::Num(*n),
            Literal::Bool(b) => ConstValue::Bool(*b),
            Literal::Str(s) => ConstValue::Str(s.clone()),
            Literal::None => ConstValue::None,
            Literal::Unit => ConstValue::Unit,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Num(n) => write!(f, "{n}"),
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Str(s) => write!(f, "{s:?}"),
            ConstValue::None => write!(f, "none"),
            ConstValue::Unit => write!(f, "()"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstLattice {
    /// No information yet (unreached, or not yet assigned)
    Top,
    Constant(ConstValue),
    /// Conflicting or unknown values
    Bottom,
}

impl ConstLattice {
    /// Join: Top is the identity, Bottom absorbs, and disagreeing
    /// constants collapse to Bottom
    pub fn join(&self, other: &ConstLattice) -> ConstLattice {
        match (self, other) {
            (ConstLattice::Top, v) | (v, ConstLattice::Top) => v.clone(),
            (ConstLattice::Bottom, _) | (_, ConstLattice::Bottom) => ConstLattice::Bottom,
            (ConstLattice::Constant(a), ConstLattice::Constant(b)) => {
                if a == b {
                    ConstLattice::Constant(a.clone())
                } else {
                    ConstLattice::Bottom
                }
            }
        }
    }

    pub fn as_constant(&self) -> Option<&ConstValue> {
        match self {
            ConstLattice::Constant(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ConstLattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstLattice::Top => write!(f, "⊤"),
            ConstLattice::Constant(v) => write!(f, "{v}"),
            ConstLattice::Bottom => write!(f, "⊥"),
        }
    }
}

/// Variable → constant-lattice map. Absent names are Top and Top is never
/// stored, so equal environments compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstEnv(BTreeMap<String, ConstLattice>);

impl ConstEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> ConstLattice {
        self.0.get(name).cloned().unwrap_or(ConstLattice::Top)
    }

    pub fn set(&mut self, name: impl Into<String>, value: ConstLattice) {
        let name = name.into();
        if value == ConstLattice::Top {
            self.0.remove(&name);
        } else {
            self.0.insert(name, value);
        }
    }

    /// The value of `name` if it is a known constant
    pub fn constant(&self, name: &str) -> Option<&ConstValue> {
        self.0.get(name).and_then(ConstLattice::as_constant)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConstLattice)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Pointwise join
    pub fn join(&self, other: &ConstEnv) -> ConstEnv {
        let mut out = self.clone();
        for (name, value) in &other.0 {
            let joined = out.get(name).join(value);
            out.set(name.clone(), joined);
        }
        out
    }
}

impl fmt::Display for ConstEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name} = {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> ConstLattice {
        ConstLattice::Constant(ConstValue::Num(n))
    }

    #[test]
    fn test_join_top_is_identity() {
        assert_eq!(ConstLattice::Top.join(&num(1.0)), num(1.0));
        assert_eq!(num(1.0).join(&ConstLattice::Top), num(1.0));
    }

    #[test]
    fn test_join_disagreeing_constants() {
        assert_eq!(num(1.0).join(&num(1.0)), num(1.0));
        assert_eq!(num(1.0).join(&num(2.0)), ConstLattice::Bottom);
        assert_eq!(ConstLattice::Bottom.join(&ConstLattice::Top), ConstLattice::Bottom);
    }

    #[test]
    fn test_env_join_pointwise() {
        let mut a = ConstEnv::new();
        a.set("x", num(1.0));
        a.set("y", num(2.0));
        let mut b = ConstEnv::new();
        b.set("x", num(1.0));
        b.set("y", num(3.0));
        b.set("z", num(4.0));

        let joined = a.join(&b);
        assert_eq!(joined.get("x"), num(1.0));
        assert_eq!(joined.get("y"), ConstLattice::Bottom);
        // absent on one side means Top there
        assert_eq!(joined.get("z"), num(4.0));
        assert_eq!(joined.to_string(), "{x = 1, y = ⊥, z = 4}");
    }

    #[test]
    fn test_top_is_not_stored() {
        let mut env = ConstEnv::new();
        env.set("x", num(1.0));
        env.set("x", ConstLattice::Top);
        assert_eq!(env, ConstEnv::new());
    }

    #[test]
    fn test_name_set_display() {
        let set: NameSet = ["y", "x"].into_iter().collect();
        assert_eq!(set.to_string(), "{x, y}");
        assert_eq!(NameSet::new().to_string(), "{}");
    }
}
