//! Collapse operators describing dissipation.
//!
//! An empty collection means closed-system (unitary) evolution; any
//! registered operator switches a run to the Lindblad master equation.

use indexmap::IndexMap;
use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    error::{ QSimError, QSimResult },
    hilbert::QSystem,
    operator::{ Operator, Recipe, Target },
};

/// Keyed collection of collapse operators over a [`QSystem`].
#[derive(Clone, Debug)]
pub struct Noise<'a> {
    qsystem: &'a QSystem,
    collapse: IndexMap<String, Operator<'a>>,
}

impl<'a> Noise<'a> {
    /// Create a new, empty collection.
    pub fn new(qsystem: &'a QSystem) -> Self {
        Self { qsystem, collapse: IndexMap::new() }
    }

    /// Register a collapse operator compiled from a recipe.
    ///
    /// Rates are carried by the recipe constant: a decay at rate `γ` from `e`
    /// to `g` is the single transition `|g⟩⟨e|` with constant `√γ`.
    pub fn add<K>(&mut self, key: K, target: Target, recipe: &Recipe)
        -> QSimResult<()>
    where K: Into<String>
    {
        let key: String = key.into();
        if self.collapse.contains_key(&key) {
            return Err(QSimError::DuplicateKey(key));
        }
        let operator = Operator::new(self.qsystem, target, recipe)?;
        debug!(key = key.as_str(), "added collapse operator");
        self.collapse.insert(key, operator);
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.collapse.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Operator<'a>> {
        self.collapse.get(key)
    }

    pub fn len(&self) -> usize { self.collapse.len() }

    pub fn is_empty(&self) -> bool { self.collapse.is_empty() }

    /// Collapse matrices in insertion order.
    pub fn compile(&self) -> Vec<nd::Array2<C64>> {
        self.collapse.values()
            .map(|op| op.matrix().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use super::*;
    use crate::{ hilbert::Quanta, operator::Transition };

    fn qubit() -> QSystem {
        QSystem::new([Rc::new(Quanta::new("Rb", ["g", "e"]).unwrap())])
    }

    #[test]
    fn empty_by_default() {
        let sys = qubit();
        let noise = Noise::new(&sys);
        assert!(noise.is_empty());
        assert!(noise.compile().is_empty());
    }

    #[test]
    fn registered_operators_compile_in_order() {
        let sys = qubit();
        let mut noise = Noise::new(&sys);
        let decay = Recipe::single(Transition::new(["g"], ["e"]), 0.5);
        let dephase = Recipe::single(Transition::new(["e"], ["e"]), 0.1);
        noise.add("decay", vec![vec![0]], &decay).unwrap();
        noise.add("dephase", vec![vec![0]], &dephase).unwrap();
        let c_ops = noise.compile();
        assert_eq!(c_ops.len(), 2);
        assert_eq!(c_ops[0][[0, 1]], C64::from(0.5));
        assert_eq!(c_ops[1][[1, 1]], C64::from(0.1));
        assert_eq!(noise.keys().collect::<Vec<_>>(), vec!["decay", "dephase"]);
        assert!(matches!(
            noise.add("decay", vec![vec![0]], &decay),
            Err(QSimError::DuplicateKey(_))
        ));
    }
}
