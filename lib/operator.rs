//! Compilation of declarative transition recipes into matrices over the full
//! tensor-product space of a [`QSystem`].
//!
//! A recipe names, for each term, the energy-level transition `|ket⟩⟨bra|` on
//! each subsystem of a target tuple. Terms are combined with `+`/`-` in order,
//! the result is summed over every target tuple, and finally scaled by a
//! constant:
//! ```text
//! M = c Σ_t ( T_0(t) ± T_1(t) ± ... )
//! ```
//! where `T_k(t)` is the `k`-th transition embedded on the subsystems of `t`
//! with identities elsewhere.

use std::str::FromStr;
use ndarray as nd;
use num_complex::Complex64 as C64;
use rustc_hash::{ FxHashMap as HashMap, FxHashSet as HashSet };
use tracing::{ debug, warn };
use crate::{
    error::{ QSimError, QSimResult },
    hilbert::{ QSystem, tensor_matrices },
};

/// Combination operator joining consecutive transitions of a recipe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Combine {
    Add,
    Sub,
}

impl FromStr for Combine {
    type Err = QSimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(Self::Add),
            "-" => Ok(Self::Sub),
            other => Err(QSimError::MalformedRecipe(
                format!("unsupported combination operator `{}`", other)
            )),
        }
    }
}

impl Combine {
    /// Fold `rhs` into `acc` in place.
    pub fn apply(self, acc: &mut nd::Array2<C64>, rhs: &nd::Array2<C64>) {
        match self {
            Self::Add => { *acc += rhs; },
            Self::Sub => { *acc -= rhs; },
        }
    }
}

/// A multi-subsystem transition `|ket⟩⟨bra|`, with one ket and one bra symbol
/// per position of a target tuple.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Transition {
    pub ket: Vec<String>,
    pub bra: Vec<String>,
}

impl Transition {
    /// Create a new `Transition`.
    pub fn new<I, J, S, T>(ket: I, bra: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            ket: ket.into_iter().map(Into::into).collect(),
            bra: bra.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of subsystems named by the ket half.
    pub fn arity(&self) -> usize { self.ket.len() }

    /// Pair this transition's symbols with the subsystems of a target tuple.
    ///
    /// Fails if the tuple and either half of the transition differ in length.
    pub fn on<'s>(&'s self, target: &[usize])
        -> QSimResult<TransitionMap<'s>>
    {
        for half in [&self.ket, &self.bra] {
            if half.len() != target.len() {
                return Err(QSimError::TargetArityMismatch {
                    target: target.to_vec(),
                    expected: half.len(),
                    got: target.len(),
                });
            }
        }
        Ok(
            target.iter().copied()
                .zip(self.ket.iter().zip(&self.bra))
                .map(|(idx, (k, b))| (idx, (k.as_str(), b.as_str())))
                .collect()
        )
    }
}

/// Partial mapping from subsystem index to the `(ket, bra)` symbols of a
/// single-subsystem transition.
pub type TransitionMap<'s> = HashMap<usize, (&'s str, &'s str)>;

/// Target subsystem tuples an operator is applied to.
pub type Target = Vec<Vec<usize>>;

/// Declarative description of an operator term.
///
/// `ops` must have exactly one fewer element than `transitions`.
#[derive(Clone, Debug, PartialEq)]
pub struct Recipe {
    pub transitions: Vec<Transition>,
    pub ops: Vec<Combine>,
    pub constant: C64,
}

impl Recipe {
    /// Create a new `Recipe`.
    pub fn new<C>(transitions: Vec<Transition>, ops: Vec<Combine>, constant: C)
        -> Self
    where C: Into<C64>
    {
        Self { transitions, ops, constant: constant.into() }
    }

    /// Recipe for a single transition scaled by `constant`.
    pub fn single<C>(transition: Transition, constant: C) -> Self
    where C: Into<C64>
    {
        Self::new(vec![transition], Vec::new(), constant)
    }

    /// Check that the combination operators join the transitions.
    pub fn validate(&self) -> QSimResult<()> {
        if self.transitions.len() != self.ops.len() + 1 {
            return Err(QSimError::MalformedRecipe(format!(
                "{} transitions require {} combination operators, got {}",
                self.transitions.len(),
                self.transitions.len().saturating_sub(1),
                self.ops.len(),
            )));
        }
        Ok(())
    }
}

/// Build the matrix of a single multi-subsystem transition over the full
/// space: `|ket⟩⟨bra|` on each named subsystem, identity on all others.
pub fn build_transition(qsystem: &QSystem, transition: &TransitionMap<'_>)
    -> QSimResult<nd::Array2<C64>>
{
    let n = qsystem.num_subsystems();
    if let Some(&index) = transition.keys().find(|&&idx| idx >= n) {
        return Err(QSimError::IndexOutOfRange { index, len: n });
    }
    let factors: Vec<nd::Array2<C64>>
        = qsystem.iter().enumerate()
        .map(|(idx, quanta)| {
            match transition.get(&idx) {
                Some((ket, bra)) => quanta.transition(ket, bra),
                None => Ok(quanta.identity()),
            }
        })
        .collect::<QSimResult<_>>()?;
    Ok(tensor_matrices(&factors))
}

fn check_target(qsystem: &QSystem, tuple: &[usize], recipe: &Recipe)
    -> QSimResult<()>
{
    for transition in recipe.transitions.iter() {
        transition.on(tuple)?;
    }
    let n = qsystem.num_subsystems();
    let mut seen: HashSet<usize> = HashSet::default();
    for &index in tuple.iter() {
        if index >= n {
            return Err(QSimError::IndexOutOfRange { index, len: n });
        }
        if !seen.insert(index) {
            return Err(QSimError::MalformedRecipe(
                format!("target {:?} names subsystem {} twice", tuple, index)
            ));
        }
    }
    Ok(())
}

/// Assemble the full operator matrix for a recipe applied to every tuple of
/// `target`.
///
/// All validation happens before any matrix is built.
pub fn build(qsystem: &QSystem, target: &[Vec<usize>], recipe: &Recipe)
    -> QSimResult<nd::Array2<C64>>
{
    recipe.validate()?;
    if target.is_empty() {
        return Err(QSimError::MalformedRecipe(
            "operator must have at least one target".into()
        ));
    }
    target.iter()
        .try_for_each(|tuple| check_target(qsystem, tuple, recipe))?;

    let dim = qsystem.dim();
    let mut total: nd::Array2<C64> = nd::Array2::zeros((dim, dim));
    for tuple in target.iter() {
        let mut group
            = recipe.transitions.iter()
            .map(|tr| build_transition(qsystem, &tr.on(tuple)?));
        // non-emptiness guaranteed by `validate`
        let mut acc = match group.next() {
            Some(first) => first?,
            None => continue,
        };
        for (op, term) in recipe.ops.iter().zip(group) {
            op.apply(&mut acc, &term?);
        }
        total += &acc;
    }
    total *= recipe.constant;
    Ok(total)
}

/// An operator compiled against a [`QSystem`].
///
/// The matrix is computed once at construction; the recipe is not retained.
#[derive(Clone, Debug, PartialEq)]
pub struct Operator<'a> {
    qsystem: &'a QSystem,
    target: Target,
    matrix: nd::Array2<C64>,
}

impl<'a> Operator<'a> {
    /// Compile `recipe` over every tuple of `target`.
    pub fn new(qsystem: &'a QSystem, target: Target, recipe: &Recipe)
        -> QSimResult<Self>
    {
        let matrix = build(qsystem, &target, recipe)?;
        if matrix.iter().all(|x| x.norm() == 0.0) {
            warn!(?target, "operator compiled to the zero matrix");
        }
        debug!(
            dim = matrix.nrows(),
            n_targets = target.len(),
            n_transitions = recipe.transitions.len(),
            "compiled operator"
        );
        Ok(Self { qsystem, target, matrix })
    }

    /// Get a reference to the system.
    pub fn qsystem(&self) -> &QSystem { self.qsystem }

    /// Get the target tuples.
    pub fn target(&self) -> &Target { &self.target }

    /// Get the compiled matrix.
    pub fn matrix(&self) -> &nd::Array2<C64> { &self.matrix }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use ndarray::linalg::kron;
    use super::*;
    use crate::hilbert::{ Quanta, identity, outer_prod };

    fn qubit_system(n: usize) -> QSystem {
        let q = Rc::new(Quanta::new("Rb", ["g", "e"]).unwrap());
        QSystem::new((0..n).map(|_| q.clone()))
    }

    fn ket_bra(sys: &QSystem, idx: usize, ket: &str, bra: &str)
        -> nd::Array2<C64>
    {
        sys.subsystem(idx).unwrap().transition(ket, bra).unwrap()
    }

    fn flip() -> Recipe {
        Recipe::new(
            vec![Transition::new(["e"], ["g"]), Transition::new(["g"], ["e"])],
            vec![Combine::Add],
            1.0,
        )
    }

    #[test]
    fn combine_parse() {
        assert_eq!("+".parse::<Combine>().unwrap(), Combine::Add);
        assert_eq!(" - ".parse::<Combine>().unwrap(), Combine::Sub);
        assert!(matches!(
            "*".parse::<Combine>(),
            Err(QSimError::MalformedRecipe(_))
        ));
    }

    #[test]
    fn single_qubit_flip() {
        let sys = qubit_system(1);
        let op = Operator::new(&sys, vec![vec![0]], &flip()).unwrap();
        let expected
            = ket_bra(&sys, 0, "e", "g") + ket_bra(&sys, 0, "g", "e");
        assert_eq!(op.matrix(), &expected);
        assert_eq!(op.target(), &vec![vec![0]]);
    }

    #[test]
    fn subtraction_and_complex_constant() {
        let sys = qubit_system(1);
        let recipe = Recipe::new(
            vec![Transition::new(["e"], ["g"]), Transition::new(["g"], ["e"])],
            vec![Combine::Sub],
            C64::new(0.0, 1.0),
        );
        let op = Operator::new(&sys, vec![vec![0]], &recipe).unwrap();
        let expected
            = (ket_bra(&sys, 0, "e", "g") - ket_bra(&sys, 0, "g", "e"))
            * C64::new(0.0, 1.0);
        assert_eq!(op.matrix(), &expected);
    }

    #[test]
    fn sums_over_targets() {
        let sys = qubit_system(2);
        let recipe = Recipe::single(Transition::new(["e"], ["g"]), 1.0);
        let op = Operator::new(&sys, vec![vec![0], vec![1]], &recipe).unwrap();
        let eg = ket_bra(&sys, 0, "e", "g");
        let expected = kron(&eg, &identity(2)) + kron(&identity(2), &eg);
        assert_eq!(op.matrix(), &expected);
    }

    #[test]
    fn two_body_transition_embeds_identity() {
        let sys = qubit_system(3);
        let recipe = Recipe::single(Transition::new(["e", "e"], ["g", "g"]), 2.0);
        let op = Operator::new(&sys, vec![vec![0, 2]], &recipe).unwrap();
        let eg = ket_bra(&sys, 0, "e", "g");
        let expected
            = kron(&kron(&eg, &identity(2)), &eg) * C64::from(2.0);
        assert_eq!(op.matrix(), &expected);
    }

    #[test]
    fn target_order_maps_symbols() {
        let sys = qubit_system(2);
        let recipe = Recipe::single(Transition::new(["e", "g"], ["g", "g"]), 1.0);
        let fwd = Operator::new(&sys, vec![vec![0, 1]], &recipe).unwrap();
        let rev = Operator::new(&sys, vec![vec![1, 0]], &recipe).unwrap();
        let psi_gg = sys.basis_state(&["g", "g"]).unwrap();
        let psi_eg = sys.basis_state(&["e", "g"]).unwrap();
        let psi_ge = sys.basis_state(&["g", "e"]).unwrap();
        assert_eq!(fwd.matrix(), &outer_prod(&psi_eg, &psi_gg));
        assert_eq!(rev.matrix(), &outer_prod(&psi_ge, &psi_gg));
    }

    #[test]
    fn reconstruction_is_idempotent() {
        let sys = qubit_system(2);
        let map: TransitionMap = [(1, ("e", "g"))].into_iter().collect();
        let a = build_transition(&sys, &map).unwrap();
        let b = build_transition(&sys, &map).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn malformed_recipe() {
        let sys = qubit_system(1);
        let recipe = Recipe::new(
            vec![Transition::new(["e"], ["g"]), Transition::new(["g"], ["e"])],
            vec![],
            1.0,
        );
        assert!(matches!(
            Operator::new(&sys, vec![vec![0]], &recipe),
            Err(QSimError::MalformedRecipe(_))
        ));
        let empty = Recipe::new(vec![], vec![], 1.0);
        assert!(matches!(
            Operator::new(&sys, vec![vec![0]], &empty),
            Err(QSimError::MalformedRecipe(_))
        ));
    }

    #[test]
    fn malformed_recipe_precedes_target_checks() {
        let sys = qubit_system(1);
        let recipe = Recipe::new(
            vec![Transition::new(["e", "e"], ["g", "g"])],
            vec![Combine::Add],
            1.0,
        );
        assert!(matches!(
            Operator::new(&sys, vec![vec![7]], &recipe),
            Err(QSimError::MalformedRecipe(_))
        ));
    }

    #[test]
    fn arity_mismatch_on_any_tuple() {
        let sys = qubit_system(3);
        let recipe = Recipe::single(Transition::new(["e"], ["g"]), 1.0);
        let res = Operator::new(&sys, vec![vec![0], vec![1, 2]], &recipe);
        match res {
            Err(QSimError::TargetArityMismatch { target, expected, got }) => {
                assert_eq!(target, vec![1, 2]);
                assert_eq!(expected, 1);
                assert_eq!(got, 2);
            },
            other => panic!("unexpected result: {:?}", other),
        }
        let lopsided = Recipe::single(Transition::new(["e"], ["g", "g"]), 1.0);
        assert!(matches!(
            Operator::new(&sys, vec![vec![0]], &lopsided),
            Err(QSimError::TargetArityMismatch { .. })
        ));
    }

    #[test]
    fn bad_targets() {
        let sys = qubit_system(2);
        let recipe = Recipe::single(Transition::new(["e"], ["g"]), 1.0);
        assert!(matches!(
            Operator::new(&sys, vec![vec![2]], &recipe),
            Err(QSimError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            Operator::new(&sys, vec![], &recipe),
            Err(QSimError::MalformedRecipe(_))
        ));
        let pair = Recipe::single(Transition::new(["e", "e"], ["g", "g"]), 1.0);
        assert!(matches!(
            Operator::new(&sys, vec![vec![1, 1]], &pair),
            Err(QSimError::MalformedRecipe(_))
        ));
    }

    #[test]
    fn unknown_symbol() {
        let sys = qubit_system(1);
        let recipe = Recipe::single(Transition::new(["r"], ["g"]), 1.0);
        assert!(matches!(
            Operator::new(&sys, vec![vec![0]], &recipe),
            Err(QSimError::UnknownSymbol { .. })
        ));
    }

    #[test]
    fn transition_map_out_of_range() {
        let sys = qubit_system(1);
        let map: TransitionMap = [(4, ("e", "g"))].into_iter().collect();
        assert!(matches!(
            build_transition(&sys, &map),
            Err(QSimError::IndexOutOfRange { index: 4, len: 1 })
        ));
    }
}
