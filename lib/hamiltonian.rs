//! Keyed collection of (operator, pulse) terms and its compiled,
//! solver-ready form.
//!
//! The compiled Hamiltonian is the list of pairs `(M_j, s_j)` such that
//! ```text
//! H(t_k) = Σ_j s_j[k] M_j
//! ```
//! on the uniform time grid `t_k`.

use indexmap::IndexMap;
use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    error::{ QSimError, QSimResult },
    hilbert::QSystem,
    operator::{ Operator, Recipe, Target },
    pulse::{ Pulse, PulseSpec, time_grid },
};

/// One compiled term: a matrix over the full space and its pulse samples.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledTerm {
    pub matrix: nd::Array2<C64>,
    pub samples: nd::Array1<f64>,
}

/// Ordered, solver-ready list of compiled terms over a fixed time grid.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledHamiltonian {
    dim: usize,
    time: nd::Array1<f64>,
    terms: Vec<CompiledTerm>,
}

impl CompiledHamiltonian {
    /// Dimension of the full space.
    pub fn dim(&self) -> usize { self.dim }

    /// The sampling grid shared by every term.
    pub fn time(&self) -> &nd::Array1<f64> { &self.time }

    /// Compiled terms in insertion order.
    pub fn terms(&self) -> &[CompiledTerm] { &self.terms }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    /// Consume `self`, returning the bare `(matrix, samples)` pairs.
    pub fn into_pairs(self) -> Vec<(nd::Array2<C64>, nd::Array1<f64>)> {
        self.terms.into_iter()
            .map(|CompiledTerm { matrix, samples }| (matrix, samples))
            .collect()
    }

    fn weighted_sum<F>(&self, weight: F) -> nd::Array2<C64>
    where F: Fn(&nd::Array1<f64>) -> f64
    {
        let mut H: nd::Array2<C64> = nd::Array2::zeros((self.dim, self.dim));
        for term in self.terms.iter() {
            H.scaled_add(C64::from(weight(&term.samples)), &term.matrix);
        }
        H
    }

    /// Evaluate the Hamiltonian at the `k`-th grid point, or `None` if `k` is
    /// outside the grid.
    pub fn matrix_at(&self, k: usize) -> Option<nd::Array2<C64>> {
        (k < self.time.len()).then(|| self.weighted_sum(|samples| samples[k]))
    }

    /// Evaluate the Hamiltonian at an arbitrary time, linearly interpolating
    /// pulse samples between grid points.
    ///
    /// Times outside the grid are clamped to its ends.
    pub fn matrix_at_time(&self, t: f64) -> nd::Array2<C64> {
        let n = self.time.len();
        let t_end = self.time[n - 1];
        if n == 1 || t_end <= 0.0 {
            return self.weighted_sum(|samples| samples[0]);
        }
        let u = (t.clamp(0.0, t_end) / t_end) * (n - 1) as f64;
        let k = (u.floor() as usize).min(n - 2);
        let frac = u - k as f64;
        self.weighted_sum(|samples| {
            samples[k] * (1.0 - frac) + samples[k + 1] * frac
        })
    }

    /// Evaluate the Hamiltonian over the whole grid as a 3D array, with the
    /// last axis corresponding to time.
    pub fn to_array3(&self) -> nd::Array3<C64> {
        let nt = self.time.len();
        let mut H: nd::Array3<C64> = nd::Array3::zeros((self.dim, self.dim, nt));
        for k in 0..nt {
            self.weighted_sum(|samples| samples[k])
                .move_into(H.slice_mut(s![.., .., k]));
        }
        H
    }
}

/// Time-dependent Hamiltonian as a keyed collection of terms.
///
/// Iteration and compilation follow insertion order.
#[derive(Clone, Debug)]
pub struct Hamiltonian<'a> {
    qsystem: &'a QSystem,
    terms: IndexMap<String, (Operator<'a>, Pulse)>,
}

impl<'a> Hamiltonian<'a> {
    /// Create a new, empty Hamiltonian over `qsystem`.
    pub fn new(qsystem: &'a QSystem) -> Self {
        Self { qsystem, terms: IndexMap::new() }
    }

    /// Get a reference to the system.
    pub fn qsystem(&self) -> &'a QSystem { self.qsystem }

    /// Term keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.terms.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn contains_key(&self, key: &str) -> bool {
        self.terms.contains_key(key)
    }

    /// Compile a recipe and a pulse description into a new term.
    ///
    /// Nothing is stored unless both compile.
    pub fn add_term<K>(
        &mut self,
        key: K,
        target: Target,
        pulse: &PulseSpec,
        recipe: &Recipe,
    ) -> QSimResult<()>
    where K: Into<String>
    {
        let key: String = key.into();
        if self.terms.contains_key(&key) {
            return Err(QSimError::DuplicateKey(key));
        }
        let operator = Operator::new(self.qsystem, target, recipe)?;
        let pulse = Pulse::from_spec(pulse)?;
        debug!(key = key.as_str(), shape = %pulse.shape(), "added term");
        self.terms.insert(key, (operator, pulse));
        Ok(())
    }

    /// Add a pre-built term.
    ///
    /// `operator` must have been built against the same system.
    pub fn insert<K>(&mut self, key: K, operator: Operator<'a>, pulse: Pulse)
        -> QSimResult<()>
    where K: Into<String>
    {
        let key: String = key.into();
        if self.terms.contains_key(&key) {
            return Err(QSimError::DuplicateKey(key));
        }
        if !std::ptr::eq(operator.qsystem(), self.qsystem) {
            return Err(QSimError::MalformedRecipe(
                "operator was built against a different system".into()
            ));
        }
        self.terms.insert(key, (operator, pulse));
        Ok(())
    }

    /// Remove a term, returning it if it was present.
    pub fn remove(&mut self, key: &str) -> Option<(Operator<'a>, Pulse)> {
        self.terms.shift_remove(key)
    }

    pub fn get_operator(&self, key: &str) -> Option<&Operator<'a>> {
        self.terms.get(key).map(|(op, _)| op)
    }

    pub fn get_pulse(&self, key: &str) -> Option<&Pulse> {
        self.terms.get(key).map(|(_, pulse)| pulse)
    }

    /// Pair every term's matrix with its pulse sampled over a fresh grid of
    /// `sample_count` points on `[0, total_time]`, shared by all terms.
    pub fn compile(&self, total_time: f64, sample_count: usize)
        -> QSimResult<CompiledHamiltonian>
    {
        let time = time_grid(total_time, sample_count)?;
        let terms: Vec<CompiledTerm>
            = self.terms.values()
            .map(|(operator, pulse)| {
                CompiledTerm {
                    matrix: operator.matrix().clone(),
                    samples: pulse.envelope().sample(&time),
                }
            })
            .collect();
        debug!(
            n_terms = terms.len(),
            total_time,
            sample_count,
            "compiled hamiltonian"
        );
        Ok(CompiledHamiltonian { dim: self.qsystem.dim(), time, terms })
    }
}
