//! Definitions to describe finite-level species, their tensor-product
//! composition, and the basis vectors and matrices built over them.

use std::rc::Rc;
use indexmap::IndexSet;
use itertools::Itertools;
use ndarray::{ self as nd, linalg::kron };
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };
use crate::error::{ QSimError, QSimResult };

/* Primitives *****************************************************************/

/// Standard basis vector `|index⟩` in a space of dimension `dim`.
///
/// An out-of-range `index` gives the zero vector.
pub fn basis_vector(dim: usize, index: usize) -> nd::Array1<C64> {
    (0..dim).map(|j| if j == index { C64::one() } else { C64::zero() })
        .collect()
}

/// Identity matrix of dimension `dim`.
pub fn identity(dim: usize) -> nd::Array2<C64> { nd::Array2::eye(dim) }

/// Compute the outer product `|a⟩⟨b|` of two state vectors.
pub fn outer_prod(a: &nd::Array1<C64>, b: &nd::Array1<C64>)
    -> nd::Array2<C64>
{
    nd::Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j].conj())
}

/// Conjugate transpose of a matrix.
pub fn dagger<S>(a: &nd::ArrayBase<S, nd::Ix2>) -> nd::Array2<C64>
where S: nd::Data<Elem = C64>
{
    a.t().mapv(|x| x.conj())
}

/// Kronecker product of an ordered list of vectors, leftmost factor most
/// significant.
///
/// An empty list gives the one-element vector `[1]`.
pub fn tensor_vectors<'a, I>(vectors: I) -> nd::Array1<C64>
where I: IntoIterator<Item = &'a nd::Array1<C64>>
{
    vectors.into_iter()
        .fold(nd::array![C64::one()], |acc, v| {
            acc.iter()
                .cartesian_product(v.iter())
                .map(|(a, b)| *a * *b)
                .collect()
        })
}

/// Kronecker product of an ordered list of matrices, leftmost factor most
/// significant.
///
/// An empty list gives the 1×1 identity.
pub fn tensor_matrices<'a, I>(matrices: I) -> nd::Array2<C64>
where I: IntoIterator<Item = &'a nd::Array2<C64>>
{
    matrices.into_iter()
        .fold(identity(1), |acc, m| kron(&acc, m))
}

/* Species ********************************************************************/

/// A single finite-level quantum species.
///
/// Energy levels are identified by symbols, stored in order; the position of a
/// symbol is its index in the species' standard basis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quanta {
    name: String,
    energy_levels: IndexSet<String>,
}

impl Quanta {
    /// Create a new species.
    ///
    /// Fails if `name` is empty, `energy_levels` is empty, or any symbol is
    /// repeated.
    pub fn new<N, I, L>(name: N, energy_levels: I) -> QSimResult<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let name: String = name.into();
        if name.is_empty() {
            return Err(QSimError::MalformedQuanta {
                name,
                reason: "name must be non-empty".into(),
            });
        }
        let mut levels: IndexSet<String> = IndexSet::new();
        for level in energy_levels.into_iter().map(Into::into) {
            if levels.contains(&level) {
                return Err(QSimError::MalformedQuanta {
                    name,
                    reason: format!("energy level `{}` is repeated", level),
                });
            }
            levels.insert(level);
        }
        if levels.is_empty() {
            return Err(QSimError::MalformedQuanta {
                name,
                reason: "at least one energy level is required".into(),
            });
        }
        Ok(Self { name, energy_levels: levels })
    }

    /// Return the name of the species.
    pub fn name(&self) -> &str { &self.name }

    /// Return the energy level symbols in basis order.
    pub fn energy_levels(&self) -> impl Iterator<Item = &str> + '_ {
        self.energy_levels.iter().map(String::as_str)
    }

    /// Hilbert-space dimension of the species.
    pub fn dim(&self) -> usize { self.energy_levels.len() }

    /// Map the symbol of an energy level to its index.
    pub fn map_level_to_index(&self, symbol: &str) -> QSimResult<usize> {
        self.energy_levels.get_index_of(symbol)
            .ok_or_else(|| QSimError::UnknownSymbol {
                species: self.name.clone(),
                symbol: symbol.to_string(),
            })
    }

    /// Get the basis vector for an energy level.
    pub fn basis(&self, symbol: &str) -> QSimResult<nd::Array1<C64>> {
        self.map_level_to_index(symbol)
            .map(|k| basis_vector(self.dim(), k))
    }

    /// Get the transition matrix `|ket⟩⟨bra|` local to this species.
    pub fn transition(&self, ket: &str, bra: &str)
        -> QSimResult<nd::Array2<C64>>
    {
        Ok(outer_prod(&self.basis(ket)?, &self.basis(bra)?))
    }

    /// Identity on this species' space.
    pub fn identity(&self) -> nd::Array2<C64> { identity(self.dim()) }
}

/* Composite system ***********************************************************/

/// An ordered tensor-product composition of species.
///
/// Species are shared, so the same [`Quanta`] may occupy several slots. The
/// order of slots is the order of tensor factors in every vector and matrix
/// built over the system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QSystem {
    species: Vec<Rc<Quanta>>,
}

impl FromIterator<Rc<Quanta>> for QSystem {
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = Rc<Quanta>>
    {
        Self { species: iter.into_iter().collect() }
    }
}

impl From<Vec<Rc<Quanta>>> for QSystem {
    fn from(species: Vec<Rc<Quanta>>) -> Self { Self { species } }
}

impl QSystem {
    /// Create a new system from species in tensor-factor order.
    pub fn new<I>(species: I) -> Self
    where I: IntoIterator<Item = Rc<Quanta>>
    {
        species.into_iter().collect()
    }

    /// Number of subsystems.
    pub fn num_subsystems(&self) -> usize { self.species.len() }

    /// Get the species occupying a subsystem slot.
    pub fn subsystem(&self, index: usize) -> QSimResult<&Quanta> {
        self.species.get(index)
            .map(|q| q.as_ref())
            .ok_or(QSimError::IndexOutOfRange {
                index,
                len: self.species.len(),
            })
    }

    /// Iterate over the species in tensor-factor order.
    pub fn iter(&self) -> impl Iterator<Item = &Quanta> + '_ {
        self.species.iter().map(|q| q.as_ref())
    }

    /// Names of the species in tensor-factor order.
    pub fn info(&self) -> Vec<&str> {
        self.species.iter().map(|q| q.name()).collect()
    }

    /// Dimensions of each subsystem in tensor-factor order.
    pub fn dims(&self) -> Vec<usize> {
        self.species.iter().map(|q| q.dim()).collect()
    }

    /// Dimension of the full space.
    pub fn dim(&self) -> usize { self.dims().into_iter().product() }

    /// Build the product basis ket for one level symbol per subsystem.
    pub fn basis_state<S>(&self, levels: &[S]) -> QSimResult<nd::Array1<C64>>
    where S: AsRef<str>
    {
        if levels.len() != self.num_subsystems() {
            return Err(QSimError::MalformedState {
                expected: self.num_subsystems(),
                got: levels.len(),
            });
        }
        let kets: Vec<nd::Array1<C64>>
            = self.species.iter().zip(levels)
            .map(|(quanta, level)| quanta.basis(level.as_ref()))
            .collect::<QSimResult<_>>()?;
        Ok(tensor_vectors(&kets))
    }

    /// Build the pure-state density matrix `|s⟩⟨s|` for one level symbol per
    /// subsystem.
    pub fn basis_density<S>(&self, levels: &[S])
        -> QSimResult<nd::Array2<C64>>
    where S: AsRef<str>
    {
        let ket = self.basis_state(levels)?;
        Ok(outer_prod(&ket, &ket))
    }

    /// Labels of every product basis state, in the order used by vectors
    /// over the full space.
    pub fn basis_labels(&self) -> Vec<Vec<&str>> {
        self.species.iter()
            .map(|q| q.energy_levels.iter().map(String::as_str))
            .multi_cartesian_product()
            .collect()
    }
}
