//! Time evolution of a compiled Hamiltonian.
//!
//! [`Solver`] is the seam between Hamiltonian compilation and numerical
//! integration: one entry point for closed-system (Schrödinger) evolution and
//! one for open-system (Lindblad) evolution. [`Rk4Solver`] is a built-in
//! implementation using fourth-order Runge-Kutta, with pulse samples linearly
//! interpolated between grid points.

use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    error::{ QSimError, QSimResult },
    hamiltonian::CompiledHamiltonian,
    hilbert::{ dagger, outer_prod },
};

/// A quantum state, either pure or mixed.
#[derive(Clone, Debug, PartialEq)]
pub enum State {
    Ket(nd::Array1<C64>),
    Density(nd::Array2<C64>),
}

impl From<nd::Array1<C64>> for State {
    fn from(ket: nd::Array1<C64>) -> Self { Self::Ket(ket) }
}

impl From<nd::Array2<C64>> for State {
    fn from(rho: nd::Array2<C64>) -> Self { Self::Density(rho) }
}

impl State {
    /// Dimension of the space the state lives in.
    pub fn dim(&self) -> usize {
        match self {
            Self::Ket(psi) => psi.len(),
            Self::Density(rho) => rho.nrows(),
        }
    }

    pub fn as_ket(&self) -> Option<&nd::Array1<C64>> {
        match self {
            Self::Ket(psi) => Some(psi),
            Self::Density(_) => None,
        }
    }

    pub fn as_density(&self) -> Option<&nd::Array2<C64>> {
        match self {
            Self::Ket(_) => None,
            Self::Density(rho) => Some(rho),
        }
    }

    /// Convert to a density matrix, taking `|ψ⟩⟨ψ|` for a ket.
    pub fn into_density(self) -> nd::Array2<C64> {
        match self {
            Self::Ket(psi) => outer_prod(&psi, &psi),
            Self::Density(rho) => rho,
        }
    }

    /// Occupation probability of each basis state.
    pub fn populations(&self) -> nd::Array1<f64> {
        match self {
            Self::Ket(psi) => psi.mapv(|a| a.norm_sqr()),
            Self::Density(rho) => rho.diag().mapv(|p| p.re),
        }
    }

    /// Overlap `⟨other|self⟩` for kets, `Tr(other† self)` for densities, and
    /// `⟨ψ|ρ|ψ⟩` for mixed combinations.
    ///
    /// Fails if the states live in spaces of different dimension or a density
    /// matrix is not square.
    pub fn overlap(&self, other: &Self) -> QSimResult<C64> {
        for state in [self, other] {
            if let Self::Density(rho) = state {
                if !rho.is_square() {
                    return Err(QSimError::DimensionMismatch {
                        expected: rho.nrows(),
                        got: rho.ncols(),
                    });
                }
            }
        }
        if self.dim() != other.dim() {
            return Err(QSimError::DimensionMismatch {
                expected: self.dim(),
                got: other.dim(),
            });
        }
        let ovlp
            = match (self, other) {
                (Self::Ket(a), Self::Ket(b))
                    => b.iter().zip(a).map(|(bi, ai)| bi.conj() * ai).sum(),
                (Self::Density(rho), Self::Ket(psi))
                | (Self::Ket(psi), Self::Density(rho))
                    => psi.mapv(|x| x.conj()).dot(&rho.dot(psi)),
                (Self::Density(a), Self::Density(b))
                    => dagger(b).dot(a).diag().sum(),
            };
        Ok(ovlp)
    }
}

/// Compute a "norm" of an object, treating it as a representation of a
/// quantum state.
pub trait StateNorm {
    fn norm(&self) -> C64;
}

/// The norm of a ket is the quadrature sum of its elements.
impl StateNorm for nd::Array1<C64> {
    fn norm(&self) -> C64 { self.mapv(|a| a * a.conj()).sum().sqrt() }
}

/// The norm of a density matrix is its trace.
impl StateNorm for nd::Array2<C64> {
    fn norm(&self) -> C64 { self.diag().iter().sum() }
}

/// Compute the commutator `[A, B] = A B - B A`.
pub fn commutator<SA, SB>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> nd::Array2<C64>
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    A.dot(B) - B.dot(A)
}

/// Compute the anti-commutator `{A, B} = A B + B A`.
pub fn anti_commutator<SA, SB>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> nd::Array2<C64>
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    A.dot(B) + B.dot(A)
}

/// Integration settings passed through to a [`Solver`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SolverOptions {
    /// Number of Runge-Kutta steps per grid interval.
    pub substeps: usize,
    /// Renormalize the state at every grid point.
    pub normalize: bool,
}

impl Default for SolverOptions {
    fn default() -> Self { Self { substeps: 10, normalize: true } }
}

/// Numerical integrator for a compiled Hamiltonian.
///
/// Both entry points return one state per grid point of the Hamiltonian, in
/// grid order, starting with the initial state.
pub trait Solver {
    /// Closed-system evolution.
    fn unitary(
        &mut self,
        hamiltonian: &CompiledHamiltonian,
        initial: &State,
        options: &SolverOptions,
    ) -> QSimResult<Vec<State>>;

    /// Open-system evolution under the Lindblad master equation with the
    /// given collapse operators.
    fn dissipative(
        &mut self,
        hamiltonian: &CompiledHamiltonian,
        initial: &State,
        collapse: &[nd::Array2<C64>],
        options: &SolverOptions,
    ) -> QSimResult<Vec<State>>;
}

// fourth-order Runge-Kutta over the grid of a compiled Hamiltonian, generic
// over the dimension of the quantum state array and the RHS of the ODE being
// solved
fn do_evolve<D, F>(
    z0: &nd::Array<C64, D>,
    hamiltonian: &CompiledHamiltonian,
    rhs: F,
    options: &SolverOptions,
) -> Vec<nd::Array<C64, D>>
where
    D: nd::Dimension,
    nd::Array<C64, D>: StateNorm,
    F: Fn(&nd::Array2<C64>, &nd::Array<C64, D>) -> nd::Array<C64, D>,
{
    let t = hamiltonian.time();
    let m = options.substeps;
    let mut z: Vec<nd::Array<C64, D>> = Vec::with_capacity(t.len());
    let mut z_old: nd::Array<C64, D> = z0.clone();
    let mut hk: nd::Array2<C64>;
    let mut hkp1h: nd::Array2<C64>;
    let mut hkp1: nd::Array2<C64>;
    let mut k1: nd::Array<C64, D>;
    let mut k2: nd::Array<C64, D>;
    let mut k3: nd::Array<C64, D>;
    let mut k4: nd::Array<C64, D>;
    let mut norm: C64;
    z.push(z0.clone());
    let iter = t.iter().zip(t.iter().skip(1));
    for (&tk, &tkp1) in iter {
        let dt = (tkp1 - tk) / m as f64;
        for j in 0..m {
            let ts = tk + dt * j as f64;
            hk = hamiltonian.matrix_at_time(ts);
            hkp1h = hamiltonian.matrix_at_time(ts + dt / 2.0);
            hkp1 = hamiltonian.matrix_at_time(ts + dt);
            k1 = rhs(&hk, &z_old);
            k2 = rhs(&hkp1h, &(&z_old + &k1 * (dt / 2.0)));
            k3 = rhs(&hkp1h, &(&z_old + &k2 * (dt / 2.0)));
            k4 = rhs(&hkp1, &(&z_old + &k3 * dt));
            z_old = &z_old + &((k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0));
        }
        if options.normalize {
            norm = z_old.norm();
            z_old /= norm;
        }
        z.push(z_old.clone());
    }
    z
}

/// Built-in fourth-order Runge-Kutta solver.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rk4Solver;

impl Rk4Solver {
    fn check(
        hamiltonian: &CompiledHamiltonian,
        initial: &State,
        options: &SolverOptions,
    ) -> QSimResult<()>
    {
        if options.substeps == 0 {
            return Err(QSimError::Solver(
                "at least one substep per grid interval is required".into()
            ));
        }
        if initial.dim() != hamiltonian.dim() {
            return Err(QSimError::DimensionMismatch {
                expected: hamiltonian.dim(),
                got: initial.dim(),
            });
        }
        if let State::Density(rho) = initial {
            if !rho.is_square() {
                return Err(QSimError::Solver(
                    "density matrix must be square".into()
                ));
            }
        }
        let norm = match initial {
            State::Ket(psi) => psi.norm(),
            State::Density(rho) => rho.norm(),
        };
        if norm.norm() == 0.0 {
            return Err(QSimError::Solver("initial state has zero norm".into()));
        }
        Ok(())
    }

    fn lindblad(
        hamiltonian: &CompiledHamiltonian,
        rho0: &nd::Array2<C64>,
        collapse: &[nd::Array2<C64>],
        options: &SolverOptions,
    ) -> Vec<State>
    {
        let jumps: Vec<(&nd::Array2<C64>, nd::Array2<C64>, nd::Array2<C64>)>
            = collapse.iter()
            .map(|L| {
                let Ld = dagger(L);
                let LdL = Ld.dot(L);
                (L, Ld, LdL)
            })
            .collect();
        let rhs = |h: &nd::Array2<C64>, rho: &nd::Array2<C64>| {
            let mut drho = -C64::i() * commutator(h, rho);
            for (L, Ld, LdL) in jumps.iter() {
                drho += &L.dot(rho).dot(Ld);
                drho.scaled_add(C64::from(-0.5), &anti_commutator(LdL, rho));
            }
            drho
        };
        do_evolve(rho0, hamiltonian, rhs, options)
            .into_iter()
            .map(State::Density)
            .collect()
    }
}

impl Solver for Rk4Solver {
    fn unitary(
        &mut self,
        hamiltonian: &CompiledHamiltonian,
        initial: &State,
        options: &SolverOptions,
    ) -> QSimResult<Vec<State>>
    {
        Self::check(hamiltonian, initial, options)?;
        debug!(
            dim = hamiltonian.dim(),
            n_times = hamiltonian.time().len(),
            "integrating Schrödinger equation"
        );
        match initial {
            State::Ket(psi0) => {
                let rhs = |h: &nd::Array2<C64>, psi: &nd::Array1<C64>| {
                    -C64::i() * h.dot(psi)
                };
                Ok(
                    do_evolve(psi0, hamiltonian, rhs, options)
                        .into_iter()
                        .map(State::Ket)
                        .collect()
                )
            },
            State::Density(rho0)
                => Ok(Self::lindblad(hamiltonian, rho0, &[], options)),
        }
    }

    fn dissipative(
        &mut self,
        hamiltonian: &CompiledHamiltonian,
        initial: &State,
        collapse: &[nd::Array2<C64>],
        options: &SolverOptions,
    ) -> QSimResult<Vec<State>>
    {
        Self::check(hamiltonian, initial, options)?;
        let dim = hamiltonian.dim();
        if let Some(bad) = collapse.iter().find(|L| L.shape() != [dim, dim]) {
            return Err(QSimError::DimensionMismatch {
                expected: dim,
                got: bad.nrows(),
            });
        }
        debug!(
            dim,
            n_times = hamiltonian.time().len(),
            n_collapse = collapse.len(),
            "integrating Lindblad equation"
        );
        let rho0 = initial.clone().into_density();
        Ok(Self::lindblad(hamiltonian, &rho0, collapse, options))
    }
}
