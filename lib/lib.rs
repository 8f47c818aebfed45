#![allow(non_snake_case)]

//! Construct operators over tensor-product spaces of multilevel quantum
//! systems from declarative transition recipes, pair them with sampled pulse
//! envelopes, and evolve the result.

pub mod error;
pub mod utils;
pub mod hilbert;
pub mod operator;
pub mod pulse;
pub mod hamiltonian;
pub mod noise;
pub mod evolve;
pub mod qsim;
pub mod experiment;

pub use error::{ QSimError, QSimResult };
pub use hilbert::{ Quanta, QSystem };
pub use operator::{ Combine, Operator, Recipe, Target, Transition };
pub use pulse::{ Pulse, PulseShape, PulseSpec };
pub use hamiltonian::{ CompiledHamiltonian, CompiledTerm, Hamiltonian };
pub use noise::Noise;
pub use evolve::{ Rk4Solver, Solver, SolverOptions, State };
pub use qsim::{ QSim, Status };
pub use experiment::Experiment;
