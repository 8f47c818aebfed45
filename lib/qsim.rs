//! Top-level facade tying a system, its Hamiltonian, and its noise model to a
//! run.
//!
//! A [`QSim`] moves through [`Status`] as terms are registered and runs are
//! performed. Any term added after a run sends it back to
//! [`Status::Configured`].

use std::fmt;
use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::{ info, warn };
use crate::{
    error::{ QSimError, QSimResult },
    evolve::{ Solver, SolverOptions, State },
    hamiltonian::{ CompiledHamiltonian, Hamiltonian },
    hilbert::QSystem,
    noise::Noise,
    operator::{ Recipe, Target },
    pulse::PulseSpec,
};

/// Lifecycle of a [`QSim`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// No terms registered yet.
    Constructed,
    /// At least one term registered since the last run.
    Configured,
    /// Hamiltonian compiled, solver not yet returned.
    Compiled,
    /// Last run returned successfully.
    Completed,
    /// Last run failed.
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Constructed => "constructed",
            Self::Configured => "configured",
            Self::Compiled => "compiled",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// A simulation over a fixed [`QSystem`].
#[derive(Clone, Debug)]
pub struct QSim<'a> {
    qsystem: &'a QSystem,
    hamiltonian: Hamiltonian<'a>,
    noise: Noise<'a>,
    status: Status,
}

impl<'a> QSim<'a> {
    pub fn new(qsystem: &'a QSystem) -> Self {
        Self {
            qsystem,
            hamiltonian: Hamiltonian::new(qsystem),
            noise: Noise::new(qsystem),
            status: Status::Constructed,
        }
    }

    pub fn qsystem(&self) -> &'a QSystem { self.qsystem }

    pub fn hamiltonian(&self) -> &Hamiltonian<'a> { &self.hamiltonian }

    pub fn noise(&self) -> &Noise<'a> { &self.noise }

    pub fn status(&self) -> Status { self.status }

    /// Register a driven Hamiltonian term.
    ///
    /// `target` must hold at least one tuple.
    pub fn add_operator<K>(
        &mut self,
        key: K,
        target: Target,
        pulse: &PulseSpec,
        recipe: &Recipe,
    ) -> QSimResult<()>
    where K: Into<String>
    {
        if target.is_empty() {
            return Err(QSimError::MalformedRecipe("empty target".into()));
        }
        self.hamiltonian.add_term(key, target, pulse, recipe)?;
        self.status = Status::Configured;
        Ok(())
    }

    /// Register a collapse operator. Any collapse operator makes subsequent
    /// runs dissipative.
    pub fn add_noise<K>(&mut self, key: K, target: Target, recipe: &Recipe)
        -> QSimResult<()>
    where K: Into<String>
    {
        self.noise.add(key, target, recipe)?;
        self.status = Status::Configured;
        Ok(())
    }

    /// Compile the Hamiltonian over `sample_count` points on
    /// `[0, total_time]`.
    pub fn compile(&self, total_time: f64, sample_count: usize)
        -> QSimResult<CompiledHamiltonian>
    {
        self.hamiltonian.compile(total_time, sample_count)
    }

    /// Compile and hand off to `solver`.
    ///
    /// Without collapse operators this calls [`Solver::unitary`], otherwise
    /// [`Solver::dissipative`]. Exactly one entry point is called per run.
    pub fn run<S>(
        &mut self,
        solver: &mut S,
        initial: &State,
        total_time: f64,
        sample_count: usize,
        options: &SolverOptions,
    ) -> QSimResult<Vec<State>>
    where S: Solver + ?Sized
    {
        if self.hamiltonian.is_empty() {
            warn!("running with an empty Hamiltonian");
        }
        let compiled = self.compile(total_time, sample_count)
            .map_err(|e| { self.status = Status::Failed; e })?;
        self.status = Status::Compiled;
        let result
            = if self.noise.is_empty() {
                info!(
                    terms = compiled.len(),
                    total_time,
                    sample_count,
                    "running unitary evolution"
                );
                solver.unitary(&compiled, initial, options)
            } else {
                let collapse: Vec<nd::Array2<C64>> = self.noise.compile();
                info!(
                    terms = compiled.len(),
                    collapse = collapse.len(),
                    total_time,
                    sample_count,
                    "running dissipative evolution"
                );
                solver.dissipative(&compiled, initial, &collapse, options)
            };
        match result {
            Ok(states) => {
                self.status = Status::Completed;
                Ok(states)
            },
            Err(e) => {
                warn!(error = %e, "run failed");
                self.status = Status::Failed;
                Err(e)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use super::*;
    use crate::{
        hilbert::Quanta,
        operator::{ Combine, Transition },
    };

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    enum Call { Unitary, Dissipative(usize) }

    // records which entry point was hit and echoes the initial state once per
    // grid point
    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        fail: bool,
    }

    impl Recorder {
        fn echo(&self, h: &CompiledHamiltonian, initial: &State)
            -> QSimResult<Vec<State>>
        {
            if self.fail {
                Err(QSimError::Solver("forced failure".into()))
            } else {
                Ok(vec![initial.clone(); h.time().len()])
            }
        }
    }

    impl Solver for Recorder {
        fn unitary(
            &mut self,
            hamiltonian: &CompiledHamiltonian,
            initial: &State,
            _options: &SolverOptions,
        ) -> QSimResult<Vec<State>>
        {
            self.calls.push(Call::Unitary);
            self.echo(hamiltonian, initial)
        }

        fn dissipative(
            &mut self,
            hamiltonian: &CompiledHamiltonian,
            initial: &State,
            collapse: &[nd::Array2<C64>],
            _options: &SolverOptions,
        ) -> QSimResult<Vec<State>>
        {
            self.calls.push(Call::Dissipative(collapse.len()));
            self.echo(hamiltonian, initial)
        }
    }

    fn qubits() -> QSystem {
        let q = Rc::new(Quanta::new("Rb", ["g", "e"]).unwrap());
        QSystem::new([q.clone(), q])
    }

    fn drive() -> (PulseSpec, Recipe) {
        (
            PulseSpec::new("square", [("amplitude", 1.0)]),
            Recipe::new(
                vec![Transition::new(["e"], ["g"]), Transition::new(["g"], ["e"])],
                vec![Combine::Add],
                0.5,
            ),
        )
    }

    #[test]
    fn dispatch_unitary() {
        let sys = qubits();
        let mut sim = QSim::new(&sys);
        assert_eq!(sim.status(), Status::Constructed);
        let (pulse, recipe) = drive();
        sim.add_operator("drive", vec![vec![0], vec![1]], &pulse, &recipe)
            .unwrap();
        assert_eq!(sim.status(), Status::Configured);
        let psi0: State = sys.basis_state(&["g", "g"]).unwrap().into();
        let mut solver = Recorder::default();
        let states = sim.run(&mut solver, &psi0, 1.0, 5, &SolverOptions::default())
            .unwrap();
        assert_eq!(states.len(), 5);
        assert_eq!(solver.calls, vec![Call::Unitary]);
        assert_eq!(sim.status(), Status::Completed);
    }

    #[test]
    fn dispatch_dissipative() {
        let sys = qubits();
        let mut sim = QSim::new(&sys);
        let (pulse, recipe) = drive();
        sim.add_operator("drive", vec![vec![0]], &pulse, &recipe).unwrap();
        let decay = Recipe::single(Transition::new(["g"], ["e"]), 0.1);
        sim.add_noise("decay0", vec![vec![0]], &decay).unwrap();
        sim.add_noise("decay1", vec![vec![1]], &decay).unwrap();
        let psi0: State = sys.basis_state(&["e", "e"]).unwrap().into();
        let mut solver = Recorder::default();
        sim.run(&mut solver, &psi0, 1.0, 3, &SolverOptions::default()).unwrap();
        assert_eq!(solver.calls, vec![Call::Dissipative(2)]);
    }

    #[test]
    fn status_transitions() {
        let sys = qubits();
        let mut sim = QSim::new(&sys);
        let (pulse, recipe) = drive();
        sim.add_operator("a", vec![vec![0]], &pulse, &recipe).unwrap();
        let psi0: State = sys.basis_state(&["g", "g"]).unwrap().into();

        let mut failing = Recorder { fail: true, ..Recorder::default() };
        assert!(sim.run(&mut failing, &psi0, 1.0, 3, &SolverOptions::default())
            .is_err());
        assert_eq!(sim.status(), Status::Failed);

        let mut solver = Recorder::default();
        assert!(matches!(
            sim.run(&mut solver, &psi0, 1.0, 0, &SolverOptions::default()),
            Err(QSimError::InvalidGrid { .. })
        ));
        assert!(solver.calls.is_empty());
        assert_eq!(sim.status(), Status::Failed);

        sim.run(&mut solver, &psi0, 1.0, 3, &SolverOptions::default()).unwrap();
        assert_eq!(sim.status(), Status::Completed);
        sim.add_operator("b", vec![vec![1]], &pulse, &recipe).unwrap();
        assert_eq!(sim.status(), Status::Configured);
    }

    #[test]
    fn rejects_empty_target_and_duplicates() {
        let sys = qubits();
        let mut sim = QSim::new(&sys);
        let (pulse, recipe) = drive();
        assert!(matches!(
            sim.add_operator("a", vec![], &pulse, &recipe),
            Err(QSimError::MalformedRecipe(_))
        ));
        assert_eq!(sim.status(), Status::Constructed);
        sim.add_operator("a", vec![vec![0]], &pulse, &recipe).unwrap();
        assert!(matches!(
            sim.add_operator("a", vec![vec![1]], &pulse, &recipe),
            Err(QSimError::DuplicateKey(_))
        ));
        assert_eq!(sim.hamiltonian().len(), 1);
    }
}
