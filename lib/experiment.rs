//! Declarative experiment descriptions loaded from TOML.
//!
//! ```toml
//! system = ["Rb", "Rb"]
//!
//! [[species]]
//! name = "Rb"
//! levels = ["g", "e"]
//!
//! [[terms]]
//! key = "Omega"
//! constant = [1.0, 0.0]
//! transitions = [[["e"], ["g"]], [["g"], ["e"]]]
//! ops = ["+"]
//! targets = "all"
//! [terms.pulse]
//! shape = "cos"
//! params = { amplitude = 1.0, a = 6.28, b = 0.0 }
//!
//! [run]
//! initial = ["g", "g"]
//! total_time = 1.0
//! samples = 101
//! ```

use std::{ path::Path, rc::Rc };
use itertools::Itertools;
use num_complex::Complex64 as C64;
use rustc_hash::FxHashMap as HashMap;
use serde::Deserialize;
use tracing::debug;
use crate::{
    error::{ QSimError, QSimResult },
    evolve::{ SolverOptions, State },
    hilbert::{ QSystem, Quanta },
    operator::{ Combine, Recipe, Target, Transition },
    pulse::PulseSpec,
    qsim::QSim,
};

/// A species declaration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    pub levels: Vec<String>,
}

/// Which target tuples a recipe is applied to.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Targets {
    /// Only `"all"` is accepted.
    Keyword(String),
    Explicit(Target),
}

impl Default for Targets {
    fn default() -> Self { Self::Keyword("all".into()) }
}

/// Every increasing combination of `arity` indices out of `n` subsystems.
pub fn all_targets(n: usize, arity: usize) -> Target {
    (0..n).combinations(arity).collect()
}

fn default_constant() -> [f64; 2] { [1.0, 0.0] }

/// Recipe fields shared by Hamiltonian terms and collapse operators.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RecipeConfig {
    pub key: String,
    /// Real and imaginary parts.
    #[serde(default = "default_constant")]
    pub constant: [f64; 2],
    pub transitions: Vec<(Vec<String>, Vec<String>)>,
    #[serde(default)]
    pub ops: Vec<String>,
    #[serde(default)]
    pub targets: Targets,
}

impl RecipeConfig {
    pub fn recipe(&self) -> QSimResult<Recipe> {
        let transitions: Vec<Transition>
            = self.transitions.iter()
            .map(|(ket, bra)| Transition::new(ket, bra))
            .collect();
        let ops: Vec<Combine>
            = self.ops.iter()
            .map(|op| op.parse::<Combine>())
            .collect::<QSimResult<_>>()?;
        let [re, im] = self.constant;
        Ok(Recipe::new(transitions, ops, C64::new(re, im)))
    }

    /// Resolve `targets` against a system of `n` subsystems.
    pub fn targets(&self, n: usize) -> QSimResult<Target> {
        match &self.targets {
            Targets::Explicit(target) => Ok(target.clone()),
            Targets::Keyword(kw) if kw == "all" => {
                let arity
                    = self.transitions.first()
                    .map(|(ket, _)| ket.len())
                    .ok_or_else(|| QSimError::MalformedRecipe(
                        format!("term `{}` has no transitions", self.key)
                    ))?;
                Ok(all_targets(n, arity))
            },
            Targets::Keyword(kw) => Err(QSimError::MalformedRecipe(
                format!("unknown target keyword `{}`", kw)
            )),
        }
    }
}

/// A driven Hamiltonian term.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TermConfig {
    #[serde(flatten)]
    pub recipe: RecipeConfig,
    pub pulse: PulseSpec,
}

fn default_substeps() -> usize { SolverOptions::default().substeps }

fn default_normalize() -> bool { SolverOptions::default().normalize }

/// Run parameters.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RunConfig {
    /// One level symbol per subsystem.
    pub initial: Vec<String>,
    pub total_time: f64,
    pub samples: usize,
    #[serde(default = "default_substeps")]
    pub substeps: usize,
    #[serde(default = "default_normalize")]
    pub normalize: bool,
    /// Start from `|s⟩⟨s|` instead of `|s⟩`.
    #[serde(default)]
    pub density: bool,
}

/// A full experiment file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Experiment {
    /// Species names in tensor-factor order.
    pub system: Vec<String>,
    pub species: Vec<SpeciesConfig>,
    #[serde(default)]
    pub terms: Vec<TermConfig>,
    #[serde(default)]
    pub noise: Vec<RecipeConfig>,
    pub run: RunConfig,
}

impl Experiment {
    pub fn from_toml_str(s: &str) -> QSimResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load<P>(path: P) -> QSimResult<Self>
    where P: AsRef<Path>
    {
        let infile = path.as_ref();
        debug!(path = %infile.display(), "loading experiment");
        let table = std::fs::read_to_string(infile)?;
        Self::from_toml_str(&table)
    }

    /// Build the system, sharing one [`Quanta`] per declared species.
    pub fn build_system(&self) -> QSimResult<QSystem> {
        let mut declared: HashMap<&str, Rc<Quanta>> = HashMap::default();
        for sp in self.species.iter() {
            let quanta = Quanta::new(sp.name.as_str(), sp.levels.iter())?;
            if declared.insert(sp.name.as_str(), Rc::new(quanta)).is_some() {
                return Err(QSimError::DuplicateKey(sp.name.clone()));
            }
        }
        self.system.iter()
            .map(|name| {
                declared.get(name.as_str())
                    .cloned()
                    .ok_or_else(|| QSimError::UnknownSpecies(name.clone()))
            })
            .collect::<QSimResult<Vec<_>>>()
            .map(QSystem::from)
    }

    /// Register every term and collapse operator on `sim`.
    pub fn configure(&self, sim: &mut QSim<'_>) -> QSimResult<()> {
        let n = sim.qsystem().num_subsystems();
        for term in self.terms.iter() {
            let recipe = term.recipe.recipe()?;
            let target = term.recipe.targets(n)?;
            sim.add_operator(term.recipe.key.as_str(), target, &term.pulse, &recipe)?;
        }
        for c in self.noise.iter() {
            let recipe = c.recipe()?;
            let target = c.targets(n)?;
            sim.add_noise(c.key.as_str(), target, &recipe)?;
        }
        Ok(())
    }

    pub fn initial_state(&self, qsystem: &QSystem) -> QSimResult<State> {
        if self.run.density {
            qsystem.basis_density(self.run.initial.as_slice()).map(State::from)
        } else {
            qsystem.basis_state(self.run.initial.as_slice()).map(State::from)
        }
    }

    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            substeps: self.run.substeps,
            normalize: self.run.normalize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qsim::Status;

    const RABI: &str = r#"
system = ["Rb", "Rb", "Rb"]

[[species]]
name = "Rb"
levels = ["g", "e"]

[[terms]]
key = "Omega"
constant = [0.5, 0.0]
transitions = [[["e"], ["g"]], [["g"], ["e"]]]
ops = ["+"]
[terms.pulse]
shape = "cos"
params = { amplitude = 1.0, a = 6.28, b = 0.0 }

[[terms]]
key = "V"
transitions = [[["e", "e"], ["e", "e"]]]
targets = [[0, 1], [1, 2]]
[terms.pulse]
shape = "square"
params = { amplitude = 2.0 }

[[noise]]
key = "decay"
constant = [0.1, 0.0]
transitions = [[["g"], ["e"]]]

[run]
initial = ["g", "g", "g"]
total_time = 1.0
samples = 11
"#;

    #[test]
    fn parse_and_configure() {
        let exp = Experiment::from_toml_str(RABI).unwrap();
        assert_eq!(exp.terms.len(), 2);
        assert_eq!(exp.terms[0].pulse.constant, 1.0);
        assert_eq!(exp.terms[1].recipe.constant, [1.0, 0.0]);
        assert_eq!(exp.run.substeps, SolverOptions::default().substeps);
        assert!(!exp.run.density);

        let sys = exp.build_system().unwrap();
        assert_eq!(sys.dims(), vec![2, 2, 2]);
        assert_eq!(exp.terms[0].recipe.targets(3).unwrap(), vec![vec![0], vec![1], vec![2]]);

        let mut sim = QSim::new(&sys);
        exp.configure(&mut sim).unwrap();
        assert_eq!(sim.status(), Status::Configured);
        assert_eq!(sim.hamiltonian().keys().collect::<Vec<_>>(), vec!["Omega", "V"]);
        assert_eq!(sim.noise().len(), 1);
        assert_eq!(sim.noise().get("decay").unwrap().target().len(), 3);

        let psi0 = exp.initial_state(&sys).unwrap();
        assert_eq!(psi0.populations()[0], 1.0);
    }

    #[test]
    fn all_targets_by_arity() {
        assert_eq!(all_targets(3, 1), vec![vec![0], vec![1], vec![2]]);
        assert_eq!(all_targets(3, 2), vec![vec![0, 1], vec![0, 2], vec![1, 2]]);
        assert!(all_targets(1, 2).is_empty());
    }

    #[test]
    fn unknown_species_and_keyword() {
        let bad = RABI.replace(r#"system = ["Rb", "Rb", "Rb"]"#, r#"system = ["Rb", "Sr"]"#);
        let exp = Experiment::from_toml_str(&bad).unwrap();
        assert!(matches!(exp.build_system(), Err(QSimError::UnknownSpecies(s)) if s == "Sr"));

        let bad = RABI.replace("targets = [[0, 1], [1, 2]]", r#"targets = "some""#);
        let exp = Experiment::from_toml_str(&bad).unwrap();
        let sys = exp.build_system().unwrap();
        let mut sim = QSim::new(&sys);
        assert!(matches!(exp.configure(&mut sim), Err(QSimError::MalformedRecipe(_))));
    }

    #[test]
    fn bad_ops_and_shapes() {
        let bad = RABI.replace(r#"ops = ["+"]"#, r#"ops = ["*"]"#);
        let exp = Experiment::from_toml_str(&bad).unwrap();
        assert!(matches!(exp.terms[0].recipe.recipe(), Err(QSimError::MalformedRecipe(_))));

        let bad = RABI.replace(r#"shape = "cos""#, r#"shape = "triangle""#);
        let exp = Experiment::from_toml_str(&bad).unwrap();
        let sys = exp.build_system().unwrap();
        let mut sim = QSim::new(&sys);
        assert!(matches!(exp.configure(&mut sim), Err(QSimError::UnknownPulseShape(_))));

        assert!(matches!(
            Experiment::from_toml_str("system = 3"),
            Err(QSimError::Config(_))
        ));
    }
}
