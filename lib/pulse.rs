//! Time-varying pulse envelopes sampled over a uniform time grid.

use std::{ fmt, str::FromStr };
use ndarray as nd;
use rustc_hash::FxHashMap as HashMap;
use serde::Deserialize;
use crate::error::{ QSimError, QSimResult };

/// Build `sample_count` evenly spaced times over `[0, total_time]`, inclusive
/// of both endpoints.
///
/// A single sample sits at `t = 0`. The last sample of a longer grid is exactly
/// `total_time`.
pub fn time_grid(total_time: f64, sample_count: usize)
    -> QSimResult<nd::Array1<f64>>
{
    if sample_count == 0 || !total_time.is_finite() || total_time < 0.0 {
        return Err(QSimError::InvalidGrid { total_time, sample_count });
    }
    if sample_count == 1 {
        return Ok(nd::array![0.0]);
    }
    let last = sample_count - 1;
    let dt = total_time / last as f64;
    Ok(
        (0..sample_count)
            .map(|k| if k == last { total_time } else { dt * k as f64 })
            .collect()
    )
}

/// Named envelope shapes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PulseShape {
    /// `amplitude`
    Square,
    /// `amplitude * cos(a t + b)`
    Cosine,
    /// `amplitude * sin(a t + b)`
    Sine,
    /// Flat-bottomed Gaussian centered on the middle of the grid, reaching zero
    /// at both ends.
    SuperGaussian,
}

impl FromStr for PulseShape {
    type Err = QSimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "square" => Ok(Self::Square),
            "cos" | "cosine" => Ok(Self::Cosine),
            "sin" | "sine" => Ok(Self::Sine),
            "super_gaussian" | "supergaussian" => Ok(Self::SuperGaussian),
            _ => Err(QSimError::UnknownPulseShape(s.to_string())),
        }
    }
}

impl fmt::Display for PulseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl PulseShape {
    /// Canonical name of the shape.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Cosine => "cos",
            Self::Sine => "sin",
            Self::SuperGaussian => "super_gaussian",
        }
    }

    /// Names of the parameters the shape requires.
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::Square => &["amplitude"],
            Self::Cosine | Self::Sine => &["amplitude", "a", "b"],
            Self::SuperGaussian => &["amplitude", "tau"],
        }
    }
}

/// A shape with its parameters resolved.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Envelope {
    Square { amplitude: f64 },
    Cosine { amplitude: f64, a: f64, b: f64 },
    Sine { amplitude: f64, a: f64, b: f64 },
    SuperGaussian { amplitude: f64, tau: f64 },
}

impl Envelope {
    /// Resolve the parameters of a shape from a name-value mapping.
    ///
    /// Parameters not used by the shape are ignored; the first of
    /// [`PulseShape::required_params`] that is absent is reported.
    pub fn from_params(shape: PulseShape, params: &HashMap<String, f64>)
        -> QSimResult<Self>
    {
        if let Some(&param)
            = shape.required_params().iter()
            .find(|p| !params.contains_key(**p))
        {
            return Err(QSimError::MissingParameter { shape: shape.name(), param });
        }
        let get = |param: &'static str| -> QSimResult<f64> {
            params.get(param).copied()
                .ok_or(QSimError::MissingParameter {
                    shape: shape.name(),
                    param,
                })
        };
        match shape {
            PulseShape::Square => Ok(Self::Square {
                amplitude: get("amplitude")?,
            }),
            PulseShape::Cosine => Ok(Self::Cosine {
                amplitude: get("amplitude")?,
                a: get("a")?,
                b: get("b")?,
            }),
            PulseShape::Sine => Ok(Self::Sine {
                amplitude: get("amplitude")?,
                a: get("a")?,
                b: get("b")?,
            }),
            PulseShape::SuperGaussian => {
                let amplitude = get("amplitude")?;
                let tau = get("tau")?;
                if tau <= 0.0 || !tau.is_finite() {
                    return Err(QSimError::InvalidParameter {
                        param: "tau",
                        value: tau,
                        reason: "width must be positive and finite",
                    });
                }
                Ok(Self::SuperGaussian { amplitude, tau })
            },
        }
    }

    /// Shape of the envelope.
    pub fn shape(&self) -> PulseShape {
        match self {
            Self::Square { .. } => PulseShape::Square,
            Self::Cosine { .. } => PulseShape::Cosine,
            Self::Sine { .. } => PulseShape::Sine,
            Self::SuperGaussian { .. } => PulseShape::SuperGaussian,
        }
    }

    /// Sample the envelope over a time grid.
    ///
    /// `time` is assumed to start at 0 and end at the total pulse time.
    pub fn sample(&self, time: &nd::Array1<f64>) -> nd::Array1<f64> {
        match *self {
            Self::Square { amplitude } => time.mapv(|_| amplitude),
            Self::Cosine { amplitude, a, b }
                => time.mapv(|t| amplitude * (a * t + b).cos()),
            Self::Sine { amplitude, a, b }
                => time.mapv(|t| amplitude * (a * t + b).sin()),
            Self::SuperGaussian { amplitude, tau } => {
                let t_total = time.len().checked_sub(1)
                    .map(|k| time[k])
                    .unwrap_or(0.0);
                let t_mid = t_total / 2.0;
                let floor = (-(t_mid / tau).powi(2)).exp();
                if floor >= 1.0 { return time.mapv(|_| amplitude); }
                time.mapv(|t| {
                    amplitude
                        * ((-((t - t_mid) / tau).powi(2)).exp() - floor)
                        / (1.0 - floor)
                })
            },
        }
    }
}

fn default_constant() -> f64 { 1.0 }

/// Caller-facing pulse description, as produced by a front end or experiment
/// file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PulseSpec {
    pub shape: String,
    #[serde(default = "default_constant")]
    pub constant: f64,
    #[serde(default)]
    pub phase: f64,
    #[serde(default)]
    pub params: HashMap<String, f64>,
}

impl PulseSpec {
    /// Create a new `PulseSpec` with default `constant` and `phase`.
    pub fn new<S, I, K>(shape: S, params: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            shape: shape.into(),
            constant: default_constant(),
            phase: 0.0,
            params: params.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A pulse envelope attached to one Hamiltonian term.
///
/// `constant` and `phase` are carried for callers but do not enter the
/// sampled series.
#[derive(Clone, Debug, PartialEq)]
pub struct Pulse {
    envelope: Envelope,
    params: HashMap<String, f64>,
    constant: f64,
    phase: f64,
}

impl Pulse {
    /// Create a new `Pulse`, checking that all required parameters are
    /// present.
    pub fn new(shape: PulseShape, params: HashMap<String, f64>)
        -> QSimResult<Self>
    {
        let envelope = Envelope::from_params(shape, &params)?;
        Ok(Self { envelope, params, constant: 1.0, phase: 0.0 })
    }

    /// Create a new `Pulse` from a caller-facing description.
    pub fn from_spec(spec: &PulseSpec) -> QSimResult<Self> {
        let shape: PulseShape = spec.shape.parse()?;
        Ok(
            Self::new(shape, spec.params.clone())?
                .with_constant(spec.constant)
                .with_phase(spec.phase)
        )
    }

    /// Set the reserved scaling field.
    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant = constant;
        self
    }

    /// Set the reserved phase field.
    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase;
        self
    }

    pub fn shape(&self) -> PulseShape { self.envelope.shape() }

    pub fn envelope(&self) -> &Envelope { &self.envelope }

    pub fn params(&self) -> &HashMap<String, f64> { &self.params }

    pub fn constant(&self) -> f64 { self.constant }

    pub fn phase(&self) -> f64 { self.phase }

    /// Sample the envelope at `sample_count` evenly spaced times over
    /// `[0, total_time]`.
    pub fn generate_samples(&self, total_time: f64, sample_count: usize)
        -> QSimResult<nd::Array1<f64>>
    {
        let time = time_grid(total_time, sample_count)?;
        Ok(self.envelope.sample(&time))
    }
}
