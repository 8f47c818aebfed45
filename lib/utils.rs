//! Output helpers.

use ndarray as nd;
use crate::evolve::State;

/// Create a directory and all its parents, evaluating to a
/// [`QSimResult`][crate::error::QSimResult].
#[macro_export]
macro_rules! mkdir {
    ( $dir:expr ) => {
        std::fs::create_dir_all($dir.as_path())
            .map_err($crate::error::QSimError::from)
    }
}

/// Write a series of named arrays to a `.npz` archive, evaluating to a
/// [`QSimResult`][crate::error::QSimResult].
///
/// ```ignore
/// write_npz!(
///     outdir.join("run.npz"),
///     arrays: {
///         "time" => &time,
///         "populations" => &populations,
///     }
/// )?;
/// ```
#[macro_export]
macro_rules! write_npz {
    (
        $filepath:expr,
        arrays: { $( $key:literal => $arr:expr ),* $(,)? }
    ) => {
        (|| -> $crate::error::QSimResult<()> {
            let mut output
                = ndarray_npy::NpzWriter::new(std::fs::File::create($filepath)?);
            $(
                output.add_array($key, $arr)?;
            )*
            output.finish()?;
            Ok(())
        })()
    }
}

/// Stack the basis-state populations of a trajectory into an array of shape
/// `(dim, n_times)`.
pub fn populations(states: &[State]) -> nd::Array2<f64> {
    let dim = states.first().map(State::dim).unwrap_or(0);
    let mut out: nd::Array2<f64> = nd::Array2::zeros((dim, states.len()));
    out.axis_iter_mut(nd::Axis(1))
        .zip(states)
        .for_each(|(mut col, state)| col.assign(&state.populations()));
    out
}
