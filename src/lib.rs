pub mod atmosphere;
pub mod config;
pub mod constants;
pub mod io;
pub mod model;
pub mod pet;
pub mod pipeline;
pub mod radiation;
pub mod summary;
#[cfg(feature = "python")]
mod utils;

pub use config::{load_config, Config};
pub use model::{Error, InvalidInput, Observation, PetEstimate};
pub use pet::priestley_taylor::{estimate, estimate_all, simulate, Params};

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use utils::register_submodule;

#[cfg(feature = "python")]
#[pymodule]
fn pet_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();

    register_submodule(py, m, &pet::make_module(py)?, "pet_rs")?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}

#[cfg(feature = "python")]
pyo3_stub_gen::define_stub_info_gatherer!(stub_info);
