pub mod priestley_taylor;

#[cfg(feature = "python")]
use crate::utils::register_submodule;
#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
pub fn make_module(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let m = PyModule::new(py, "pet")?;
    register_submodule(py, &m, &priestley_taylor::make_module(py)?, "pet_rs.pet")?;
    Ok(m)
}
