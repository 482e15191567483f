//! # Hdf5 input / output
//! Controls and trajectories are stored as `f64` datasets,
//! trajectories with shape (snapshots, nodes, dof).
//!
//! Requires feature `hdf5` (sudo apt-get install -y libhdf5-dev).
use crate::error::{InverseError, Result};
use crate::field::FieldTrajectory;
use ndarray::{Array, Array1, Array3, ArrayBase, ArrayD, Data, Dimension};
use std::path::Path;

/// Read ndarray from hdf5 file
///
/// # Errors
/// Errors when file/variable does not exist or
/// when the dataset has the wrong dimensionality.
pub fn read_from_hdf5<D>(filename: &str, varname: &str) -> Result<Array<f64, D>>
where
    D: Dimension,
{
    let file = hdf5::File::open(filename)?;
    let data = file.dataset(varname)?;
    let y: ArrayD<f64> = data.read_dyn::<f64>()?;
    let ndim = y.ndim();
    y.into_dimensionality::<D>().map_err(|_| {
        InverseError::Config(format!(
            "dataset {} has {} dimensions, expected {:?}",
            varname,
            ndim,
            D::NDIM
        ))
    })
}

/// Write ndarray to hdf5 file
///
/// # Errors
/// When file can not be created or when file and
/// variable exist, but the variable has a different
/// shape than the input array.
pub fn write_to_hdf5<S, D>(filename: &str, varname: &str, array: &ArrayBase<S, D>) -> Result<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let file = if Path::new(filename).exists() {
        hdf5::File::append(filename)?
    } else {
        hdf5::File::create(filename)?
    };
    let dset = match file.dataset(varname) {
        Ok(dset) => dset,
        Err(..) => file
            .new_dataset::<f64>()
            .no_chunk()
            .shape(array.shape())
            .create(varname)?,
    };
    dset.write(&array.view())?;
    Ok(())
}

/// Write control vector to dataset `name`
///
/// # Errors
/// See [`write_to_hdf5`].
pub fn write_control(filename: &str, name: &str, control: &Array1<f64>) -> Result<()> {
    write_to_hdf5(filename, name, control)
}

/// Read control vector from dataset `name`
///
/// # Errors
/// See [`read_from_hdf5`].
pub fn read_control(filename: &str, name: &str) -> Result<Array1<f64>> {
    read_from_hdf5(filename, name)
}

impl FieldTrajectory {
    /// Write snapshots to dataset `name`
    ///
    /// # Errors
    /// See [`write_to_hdf5`].
    pub fn write(&self, filename: &str, name: &str) -> Result<()> {
        write_to_hdf5(filename, name, &self.v)
    }

    /// Read snapshots from dataset `name`
    ///
    /// # Errors
    /// See [`read_from_hdf5`].
    pub fn read(filename: &str, name: &str) -> Result<Self> {
        let v: Array3<f64> = read_from_hdf5(filename, name)?;
        Ok(Self::from_array(v))
    }
}
