use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn};

use crate::alloc::Vec;
use crate::tensor::{Scalar, Tensor};
use crate::{Error, Result};

impl Tensor {
    /// Create a contiguous CPU tensor holding a copy of an array.
    ///
    /// The elements are copied in the logical order of the array, so the tensor is contiguous regardless of the
    /// memory order of the array.
    ///
    /// ```
    /// use functionalize::tensor::Tensor;
    ///
    /// let array = functionalize::ndarray::arr2(&[[1.0_f32, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    /// let tensor = Tensor::from_array(&array.t()).unwrap();
    /// assert_eq!(tensor.sizes(), vec![3, 2]);
    /// assert_eq!(tensor.strides(), vec![2, 1]);
    /// ```
    pub fn from_array<S, A, D>(array: &ArrayBase<A, D>) -> Result<Tensor>
    where
        S: Scalar,
        A: Data<Elem = S>,
        D: Dimension,
    {
        let sizes = array.shape().iter().map(|&s| s as i64).collect::<Vec<_>>();
        let data = array.iter().copied().collect::<Vec<_>>();
        Tensor::from_slice(&data, &sizes)
    }

    /// Copy the elements of the tensor into a new dynamic dimensional array.
    ///
    /// Fails under the same conditions as [`to_vec`](Self::to_vec).
    pub fn to_array<S: Scalar>(&self) -> Result<ArrayD<S>> {
        let data = self.to_vec::<S>()?;
        let shape = self.sizes().iter().map(|&s| s as usize).collect::<Vec<_>>();
        ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|_| Error::InvalidArgument)
    }
}
