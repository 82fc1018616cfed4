use crate::{
    allocator::TensorAllocator,
    shape::{Dim, Shape},
    tensor_like::TensorLike,
    Tensor,
};

use serde::ser::SerializeStruct;
use serde::Deserialize;

impl<T, const N: usize, A> serde::Serialize for Tensor<T, N, A>
where
    T: serde::Serialize + Clone,
    A: TensorAllocator + 'static,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let shape = self.shape();
        let fixed: Vec<bool> = (0..N).map(|k| shape.is_fixed(k)).collect();
        let mut state = serializer.serialize_struct("Tensor", 3)?;
        state.serialize_field("data", self.as_slice())?;
        state.serialize_field("shape", &shape.sizes().to_vec())?;
        state.serialize_field("fixed", &fixed)?;
        state.end()
    }
}

impl<'de, T, const N: usize, A: TensorAllocator + Default + 'static> serde::Deserialize<'de>
    for Tensor<T, N, A>
where
    T: serde::Deserialize<'de> + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TensorData<T> {
            data: Vec<T>,
            shape: Vec<usize>,
            #[serde(default)]
            fixed: Vec<bool>,
        }

        let TensorData { data, shape, fixed } = TensorData::deserialize(deserializer)?;

        let sizes: [usize; N] = shape
            .try_into()
            .map_err(|_| serde::de::Error::custom("Invalid shape"))?;

        let mut dims = sizes.map(Dim::Dynamic);
        for (dim, fixed) in dims.iter_mut().zip(fixed) {
            if fixed {
                if let Dim::Dynamic(size) = *dim {
                    *dim = Dim::Fixed(size);
                }
            }
        }

        Tensor::from_shape_vec(Shape::new(dims), data, A::default())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::CpuAllocator;

    #[test]
    fn test_serde() -> Result<(), Box<dyn std::error::Error>> {
        let data = vec![1, 2, 3, 4, 5, 6];
        let tensor = Tensor::<u8, 2, CpuAllocator>::from_shape_vec([2, 3], data, CpuAllocator)?;
        let serialized = serde_json::to_string(&tensor)?;
        let deserialized: Tensor<u8, 2, CpuAllocator> = serde_json::from_str(&serialized)?;
        assert_eq!(tensor.as_slice(), deserialized.as_slice());
        assert_eq!(tensor.shape(), deserialized.shape());
        Ok(())
    }

    #[test]
    fn test_serde_keeps_fixed_axes() -> Result<(), Box<dyn std::error::Error>> {
        let tensor = Tensor::matrix([[1.5f32, 2.0], [3.0, 4.0]])?;
        let serialized = serde_json::to_string(&tensor)?;
        assert!(serialized.contains("\"fixed\":[true,true]"));
        let deserialized: Tensor<f32, 2> = serde_json::from_str(&serialized)?;
        assert!(deserialized.shape().is_static());
        assert_eq!(tensor, deserialized);
        Ok(())
    }

    #[test]
    fn test_serde_rejects_bad_input() {
        let wrong_rank = r#"{"data":[1,2],"shape":[2]}"#;
        assert!(serde_json::from_str::<Tensor<u8, 2>>(wrong_rank).is_err());
        let wrong_len = r#"{"data":[1,2,3],"shape":[2,2]}"#;
        assert!(serde_json::from_str::<Tensor<u8, 2>>(wrong_len).is_err());
    }
}
