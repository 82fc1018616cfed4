use crate::{
    allocator::{CpuAllocator, TensorAllocator},
    shape::{Dim, Shape},
    tensor_like::TensorLike,
    Tensor,
};

impl<T, const N: usize, A: TensorAllocator + 'static> bincode::enc::Encode for Tensor<T, N, A>
where
    T: bincode::enc::Encode + Clone,
{
    fn encode<E: bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        let shape = self.shape();
        let fixed: [bool; N] = std::array::from_fn(|k| shape.is_fixed(k));
        bincode::Encode::encode(&shape.sizes(), encoder)?;
        bincode::Encode::encode(&fixed, encoder)?;
        bincode::Encode::encode(self.as_slice(), encoder)?;
        Ok(())
    }
}

impl<T, const N: usize, C> bincode::de::Decode<C> for Tensor<T, N, CpuAllocator>
where
    T: bincode::de::Decode<C> + Clone + Default,
{
    fn decode<D: bincode::de::Decoder<Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        let sizes: [usize; N] = bincode::Decode::decode(decoder)?;
        let fixed: [bool; N] = bincode::Decode::decode(decoder)?;
        let data: Vec<T> = bincode::Decode::decode(decoder)?;
        let dims: [Dim; N] = std::array::from_fn(|k| {
            if fixed[k] {
                Dim::Fixed(sizes[k])
            } else {
                Dim::Dynamic(sizes[k])
            }
        });
        Self::from_shape_vec(Shape::new(dims), data, CpuAllocator)
            .map_err(|e| bincode::error::DecodeError::OtherString(format!("Tensor error: {}", e)))
    }
}
