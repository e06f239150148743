mod desc;
pub use desc::TensorDesc;
mod shape;
pub use shape::ShapeSpec;
mod tensor;
pub use tensor::Tensor;
