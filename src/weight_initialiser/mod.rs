mod initialiser;
pub use initialiser::WeightInit;
