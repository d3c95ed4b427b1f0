pub mod field;
pub mod product;
