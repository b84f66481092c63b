pub mod column;
pub mod postgres;
