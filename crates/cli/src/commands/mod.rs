pub mod generate;
pub mod migrate;
