pub mod migrate;
pub mod run;
pub mod seed;
