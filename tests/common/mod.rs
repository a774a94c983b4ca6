#![allow(dead_code)]

pub mod builders;
pub mod in_memory_collection;
pub mod strategies;

pub use builders::*;
pub use in_memory_collection::*;
