pub mod goal;
pub mod summary;
pub mod sync;
