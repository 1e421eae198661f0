pub mod catalog;
pub mod detection;
pub mod metrics;
pub mod mongo;
pub mod nutrition;
pub mod openfoodfacts;
pub mod seed;
pub mod storage;
