pub mod local;

pub use local::LocalStore;
pub use local::StoreKey;
pub use local::StoreWriterHandle;
