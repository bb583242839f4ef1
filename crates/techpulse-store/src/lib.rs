//! C4 Catalog Store: the file-backed `CatalogStore` implementation
//! (`storeBackend = file`, the default, §6) plus the shared atomic-write
//! primitive. The relational backend lives in `techpulse-store-relational`.

pub mod atomic_writer;
pub mod catalog_store;
pub mod error;

pub use atomic_writer::{AtomicWriter, write_atomic};
pub use catalog_store::FileCatalogStore;
pub use error::{Result, StoreError};
