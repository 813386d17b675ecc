pub mod accessor;
pub mod backend;
pub mod columns;
pub mod memory;
pub mod sheets;

pub use accessor::{SheetAccessor, Table, TableSpec};
pub use backend::{StoreError, TabularStore};
