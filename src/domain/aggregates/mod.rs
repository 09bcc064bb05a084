//! Aggregates module
pub mod product;
pub mod order;
pub mod pending;

pub use product::{Catalog, Product};
pub use order::{Charges, Discount, ExportItem, OrderDraft, OrderExport, OrderLine, StructuredOrder};
pub use pending::{PendingError, PendingOrder, PendingStatus};
