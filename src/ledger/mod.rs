pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use memory::MemoryLedger;
pub use model::{Account, NewPayment, NewUser, Payment, PaymentStatus, User};
pub use postgres::PgLedger;
pub use store::LedgerStore;
