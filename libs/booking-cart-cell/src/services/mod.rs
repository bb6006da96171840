pub mod store;
pub mod repository;
pub mod merger;
pub mod remote;
pub mod adapter;
pub mod slots;
pub mod selection;
pub mod reschedule;
pub mod removal;
pub mod notifications;
pub mod sync;
pub mod engine;
pub mod hub;

pub use store::*;
pub use repository::*;
pub use merger::*;
pub use remote::*;
pub use adapter::*;
pub use slots::*;
pub use selection::*;
pub use reschedule::*;
pub use removal::*;
pub use notifications::*;
pub use sync::*;
pub use engine::*;
pub use hub::*;
