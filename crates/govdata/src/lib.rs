pub mod schema;
pub mod filter;
pub mod options;
pub mod summary;

pub use schema::*;
pub use filter::*;
pub use options::*;
pub use summary::*;
