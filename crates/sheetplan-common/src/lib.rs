pub mod address;
pub mod column;
pub mod error;
pub mod range;
pub mod value;

pub use address::*;
pub use column::*;
pub use error::*;
pub use range::*;
pub use value::*;
