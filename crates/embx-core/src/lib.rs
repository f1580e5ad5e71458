pub mod error;
pub mod key;
pub mod request;
pub mod result;
pub mod retry;
pub mod similarity;

pub use error::*;
pub use key::*;
pub use request::*;
pub use result::*;
pub use retry::*;
pub use similarity::*;
