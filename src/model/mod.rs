//! Plain data types shared by the adapter, linker and transports.

pub mod envelope;
pub mod key;
pub mod resource;

pub use envelope::*;
pub use key::*;
pub use resource::*;
