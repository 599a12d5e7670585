#![allow(unreachable_pub)]

mod error;
mod response;
mod submission;

pub use error::ErrorKind;
pub use response::{OutputFields, OutputLine, ProbeResponse};
pub use submission::{Scheme, Submission};

/// The `httprobe_lib` `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
