pub mod admission;
pub mod api;
pub mod session;

pub use self::{admission::*, api::*, session::*};
