#![allow(non_snake_case)]

mod codec;
mod error;
mod limiter;
mod model;
mod server;
mod util;

pub use codec::*;
pub use error::*;
pub use limiter::*;
pub use model::config::*;
pub use model::midi::*;
pub use model::velocity::*;
pub use server::*;
pub use util::*;
