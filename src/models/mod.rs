pub mod params;
pub mod status;
pub mod stream;

pub use params::*;
pub use status::*;
pub use stream::*;
