mod path;
mod request;
mod response;
mod upload;
mod wrapper;

pub use path::*;
pub use request::*;
pub use response::*;
pub use upload::*;
pub use wrapper::*;
