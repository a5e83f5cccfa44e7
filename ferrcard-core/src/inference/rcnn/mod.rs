pub mod model;
pub mod session;

pub use model::{FasterRcnn, RcnnConfig};
pub use session::RcnnSession;
