pub mod error;
pub mod model;
pub mod naming;

pub use error::{AppError, ComposeError};
pub use model::{DownloadTask, Phase, Row};
pub use naming::compose;
