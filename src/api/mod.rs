pub mod client;
pub mod disposition;
pub mod models;
pub mod page;

pub use client::{ApiError, PostboxClient};
pub use page::{HtmlRowSource, RowSource};
