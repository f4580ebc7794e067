pub mod client;
pub mod types;

pub use client::CvpClient;
pub use types::NetElement;
