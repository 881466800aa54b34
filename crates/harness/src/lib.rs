pub mod client;
pub mod server;

pub use client::{RecordingAnalytics, RecordingNotifier, TestClient};
pub use server::{ApiCall, MockCartApi};
