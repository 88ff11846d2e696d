pub mod audio_file;
pub mod cookie;
pub mod http;
pub mod navigator;

pub use audio_file::load_audio_file;
pub use cookie::{FileCookieStore, MemoryTokenStore};
pub use http::ReqwestTransport;
pub use navigator::HistoryNavigator;
