pub mod http;
pub mod token_file;

pub use http::HttpApi;
pub use token_file::FileTokenStore;
