mod fixture;
mod http;

pub use fixture::FixtureSource;
pub use http::HttpFactSource;
