pub mod bing;

pub use bing::BingProvider;
