pub mod newsai;
pub mod newsapi;
pub mod serpapi;

pub use newsai::NewsAiAdapter;
pub use newsapi::NewsApiAdapter;
pub use serpapi::SerpApiAdapter;
