pub mod oddschecker;

pub use oddschecker::OddscheckerScraper;
