pub mod judge;
pub mod prompts;
pub mod scraper;
pub mod session;
pub mod verdict;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
