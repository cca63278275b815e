//! Ranked extraction strategies.
//!
//! Every field extractor is an ordered [`Cascade`] of [`Strategy`] objects.
//! The cascade evaluates strategies in priority order and returns the first
//! value one of them validates; `None` means an extraction gap, not an error.

use tracing::debug;
use vanbuilder_crawler::PageHandle;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Caller inputs that page-only strategies cannot know.
#[derive(Debug, Clone)]
pub struct ExtractContext {
    /// Two-letter state code of the target.
    pub state: String,
    /// Caller-supplied name; wins over every name strategy.
    pub known_name: Option<String>,
    /// Maximum photos kept per record.
    pub photo_limit: usize,
}

impl ExtractContext {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            known_name: None,
            photo_limit: 8,
        }
    }

    pub fn with_known_name(mut self, name: Option<String>) -> Self {
        self.known_name = name;
        self
    }

    pub fn with_photo_limit(mut self, limit: usize) -> Self {
        self.photo_limit = limit;
        self
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// One independently testable heuristic for a single field.
pub trait Strategy<T> {
    /// Short label for tracing.
    fn name(&self) -> &str;

    /// Try to produce a validated value.
    fn extract(&self, page: &dyn PageHandle, ctx: &ExtractContext) -> Option<T>;
}

/// Signature of a plain-function strategy.
pub type StrategyFn<T> = fn(&dyn PageHandle, &ExtractContext) -> Option<T>;

/// Adapts a plain function into a [`Strategy`].
pub struct FnStrategy<T> {
    name: &'static str,
    f: StrategyFn<T>,
}

impl<T> FnStrategy<T> {
    pub const fn new(name: &'static str, f: StrategyFn<T>) -> Self {
        Self { name, f }
    }
}

impl<T> Strategy<T> for FnStrategy<T> {
    fn name(&self) -> &str {
        self.name
    }

    fn extract(&self, page: &dyn PageHandle, ctx: &ExtractContext) -> Option<T> {
        (self.f)(page, ctx)
    }
}

// ---------------------------------------------------------------------------
// Cascade
// ---------------------------------------------------------------------------

/// Strategies for one field, held in priority order.
pub struct Cascade<T> {
    field: &'static str,
    strategies: Vec<Box<dyn Strategy<T>>>,
}

impl<T: 'static> Cascade<T> {
    /// An empty cascade for `field`.
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    /// Append a strategy at the lowest priority so far.
    pub fn with(mut self, strategy: impl Strategy<T> + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Append a plain-function strategy.
    pub fn with_fn(self, name: &'static str, f: StrategyFn<T>) -> Self {
        self.with(FnStrategy::new(name, f))
    }

    /// Strategy labels in evaluation order.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Evaluate strategies in order; the first `Some` wins.
    pub fn run(&self, page: &dyn PageHandle, ctx: &ExtractContext) -> Option<T> {
        for strategy in &self.strategies {
            if let Some(value) = strategy.extract(page, ctx) {
                debug!(field = self.field, strategy = strategy.name(), "field extracted");
                return Some(value);
            }
        }
        debug!(field = self.field, "no strategy matched");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanbuilder_crawler::HtmlPage;

    fn page() -> HtmlPage {
        HtmlPage::parse(
            url::Url::parse("https://example-van.test/").unwrap(),
            "<html><body><h1>Hello</h1></body></html>",
        )
    }

    fn never(_: &dyn PageHandle, _: &ExtractContext) -> Option<String> {
        None
    }

    fn heading(page: &dyn PageHandle, _: &ExtractContext) -> Option<String> {
        page.text("h1")
    }

    fn constant(_: &dyn PageHandle, _: &ExtractContext) -> Option<String> {
        Some("constant".into())
    }

    #[test]
    fn first_matching_strategy_wins() {
        let cascade = Cascade::new("test")
            .with_fn("never", never)
            .with_fn("heading", heading)
            .with_fn("constant", constant);
        assert_eq!(cascade.names(), vec!["never", "heading", "constant"]);
        let value = cascade.run(&page(), &ExtractContext::new("CA"));
        assert_eq!(value.as_deref(), Some("Hello"));
    }

    #[test]
    fn empty_cascade_is_a_gap() {
        let cascade: Cascade<String> = Cascade::new("test").with_fn("never", never);
        assert!(cascade.run(&page(), &ExtractContext::new("CA")).is_none());
    }
}
