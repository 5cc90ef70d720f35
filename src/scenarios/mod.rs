//! Named acceptance scenarios and their registry.

pub mod sorting;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::shim::BrowserActor;

type ScenarioFn = for<'a> fn(&'a BrowserActor) -> BoxFuture<'a, Result<()>>;

/// A named acceptance scenario, executable against either backend kind.
#[derive(Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub summary: &'static str,
    run: ScenarioFn,
}

impl Scenario {
    pub async fn run(&self, actor: &BrowserActor) -> Result<()> {
        (self.run)(actor).await
    }
}

fn price_sorting_single_page(actor: &BrowserActor) -> BoxFuture<'_, Result<()>> {
    Box::pin(sorting::price_ascending_single_page(actor))
}

fn price_sorting_multiple_pages(actor: &BrowserActor) -> BoxFuture<'_, Result<()>> {
    Box::pin(sorting::price_ascending_across_pages(actor))
}

/// Every scenario the runner knows, in execution order.
pub fn all() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "price-sorting-single-page",
            summary: "train fares stay ascending on a single result page (Berlin to Prague)",
            run: price_sorting_single_page,
        },
        Scenario {
            name: "price-sorting-multiple-pages",
            summary: "train fares stay ascending across result pages (Berlin to Munich)",
            run: price_sorting_multiple_pages,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_are_unique() {
        let names: Vec<_> = all().iter().map(|s| s.name).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert!(!names.is_empty());
        assert_eq!(names.len(), deduped.len());
    }
}
