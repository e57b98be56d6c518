//! `adshelf query`: run one dashboard query from the terminal.

use anyhow::Result;

use adshelf_core::filter::{AdvertiserSelection, DateRange};
use adshelf_core::models::AdRecord;
use adshelf_core::query::{run_query, PageItem, QueryResponse, View, ViewRequest};

use crate::config::Config;
use crate::stores;

/// CLI arguments for a query, before defaults are applied.
#[derive(Debug, Default, Clone)]
pub struct QueryArgs {
    pub highlights: bool,
    pub keyword: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub advertisers: Vec<String>,
    pub no_advertisers: bool,
    pub keyword_filter: Vec<String>,
    pub page: usize,
    pub page_size: Option<usize>,
    pub json: bool,
}

impl QueryArgs {
    pub fn to_request(&self, config: &Config) -> ViewRequest {
        let advertiser_selection = if self.no_advertisers {
            AdvertiserSelection::NoneSelected
        } else if self.advertisers.is_empty() {
            AdvertiserSelection::AllSelected
        } else {
            AdvertiserSelection::subset(self.advertisers.iter().cloned())
        };

        ViewRequest {
            view: if self.highlights {
                View::Highlights
            } else {
                View::Keyword
            },
            keyword: self.keyword.clone(),
            date_range: DateRange::parse(self.from.as_deref(), self.to.as_deref()),
            advertiser_selection,
            keyword_selection: self.keyword_filter.clone(),
            page_number: self.page.max(1),
            page_size: config.dashboard.effective_page_size(self.page_size),
        }
    }
}

pub async fn run_query_cmd(config: &Config, args: &QueryArgs) -> Result<()> {
    let stores = stores::open(config).await?;
    let req = args.to_request(config);
    let resp = run_query(stores.ads.as_ref(), stores.highlights.as_ref(), &req).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else {
        print_response(&resp);
    }
    Ok(())
}

fn print_response(resp: &QueryResponse) {
    for notice in &resp.notices {
        eprintln!("notice: {}", notice);
    }

    match resp.view {
        View::Keyword => println!(
            "keyword: {}",
            resp.keyword.as_deref().unwrap_or("(no keywords)")
        ),
        View::Highlights => println!("highlights"),
    }
    println!(
        "{} ad(s), page {}/{}",
        resp.total_count,
        resp.page_number,
        resp.page_count.max(1)
    );

    for item in &resp.page_items {
        let (id, record): (String, &dyn AdRecord) = match item {
            PageItem::Ad(a) => (a.identity(), a as &dyn AdRecord),
            PageItem::Highlight(h) => (h.id.clone(), h as &dyn AdRecord),
        };
        println!(
            "  {:<34} {:<24} {}",
            id,
            record.advertiser(),
            record.collected_at().unwrap_or("-")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        toml::from_str("").unwrap()
    }

    #[test]
    fn test_defaults_become_all_selected_first_page() {
        let req = QueryArgs::default().to_request(&config());
        assert_eq!(req.view, View::Keyword);
        assert_eq!(req.page_number, 1);
        assert_eq!(req.page_size, 70);
        assert_eq!(req.advertiser_selection, AdvertiserSelection::AllSelected);
        assert!(req.date_range.is_unbounded());
    }

    #[test]
    fn test_explicit_none_and_clamped_page_size() {
        let args = QueryArgs {
            highlights: true,
            no_advertisers: true,
            page_size: Some(9_999),
            from: Some("2024-01-10".to_string()),
            to: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        let req = args.to_request(&config());
        assert_eq!(req.view, View::Highlights);
        assert_eq!(req.advertiser_selection, AdvertiserSelection::NoneSelected);
        assert_eq!(req.page_size, 500);
        assert!(req.date_range.start() <= req.date_range.end());
    }
}
