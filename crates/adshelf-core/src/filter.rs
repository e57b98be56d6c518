//! Filter composition for the dashboard views.
//!
//! Stages run conjunctively in a fixed order:
//!
//! 1. date range over `collected_at` (undated ads always pass),
//! 2. advertiser selection,
//! 3. keyword allow-list (highlights view only).
//!
//! Malformed filter input never errors; it widens that axis to
//! "unconstrained" instead.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::{parse_timestamp, AdRecord};

/// Inclusive calendar-day range. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DateRangeWire", into = "DateRangeWire")]
pub struct DateRange {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DateRangeWire {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
}

impl From<DateRangeWire> for DateRange {
    fn from(w: DateRangeWire) -> Self {
        DateRange::parse(w.from.as_deref(), w.to.as_deref())
    }
}

impl From<DateRange> for DateRangeWire {
    fn from(r: DateRange) -> Self {
        DateRangeWire {
            from: r.from.map(|d| d.format("%Y-%m-%d").to_string()),
            to: r.to.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl DateRange {
    /// Build a range; reversed bounds are swapped.
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        match (from, to) {
            (Some(f), Some(t)) if f > t => Self {
                from: Some(t),
                to: Some(f),
            },
            _ => Self { from, to },
        }
    }

    /// Parse optional `YYYY-MM-DD` (or full timestamp) bounds. Anything
    /// unparseable leaves that side open.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Self {
        Self::new(from.and_then(parse_day), to.and_then(parse_day))
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.from
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.to
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Whether an ad falls in `[start_of_day(from), end_of_day(to)]`.
    /// Ads with a missing or unreadable timestamp are always kept.
    pub fn contains<T: AdRecord + ?Sized>(&self, ad: &T) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(ts) = ad.collected_at_parsed() else {
            return true;
        };
        let day = ts.date_naive();
        self.from.map_or(true, |f| day >= f) && self.to.map_or(true, |t| day <= t)
    }
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(s).map(|ts| ts.date_naive()))
}

/// Three-state advertiser picker.
///
/// `Subset` with an empty set selects nothing, which is different from
/// [`AdvertiserSelection::AllSelected`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SelectionWire", into = "SelectionWire")]
pub enum AdvertiserSelection {
    #[default]
    AllSelected,
    NoneSelected,
    Subset(BTreeSet<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectionWire {
    State(String),
    List(Vec<String>),
}

impl TryFrom<SelectionWire> for AdvertiserSelection {
    type Error = CoreError;

    fn try_from(w: SelectionWire) -> Result<Self, Self::Error> {
        match w {
            SelectionWire::State(s) => match s.as_str() {
                "all" => Ok(Self::AllSelected),
                "none" => Ok(Self::NoneSelected),
                _ => Err(CoreError::InvalidSelection { value: s }),
            },
            SelectionWire::List(names) => Ok(Self::Subset(names.into_iter().collect())),
        }
    }
}

impl From<AdvertiserSelection> for SelectionWire {
    fn from(sel: AdvertiserSelection) -> Self {
        match sel {
            AdvertiserSelection::AllSelected => SelectionWire::State("all".to_string()),
            AdvertiserSelection::NoneSelected => SelectionWire::State("none".to_string()),
            AdvertiserSelection::Subset(names) => SelectionWire::List(names.into_iter().collect()),
        }
    }
}

impl AdvertiserSelection {
    pub fn subset<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Subset(names.into_iter().map(Into::into).collect())
    }

    /// Collapse an explicit pick of every available advertiser back to
    /// `AllSelected`, so advertisers that show up later are included.
    pub fn normalized(self, available: &[String]) -> Self {
        match self {
            Self::Subset(names)
                if !available.is_empty() && available.iter().all(|a| names.contains(a)) =>
            {
                Self::AllSelected
            }
            other => other,
        }
    }

    pub fn matches(&self, advertiser: &str) -> bool {
        match self {
            Self::AllSelected => true,
            Self::NoneSelected => false,
            Self::Subset(names) => names.contains(advertiser),
        }
    }
}

pub fn filter_by_date<T: AdRecord>(ads: Vec<T>, range: &DateRange) -> Vec<T> {
    if range.is_unbounded() {
        return ads;
    }
    ads.into_iter().filter(|ad| range.contains(ad)).collect()
}

pub fn filter_by_advertiser<T: AdRecord>(ads: Vec<T>, selection: &AdvertiserSelection) -> Vec<T> {
    match selection {
        AdvertiserSelection::AllSelected => ads,
        AdvertiserSelection::NoneSelected => Vec::new(),
        AdvertiserSelection::Subset(_) => ads
            .into_iter()
            .filter(|ad| selection.matches(ad.advertiser()))
            .collect(),
    }
}

/// Keyword allow-list; an empty list keeps everything.
pub fn filter_by_keyword<T: AdRecord>(ads: Vec<T>, keywords: &[String]) -> Vec<T> {
    if keywords.is_empty() {
        return ads;
    }
    ads.into_iter()
        .filter(|ad| keywords.iter().any(|k| k == ad.keyword()))
        .collect()
}

/// Output of [`apply_filters`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filtered<T> {
    /// Surviving records, in input order.
    pub items: Vec<T>,
    /// Advertisers present after the date stage, for the picker.
    pub available_advertisers: Vec<String>,
    /// The selection actually applied, after normalisation.
    pub selection: AdvertiserSelection,
}

/// Run all stages in order. `keywords` is `None` for the keyword view.
///
/// The advertiser selection is normalised against the advertisers that
/// survive the date stage before it is applied.
pub fn apply_filters<T: AdRecord>(
    ads: Vec<T>,
    date_range: &DateRange,
    advertisers: &AdvertiserSelection,
    keywords: Option<&[String]>,
) -> Filtered<T> {
    let ads = filter_by_date(ads, date_range);
    let available = available_advertisers(&ads);
    let selection = advertisers.clone().normalized(&available);
    let ads = filter_by_advertiser(ads, &selection);
    let items = match keywords {
        Some(k) => filter_by_keyword(ads, k),
        None => ads,
    };
    Filtered {
        items,
        available_advertisers: available,
        selection,
    }
}

/// Distinct advertiser display names, sorted.
pub fn available_advertisers<T: AdRecord>(ads: &[T]) -> Vec<String> {
    ads.iter()
        .map(|ad| ad.advertiser().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct keywords, sorted.
pub fn available_keywords<T: AdRecord>(ads: &[T]) -> Vec<String> {
    ads.iter()
        .map(|ad| ad.keyword().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
