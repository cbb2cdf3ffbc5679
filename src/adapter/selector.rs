//! Selector-driven site adapter
//!
//! `SelectorAdapter` implements [`SiteAdapter`] from a declarative [`SelectorConfig`]: CSS
//! selectors for the title and price, marker elements for "not found" and stock state, and a URL
//! pattern for identifiers without an explicit link. Selectors are compiled once, when the adapter
//! is built, so a bad selector is reported at configuration time rather than mid-run.

use crate::adapter::profiles;
use crate::adapter::traits::{Classification, SiteAdapter};
use crate::config::{MarkerConfig, PriceSelector, RetailerConfig, SelectorConfig, StockConfig};
use crate::runner::FetchFailure;
use crate::source::ItemRecord;
use crate::state::StockState;
use crate::{ConfigError, ConfigResult};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Adapter for retailers whose product pages can be described with CSS selectors
#[derive(Debug)]
pub struct SelectorAdapter {
    name: String,
    title: Selector,
    price: PriceRule,
    not_found: Vec<Marker>,
    stock: StockRule,
    url_pattern: Option<UrlPattern>,
    terminal_statuses: Vec<u16>,
}

impl SelectorAdapter {
    /// Builds an adapter from explicit selectors
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSelector` for a selector that does not parse and
    /// `ConfigError::InvalidUrl` for a malformed URL pattern.
    pub fn new(
        name: &str,
        selectors: &SelectorConfig,
        url_pattern: Option<&str>,
        terminal_statuses: Vec<u16>,
    ) -> ConfigResult<Self> {
        let price = match &selectors.price {
            PriceSelector::Single(selector) => PriceRule::Single(compile(selector)?),
            PriceSelector::Split {
                dollars,
                cents,
                separator,
            } => PriceRule::Split {
                dollars: compile(dollars)?,
                cents: compile(cents)?,
                separator: separator.clone(),
            },
        };

        let stock = match &selectors.stock {
            StockConfig::InStockMarkers(markers) => StockRule::InStockWhenAny(compile_markers(markers)?),
            StockConfig::OutOfStockMarkers(markers) => {
                StockRule::OutOfStockWhenAny(compile_markers(markers)?)
            }
        };

        let url_pattern = url_pattern.map(UrlPattern::parse).transpose()?;

        Ok(Self {
            name: name.to_string(),
            title: compile(&selectors.title)?,
            price,
            not_found: compile_markers(&selectors.not_found)?,
            stock,
            url_pattern,
            terminal_statuses,
        })
    }

    /// Builds the adapter for a configured retailer
    ///
    /// Inline selectors, URL pattern and terminal statuses override the named profile's.
    pub fn from_retailer(retailer: &RetailerConfig) -> ConfigResult<Self> {
        let profile = match &retailer.profile {
            Some(name) => Some(
                profiles::profile(name).ok_or_else(|| ConfigError::UnknownProfile(name.clone()))?,
            ),
            None => None,
        };

        let selectors = retailer
            .selectors
            .clone()
            .or_else(|| profile.as_ref().map(|p| p.selectors.clone()))
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "Retailer '{}' needs either a profile or selectors",
                    retailer.name
                ))
            })?;

        let url_pattern = retailer
            .url_pattern
            .as_deref()
            .or_else(|| profile.as_ref().and_then(|p| p.url_pattern));

        let terminal_statuses = retailer
            .terminal_statuses
            .clone()
            .or_else(|| profile.as_ref().map(|p| p.terminal_statuses.to_vec()))
            .unwrap_or_default();

        Self::new(&retailer.name, &selectors, url_pattern, terminal_statuses)
    }

    fn extract_price(&self, document: &Html) -> Option<String> {
        match &self.price {
            PriceRule::Single(selector) => first_text(document, selector),
            PriceRule::Split {
                dollars,
                cents,
                separator,
            } => {
                let dollars = first_text(document, dollars)?;
                let dollars = dollars.trim_start_matches('$');
                let cents = document
                    .select(cents)
                    .last()
                    .map(element_text)
                    .unwrap_or_default();

                if cents.is_empty() {
                    Some(format!("${}", dollars))
                } else {
                    Some(format!("${}{}{}", dollars, separator, cents))
                }
            }
        }
    }
}

impl SiteAdapter for SelectorAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn build_target(&self, item: &ItemRecord) -> Option<Url> {
        if item.identifier.eq_ignore_ascii_case("n/a") {
            return None;
        }

        if let Some(explicit) = &item.target {
            match Url::parse(explicit) {
                Ok(url) if is_http(&url) => return Some(url),
                _ => tracing::warn!(
                    "[{}] Ignoring invalid URL for {}: {}",
                    self.name,
                    item.identifier,
                    explicit
                ),
            }
        }

        let url = Url::parse(&self.url_pattern.as_ref()?.fill(item)?).ok()?;
        is_http(&url).then_some(url)
    }

    fn classify(&self, document: &Html) -> Classification {
        if self.not_found.iter().any(|marker| marker.is_present(document)) {
            return Classification::NotFound;
        }

        let title = first_text(document, &self.title);
        let price = self.extract_price(document);
        let stock = match &self.stock {
            StockRule::InStockWhenAny(markers) => {
                StockState::from_available(markers.iter().any(|m| m.is_present(document)))
            }
            StockRule::OutOfStockWhenAny(markers) => {
                StockState::from_available(!markers.iter().any(|m| m.is_present(document)))
            }
        };

        Classification::Product {
            title,
            price,
            stock,
        }
    }

    fn should_retry(&self, failure: &FetchFailure) -> bool {
        match failure {
            FetchFailure::Status(code) => !self.terminal_statuses.contains(code),
            _ => true,
        }
    }
}

#[derive(Debug)]
enum PriceRule {
    Single(Selector),
    Split {
        dollars: Selector,
        cents: Selector,
        separator: String,
    },
}

#[derive(Debug)]
enum StockRule {
    InStockWhenAny(Vec<Marker>),
    OutOfStockWhenAny(Vec<Marker>),
}

/// A compiled marker: a selector plus an optional lowercase text fragment
#[derive(Debug)]
struct Marker {
    selector: Selector,
    contains: Option<String>,
}

impl Marker {
    fn is_present(&self, document: &Html) -> bool {
        document.select(&self.selector).any(|element| match &self.contains {
            Some(fragment) => element_text(element).to_lowercase().contains(fragment),
            None => true,
        })
    }
}

/// URL template with `{id}` and `{<metadata column>}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlPattern {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

impl UrlPattern {
    fn parse(template: &str) -> ConfigResult<Self> {
        let invalid = |message: &str| {
            ConfigError::InvalidUrl(format!("Invalid URL pattern '{}': {}", template, message))
        };

        let mut segments = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let close = rest[open..]
                .find('}')
                .map(|offset| open + offset)
                .ok_or_else(|| invalid("unclosed '{'"))?;
            let name = rest[open + 1..close].trim();
            if name.is_empty() {
                return Err(invalid("empty placeholder"));
            }
            segments.push(Segment::Placeholder(name.to_string()));
            rest = &rest[close + 1..];
        }
        if rest.contains('}') {
            return Err(invalid("unmatched '}'"));
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        let pattern = Self { segments };

        // A pattern filled with a dummy value must be a valid http(s) URL
        let sample = pattern.render(|_| Some("x".to_string())).unwrap_or_default();
        match Url::parse(&sample) {
            Ok(url) if is_http(&url) => Ok(pattern),
            Ok(_) => Err(invalid("scheme must be http or https")),
            Err(e) => Err(invalid(&e.to_string())),
        }
    }

    /// Fills the pattern for an item; `None` if a placeholder has no value
    fn fill(&self, item: &ItemRecord) -> Option<String> {
        self.render(|name| {
            let value = if name == "id" {
                Some(item.identifier.as_str())
            } else {
                item.metadata.get(name)
            };
            value.filter(|v| !v.is_empty()).map(str::to_string)
        })
    }

    fn render(&self, mut lookup: impl FnMut(&str) -> Option<String>) -> Option<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => out.push_str(&lookup(name)?),
            }
        }
        Some(out)
    }
}

fn compile(selector: &str) -> ConfigResult<Selector> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

fn compile_markers(markers: &[MarkerConfig]) -> ConfigResult<Vec<Marker>> {
    markers
        .iter()
        .map(|marker| {
            Ok(Marker {
                selector: compile(&marker.selector)?,
                contains: marker.contains.as_ref().map(|s| s.to_lowercase()),
            })
        })
        .collect()
}

fn is_http(url: &Url) -> bool {
    url.scheme() == "http" || url.scheme() == "https"
}

/// Text of an element with whitespace runs collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first matching element, if it is not empty
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}
