//! Built-in selector profiles for supported retailers
//!
//! A retailer entry in the config can name one of these instead of spelling out its selectors.
//! Inline settings in the config still override the profile field by field.

use crate::config::{MarkerConfig, PriceSelector, SelectorConfig, StockConfig};

/// Names accepted by the `profile` key
pub const PROFILE_NAMES: &[&str] = &[
    "home-depot",
    "office-depot",
    "quill",
    "staples",
    "best-buy",
    "newegg",
    "bh-photo",
];

/// Selectors and URL rules for one retailer
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub selectors: SelectorConfig,
    pub url_pattern: Option<&'static str>,

    /// HTTP statuses that mean "stop retrying this identifier"
    pub terminal_statuses: &'static [u16],
}

/// Looks up a built-in profile by name
pub fn profile(name: &str) -> Option<Profile> {
    let profile = match name {
        "home-depot" => Profile {
            selectors: SelectorConfig {
                title: "h1.sui-h4-bold".to_string(),
                price: PriceSelector::Split {
                    dollars: ".sui-text-9xl".to_string(),
                    cents: ".sui-font-display.sui-text-3xl".to_string(),
                    separator: ".".to_string(),
                },
                not_found: vec![],
                stock: StockConfig::OutOfStockMarkers(vec![marker(
                    "div.sui-my-12.sui-mx-auto.sui-p-5.sui-text-danger.sui-font-bold",
                    None,
                )]),
            },
            url_pattern: Some("https://www.homedepot.com/p/{id}"),
            terminal_statuses: &[],
        },
        "office-depot" => Profile {
            selectors: SelectorConfig {
                title: r#"h1[itemprop="name"]"#.to_string(),
                price: PriceSelector::Single(".od-graphql-price-big-price".to_string()),
                not_found: vec![
                    marker(r#"h1[auid="sku-failure-heading"]"#, None),
                    marker(
                        "h1",
                        Some("We are sorry, but Office Depot is currently not available in your country"),
                    ),
                ],
                stock: StockConfig::InStockMarkers(vec![marker(
                    ".call-to-action-wrapper .common-add-to-cart",
                    None,
                )]),
            },
            url_pattern: Some("https://www.officedepot.com/a/products/{id}"),
            terminal_statuses: &[],
        },
        "quill" => Profile {
            selectors: SelectorConfig {
                title: "h1".to_string(),
                price: PriceSelector::Single(".h2.mb-2.savings-highlight-wrap".to_string()),
                not_found: vec![],
                stock: StockConfig::OutOfStockMarkers(vec![
                    marker(".promo-flag", Some("out of stock")),
                    marker("div.h6.my-3", Some("no longer available")),
                ]),
            },
            url_pattern: Some("https://www.quill.com/{VITEM_MODEL_NUM}/cbs/{id}.html"),
            terminal_statuses: &[],
        },
        "staples" => Profile {
            selectors: SelectorConfig {
                title: ".product-info-ux2dot0__product_title span".to_string(),
                price: PriceSelector::Single(".price-info__final_price_sku".to_string()),
                not_found: vec![
                    marker(".sc-dxvudf-1.bmnFaj h4", Some("404")),
                    marker(
                        "body",
                        Some("An error occurred while processing your request."),
                    ),
                ],
                stock: StockConfig::OutOfStockMarkers(vec![marker(
                    ".purchasing-option-pickers__oos_message",
                    None,
                )]),
            },
            url_pattern: Some("https://www.staples.com/product_{id}"),
            terminal_statuses: &[500],
        },
        "best-buy" => Profile {
            selectors: SelectorConfig {
                title: "h1.h4".to_string(),
                price: PriceSelector::Single("#large-customer-price".to_string()),
                not_found: vec![marker(
                    ".no-results-found-block h3",
                    Some("we didn\u{2019}t find anything"),
                )],
                stock: StockConfig::OutOfStockMarkers(vec![
                    marker(
                        "div.text-danger",
                        Some("This item is no longer available in new condition"),
                    ),
                    marker("div strong", Some("Sold Out")),
                ]),
            },
            url_pattern: Some("https://www.bestbuy.com/product/{id}"),
            terminal_statuses: &[],
        },
        "newegg" => Profile {
            selectors: SelectorConfig {
                title: "h1.product-title".to_string(),
                price: PriceSelector::Split {
                    dollars: ".price-new-right .price-current strong".to_string(),
                    cents: ".price-new-right .price-current sup".to_string(),
                    separator: String::new(),
                },
                not_found: vec![],
                stock: StockConfig::OutOfStockMarkers(vec![marker(
                    "#ProductBuy .btn-message",
                    Some("Out of Stock"),
                )]),
            },
            url_pattern: Some("https://www.newegg.com/p/{id}"),
            terminal_statuses: &[500],
        },
        "bh-photo" => Profile {
            selectors: SelectorConfig {
                title: r#"[data-selenium="productTitle"]"#.to_string(),
                price: PriceSelector::Single(r#"[data-selenium="pricingPrice"]"#.to_string()),
                not_found: vec![],
                stock: StockConfig::OutOfStockMarkers(vec![
                    marker(r#"[data-selenium="stockStatus"]"#, Some("no longer available")),
                    marker(
                        r#"[data-selenium="stockStatus"]"#,
                        Some("temporarily out of stock"),
                    ),
                ]),
            },
            // B&H links carry a slug, so every item needs an explicit URL
            url_pattern: None,
            terminal_statuses: &[],
        },
        _ => return None,
    };

    Some(profile)
}

fn marker(selector: &str, contains: Option<&str>) -> MarkerConfig {
    MarkerConfig {
        selector: selector.to_string(),
        contains: contains.map(str::to_string),
    }
}
