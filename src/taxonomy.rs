//! The fixed two-level commodity taxonomy.
//!
//! Seven categories partition fifty leaf commodity groups. Leaf IDs are
//! globally unique, so a leaf belongs to exactly one category. The table is
//! compiled into the binary; the lookup indices below are built once on first
//! use and never mutated afterwards.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use Category::*;

/// A top-level commodity category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    GeneralServices,
    FacilityManagement,
    PublishingProduction,
    InformationTechnology,
    Logistics,
    MarketingAdvertising,
    Production,
}

/// All categories in table order.
pub const CATEGORIES: [Category; 7] = [
    Category::GeneralServices,
    Category::FacilityManagement,
    Category::PublishingProduction,
    Category::InformationTechnology,
    Category::Logistics,
    Category::MarketingAdvertising,
    Category::Production,
];

impl Category {
    /// Canonical display name, as presented to the oracle.
    pub fn name(self) -> &'static str {
        match self {
            Category::GeneralServices => "General Services",
            Category::FacilityManagement => "Facility Management",
            Category::PublishingProduction => "Publishing Production",
            Category::InformationTechnology => "Information Technology",
            Category::Logistics => "Logistics",
            Category::MarketingAdvertising => "Marketing & Advertising",
            Category::Production => "Production",
        }
    }

    /// One-line definition used in the category-step prompt.
    pub fn definition(self) -> &'static str {
        match self {
            Category::GeneralServices => {
                "business services such as consulting, insurance, memberships, recruiting, training and rentals"
            }
            Category::FacilityManagement => {
                "buildings and offices: maintenance, cleaning, security, energy, renovation, office furniture and equipment"
            }
            Category::PublishingProduction => {
                "producing books and media: printing, audio/video production, pre- and post-production, publishing software"
            }
            Category::InformationTechnology => "computer hardware, software licences and IT services",
            Category::Logistics => "courier, postal, warehousing, transport and delivery services",
            Category::MarketingAdvertising => {
                "advertising, agencies, events, online marketing, customer communication and promotional or decorative branded items"
            }
            Category::Production => {
                "manufacturing: machinery, spare parts, production materials, consumables and operational equipment"
            }
        }
    }

    /// Resolve a category from the oracle's answer.
    ///
    /// Matching ignores case, surrounding whitespace and quotes, and accepts
    /// `and` in place of `&`.
    pub fn from_name(raw: &str) -> Option<Category> {
        let wanted = normalise_name(raw);
        CATEGORIES
            .iter()
            .copied()
            .find(|c| normalise_name(c.name()) == wanted)
    }

    /// The leaf groups of this category, in ID order.
    pub fn groups(self) -> &'static [CommodityGroup] {
        BY_CATEGORY.get(&self).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `id` is a leaf of this category.
    pub fn contains(self, id: u32) -> bool {
        group(id).is_some_and(|g| g.category == self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn normalise_name(s: &str) -> String {
    s.trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '*' || c == '.')
        .to_lowercase()
        .replace(" and ", " & ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A leaf commodity group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommodityGroup {
    pub id: u32,
    pub category: Category,
    pub name: &'static str,
}

impl CommodityGroup {
    /// `"<category> - <name>"`, e.g. `"Information Technology - Hardware"`.
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.category.name(), self.name)
    }
}

const fn g(id: u32, category: Category, name: &'static str) -> CommodityGroup {
    CommodityGroup { id, category, name }
}

/// Every leaf commodity group, ordered by ID.
pub const COMMODITY_GROUPS: [CommodityGroup; 50] = [
    g(1, GeneralServices, "Accommodation Rentals"),
    g(2, GeneralServices, "Membership Fees"),
    g(3, GeneralServices, "Workplace Safety"),
    g(4, GeneralServices, "Consulting"),
    g(5, GeneralServices, "Financial Services"),
    g(6, GeneralServices, "Fleet Management"),
    g(7, GeneralServices, "Recruitment Services"),
    g(8, GeneralServices, "Professional Development"),
    g(9, GeneralServices, "Miscellaneous Services"),
    g(10, GeneralServices, "Insurance"),
    g(11, FacilityManagement, "Electrical Engineering"),
    g(12, FacilityManagement, "Facility Management Services"),
    g(13, FacilityManagement, "Security"),
    g(14, FacilityManagement, "Renovations"),
    g(15, FacilityManagement, "Office Equipment"),
    g(16, FacilityManagement, "Energy Management"),
    g(17, FacilityManagement, "Maintenance"),
    g(18, FacilityManagement, "Cafeteria and Kitchenettes"),
    g(19, FacilityManagement, "Cleaning"),
    g(20, PublishingProduction, "Audio and Visual Production"),
    g(21, PublishingProduction, "Books/Videos/CDs"),
    g(22, PublishingProduction, "Printing Costs"),
    g(23, PublishingProduction, "Software Development for Publishing"),
    g(24, PublishingProduction, "Material Costs"),
    g(25, PublishingProduction, "Shipping for Production"),
    g(26, PublishingProduction, "Digital Product Development"),
    g(27, PublishingProduction, "Pre-production"),
    g(28, PublishingProduction, "Post-production Costs"),
    g(29, InformationTechnology, "Hardware"),
    g(30, InformationTechnology, "IT Services"),
    g(31, InformationTechnology, "Software"),
    g(32, Logistics, "Courier, Express, and Postal Services"),
    g(33, Logistics, "Warehousing and Material Handling"),
    g(34, Logistics, "Transportation Logistics"),
    g(35, Logistics, "Delivery Services"),
    g(36, MarketingAdvertising, "Advertising"),
    g(37, MarketingAdvertising, "Outdoor Advertising"),
    g(38, MarketingAdvertising, "Marketing Agencies"),
    g(39, MarketingAdvertising, "Direct Mail"),
    g(40, MarketingAdvertising, "Customer Communication"),
    g(41, MarketingAdvertising, "Online Marketing"),
    g(42, MarketingAdvertising, "Events"),
    g(43, MarketingAdvertising, "Promotional Materials"),
    g(44, Production, "Warehouse and Operational Equipment"),
    g(45, Production, "Production Machinery"),
    g(46, Production, "Spare Parts"),
    g(47, Production, "Internal Transportation"),
    g(48, Production, "Production Materials"),
    g(49, Production, "Consumables"),
    g(50, Production, "Maintenance and Repairs"),
];

static BY_ID: Lazy<HashMap<u32, &'static CommodityGroup>> =
    Lazy::new(|| COMMODITY_GROUPS.iter().map(|g| (g.id, g)).collect());

static BY_CATEGORY: Lazy<HashMap<Category, Vec<CommodityGroup>>> = Lazy::new(|| {
    let mut map: HashMap<Category, Vec<CommodityGroup>> = HashMap::new();
    for group in COMMODITY_GROUPS.iter() {
        map.entry(group.category).or_default().push(*group);
    }
    map
});

/// Look up a leaf group by ID.
pub fn group(id: u32) -> Option<&'static CommodityGroup> {
    BY_ID.get(&id).copied()
}

/// Leaf groups of a category (same as [`Category::groups`]).
pub fn groups_in(category: Category) -> &'static [CommodityGroup] {
    category.groups()
}

/// All groups ordered by category name, then group name.
pub fn list_sorted() -> Vec<&'static CommodityGroup> {
    let mut all: Vec<_> = COMMODITY_GROUPS.iter().collect();
    all.sort_by(|a, b| {
        a.category
            .name()
            .cmp(b.category.name())
            .then_with(|| a.name.cmp(b.name))
    });
    all
}

/// Case-insensitive substring search over group and category names.
///
/// Results use the same ordering as [`list_sorted`]. An empty or
/// whitespace-only query matches nothing.
pub fn search(query: &str) -> Vec<&'static CommodityGroup> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return Vec::new();
    }
    list_sorted()
        .into_iter()
        .filter(|g| g.name.to_lowercase().contains(&q) || g.category.name().to_lowercase().contains(&q))
        .collect()
}
