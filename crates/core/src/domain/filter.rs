use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Attribute tiers. Tier membership is fixed; attributes are never
/// reclassified at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterTier {
    Primary,
    Secondary,
    Expert,
}

/// Every promptable filter attribute, named the way prompts and stored
/// snapshots refer to them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAttribute {
    PriceRange,
    Color,
    Country,
    Style,
    Grape,
    Sugar,
    Body,
    MatchingDishes,
    Strength,
    Vintage,
    Region,
}

impl FilterAttribute {
    /// Primary attributes in prompt order.
    pub const PRIMARY: [FilterAttribute; 4] =
        [Self::PriceRange, Self::Color, Self::Country, Self::Style];

    /// Secondary attributes in prompt order.
    pub const SECONDARY: [FilterAttribute; 5] =
        [Self::Grape, Self::Sugar, Self::Body, Self::MatchingDishes, Self::Strength];

    /// Expert attributes in prompt order.
    pub const EXPERT: [FilterAttribute; 2] = [Self::Vintage, Self::Region];

    pub fn tier(self) -> FilterTier {
        match self {
            Self::PriceRange | Self::Color | Self::Country | Self::Style => FilterTier::Primary,
            Self::Grape | Self::Sugar | Self::Body | Self::MatchingDishes | Self::Strength => {
                FilterTier::Secondary
            }
            Self::Vintage | Self::Region => FilterTier::Expert,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

/// Alcohol strength bounds in percent ABV.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StrengthRange {
    pub min: Option<f32>,
    pub max: Option<f32>,
}

/// Extracted user intent for one conversation turn. All fields are optional;
/// absence is meaningful, not an error. The filter is treated as immutable
/// once handed to the decision engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WineFilter {
    // primary tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    // secondary tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matching_dishes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<StrengthRange>,

    // expert tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vintage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    // direct lookup by wine name bypasses tier logic entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WineFilter {
    /// Number of primary attributes required for a confident recommendation.
    pub const TOTAL_PRIMARY: usize = FilterAttribute::PRIMARY.len();

    pub fn is_set(&self, attribute: FilterAttribute) -> bool {
        match attribute {
            FilterAttribute::PriceRange => self.price_range.is_some(),
            FilterAttribute::Color => non_empty(&self.color),
            FilterAttribute::Country => non_empty(&self.country),
            FilterAttribute::Style => non_empty(&self.style),
            FilterAttribute::Grape => non_empty(&self.grape),
            FilterAttribute::Sugar => non_empty(&self.sugar),
            FilterAttribute::Body => non_empty(&self.body),
            FilterAttribute::MatchingDishes => !self.matching_dishes.is_empty(),
            FilterAttribute::Strength => self.strength.is_some(),
            FilterAttribute::Vintage => self.vintage.is_some(),
            FilterAttribute::Region => non_empty(&self.region),
        }
    }

    pub fn has_name(&self) -> bool {
        non_empty(&self.name)
    }

    pub fn primary_filled_count(&self) -> usize {
        FilterAttribute::PRIMARY.iter().filter(|attribute| self.is_set(**attribute)).count()
    }

    pub fn has_secondary_filters(&self) -> bool {
        FilterAttribute::SECONDARY.iter().any(|attribute| self.is_set(*attribute))
    }

    pub fn has_expert_filters(&self) -> bool {
        FilterAttribute::EXPERT.iter().any(|attribute| self.is_set(*attribute))
    }

    /// Unfilled primary attributes in stable prompt order.
    pub fn empty_primary_filters(&self) -> Vec<FilterAttribute> {
        FilterAttribute::PRIMARY.iter().copied().filter(|attribute| !self.is_set(*attribute)).collect()
    }

    /// A non-empty random subset of the unfilled secondary attributes, used to
    /// vary prompt wording between turns. Falls back to the full secondary
    /// tier when every secondary attribute is already filled, so the result
    /// is never empty. Returned in stable prompt order.
    pub fn random_secondary_filters<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<FilterAttribute> {
        let unfilled: Vec<FilterAttribute> = FilterAttribute::SECONDARY
            .iter()
            .copied()
            .filter(|attribute| !self.is_set(*attribute))
            .collect();
        let pool = if unfilled.is_empty() { FilterAttribute::SECONDARY.to_vec() } else { unfilled };

        let count = rng.gen_range(1..=pool.len());
        let mut chosen: Vec<FilterAttribute> =
            pool.choose_multiple(rng, count).copied().collect();
        chosen.sort_by_key(|attribute| prompt_rank(*attribute));
        chosen
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|text| !text.trim().is_empty())
}

fn prompt_rank(attribute: FilterAttribute) -> usize {
    FilterAttribute::SECONDARY
        .iter()
        .position(|candidate| *candidate == attribute)
        .unwrap_or(usize::MAX)
}
