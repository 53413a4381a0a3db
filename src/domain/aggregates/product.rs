//! Product Aggregate
//!
//! Read-only catalog snapshot types as the commerce platform reports them.
//! The storefront never mutates products; it only stages variants into the
//! bundle or cart.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Image, Money};

/// A selected option on a variant, e.g. `Size: 8 oz`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

/// A purchasable SKU of a product with its own price and stock level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub title: String,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    #[serde(default)]
    pub quantity_available: i64,
}

impl Variant {
    pub fn in_stock(&self) -> bool {
        self.quantity_available > 0
    }

    /// Display title for cart lines: option values joined with `" - "`.
    pub fn display_title(&self) -> String {
        self.selected_options
            .iter()
            .map(|o| o.value.as_str())
            .collect::<Vec<_>>()
            .join(" - ")
    }
}

/// Storefront category buckets, derived from product titles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Houseplants,
    GardenPlants,
    HydroAquatic,
    Supplement,
    All,
}

impl Category {
    /// Buckets a product by title keywords.
    pub fn from_title(title: &str) -> Self {
        let title = title.to_lowercase();
        let any = |words: &[&str]| words.iter().any(|w| title.contains(w));

        if any(&["monstera", "fiddle leaf", "indoor", "succulent", "houseplant", "snake plant"]) {
            Category::Houseplants
        } else if any(&["garden", "tomato", "flower", "rose", "vegetable", "strawberry"]) {
            Category::GardenPlants
        } else if any(&["hydro", "aquatic", "water", "lotus"]) {
            Category::HydroAquatic
        } else if any(&["supplement", "calcium", "nutrient", "magnesium", "silica"]) {
            Category::Supplement
        } else {
            Category::All
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub featured_image: Image,
    pub variants: Vec<Variant>,
    pub category: Category,
}

impl Product {
    /// The default variant offered by quick-add surfaces.
    pub fn first_variant(&self) -> Option<&Variant> {
        self.variants.first()
    }
}
