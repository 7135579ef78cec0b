use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One jewellery sub-category. Every category lives in its own collection
/// and is reseeded from its own feed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[serde(alias = "bracelets")]
    Bracelet,
    #[serde(alias = "rings")]
    Ring,
    #[serde(alias = "necklaces")]
    Necklace,
    #[serde(alias = "mangalsutras")]
    Mangalsutra,
    #[serde(alias = "earrings")]
    Earring,
    Gifting,
    #[serde(alias = "others")]
    Other,
    #[serde(alias = "solitaries")]
    Solitary,
    Trending,
    #[serde(alias = "new-arrivals", alias = "new_arrivals")]
    NewArrival,
    #[serde(alias = "best-sellers", alias = "best_sellers")]
    BestSeller,
}

/// Shape of the `reviews` field for a category's documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewsKind {
    Count,
    List,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Bracelet,
        Category::Ring,
        Category::Necklace,
        Category::Mangalsutra,
        Category::Earring,
        Category::Gifting,
        Category::Other,
        Category::Solitary,
        Category::Trending,
        Category::NewArrival,
        Category::BestSeller,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Category::Bracelet => "bracelet",
            Category::Ring => "ring",
            Category::Necklace => "necklace",
            Category::Mangalsutra => "mangalsutra",
            Category::Earring => "earring",
            Category::Gifting => "gifting",
            Category::Other => "other",
            Category::Solitary => "solitary",
            Category::Trending => "trending",
            Category::NewArrival => "new_arrival",
            Category::BestSeller => "best_seller",
        }
    }

    /// Route prefix, without the leading slash.
    pub fn prefix(self) -> &'static str {
        match self {
            Category::Bracelet => "bracelets",
            Category::Ring => "rings",
            Category::Necklace => "necklaces",
            Category::Mangalsutra => "mangalsutras",
            Category::Earring => "earrings",
            Category::Gifting => "gifting",
            Category::Other => "others",
            Category::Solitary => "solitaries",
            Category::Trending => "trending",
            Category::NewArrival => "new-arrivals",
            Category::BestSeller => "best-sellers",
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            Category::Bracelet => "bracelets",
            Category::Ring => "rings",
            Category::Necklace => "necklaces",
            Category::Mangalsutra => "mangalsutras",
            Category::Earring => "earrings",
            Category::Gifting => "giftings",
            Category::Other => "others",
            Category::Solitary => "solitaries",
            Category::Trending => "trendings",
            Category::NewArrival => "new_arrivals",
            Category::BestSeller => "best_sellers",
        }
    }

    pub fn feed_file(self) -> String {
        format!("{}.json", self.prefix())
    }

    /// Key the feed nests its array under, when it is not a flat array.
    pub fn feed_key(self) -> &'static str {
        match self {
            Category::NewArrival => "newArrivals",
            Category::BestSeller => "bestSellers",
            other => other.prefix(),
        }
    }

    pub fn reviews_kind(self) -> ReviewsKind {
        match self {
            Category::Bracelet
            | Category::Ring
            | Category::Necklace
            | Category::Mangalsutra
            | Category::Earring
            | Category::Solitary => ReviewsKind::Count,
            Category::Gifting
            | Category::Other
            | Category::Trending
            | Category::NewArrival
            | Category::BestSeller => ReviewsKind::List,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().trim_start_matches('/').to_lowercase();

        Category::ALL
            .into_iter()
            .find(|category| {
                category.slug() == needle
                    || category.prefix() == needle
                    || category.collection() == needle
            })
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
