//! Map an image description to a stock photo URL
//!
//! Each catalogue category has alias keywords. A category scores `len * 2` for every
//! alias contained in the description, plus 10 when the alias stands as a whole word.
//! The highest score wins; on ties the earlier category wins. With no hit at all a
//! short list of context rules is tried, then the default category.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCategory {
    pub name: String,
    pub aliases: Vec<String>,
    pub urls: Vec<String>,
}

/// Applied only when no alias matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRule {
    pub terms: Vec<String>,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCatalog {
    pub categories: Vec<ImageCategory>,
    #[serde(default)]
    pub context_rules: Vec<ContextRule>,
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default = "default_fallback_url")]
    pub fallback_url: String,
}

pub const FALLBACK_IMAGE_URL: &str =
    "https://images.pexels.com/photos/3184360/pexels-photo-3184360.jpeg?auto=compress&cs=tinysrgb&w=800&h=600";

fn default_category() -> String {
    "business".to_string()
}

fn default_fallback_url() -> String {
    FALLBACK_IMAGE_URL.to_string()
}

fn pexels(id: &str) -> String {
    format!(
        "https://images.pexels.com/photos/{}.jpeg?auto=compress&cs=tinysrgb&w=800&h=600",
        id
    )
}

const BUILTIN: &[(&str, &[&str], &[&str])] = &[
    ("camel", &["camel", "desert animal", "dromedary", "hump"], &["2295744/pexels-photo-2295744", "1598073/pexels-photo-1598073"]),
    ("horse", &["horse", "equine", "stallion", "mare", "pony"], &["635499/pexels-photo-635499", "1996333/pexels-photo-1996333"]),
    ("dog", &["dog", "canine", "puppy", "pet dog", "domestic dog"], &["1108099/pexels-photo-1108099", "1805164/pexels-photo-1805164"]),
    ("cat", &["cat", "feline", "kitten", "pet cat", "domestic cat"], &["104827/cat-pet-animal-domestic-104827"]),
    ("elephant", &["elephant", "safari", "trunk", "tusks", "african elephant"], &["66898/elephant-cub-tsavo-kenya-66898"]),
    ("lion", &["lion", "big cat", "wildlife", "mane", "king of jungle"], &["247502/pexels-photo-247502"]),
    ("ice-cream", &["ice cream", "icecream", "frozen dessert", "gelato", "sorbet"], &["1352278/pexels-photo-1352278", "1362534/pexels-photo-1362534"]),
    ("pizza", &["pizza", "italian food", "slice", "pepperoni", "margherita"], &["315755/pexels-photo-315755", "1566837/pexels-photo-1566837"]),
    ("burger", &["burger", "hamburger", "fast food", "cheeseburger", "sandwich"], &["70497/pexels-photo-70497", "1639557/pexels-photo-1639557"]),
    ("cake", &["cake", "dessert", "bakery", "birthday cake", "wedding cake"], &["291528/pexels-photo-291528", "1721932/pexels-photo-1721932"]),
    ("coffee", &["coffee", "cafe", "beverage", "espresso", "latte", "cappuccino"], &["302899/pexels-photo-302899", "312418/pexels-photo-312418"]),
    ("food", &["meal", "restaurant", "dining", "cuisine", "dish"], &["376464/pexels-photo-376464", "1640777/pexels-photo-1640777"]),
    ("business", &["business", "office", "corporate", "professional", "meeting", "workplace"], &["3184360/pexels-photo-3184360", "3182812/pexels-photo-3182812", "3183197/pexels-photo-3183197"]),
    ("technology", &["technology", "tech", "digital", "software", "innovation", "startup"], &["373543/pexels-photo-373543", "3861969/pexels-photo-3861969"]),
    ("computer", &["computer", "laptop", "pc", "desktop", "workstation"], &["205316/pexels-photo-205316", "574071/pexels-photo-574071"]),
    ("smartphone", &["phone", "mobile", "smartphone", "device", "iphone", "android"], &["47261/pexels-photo-47261", "699122/pexels-photo-699122"]),
    ("nature", &["nature", "forest", "outdoor", "environment", "wilderness", "trees"], &["414612/pexels-photo-414612", "1366919/pexels-photo-1366919"]),
    ("beach", &["beach", "ocean", "sea", "coastal", "waves", "sand"], &["457882/pexels-photo-457882", "1032650/pexels-photo-1032650"]),
    ("mountain", &["mountain", "hiking", "peak", "landscape", "summit", "alpine"], &["417074/pexels-photo-417074", "1366630/pexels-photo-1366630"]),
    ("travel", &["travel", "vacation", "tourism", "journey", "adventure", "destination"], &["346885/pexels-photo-346885", "1371360/pexels-photo-1371360"]),
    ("sunset", &["sunset", "sunrise", "sky", "horizon", "golden hour", "dusk"], &["158163/clouds-cloudporn-weather-lookup-158163", "1624496/pexels-photo-1624496"]),
    ("fitness", &["fitness", "gym", "workout", "exercise", "training", "bodybuilding"], &["841130/pexels-photo-841130", "1552242/pexels-photo-1552242"]),
    ("yoga", &["yoga", "meditation", "wellness", "mindfulness", "zen", "namaste"], &["317157/pexels-photo-317157", "1051838/pexels-photo-1051838"]),
    ("health", &["health", "medical", "healthcare", "doctor", "hospital", "wellness"], &["40751/doctor-medical-medicine-health-40751", "1170979/pexels-photo-1170979"]),
];

const CONTEXT_RULES: &[(&[&str], &str)] = &[
    (&["product", "service", "company"], "business"),
    (&["food", "eat", "taste"], "food"),
    (&["outdoor", "natural", "green"], "nature"),
    (&["digital", "online", "app"], "technology"),
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ImageCatalog {
    fn default() -> Self {
        Self {
            categories: BUILTIN
                .iter()
                .map(|(name, aliases, ids)| ImageCategory {
                    name: name.to_string(),
                    aliases: strings(aliases),
                    urls: ids.iter().map(|id| pexels(id)).collect(),
                })
                .collect(),
            context_rules: CONTEXT_RULES
                .iter()
                .map(|(terms, category)| ContextRule {
                    terms: strings(terms),
                    category: category.to_string(),
                })
                .collect(),
            default_category: default_category(),
            fallback_url: default_fallback_url(),
        }
    }
}

/// True when some occurrence of `needle` in `haystack` is bounded by spaces or the string ends
fn is_whole_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = haystack[..start].chars().next_back().map_or(true, |c| c == ' ');
        let after_ok = haystack[end..].chars().next().map_or(true, |c| c == ' ');
        before_ok && after_ok
    })
}

impl ImageCatalog {
    /// Score of one category against an already-normalised description
    fn category_score(category: &ImageCategory, description: &str) -> u32 {
        category
            .aliases
            .iter()
            .filter(|alias| !alias.is_empty() && description.contains(alias.as_str()))
            .map(|alias| {
                let base = alias.len() as u32 * 2;
                if is_whole_word(description, alias) {
                    base + 10
                } else {
                    base
                }
            })
            .sum()
    }

    /// Best-scoring category and its score. Ties go to the earlier category.
    pub fn score(&self, description: &str) -> (Option<&ImageCategory>, u32) {
        let normalised = description.trim().to_lowercase();
        let mut best: (Option<&ImageCategory>, u32) = (None, 0);

        for category in &self.categories {
            let score = Self::category_score(category, &normalised);
            if score > best.1 {
                best = (Some(category), score);
            }
        }
        best
    }

    /// Category name to draw an image from
    pub fn choose_category(&self, description: &str) -> String {
        let (best, score) = self.score(description);
        if let Some(category) = best {
            debug!(category = %category.name, score, "Matched image category");
            return category.name.clone();
        }

        let normalised = description.trim().to_lowercase();
        self.context_rules
            .iter()
            .find(|rule| rule.terms.iter().any(|t| normalised.contains(t.as_str())))
            .map(|rule| rule.category.clone())
            .unwrap_or_else(|| self.default_category.clone())
    }

    /// Candidate URLs for a category, falling back to the default category's list
    pub fn urls_for(&self, name: &str) -> &[String] {
        let find = |wanted: &str| {
            self.categories
                .iter()
                .find(|c| c.name == wanted && !c.urls.is_empty())
                .map(|c| c.urls.as_slice())
        };
        find(name)
            .or_else(|| find(&self.default_category))
            .unwrap_or(&[])
    }
}

/// Picks a concrete image URL for a description. Never fails.
pub struct ImageResolver<R = StdRng> {
    catalog: ImageCatalog,
    rng: Mutex<R>,
}

impl ImageResolver<StdRng> {
    pub fn new(catalog: ImageCatalog) -> Self {
        Self::with_rng(catalog, StdRng::from_entropy())
    }

    /// Deterministic selection for a given seed
    pub fn seeded(catalog: ImageCatalog, seed: u64) -> Self {
        Self::with_rng(catalog, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ImageResolver<R> {
    pub fn with_rng(catalog: ImageCatalog, rng: R) -> Self {
        Self {
            catalog,
            rng: Mutex::new(rng),
        }
    }

    pub fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    pub fn resolve_image_url(&self, description: &str) -> String {
        let category = self.catalog.choose_category(description);
        let candidates = self.catalog.urls_for(&category);

        let chosen = match self.rng.lock() {
            Ok(mut rng) => candidates.choose(&mut *rng).cloned(),
            Err(_) => candidates.first().cloned(),
        };

        chosen.unwrap_or_else(|| self.catalog.fallback_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category_of(description: &str) -> String {
        ImageCatalog::default().choose_category(description)
    }

    #[test]
    fn test_whole_word_detection() {
        assert!(is_whole_word("a camel walks", "camel"));
        assert!(is_whole_word("camel", "camel"));
        assert!(is_whole_word("ride a camel", "camel"));
        assert!(!is_whole_word("camels walk", "camel"));
        assert!(!is_whole_word("a camel, resting", "camel"));
    }

    #[test]
    fn test_scoring_values() {
        let catalog = ImageCatalog::default();
        // "camel" whole word (10 + 10) plus "hump" substring of "humps" (8)
        let (best, score) = catalog.score("A camel with two humps");
        assert_eq!(best.unwrap().name, "camel");
        assert_eq!(score, 28);
    }

    #[test]
    fn test_camel_beats_desert_scenery() {
        assert_eq!(
            category_of("A majestic camel standing in golden desert sand dunes under clear blue sky"),
            "camel"
        );
    }

    #[test]
    fn test_specific_food_categories() {
        assert_eq!(category_of("Colorful ice cream scoops in a waffle cone"), "ice-cream");
        assert_eq!(category_of("A steaming cup of coffee with latte art"), "coffee");
    }

    #[test]
    fn test_tie_goes_to_earlier_category() {
        // "wellness" is an alias of both yoga and health
        assert_eq!(category_of("wellness"), "yoga");
    }

    #[test]
    fn test_context_rules_when_nothing_matches() {
        assert_eq!(category_of("people who like to eat well"), "food");
        assert_eq!(category_of("an online shop"), "technology");
        assert_eq!(category_of("a green field"), "nature");
    }

    #[test]
    fn test_default_category() {
        assert_eq!(category_of("zzz qqq"), "business");
        assert_eq!(category_of(""), "business");
    }

    #[test]
    fn test_resolve_picks_from_category() {
        let resolver = ImageResolver::seeded(ImageCatalog::default(), 7);
        let camel_urls = resolver.catalog().urls_for("camel").to_vec();
        for _ in 0..10 {
            let url = resolver.resolve_image_url("a camel resting in the desert");
            assert!(camel_urls.contains(&url));
        }
    }

    #[test]
    fn test_same_seed_same_choice() {
        let a = ImageResolver::seeded(ImageCatalog::default(), 42);
        let b = ImageResolver::seeded(ImageCatalog::default(), 42);
        for _ in 0..5 {
            assert_eq!(
                a.resolve_image_url("modern office meeting"),
                b.resolve_image_url("modern office meeting")
            );
        }
    }

    #[test]
    fn test_unknown_category_uses_default_urls() {
        let mut catalog = ImageCatalog::default();
        catalog.context_rules = vec![ContextRule {
            terms: vec!["zebra".to_string()],
            category: "stripes".to_string(),
        }];
        let business = catalog.urls_for("business").to_vec();
        let resolver = ImageResolver::seeded(catalog, 1);
        assert!(business.contains(&resolver.resolve_image_url("zebra")));
    }

    #[test]
    fn test_empty_catalog_returns_fallback_url() {
        let catalog = ImageCatalog {
            categories: Vec::new(),
            context_rules: Vec::new(),
            default_category: "business".to_string(),
            fallback_url: FALLBACK_IMAGE_URL.to_string(),
        };
        let resolver = ImageResolver::seeded(catalog, 1);
        assert_eq!(resolver.resolve_image_url("anything"), FALLBACK_IMAGE_URL);
    }

    #[test]
    fn test_odd_inputs_resolve() {
        let resolver = ImageResolver::seeded(ImageCatalog::default(), 3);
        let long = "ünïcödé ☕ ".repeat(10_000);
        for input in ["", "   ", "日本の寿司", long.as_str()] {
            assert!(resolver.resolve_image_url(input).starts_with("https://"));
        }
    }
}
