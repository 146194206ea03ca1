//! Local image descriptions used when the provider is unavailable
//!
//! The table is plain data and can be replaced wholesale from `config.toml`:
//!
//! ```toml
//! [fallback_descriptions]
//! default = "A bright, professional photo"
//!
//! [[fallback_descriptions.keywords]]
//! keyword = "tea"
//! description = "A teapot pouring into a glass cup"
//! ```

use serde::{Deserialize, Serialize};

use crate::types::ContentCategory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordDescription {
    pub keyword: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDescription {
    pub category: ContentCategory,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackDescriptions {
    /// Checked in order; the first keyword found in the prompt wins
    #[serde(default)]
    pub keywords: Vec<KeywordDescription>,
    #[serde(default)]
    pub categories: Vec<CategoryDescription>,
    pub default: String,
}

const KEYWORDS: &[(&str, &str)] = &[
    ("camel", "A majestic camel standing in golden desert sand dunes under clear blue sky"),
    ("horse", "A beautiful horse running freely in an open green meadow"),
    ("dog", "A friendly dog sitting in a sunny park with green grass"),
    ("cat", "A cute cat sitting peacefully in a cozy indoor setting"),
    ("ice cream", "Colorful ice cream scoops in a waffle cone on a bright background"),
    ("pizza", "A delicious pizza with fresh toppings on a wooden table"),
    ("burger", "A gourmet burger with fresh ingredients on a rustic plate"),
    ("cake", "An elegant cake with beautiful decorations on a white background"),
    ("coffee", "A steaming cup of coffee with latte art on a wooden table"),
    ("business", "Professional business meeting in a modern office setting"),
    ("technology", "Modern technology devices and digital interfaces"),
    ("fitness", "People exercising in a bright, modern gym environment"),
    ("travel", "Beautiful travel destination with scenic landscape view"),
    ("food", "Fresh, appetizing food beautifully presented on a table"),
];

const CATEGORIES: &[(ContentCategory, &str)] = &[
    (ContentCategory::BusinessMarketing, "Professional business presentation in a modern office environment"),
    (ContentCategory::TechnologyInnovation, "Cutting-edge technology and digital innovation concepts"),
    (ContentCategory::HealthWellness, "Healthy lifestyle and wellness activities in natural setting"),
    (ContentCategory::LifestyleTravel, "Beautiful travel destination with stunning natural scenery"),
    (ContentCategory::FoodCooking, "Delicious, fresh food beautifully arranged and presented"),
    (ContentCategory::EducationLearning, "Learning environment with books and educational materials"),
    (ContentCategory::EntertainmentFun, "Fun, colorful entertainment and recreational activities"),
    (ContentCategory::SportsFitness, "Athletic activities and fitness training in action"),
    (ContentCategory::FashionBeauty, "Stylish fashion and beauty products in elegant setting"),
];

const DEFAULT_DESCRIPTION: &str =
    "Professional, high-quality image suitable for social media content";

impl Default for FallbackDescriptions {
    fn default() -> Self {
        Self {
            keywords: KEYWORDS
                .iter()
                .map(|(keyword, description)| KeywordDescription {
                    keyword: keyword.to_string(),
                    description: description.to_string(),
                })
                .collect(),
            categories: CATEGORIES
                .iter()
                .map(|(category, description)| CategoryDescription {
                    category: *category,
                    description: description.to_string(),
                })
                .collect(),
            default: DEFAULT_DESCRIPTION.to_string(),
        }
    }
}

impl FallbackDescriptions {
    /// Keyword hit first, then the category's description, then the generic default
    pub fn describe(&self, prompt: &str, category: ContentCategory) -> &str {
        let prompt = prompt.trim().to_lowercase();

        if let Some(hit) = self
            .keywords
            .iter()
            .find(|k| !k.keyword.is_empty() && prompt.contains(&k.keyword.to_lowercase()))
        {
            return &hit.description;
        }

        self.categories
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.description.as_str())
            .unwrap_or(&self.default)
    }
}
