//! Prompt templates for the text-generation provider

use crate::types::{AdBrief, ContentCategory};

/// Prompt for ready-to-post social copy
pub fn post_copy(prompt: &str, category: ContentCategory) -> String {
    format!(
        "You are a professional social media content creator. Generate an engaging social media post based on the following:

Category: {category}
Prompt: {prompt}

Requirements:
- Keep it conversational and engaging
- Make it suitable for a broad social media audience
- Include relevant hashtags if appropriate
- Do NOT use asterisks (*) or special formatting characters
- Keep it concise but compelling (150-300 words)
- Make it sound natural and human-like
- Focus on value and engagement

Generate only the post content, nothing else:",
        category = category.label(),
        prompt = prompt.trim(),
    )
}

/// Prompt for a short description of the image that should accompany a post
pub fn image_description(prompt: &str, category: ContentCategory) -> String {
    format!(
        "You are an expert at creating image descriptions. Create a detailed, specific description of a photo for this social media post idea:

Category: {category}
Post Idea: {prompt}

Requirements:
1. Identify and describe the exact main subject mentioned in the idea
2. Name specific animals, food items or products exactly as mentioned
3. Use clear, descriptive keywords that match the subject
4. Professional, high-quality visual suitable for social media
5. 30-80 words focusing on the primary subject

Generate only the image description:",
        category = category.label(),
        prompt = prompt.trim(),
    )
}

/// Prompt asking for ad copy as a single JSON object
pub fn ad_copy(brief: &AdBrief) -> String {
    let offer = brief
        .offer
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .unwrap_or("No specific offer mentioned");

    format!(
        r##"You are an expert Facebook Ads specialist. Create a high-converting ad based on these details:

Product/Service: {product}
Target Audience: {audience}
Special Offer: {offer}
Campaign Goal: {goal}

Generate a JSON response with exactly this structure:
{{
  "caption": "A compelling ad caption (150-200 words) with a strong hook, benefits and a clear call-to-action",
  "hashtags": ["#hashtag1", "#hashtag2", "#hashtag3", "#hashtag4", "#hashtag5"],
  "keywords": ["keyword1", "keyword2", "keyword3", "keyword4", "keyword5"],
  "targetingTips": ["tip1", "tip2", "tip3", "tip4", "tip5"]
}}

Hashtags should mix popular and niche tags. Keywords should suit interest-based targeting.
Targeting tips should be specific, actionable optimization advice.

Return ONLY the JSON object, no additional text or formatting."##,
        product = brief.product.trim(),
        audience = brief.audience.trim(),
        offer = offer,
        goal = brief.goal.trim(),
    )
}
