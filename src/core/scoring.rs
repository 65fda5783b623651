//! Design success scoring.
//!
//! Pure and deterministic: the same [`ScoreInput`] always yields the same
//! [`ScoreResult`]. The workflow runner computes the identical result on
//! the server side, so both can be cached and compared field by field.

use crate::domain::model::{RevenueEstimate, ScoreInput, ScoreResult, SubScores, Tier};

pub const TRENDING_COLORS: &[&str] = &["purple", "sage green", "terracotta", "navy blue", "blush pink"];

pub const POWER_TAGS: &[&str] = &["minimalist", "boho", "vintage", "modern", "aesthetic", "trendy"];

/// niche -> bonus；依表格順序比對，只取第一個命中的
pub const HOT_NICHES: &[(&str, u32)] = &[
    ("cat", 25),
    ("dog", 25),
    ("coffee", 20),
    ("mom", 20),
    ("teacher", 20),
    ("nurse", 18),
    ("quote", 15),
    ("motivational", 15),
    ("funny", 15),
    ("christmas", 25),
    ("halloween", 20),
    ("valentine", 18),
];

const COLOR_POINTS: u32 = 20;
const TAG_POINTS: u32 = 15;
const MARKET_BASE: u32 = 30;
const MAX_SUB_SCORE: u32 = 100;

pub const COLOR_ADVICE: &str =
    "Consider using trending colors like sage green or terracotta for +23% appeal";
pub const TAG_ADVICE: &str =
    "Add trending tags like \"minimalist\" or \"aesthetic\" for +18% discoverability";
pub const MARKET_ADVICE: &str =
    "Target high-demand niches like pets, coffee, or motivational quotes for +25% sales potential";
pub const TITLE_ADVICE: &str = "Expand title with descriptive keywords for +15% SEO visibility";
pub const TAG_COUNT_ADVICE: &str =
    "Add more relevant tags (aim for 10-13) for maximum platform visibility";

const MIN_TITLE_CHARS: usize = 10;
const MIN_TAG_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, input: &ScoreInput) -> ScoreResult {
        score(input)
    }

    pub fn sub_scores(&self, input: &ScoreInput) -> SubScores {
        sub_scores(input)
    }
}

pub fn score(input: &ScoreInput) -> ScoreResult {
    let subs = sub_scores(input);
    let success_score = success_score(&subs);
    let tier = Tier::from_score(success_score);

    ScoreResult {
        success_score,
        tier,
        recommendations: recommendations(input, &subs),
        revenue_estimate: revenue_estimate(tier, success_score),
    }
}

pub fn sub_scores(input: &ScoreInput) -> SubScores {
    SubScores {
        color: color_score(&input.colors),
        tag: tag_score(&input.tags),
        market: market_score(input),
    }
}

fn count_matches(values: &[String], vocabulary: &[&str]) -> u32 {
    values
        .iter()
        .filter(|value| {
            let lower = value.to_lowercase();
            vocabulary.iter().any(|term| lower.contains(term))
        })
        .count() as u32
}

fn capped(score: u32) -> u8 {
    score.min(MAX_SUB_SCORE) as u8
}

pub fn color_score(colors: &[String]) -> u8 {
    capped(count_matches(colors, TRENDING_COLORS).saturating_mul(COLOR_POINTS))
}

pub fn tag_score(tags: &[String]) -> u8 {
    capped(count_matches(tags, POWER_TAGS).saturating_mul(TAG_POINTS))
}

pub fn market_score(input: &ScoreInput) -> u8 {
    let all_text = format!(
        "{} {} {}",
        input.title,
        input.description,
        input.tags.join(" ")
    )
    .to_lowercase();

    let bonus = HOT_NICHES
        .iter()
        .find(|(niche, _)| all_text.contains(niche))
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0);

    capped(MARKET_BASE + bonus)
}

/// round(0.2·color + 0.3·tag + 0.5·market)，以整數運算避免浮點誤差，.5 進位
pub fn success_score(subs: &SubScores) -> u8 {
    let weighted =
        2 * u32::from(subs.color) + 3 * u32::from(subs.tag) + 5 * u32::from(subs.market);
    ((weighted + 5) / 10).min(MAX_SUB_SCORE) as u8
}

fn recommendations(input: &ScoreInput, subs: &SubScores) -> Vec<String> {
    let rules: [(bool, &str); 5] = [
        (subs.color < 60, COLOR_ADVICE),
        (subs.tag < 60, TAG_ADVICE),
        (subs.market < 70, MARKET_ADVICE),
        (input.title.chars().count() < MIN_TITLE_CHARS, TITLE_ADVICE),
        (input.tags.len() < MIN_TAG_COUNT, TAG_COUNT_ADVICE),
    ];

    rules
        .iter()
        .filter(|(triggered, _)| *triggered)
        .map(|(_, advice)| advice.to_string())
        .collect()
}

pub fn revenue_estimate(tier: Tier, success_score: u8) -> RevenueEstimate {
    let (min, max) = match tier {
        Tier::High => (2000, 5000),
        Tier::Moderate => (800, 2500),
        Tier::Low => (200, 800),
    };
    RevenueEstimate {
        min,
        max,
        confidence_percent: success_score.saturating_add(10).min(95),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_a() -> ScoreInput {
        ScoreInput::new("Sleepy Cat Print", "A cozy illustration")
            .with_tags(["minimalist", "modern"])
            .with_colors(["Deep Purple", "Navy Blue"])
    }

    fn scenario_b() -> ScoreInput {
        ScoreInput::new("Christmas Wreath Poster", "Festive wall art")
            .with_tags(["minimalist", "boho", "vintage", "modern", "aesthetic"])
            .with_colors(["purple", "sage green", "terracotta", "navy blue", "blush pink"])
    }

    #[test]
    fn test_scenario_a_low_tier() {
        let input = scenario_a();
        let subs = sub_scores(&input);
        assert_eq!(subs, SubScores { color: 40, tag: 30, market: 55 });

        let result = score(&input);
        assert_eq!(result.success_score, 45);
        assert_eq!(result.tier, Tier::Low);
        assert_eq!(result.revenue_estimate.min, 200);
        assert_eq!(result.revenue_estimate.max, 800);
        assert_eq!(result.revenue_estimate.confidence_percent, 55);
    }

    #[test]
    fn test_scenario_b_moderate_tier() {
        let input = scenario_b();
        let subs = sub_scores(&input);
        assert_eq!(subs, SubScores { color: 100, tag: 100, market: 55 });

        let result = score(&input);
        assert_eq!(result.success_score, 78);
        assert_eq!(result.tier, Tier::Moderate);
        assert_eq!(result.revenue_estimate.min, 800);
        assert_eq!(result.revenue_estimate.max, 2500);
        assert_eq!(result.revenue_estimate.confidence_percent, 88);
        assert_eq!(result.recommendations, vec![MARKET_ADVICE.to_string()]);
    }

    #[test]
    fn test_score_is_deterministic() {
        let input = scenario_b();
        assert_eq!(score(&input), score(&input));
        assert_eq!(ScoringEngine::new().score(&input), score(&input));
    }

    #[test]
    fn test_only_first_niche_counts() {
        // "cat" 與 "coffee" 都出現，只計算表格中較前面的 cat
        let input = ScoreInput::new("Coffee and cat lovers", "");
        assert_eq!(market_score(&input), 55);

        let input = ScoreInput::new("Nurse life", "");
        assert_eq!(market_score(&input), 48);

        let input = ScoreInput::new("Abstract lines", "");
        assert_eq!(market_score(&input), 30);
    }

    #[test]
    fn test_niche_found_in_tags_and_description() {
        let from_tags = ScoreInput::new("Print", "").with_tags(["halloween"]);
        assert_eq!(market_score(&from_tags), 50);

        let from_description = ScoreInput::new("Print", "gift for mom");
        assert_eq!(market_score(&from_description), 50);
    }

    #[test]
    fn test_sub_scores_are_capped() {
        let colors: Vec<String> = (0..8).map(|i| format!("purple {}", i)).collect();
        let tags: Vec<String> = (0..9).map(|i| format!("boho {}", i)).collect();
        assert_eq!(color_score(&colors), 100);
        assert_eq!(tag_score(&tags), 100);
    }

    #[test]
    fn test_matching_is_case_insensitive_substring() {
        assert_eq!(color_score(&["SAGE GREEN linen".to_string()]), 20);
        assert_eq!(tag_score(&["Vintage-Style".to_string()]), 15);
        assert_eq!(color_score(&["green".to_string()]), 0);
    }

    #[test]
    fn test_high_tier_and_confidence_cap() {
        let subs = SubScores { color: 100, tag: 100, market: 100 };
        assert_eq!(success_score(&subs), 100);
        let estimate = revenue_estimate(Tier::High, 100);
        assert_eq!((estimate.min, estimate.max), (2000, 5000));
        assert_eq!(estimate.confidence_percent, 95);
    }

    #[test]
    fn test_half_rounds_up() {
        // 2*40 + 3*30 + 5*55 = 445 -> 44.5 -> 45
        assert_eq!(success_score(&SubScores { color: 40, tag: 30, market: 55 }), 45);
        // 2*0 + 3*15 + 5*30 = 195 -> 19.5 -> 20
        assert_eq!(success_score(&SubScores { color: 0, tag: 15, market: 30 }), 20);
    }

    #[test]
    fn test_empty_input_fires_every_recommendation() {
        let result = score(&ScoreInput::default());

        assert_eq!(result.success_score, 15);
        assert_eq!(result.tier, Tier::Low);
        assert_eq!(
            result.recommendations,
            vec![
                COLOR_ADVICE.to_string(),
                TAG_ADVICE.to_string(),
                MARKET_ADVICE.to_string(),
                TITLE_ADVICE.to_string(),
                TAG_COUNT_ADVICE.to_string(),
            ]
        );
    }

    #[test]
    fn test_title_length_counts_characters() {
        let input = ScoreInput::new("Café ☕ art", "")
            .with_tags(["a", "b", "c", "d", "e"]);
        let result = score(&input);
        assert!(!result.recommendations.contains(&TITLE_ADVICE.to_string()));
        assert!(!result.recommendations.contains(&TAG_COUNT_ADVICE.to_string()));
    }
}
