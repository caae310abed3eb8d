//! Side-effect-free projections over the community pool: statistics and the
//! filtered/sorted feed.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::{CommunityManifestation, CommunityStats, ManifestationState, TrendingCategory};

/// How many categories the trending list keeps.
pub const TRENDING_LIMIT: usize = 5;

pub fn category_emoji(category: &str) -> &'static str {
    match category {
        "Business" => "💼",
        "Health" => "💪",
        "Learning" => "📚",
        "Creative" => "🎨",
        "Adventure" => "🌍",
        "Technology" => "💻",
        "Lifestyle" => "🌟",
        "Finance" => "💰",
        _ => "✨",
    }
}

/// Aggregate the pool. Entries without a category are left out of the
/// histogram but still count toward the totals.
pub fn compute_stats(pool: &[CommunityManifestation]) -> CommunityStats {
    // First-seen order decides ties in the trending list.
    let mut ordered: Vec<(&str, usize)> = Vec::new();
    for category in pool.iter().filter_map(|m| m.category.as_deref()) {
        match ordered.iter_mut().find(|(name, _)| *name == category) {
            Some((_, count)) => *count += 1,
            None => ordered.push((category, 1)),
        }
    }

    let category_counts: BTreeMap<String, usize> = ordered
        .iter()
        .map(|(name, count)| (name.to_string(), *count))
        .collect();

    let mut trending = ordered.clone();
    trending.sort_by(|a, b| b.1.cmp(&a.1));
    let trending_categories = trending
        .into_iter()
        .take(TRENDING_LIMIT)
        .map(|(name, count)| TrendingCategory {
            name: name.to_string(),
            count,
            emoji: category_emoji(name).to_string(),
        })
        .collect();

    let authors: HashSet<&str> = pool.iter().map(|m| m.author.address.as_str()).collect();

    CommunityStats {
        total_dreamers: authors.len(),
        total_manifested: pool
            .iter()
            .filter(|m| m.state == ManifestationState::Done)
            .count(),
        total_support: pool.iter().map(CommunityManifestation::popularity).sum(),
        category_counts,
        trending_categories,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSort {
    /// Likes plus supports, highest first.
    #[default]
    Popular,
    /// Creation time, newest first.
    Recent,
}

/// Feed filter. Every field is optional; the default returns the whole pool
/// by popularity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub category: Option<String>,
    /// Case-insensitive match against title, description and author name.
    #[serde(default, rename = "q")]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: FeedSort,
    /// Only entries in the `Done` state.
    #[serde(default)]
    pub completed: bool,
}

impl FeedQuery {
    pub fn matches(&self, entry: &CommunityManifestation) -> bool {
        if let Some(category) = self.category.as_deref().filter(|c| *c != "all") {
            if entry.category.as_deref() != Some(category) {
                return false;
            }
        }

        if self.completed && entry.state != ManifestationState::Done {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                entry.title.to_lowercase().contains(&needle)
                    || entry
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
                    || entry.author.name.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }

    /// Filter and sort a snapshot of the pool. Sorting is stable, so equal
    /// keys keep pool order.
    pub fn apply(&self, pool: &[CommunityManifestation]) -> Vec<CommunityManifestation> {
        let mut results: Vec<_> = pool.iter().filter(|m| self.matches(m)).cloned().collect();
        match self.sort {
            FeedSort::Popular => results.sort_by(|a, b| b.popularity().cmp(&a.popularity())),
            FeedSort::Recent => results.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Author;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn entry(title: &str, category: Option<&str>, author: &str) -> CommunityManifestation {
        let now = Utc::now();
        CommunityManifestation {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            emoji: "✨".to_string(),
            state: ManifestationState::Dream,
            category: category.map(str::to_string),
            tags: Vec::new(),
            progress: 0,
            author: Author {
                name: format!("User {author}"),
                address: author.to_string(),
                verified: false,
            },
            likes: Vec::new(),
            supporters: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
            shared_at: now,
        }
    }

    #[test]
    fn stats_on_empty_pool_are_zero() {
        assert_eq!(compute_stats(&[]), CommunityStats::default());
    }

    #[test]
    fn stats_count_distinct_authors_done_and_support() {
        let mut a = entry("Ship the app", Some("Business"), "0xaaa");
        a.state = ManifestationState::Done;
        a.likes = vec!["0x1".into(), "0x2".into()];
        let mut b = entry("Learn piano", Some("Learning"), "0xaaa");
        b.supporters = vec!["0x3".into()];
        let c = entry("Climb Kilimanjaro", None, "0xbbb");

        let stats = compute_stats(&[a, b, c]);

        assert_eq!(stats.total_dreamers, 2);
        assert_eq!(stats.total_manifested, 1);
        assert_eq!(stats.total_support, 3);
        assert_eq!(stats.category_counts.len(), 2);
        assert_eq!(stats.category_counts["Business"], 1);
    }

    #[test]
    fn trending_breaks_ties_by_first_appearance() {
        let pool = vec![
            entry("a", Some("Health"), "0x1"),
            entry("b", Some("Finance"), "0x2"),
            entry("c", Some("Finance"), "0x3"),
            entry("d", Some("Health"), "0x4"),
            entry("e", Some("Creative"), "0x5"),
            entry("f", Some("Zen"), "0x6"),
            entry("g", Some("Adventure"), "0x7"),
            entry("h", Some("Lifestyle"), "0x8"),
        ];

        let stats = compute_stats(&pool);
        let names: Vec<_> = stats
            .trending_categories
            .iter()
            .map(|t| t.name.as_str())
            .collect();

        assert_eq!(names, vec!["Health", "Finance", "Creative", "Zen", "Adventure"]);
        assert_eq!(stats.trending_categories[0].emoji, "💪");
        assert_eq!(stats.trending_categories[3].emoji, "✨");
    }

    #[test]
    fn search_matches_title_description_and_author() {
        let mut with_description = entry("Garden", None, "0x1");
        with_description.description = Some("Grow TOMATOES".to_string());
        let pool = vec![
            entry("Build a SaaS", None, "0x2"),
            with_description,
            entry("Write", None, "0xsaas"),
        ];

        let query = FeedQuery {
            search: Some("saas".to_string()),
            ..Default::default()
        };
        assert_eq!(query.apply(&pool).len(), 2);

        let query = FeedQuery {
            search: Some("tomatoes".to_string()),
            ..Default::default()
        };
        assert_eq!(query.apply(&pool)[0].title, "Garden");
    }

    #[test]
    fn popular_sort_is_stable_and_recent_sort_is_newest_first() {
        let mut quiet = entry("quiet", None, "0x1");
        quiet.created_at -= Duration::days(2);
        let mut loud = entry("loud", None, "0x2");
        loud.likes = vec!["0x9".into()];
        loud.created_at -= Duration::days(1);
        let also_quiet = entry("also quiet", None, "0x3");
        let pool = vec![quiet, loud, also_quiet];

        let popular: Vec<_> = FeedQuery::default()
            .apply(&pool)
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(popular, vec!["loud", "quiet", "also quiet"]);

        let recent: Vec<_> = FeedQuery {
            sort: FeedSort::Recent,
            ..Default::default()
        }
        .apply(&pool)
        .into_iter()
        .map(|m| m.title)
        .collect();
        assert_eq!(recent, vec!["also quiet", "loud", "quiet"]);
    }

    #[test]
    fn category_and_completed_filters_combine() {
        let mut done = entry("done", Some("Health"), "0x1");
        done.state = ManifestationState::Done;
        let pool = vec![done, entry("dream", Some("Health"), "0x2")];

        let query = FeedQuery {
            category: Some("Health".to_string()),
            completed: true,
            ..Default::default()
        };
        let results = query.apply(&pool);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "done");

        let all = FeedQuery {
            category: Some("all".to_string()),
            ..Default::default()
        };
        assert_eq!(all.apply(&pool).len(), 2);
    }
}
