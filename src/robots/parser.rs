//! Robots policy parser
//!
//! Extracts the two directives the pipeline acts on: the first `Crawl-delay`
//! value and an unqualified `Disallow: /`. User-agent groups are not
//! interpreted.

use crate::config::PolitenessConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Crawl delay used when a site's policy does not set one (milliseconds)
pub const DEFAULT_CRAWL_DELAY_MS: u64 = 1000;

/// Politeness rules for a site, frozen at ingestion time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    /// Delay to wait before fetching the page (milliseconds)
    pub crawl_delay_ms: u64,

    /// Whether the site forbids crawling altogether
    pub disallow_all: bool,

    /// Raw robots policy text (empty when none could be fetched)
    pub raw_policy_text: String,
}

impl PolicySnapshot {
    /// Creates a permissive snapshot with the given delay and no policy text
    ///
    /// This is used when the robots policy cannot be fetched.
    pub fn permissive(default_delay_ms: u64) -> Self {
        Self {
            crawl_delay_ms: default_delay_ms,
            disallow_all: false,
            raw_policy_text: String::new(),
        }
    }

    /// Parses raw robots policy content
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    /// * `rules` - Default delay, upper bound, and the unit of `Crawl-delay`
    ///
    /// # Returns
    ///
    /// A snapshot carrying the parsed rules and the raw text
    pub fn from_content(content: &str, rules: &PolitenessConfig) -> Self {
        let crawl_delay_ms = parse_crawl_delay(content)
            .map(|n| rules.crawl_delay_unit.to_millis(n).min(rules.max_crawl_delay_ms))
            .unwrap_or(rules.default_crawl_delay_ms);

        Self {
            crawl_delay_ms,
            disallow_all: parse_disallow_all(content),
            raw_policy_text: content.to_string(),
        }
    }
}

impl Default for PolicySnapshot {
    fn default() -> Self {
        Self::permissive(DEFAULT_CRAWL_DELAY_MS)
    }
}

fn crawl_delay_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)crawl-delay:\s*(\d+)").expect("crawl-delay pattern is valid"))
}

/// Returns the first `Crawl-delay` value in the document, unit not applied
fn parse_crawl_delay(content: &str) -> Option<u64> {
    crawl_delay_regex()
        .captures(content)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Checks for a `Disallow: /` line whose value is exactly the root path
fn parse_disallow_all(content: &str) -> bool {
    content.lines().any(|line| {
        // Strip trailing comments
        let line = line.split('#').next().unwrap_or("").trim();
        match line.split_once(':') {
            Some((key, value)) => key.trim().eq_ignore_ascii_case("disallow") && value.trim() == "/",
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlDelayUnit;

    const MAX: u64 = 60_000;

    fn rules(default_delay_ms: u64) -> PolitenessConfig {
        PolitenessConfig {
            default_crawl_delay_ms: default_delay_ms,
            max_crawl_delay_ms: MAX,
            crawl_delay_unit: CrawlDelayUnit::Millis,
        }
    }

    fn seconds_rules() -> PolitenessConfig {
        PolitenessConfig {
            crawl_delay_unit: CrawlDelayUnit::Seconds,
            ..rules(1000)
        }
    }

    #[test]
    fn test_permissive_default() {
        let policy = PolicySnapshot::default();
        assert_eq!(policy.crawl_delay_ms, 1000);
        assert!(!policy.disallow_all);
        assert!(policy.raw_policy_text.is_empty());
    }

    #[test]
    fn test_parse_disallow_all() {
        let content = "User-agent: *\nDisallow: /";
        let policy = PolicySnapshot::from_content(content, &rules(1000));
        assert!(policy.disallow_all);
        assert_eq!(policy.raw_policy_text, content);
    }

    #[test]
    fn test_parse_disallow_specific_path_is_not_disallow_all() {
        let content = "User-agent: *\nDisallow: /admin\nDisallow: /private/";
        let policy = PolicySnapshot::from_content(content, &rules(1000));
        assert!(!policy.disallow_all);
    }

    #[test]
    fn test_empty_disallow_allows_everything() {
        let content = "User-agent: *\nDisallow:";
        let policy = PolicySnapshot::from_content(content, &rules(1000));
        assert!(!policy.disallow_all);
    }

    #[test]
    fn test_disallow_all_with_comment_and_case() {
        let content = "user-agent: *\ndisallow:   /   # keep out";
        let policy = PolicySnapshot::from_content(content, &rules(1000));
        assert!(policy.disallow_all);
    }

    #[test]
    fn test_crawl_delay_kept_as_millis() {
        let content = "User-agent: *\nCrawl-delay: 5\nDisallow: /admin";
        let policy = PolicySnapshot::from_content(content, &rules(1000));
        assert_eq!(policy.crawl_delay_ms, 5);
    }

    #[test]
    fn test_crawl_delay_seconds_unit() {
        let content = "User-agent: *\nCrawl-delay: 10\nDisallow: /admin";
        let policy = PolicySnapshot::from_content(content, &seconds_rules());
        assert_eq!(policy.crawl_delay_ms, 10_000);
    }

    #[test]
    fn test_crawl_delay_first_match_wins() {
        let content = "User-agent: BotA\nCrawl-delay: 2\n\nUser-agent: *\nCrawl-delay: 7";
        let policy = PolicySnapshot::from_content(content, &rules(1000));
        assert_eq!(policy.crawl_delay_ms, 2);
    }

    #[test]
    fn test_crawl_delay_decimal_uses_integer_part() {
        let content = "User-agent: *\nCrawl-delay: 2.5";
        let policy = PolicySnapshot::from_content(content, &seconds_rules());
        assert_eq!(policy.crawl_delay_ms, 2000);
    }

    #[test]
    fn test_crawl_delay_case_insensitive() {
        let content = "User-agent: TestBot\ncrawl-delay: 3";
        let policy = PolicySnapshot::from_content(content, &rules(1000));
        assert_eq!(policy.crawl_delay_ms, 3);
    }

    #[test]
    fn test_crawl_delay_missing_uses_default() {
        let content = "User-agent: *\nDisallow: /admin";
        let policy = PolicySnapshot::from_content(content, &rules(1500));
        assert_eq!(policy.crawl_delay_ms, 1500);
    }

    #[test]
    fn test_crawl_delay_capped() {
        let content = "User-agent: *\nCrawl-delay: 86400";
        let policy = PolicySnapshot::from_content(content, &seconds_rules());
        assert_eq!(policy.crawl_delay_ms, MAX);

        let content = "User-agent: *\nCrawl-delay: 600000";
        let policy = PolicySnapshot::from_content(content, &rules(1000));
        assert_eq!(policy.crawl_delay_ms, MAX);
    }

    #[test]
    fn test_invalid_robots_txt() {
        let content = "This is not valid robots.txt {{{";
        let policy = PolicySnapshot::from_content(content, &rules(1000));
        assert!(!policy.disallow_all);
        assert_eq!(policy.crawl_delay_ms, 1000);
    }
}
