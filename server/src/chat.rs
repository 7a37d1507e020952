//! Chat admission: text sanitizing and per-connection rate limiting.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Rewrites user supplied text before it is stored or broadcast
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, text: &str) -> String;
}

const DEFAULT_BLOCKED_WORDS: &[&str] = &[
    "ass", "asshole", "bastard", "bitch", "crap", "cunt", "damn", "dick", "fuck", "piss", "shit",
    "slut", "whore",
];

/// Masks blocked words with `*`, matching whole words case-insensitively.
/// Output always has the same number of characters as the input.
#[derive(Debug, Clone)]
pub struct WordFilter {
    words: HashSet<String>,
}

impl Default for WordFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl WordFilter {
    pub fn new() -> Self {
        Self::with_words(DEFAULT_BLOCKED_WORDS.iter().copied())
    }

    pub fn with_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words.into_iter().map(|w| w.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn add_word(&mut self, word: &str) {
        self.words.insert(word.to_lowercase());
    }

    fn mask_word(&self, word: &str, out: &mut String) {
        if self.words.contains(&word.to_lowercase()) {
            out.extend(std::iter::repeat('*').take(word.chars().count()));
        } else {
            out.push_str(word);
        }
    }
}

impl Sanitizer for WordFilter {
    fn sanitize(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut word = String::new();

        for c in text.chars() {
            if c.is_alphanumeric() {
                word.push(c);
            } else {
                self.mask_word(&word, &mut out);
                word.clear();
                out.push(c);
            }
        }
        self.mask_word(&word, &mut out);

        out
    }
}

/// Keeps at most `max` characters
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Rolling window limiter: at most `capacity` admissions in any `window`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    hits: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity,
            window,
            hits: VecDeque::with_capacity(capacity),
        }
    }

    pub fn allow(&mut self) -> bool {
        self.allow_at(Instant::now())
    }

    /// Admits and records a hit at `now` unless the window is saturated.
    /// Rejected attempts are not recorded.
    pub fn allow_at(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.hits.front() {
            if now.duration_since(oldest) >= self.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }

        if self.hits.len() >= self.capacity {
            return false;
        }
        self.hits.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_masks_whole_words() {
        let filter = WordFilter::new();
        assert_eq!(filter.sanitize("well damn it"), "well **** it");
        assert_eq!(filter.sanitize("DAMN!"), "****!");
        assert_eq!(filter.sanitize("amsterdam classic"), "amsterdam classic");
    }

    #[test]
    fn test_filter_preserves_length() {
        let filter = WordFilter::new();
        let text = "crap, that's a shit move. good game!";
        let clean = filter.sanitize(text);
        assert_eq!(clean.chars().count(), text.chars().count());
        assert_eq!(clean, "****, that's a **** move. good game!");
    }

    #[test]
    fn test_filter_custom_words() {
        let mut filter = WordFilter::with_words(["rats"]);
        assert_eq!(filter.sanitize("Rats and damn"), "**** and damn");

        filter.add_word("Damn");
        assert_eq!(filter.sanitize("Rats and damn"), "**** and ****");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("hello", 3), "hel");
        assert_eq!(truncate("hi", 10), "hi");
        assert_eq!(truncate("ééééé", 2), "éé");

        let long = "x".repeat(600);
        assert_eq!(truncate(&long, 500).len(), 500);
    }

    #[test]
    fn test_rate_limiter_capacity() {
        let mut limiter = RateLimiter::new(30, Duration::from_secs(60));
        let start = Instant::now();

        for i in 0..30 {
            assert!(limiter.allow_at(start + Duration::from_millis(i)));
        }
        assert!(!limiter.allow_at(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_rate_limiter_window_rolls() {
        let mut limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.allow_at(start));
        assert!(limiter.allow_at(start + Duration::from_secs(10)));
        assert!(!limiter.allow_at(start + Duration::from_secs(59)));

        // The first hit has aged out, the second has not
        assert!(limiter.allow_at(start + Duration::from_secs(60)));
        assert!(!limiter.allow_at(start + Duration::from_secs(61)));
        assert!(limiter.allow_at(start + Duration::from_secs(70)));
    }
}
