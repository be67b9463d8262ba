//! Skill extraction against a fixed vocabulary

use crate::error::{RelevanceError, Result};
use aho_corasick::AhoCorasick;
use std::collections::{BTreeSet, HashSet};

/// Skills recognized when no vocabulary is configured
pub const DEFAULT_SKILLS: &[&str] = &[
    "python", "java", "c++", "sql", "mysql", "postgresql",
    "machine learning", "data analysis", "data science",
    "tensorflow", "pytorch", "scikit-learn", "pandas", "numpy",
    "react", "angular", "vue", "javascript", "html", "css",
    "flask", "django", "fastapi", "aws", "azure", "gcp",
];

const SEPARATORS: &[char] = &[
    ',', ';', ':', '/', '|', '(', ')', '[', ']', '{', '}', '<', '>', '"', '\'', '!', '?', '*',
    '•',
];

/// Precompiled matcher over the skill vocabulary.
///
/// Every vocabulary entry and every input text goes through the same [`tokenize`]
/// step. Entries are searched as space-joined token sequences in the space-joined
/// token stream of the text, and a hit only counts when it starts and ends on a
/// token boundary, so `java` never matches inside `javascript`.
pub struct SkillMatcher {
    automaton: AhoCorasick,
    skills: Vec<String>,
}

impl SkillMatcher {
    pub fn new<S: AsRef<str>>(vocabulary: &[S]) -> Result<Self> {
        let mut seen = HashSet::new();
        let skills: Vec<String> = vocabulary
            .iter()
            .map(|entry| canonical_skill(entry.as_ref()))
            .filter(|skill| !skill.is_empty())
            .filter(|skill| seen.insert(skill.clone()))
            .collect();

        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&skills)
            .map_err(|e| {
                RelevanceError::Configuration(format!("Failed to build skill matcher: {}", e))
            })?;

        log::debug!("Skill matcher built with {} entries", skills.len());

        Ok(Self { automaton, skills })
    }

    pub fn with_default_vocabulary() -> Result<Self> {
        Self::new(DEFAULT_SKILLS)
    }

    /// Skills present in already-normalized text, in canonical form
    pub fn extract_skills(&self, text: &str) -> BTreeSet<String> {
        let haystack = tokenize(text).join(" ");
        let bytes = haystack.as_bytes();
        let mut found = BTreeSet::new();

        for mat in self.automaton.find_overlapping_iter(&haystack) {
            let starts_on_boundary = mat.start() == 0 || bytes[mat.start() - 1] == b' ';
            let ends_on_boundary = mat.end() == bytes.len() || bytes[mat.end()] == b' ';
            if starts_on_boundary && ends_on_boundary {
                found.insert(self.skills[mat.pattern().as_usize()].clone());
            }
        }

        found
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.skills
    }

    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }
}

/// Split text into skill tokens.
///
/// Whitespace and list punctuation separate tokens; a trailing `.` (sentence end)
/// and a leading `-` (bullet) are dropped, but internal punctuation stays, which
/// keeps `c++`, `node.js` and `scikit-learn` whole.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .map(|token| token.trim_end_matches('.').trim_start_matches('-'))
        .filter(|token| !token.is_empty())
        .collect()
}

/// Lowercased tokens of a vocabulary entry joined by single spaces
pub fn canonical_skill(entry: &str) -> String {
    tokenize(&entry.to_lowercase()).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::text_processor::normalize;
    use proptest::prelude::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_matcher_creation() {
        let matcher = SkillMatcher::with_default_vocabulary().unwrap();
        assert_eq!(matcher.skill_count(), DEFAULT_SKILLS.len());
    }

    #[test]
    fn test_extracts_single_and_multi_word_skills() {
        let matcher = SkillMatcher::with_default_vocabulary().unwrap();
        let text = normalize("Built Machine Learning pipelines in Python, with SQL and AWS.");
        assert_eq!(
            matcher.extract_skills(&text),
            set(&["aws", "machine learning", "python", "sql"])
        );
    }

    #[test]
    fn test_token_boundaries_not_substrings() {
        let matcher = SkillMatcher::with_default_vocabulary().unwrap();
        let skills = matcher.extract_skills("javascript and mysql expert");
        assert!(skills.contains("javascript"));
        assert!(skills.contains("mysql"));
        assert!(!skills.contains("java"));
        assert!(!skills.contains("sql"));
    }

    #[test]
    fn test_punctuated_skills() {
        let matcher = SkillMatcher::with_default_vocabulary().unwrap();
        let text = normalize("Languages: C++, Python/Django. Libraries - scikit-learn (pandas)");
        assert_eq!(
            matcher.extract_skills(&text),
            set(&["c++", "django", "pandas", "python", "scikit-learn"])
        );
    }

    #[test]
    fn test_repeated_mentions_collapse() {
        let matcher = SkillMatcher::with_default_vocabulary().unwrap();
        let skills = matcher.extract_skills("python python python");
        assert_eq!(skills, set(&["python"]));
    }

    #[test]
    fn test_multi_word_skill_needs_contiguous_tokens() {
        let matcher = SkillMatcher::with_default_vocabulary().unwrap();
        assert!(matcher.extract_skills("machine and learning").is_empty());
        assert!(matcher.extract_skills("data   science").contains("data science"));
    }

    #[test]
    fn test_overlapping_entries_are_all_reported() {
        let matcher = SkillMatcher::new(&["machine learning", "learning", "data"]).unwrap();
        let skills = matcher.extract_skills("machine learning on big data");
        assert_eq!(skills, set(&["data", "learning", "machine learning"]));
    }

    #[test]
    fn test_vocabulary_is_canonicalized_and_deduplicated() {
        let matcher = SkillMatcher::new(&["Machine  Learning", "machine learning", "  ", "SQL"]).unwrap();
        assert_eq!(matcher.vocabulary(), &["machine learning".to_string(), "sql".to_string()]);
    }

    #[test]
    fn test_empty_vocabulary_never_matches() {
        let empty: [&str; 0] = [];
        let matcher = SkillMatcher::new(&empty).unwrap();
        assert!(matcher.extract_skills("python sql aws").is_empty());
    }

    #[test]
    fn test_no_match_is_empty_set() {
        let matcher = SkillMatcher::with_default_vocabulary().unwrap();
        assert!(matcher.extract_skills("").is_empty());
        assert!(matcher.extract_skills("gardening and cooking").is_empty());
    }

    proptest! {
        #[test]
        fn prop_only_vocabulary_entries_returned(
            words in proptest::collection::vec("[a-z+#.-]{1,8}", 0..40)
        ) {
            let matcher = SkillMatcher::with_default_vocabulary().unwrap();
            let vocabulary: BTreeSet<String> = matcher.vocabulary().iter().cloned().collect();
            let text = words.join(" ");
            let found = matcher.extract_skills(&text);
            prop_assert!(found.is_subset(&vocabulary));
            prop_assert_eq!(found, matcher.extract_skills(&text));
        }

        #[test]
        fn prop_every_embedded_skill_is_found(
            picks in proptest::collection::vec(0..DEFAULT_SKILLS.len(), 1..6)
        ) {
            let matcher = SkillMatcher::with_default_vocabulary().unwrap();
            let text = picks
                .iter()
                .map(|&i| DEFAULT_SKILLS[i])
                .collect::<Vec<_>>()
                .join(", ");
            let found = matcher.extract_skills(&normalize(&text));
            for &i in &picks {
                prop_assert!(found.contains(DEFAULT_SKILLS[i]));
            }
        }
    }
}
