/// Topics offered when the backend cannot be reached.
pub const DEFAULT_TOPICS: [&str; 5] = [
    "general",
    "learning",
    "creative",
    "technology",
    "problem_solving",
];

pub const DEFAULT_TOPIC: &str = "general";

/// Human-readable label for a topic key, e.g. `problem_solving` -> `problem solving`.
pub fn topic_label(topic: &str) -> String {
    topic.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_label() {
        assert_eq!(topic_label("problem_solving"), "problem solving");
        assert_eq!(topic_label("general"), "general");
    }
}
