use crate::error::ConfigurationError;

/// The fixed, ordered prompts an interview has to cover.
///
/// Topics are identified by position and never change once the list is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicList {
    topics: Vec<String>,
}

impl TopicList {
    pub fn new(topics: Vec<String>) -> Result<Self, ConfigurationError> {
        if topics.is_empty() {
            return Err(ConfigurationError::EmptyTopics);
        }
        let mut trimmed = Vec::with_capacity(topics.len());
        for (index, topic) in topics.into_iter().enumerate() {
            let topic = topic.trim();
            if topic.is_empty() {
                return Err(ConfigurationError::BlankTopic(index));
            }
            trimmed.push(topic.to_string());
        }
        Ok(Self { topics: trimmed })
    }

    // Never empty once built.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.topics.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    /// Renders every topic as one numbered block so the model knows the whole
    /// interview plan without seeing the whole history.
    pub fn framing_message(&self) -> String {
        let mut out = String::from("Full list of interview questions:");
        for (i, topic) in self.iter().enumerate() {
            out.push_str(&format!("\n{}. {}", i + 1, topic));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_list() {
        assert!(matches!(
            TopicList::new(vec![]),
            Err(ConfigurationError::EmptyTopics)
        ));
    }

    #[test]
    fn rejects_blank_topic_with_its_position() {
        let result = TopicList::new(vec!["First".into(), "   ".into()]);
        assert!(matches!(result, Err(ConfigurationError::BlankTopic(1))));
    }

    #[test]
    fn trims_and_numbers_topics() {
        let topics = TopicList::new(vec![" How do you use AI? ".into(), "What worries you?".into()])
            .unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics.get(0), Some("How do you use AI?"));
        assert_eq!(topics.get(2), None);
        assert_eq!(
            topics.iter().collect::<Vec<_>>(),
            ["How do you use AI?", "What worries you?"]
        );
        assert_eq!(
            topics.framing_message(),
            "Full list of interview questions:\n1. How do you use AI?\n2. What worries you?"
        );
    }
}
