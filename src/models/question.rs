use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Every generated question carries exactly this many answer options.
pub const OPTION_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    #[serde(alias = "correctAnswerIndex")]
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    /// A non-blank prompt, exactly [`OPTION_COUNT`] distinct non-blank options,
    /// and a correct index that addresses one of them.
    pub fn is_well_formed(&self) -> bool {
        if self.question.trim().is_empty()
            || self.options.len() != OPTION_COUNT
            || self.correct_answer >= OPTION_COUNT
        {
            return false;
        }
        let distinct: HashSet<&str> = self.options.iter().map(|o| o.trim()).collect();
        distinct.len() == OPTION_COUNT && !distinct.contains("")
    }

    pub fn is_correct(&self, choice: Option<usize>) -> bool {
        choice == Some(self.correct_answer)
    }

    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_answer).map(String::as_str)
    }
}
