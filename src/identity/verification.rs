//! The one-time quiz that unlocks social features.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub name: &'static str,
    pub prompt: &'static str,
    pub choices: [(&'static str, &'static str); 4],
}

pub const QUESTIONS: [Question; 3] = [
    Question {
        name: "choices1",
        prompt: "What is the name of the platform?",
        choices: [
            ("choice1", "Go up"),
            ("choice2", "Goleft"),
            ("choice3", "Goup"),
            ("choice4", "Goright"),
        ],
    },
    Question {
        name: "choices2",
        prompt: "What is 1+1=?",
        choices: [
            ("choice1", "2"),
            ("choice2", "4"),
            ("choice3", "5"),
            ("choice4", "0"),
        ],
    },
    Question {
        name: "choices3",
        prompt: "What is the capital of USA?",
        choices: [
            ("choice1", "California"),
            ("choice2", "Washington D.C"),
            ("choice3", "New York"),
            ("choice4", "Chicago"),
        ],
    },
];

const ANSWER_KEY: [&str; 3] = ["choice3", "choice1", "choice2"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerificationForm {
    #[serde(default)]
    pub choices1: Option<String>,
    #[serde(default)]
    pub choices2: Option<String>,
    #[serde(default)]
    pub choices3: Option<String>,
}

impl VerificationForm {
    /// True only when every answer matches the key.
    pub fn is_correct(&self) -> bool {
        let given = [&self.choices1, &self.choices2, &self.choices3];
        given
            .iter()
            .zip(ANSWER_KEY)
            .all(|(answer, expected)| answer.as_deref() == Some(expected))
    }
}
