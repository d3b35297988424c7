use crate::CoreError;
use std::collections::VecDeque;

/// Asks the operator a yes/no question.
pub trait Prompter {
    fn confirm(&mut self, question: &str) -> Result<bool, CoreError>;
}

/// Answers from a fixed script and records every question asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<bool>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool, CoreError> {
        self.asked.push(question.to_owned());
        self.answers
            .pop_front()
            .ok_or_else(|| CoreError::Prompt(format!("no scripted answer for '{question}'")))
    }
}
