//! Prompt decks
//!
//! The round state machine asks a [`PromptProvider`] for a fresh prompt at the
//! start of every round. [`PromptDeck`] is the in-memory implementation, built
//! from the standard deck or a newline-delimited file.

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use std::collections::HashSet;
use std::path::Path;

use crate::types::PromptId;

/// Result type for prompt operations
pub type PromptResult<T> = Result<T, PromptError>;

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("No unused prompts left")]
    Exhausted,

    #[error("Failed to read prompt deck: {0}")]
    Io(#[from] std::io::Error),

    #[error("Prompt deck '{0}' contains no prompts")]
    Empty(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub id: PromptId,
    pub text: String,
}

/// Source of prompts that have not been played yet
#[async_trait]
pub trait PromptProvider: Send + Sync {
    /// Return a prompt whose id is not in `used`, or [`PromptError::Exhausted`]
    async fn next_prompt(&self, used: &HashSet<PromptId>) -> PromptResult<Prompt>;
}

const STANDARD_PROMPTS: &[&str] = &[
    "Things you find in a kitchen",
    "Famous detectives",
    "Something you'd bring to a desert island",
    "Words that rhyme with 'cat'",
    "Pizza toppings",
    "Reasons to be late for work",
    "Animals with stripes",
    "Things that are yellow",
    "Board games",
    "Excuses for not doing homework",
    "Breakfast foods",
    "Things you shout at a referee",
    "Superheroes",
    "Things that melt",
    "Jobs that require a uniform",
    "Sounds a car can make",
    "Things you keep in a wallet",
    "Ice cream flavors",
    "Famous bridges",
    "Things that come in pairs",
    "Winter sports",
    "Ways to say hello",
    "Things with wheels",
    "Fairy tale characters",
    "Musical instruments",
    "Things you'd find at the beach",
    "Bad names for a pet",
    "Things that are sticky",
    "Vegetables kids hate",
    "Places you shouldn't fall asleep",
    "Things in a first aid kit",
    "Reasons to call your mom",
    "Card games",
    "Things that bounce",
    "Camping gear",
    "Things you'd see at a wedding",
    "Planets and moons",
    "Desserts",
    "Things that smell bad",
    "Dog breeds",
];

/// A fixed list of prompts drawn at random without repetition
#[derive(Debug, Clone)]
pub struct PromptDeck {
    name: String,
    prompts: Vec<Prompt>,
}

impl PromptDeck {
    /// Build a deck from prompt texts, skipping blank lines
    pub fn new(name: &str, texts: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let prompts = texts
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .enumerate()
            .map(|(i, text)| Prompt {
                id: format!("{}:{}", name, i),
                text,
            })
            .collect();

        Self {
            name: name.to_string(),
            prompts,
        }
    }

    /// The built-in deck
    pub fn standard() -> Self {
        Self::new("standard", STANDARD_PROMPTS)
    }

    /// Load a deck from a file with one prompt per line
    pub fn from_file(path: &Path) -> PromptResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("file")
            .to_string();

        let deck = Self::new(&name, contents.lines());
        if deck.is_empty() {
            return Err(PromptError::Empty(name));
        }

        tracing::info!("Loaded {} prompts from {}", deck.len(), path.display());
        Ok(deck)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

#[async_trait]
impl PromptProvider for PromptDeck {
    async fn next_prompt(&self, used: &HashSet<PromptId>) -> PromptResult<Prompt> {
        let remaining: Vec<&Prompt> = self
            .prompts
            .iter()
            .filter(|p| !used.contains(&p.id))
            .collect();

        remaining
            .choose(&mut rand::rng())
            .map(|p| (*p).clone())
            .ok_or(PromptError::Exhausted)
    }
}
