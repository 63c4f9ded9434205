// Public API for integration tests and potential library usage

pub mod config;
pub mod game;
pub mod prompts;
pub mod protocol;
pub mod similarity;
pub mod state;
pub mod types;
pub mod ws;

// Prompt timers and game event listeners
pub mod broadcast;
