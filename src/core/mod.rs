// src/core/mod.rs

pub mod aggregator;
pub mod dictionary;
pub mod engine;
pub mod matcher;
pub mod tokenizer;
pub mod trie;
pub mod types;
