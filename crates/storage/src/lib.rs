#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;
pub mod supabase;

pub use repository::{
    InMemoryRepository, QuestionStore, RecentAttempt, ResultSink, Storage, StorageError,
};
