pub use sat_arena_core as core;
pub use sat_arena_runner as runner;
