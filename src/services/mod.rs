pub mod catalog;
pub mod llm;
pub mod matching;
pub mod pool;
pub mod post_process;
pub mod providers;
pub mod recommendations;
pub mod resolver;
