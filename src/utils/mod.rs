pub mod openai_chat;
pub mod pdf;
pub mod prompts;
