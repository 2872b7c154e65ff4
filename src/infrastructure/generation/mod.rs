mod openai;

pub use openai::OpenAiGeneration;
