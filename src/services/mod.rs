pub mod answer_selector;
pub mod question_extractor;

pub use answer_selector::AnswerSelector;
pub use question_extractor::QuestionExtractor;
