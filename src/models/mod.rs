pub mod chain;
pub mod quiz;
pub mod request;

pub use chain::{ChainEvent, ChainEventKind, ChainFailure, ChainOutcome, ChainState, ChainStatus};
pub use quiz::{
    Answer, AnswerKind, AnswerValue, DatasetRef, QuestionDescription, QuizPage, Submission,
    SubmitResult,
};
pub use request::{ChainKey, SolveRequest};
