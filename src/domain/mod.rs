pub mod statement;

pub use statement::{Actor, ActorAccount, Context, LearningObject, Statement, StatementResult, Verb};
