//! Built-in strategies.

pub mod advice;
pub mod body;
pub mod property;
pub mod query;

pub use advice::{DefaultValueAdvice, SudoAdvice};
pub use body::BodyHandler;
pub use property::{GetProperty, SetProperty};
pub use query::{bind_params, CommandHandler, LookupHandler, QueryHandler};
