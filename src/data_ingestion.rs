pub mod event_reader;
pub mod validator;

pub use event_reader::{parse_line, EventReadError, EventReader, EventSource, ReadReport};
pub use validator::{EventValidationError, EventValidator};
