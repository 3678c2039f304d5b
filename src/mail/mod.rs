//! Mail API schemas
//!
//! The message shapes exchanged by the mail capture service.

mod models;

pub use models::{Message, MessagePart};

use crate::engine::Engine;
use crate::schema::ModelResult;

/// Registers the mail schemas, parts first since messages reference them.
pub fn register(engine: &Engine) -> ModelResult<()> {
    engine.register_model::<MessagePart>()?;
    engine.register_model::<Message>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_twice_fails() {
        let engine = Engine::default();
        register(&engine).unwrap();
        assert!(register(&engine).is_err());
        assert_eq!(engine.schemas().names(), ["Message", "MessagePart"]);
    }
}
