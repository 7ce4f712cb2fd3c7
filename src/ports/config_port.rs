//! Configuration access port trait.

/// Raw key/value lookup by section. Typing and defaults are the domain's job.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Human-readable origin of the values, used in error messages.
    fn source(&self) -> String {
        "<memory>".to_string()
    }
}
