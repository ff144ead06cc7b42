// Re-export all model types
pub use self::enums::*;
pub use self::errors::*;
pub use self::food::*;
pub use self::food_eaten::*;
pub use self::pattern::*;
pub use self::user::*;
pub use self::validation::*;

mod enums;
mod errors;
mod food;
mod food_eaten;
mod pattern;
mod user;
mod validation;
