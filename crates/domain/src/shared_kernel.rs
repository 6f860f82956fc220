pub use sutegi_shared::*;
