mod code;

pub use code::{CodeKind, CodePayload, is_integer};
