/// Store-assigned numeric identity
pub type Id = i64;
