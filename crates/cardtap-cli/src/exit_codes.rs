pub const SUCCESS: i32 = 0;
/// Generic failure, including an exhausted initialization retry budget.
pub const FAILURE: i32 = 1;
pub const NOTHING_TO_EXPORT: i32 = 2;
