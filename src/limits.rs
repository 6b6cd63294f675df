/// Length of the rolling booking window, in days, starting tomorrow.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Longest stay a single reservation may cover, counting both ends.
pub const DEFAULT_MAX_STAY_DAYS: u32 = 3;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_EMAIL_LEN: usize = 320;

/// Fresh ULIDs essentially never collide; this only bounds the retry loop.
pub const MAX_ID_MINT_ATTEMPTS: usize = 8;
