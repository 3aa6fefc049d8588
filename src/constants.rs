pub const SERVICE_NAME: &str = "habit-tracker";

pub const SERVER_PORT: u16 = 3000;

// PROGRESSION
pub const BASE_XP_FOR_NEXT_LEVEL: u64 = 100;
pub const XP_PER_LEVEL: u64 = 100;
pub const STARTING_GOLD: u64 = 100;

pub const POSITIVE_LOG_XP: i64 = 10;
pub const NEGATIVE_LOG_XP: i64 = -5;
pub const POSITIVE_LOG_GOLD: u64 = 5;

// PAYMENTS
pub const STRIPE_API_URL: &str = "https://api.stripe.com";
pub const DARK_MODE_PRICE_CENTS: u64 = 5000;
pub const PAYMENT_CURRENCY: &str = "usd";
pub const PAYMENT_SUCCEEDED: &str = "succeeded";

pub const QUOTES_API_URL: &str = "https://dummyjson.com";

// SESSIONS
pub const SESSION_TOKEN_SEPARATOR: char = '.';
pub const BEARER_PREFIX: &str = "Bearer ";

// STORE
pub const REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const ACCOUNT_DOC_ID: &str = "account";
pub const BADGES_DOC_ID: &str = "badges";
/// Hash of redeemed payment intent ids to the user each one was redeemed by
pub const REDEEMED_PAYMENTS_KEY: &str = "payments:redeemed";

/// Largest accepted UTC offset for local-time calculations, in minutes
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;
