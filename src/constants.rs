// Messages
pub const MESSAGE_PUPIL_RETRIEVED: &str = "Pupil retrieved successfully";
pub const MESSAGE_PUPIL_CREATED: &str = "Pupil created successfully";
pub const MESSAGE_PUPIL_UPDATED: &str = "Pupil updated successfully";
pub const MESSAGE_PUPIL_DELETED: &str = "Pupil deleted successfully";
pub const MESSAGE_PONG: &str = "pong";
pub const MESSAGE_SERVER_RUNNING: &str = "Server is running";

pub const MESSAGE_VALIDATION_FAILED: &str = "Validation failed";
pub const MESSAGE_DATABASE_VALIDATION_FAILED: &str = "Database validation failed";
pub const MESSAGE_EMAIL_EXISTS: &str = "Email already exists";
pub const MESSAGE_EMAIL_EXISTS_DETAIL: &str = "A pupil with this email already exists";
pub const MESSAGE_PUPIL_NOT_FOUND: &str = "Pupil not found";
pub const MESSAGE_ROUTE_NOT_FOUND: &str = "Route not found";
pub const MESSAGE_INVALID_JSON: &str = "Invalid JSON in request body";
pub const MESSAGE_STORAGE_UNAVAILABLE: &str = "Storage is temporarily unavailable";
pub const MESSAGE_INTERNAL_SERVER_ERROR: &str = "Internal server error";

// Health
pub const STORAGE_CONNECTED: &str = "connected";
pub const STORAGE_DISCONNECTED: &str = "disconnected";

// Routes
pub const PUPILS_SCOPE: &str = "/api/pupils";
