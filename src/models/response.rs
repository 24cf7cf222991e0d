use serde::Serialize;

/// Success envelope: `{success: true, message, data, count?}`.
#[derive(Debug, Serialize)]
pub struct ResponseBody<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T> ResponseBody<T> {
    pub fn new(message: &str, data: T) -> ResponseBody<T> {
        ResponseBody {
            success: true,
            message: message.to_string(),
            data,
            count: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}
