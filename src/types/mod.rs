//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 공통 타입 정의

mod event;

pub use event::{Coordinates, DrinkEvent, EventId, NewDrinkEvent, DEFAULT_COUNTRY};

use serde::Serialize;

/// API 응답 래퍼
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let resp = ApiResponse::success(3u32);
        assert!(resp.success);
        assert_eq!(resp.data, Some(3));
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_api_response_success_serializes_null_error() {
        let json = serde_json::to_value(ApiResponse::success("ok")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], "ok");
        assert!(json["error"].is_null());
    }
}
