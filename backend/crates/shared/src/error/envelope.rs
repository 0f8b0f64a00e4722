//! Error Envelope - wire format of failed responses
//!
//! `{ "success": false, "message": "...", "error": { "code": "...", "details": ..., "stack": [...] } }`
//!
//! What leaks into the envelope depends on the exposure mode, which the
//! binary sets once at startup via [`set_production_mode`].

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use super::app_error::AppError;

/// 本番モードで内部エラーの代わりに返すメッセージ
pub const OPAQUE_MESSAGE: &str = "Internal server error";

static PRODUCTION_MODE: AtomicBool = AtomicBool::new(false);

/// 本番モードを設定（起動時に一度だけ呼ぶ）
pub fn set_production_mode(enabled: bool) {
    PRODUCTION_MODE.store(enabled, Ordering::Relaxed);
}

/// 現在のモードが本番かどうか
pub fn is_production_mode() -> bool {
    PRODUCTION_MODE.load(Ordering::Relaxed)
}

/// 失敗レスポンスのボディ
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    pub error: ErrorBody,
}

/// `error` フィールドの中身
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
}

impl ErrorEnvelope {
    /// 指定したモードでエンベロープを構築
    ///
    /// * `details` - バリデーションエラー、または非本番モードで出力
    /// * `stack` - 非本番モードのみ出力（ソースエラーの連鎖）
    /// * 本番モードでは内部エラーのメッセージを隠す
    pub fn build(err: &AppError, production: bool) -> Self {
        let kind = err.kind();

        let message = if production && kind.is_opaque() {
            OPAQUE_MESSAGE.to_string()
        } else {
            err.message().to_string()
        };

        let details = if !production || kind.status_code() == 400 {
            err.details().cloned()
        } else {
            None
        };

        let stack = if production {
            None
        } else {
            let chain = err.source_chain();
            (!chain.is_empty()).then_some(chain)
        };

        Self {
            success: false,
            message,
            error: ErrorBody {
                code: kind.code(),
                details,
                stack,
            },
        }
    }

    /// 現在のモードでエンベロープを構築
    pub fn from_app_error(err: &AppError) -> Self {
        Self::build(err, is_production_mode())
    }
}
