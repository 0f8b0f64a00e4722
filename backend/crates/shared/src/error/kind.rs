//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum that maps to HTTP status codes and
//! stable machine-readable codes.

use serde::Serialize;

/// エラー種別の列挙体
///
/// API 境界で使用するエラー分類を定義します。
/// 各バリアントは HTTP ステータスコードと、クライアントが分岐に使う
/// 安定したエラーコード文字列（`VALIDATION_ERROR` など）に対応します。
///
/// ## Notes
/// * `non_exhaustive` - 将来的に列挙子が追加される可能性があることを示す
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::Authentication;
/// assert_eq!(kind.status_code(), 401);
/// assert_eq!(kind.code(), "AUTHENTICATION_ERROR");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// 400 - 入力が不正・不足
    Validation,
    /// 401 - 認証失敗（資格情報・2FA・トークン）
    Authentication,
    /// 401 - トークン固有の失敗（内部では invalid / expired を区別）
    Token,
    /// 403 - アクセス権限なし
    Authorization,
    /// 404 - リソースが見つからない
    NotFound,
    /// 409 - 現在の状態と競合
    Conflict,
    /// 429 - レート制限超過
    RateLimit,
    /// 500 - データストアの障害
    Database,
    /// 503 - 外部サービス（OAuth プロバイダ等）の障害
    ExternalService,
    /// 500 - 予期しない内部エラー
    Internal,
}

impl ErrorKind {
    /// HTTP ステータスコードを取得
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::kind::ErrorKind;
    /// assert_eq!(ErrorKind::Validation.status_code(), 400);
    /// assert_eq!(ErrorKind::ExternalService.status_code(), 503);
    /// ```
    #[inline]
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Authentication | ErrorKind::Token => 401,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::RateLimit => 429,
            ErrorKind::Database | ErrorKind::Internal => 500,
            ErrorKind::ExternalService => 503,
        }
    }

    /// 機械可読なエラーコードを取得
    ///
    /// レスポンスの `error.code` にそのまま出力されます。
    /// クライアントとの契約なので変更しないこと。
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Authentication => "AUTHENTICATION_ERROR",
            ErrorKind::Token => "TOKEN_ERROR",
            ErrorKind::Authorization => "AUTHORIZATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND_ERROR",
            ErrorKind::Conflict => "CONFLICT_ERROR",
            ErrorKind::RateLimit => "RATE_LIMIT_ERROR",
            ErrorKind::Database => "DATABASE_ERROR",
            ErrorKind::ExternalService => "EXTERNAL_SERVICE_ERROR",
            ErrorKind::Internal => "INTERNAL_SERVER_ERROR",
        }
    }

    /// ユーザー向けの文字列表現を取得
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Validation Error",
            ErrorKind::Authentication => "Authentication Error",
            ErrorKind::Token => "Token Error",
            ErrorKind::Authorization => "Authorization Error",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::RateLimit => "Too Many Requests",
            ErrorKind::Database => "Database Error",
            ErrorKind::ExternalService => "External Service Error",
            ErrorKind::Internal => "Internal Server Error",
        }
    }

    /// サーバー側のエラーかどうかを判定
    ///
    /// 5xx系のエラーは `true` を返します。
    /// これらのエラーはログに記録すべきです。
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// クライアント側のエラーかどうかを判定
    #[inline]
    pub const fn is_client_error(&self) -> bool {
        let code = self.status_code();
        code >= 400 && code < 500
    }

    /// 本番モードでメッセージを隠すべき種別かどうか
    #[inline]
    pub const fn is_opaque(&self) -> bool {
        matches!(self, ErrorKind::Database | ErrorKind::Internal)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
