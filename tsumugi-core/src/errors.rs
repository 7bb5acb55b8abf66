//! エラーメッセージ定数

/// 登録されていないコンテキストを指定した場合のエラーメッセージ
pub const ERR_UNKNOWN_CONTEXT: &str = "Unknown context";

/// 呼び出し先に関数が見つからなかった場合のエラーメッセージ
pub const ERR_FUNCTION_NOT_FOUND: &str = "Function not found in target context";
