//! パース関連のユーティリティ関数

use anyhow::Result;
use tsumugi_host::Value;

/// 整数文字列をi64にパース
///
/// 16進数（0xプレフィックス付き）または10進数をサポート
///
/// # Examples
/// ```
/// use tsumugi_core::parse::parse_integer;
///
/// assert_eq!(parse_integer("0x1234").unwrap(), 0x1234);
/// assert_eq!(parse_integer("-12").unwrap(), -12);
/// ```
pub fn parse_integer(s: &str) -> Result<i64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        // 16進数
        i64::from_str_radix(hex, 16)
            .map_err(|e| anyhow::anyhow!("Invalid hexadecimal integer '{}': {}", s, e))?
    } else {
        digits
            .parse::<i64>()
            .map_err(|e| anyhow::anyhow!("Invalid integer '{}': {}", s, e))?
    };

    Ok(if negative { -value } else { value })
}

/// コマンド引数を値にパース
///
/// `nil`・`true`・`false`・整数・浮動小数点数の順に試し、
/// どれでもなければ文字列として扱います（前後の引用符は外します）。
///
/// # Examples
/// ```
/// use tsumugi_core::parse::parse_value;
/// use tsumugi_core::Value;
///
/// assert_eq!(parse_value("42"), Value::Integer(42));
/// assert_eq!(parse_value("\"ping\""), Value::from("ping"));
/// ```
pub fn parse_value(s: &str) -> Value {
    let s = s.trim();
    match s {
        "nil" => return Value::Nil,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(i) = parse_integer(s) {
        return Value::Integer(i);
    }
    if let Ok(n) = s.parse::<f64>() {
        if n.is_finite() {
            return Value::Number(n);
        }
    }

    let unquoted = s
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))
        .unwrap_or(s);
    Value::from(unquoted)
}

/// 引数の並びをまとめてパース
pub fn parse_values(parts: &[&str]) -> Vec<Value> {
    parts.iter().map(|p| parse_value(p)).collect()
}

/// フレームIDをパース
///
/// フレームIDはフロントエンドに渡した整数そのものなので、符号付きで読みます。
/// 形式の検証は [`crate::FrameId::decode`] が行います。
pub fn parse_frame_id(s: &str) -> Result<i64> {
    parse_integer(s)
}
